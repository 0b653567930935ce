//! Ownership of the emitted SVG path element and its colours.

use svg::node::element::{path::Data, Path};

use cairn_model::Block;

/// Block kinds that keep their primary contrast colours even when flagged as
/// shadows; a parameter reporter inside a prototype must stay legible.
const ARGUMENT_REPORTER_KINDS: [&str; 2] = [
    "argument_reporter_string_number",
    "argument_reporter_boolean",
];

/// Wraps one block's outline path element. The single place fill and stroke
/// colours are decided.
pub struct PathObject {
    path: Path,
}

impl PathObject {
    pub fn new(data: Data) -> Self {
        Self {
            path: Path::new().set("d", data),
        }
    }

    /// Applies the block's colour set: primary fill with tertiary outline,
    /// secondary fill for shadow blocks. Argument reporters are exempt from
    /// the shadow rule.
    pub fn apply_colour(mut self, block: &Block) -> Self {
        let colours = block.colours();
        let argument_reporter = ARGUMENT_REPORTER_KINDS.contains(&block.kind());
        let fill = if block.is_shadow() && !argument_reporter {
            colours.secondary()
        } else {
            colours.primary()
        };
        self.path = self
            .path
            .set("fill", fill)
            .set("stroke", colours.tertiary())
            .set("stroke-width", 1);
        self
    }

    pub fn finish(self) -> Path {
        self.path
    }
}
