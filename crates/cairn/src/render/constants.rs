//! Shared rendering constants and resolved theme colours.
//!
//! One [`ConstantProvider`] is built per renderer and shared by every
//! measure/draw pass. All lengths are workspace units derived from the grid
//! unit, so a scaled provider scales the whole geometry coherently.

use indexmap::IndexMap;

use cairn_core::{
    geometry::Size,
    theme::{BlockStyle, ColourSet, Theme},
};
use cairn_model::{Field, FieldKind, HatKind, OutputShape};

/// Grid-derived geometry constants plus the resolved theme palette.
#[derive(Debug, Clone)]
pub struct ConstantProvider {
    grid_unit: f32,
    corner_radius: f32,
    notch_width: f32,
    notch_height: f32,
    notch_offset: f32,
    statement_input_indent: f32,
    cap_hat_width: f32,
    cap_hat_height: f32,
    bowler_hat_height: f32,
    bowler_side_padding: f32,
    min_block_width: f32,
    min_row_height: f32,
    field_height: f32,
    padding: f32,
    char_width: f32,
    icon_size: f32,
    styles: IndexMap<String, ColourSet>,
    css_variables: IndexMap<String, String>,
}

impl ConstantProvider {
    /// Builds a provider at the given grid scale. Scale 1.0 is a 4-unit
    /// grid.
    pub fn new(scale: f32) -> Self {
        let grid_unit = 4.0 * scale;
        Self {
            grid_unit,
            corner_radius: grid_unit,
            notch_width: 6.0 * grid_unit,
            notch_height: 2.0 * grid_unit,
            notch_offset: 3.0 * grid_unit,
            statement_input_indent: 4.0 * grid_unit,
            cap_hat_width: 24.0 * grid_unit,
            cap_hat_height: 4.0 * grid_unit,
            bowler_hat_height: 3.0 * grid_unit,
            bowler_side_padding: 4.0 * grid_unit,
            min_block_width: 16.0 * grid_unit,
            min_row_height: 8.0 * grid_unit,
            field_height: 6.0 * grid_unit,
            padding: 2.0 * grid_unit,
            char_width: 2.0 * grid_unit,
            icon_size: 6.0 * grid_unit,
            styles: IndexMap::new(),
            css_variables: IndexMap::new(),
        }
    }

    /// Resolves a theme into the provider.
    ///
    /// Flat styles become `--cairn-<name>` CSS custom properties. Colour-set
    /// styles are stored by name, and each gets a companion
    /// `<name>_selected` style with every slot set to the set's selected
    /// colour.
    pub fn set_theme(&mut self, theme: &Theme) {
        self.styles.clear();
        self.css_variables.clear();
        for (name, style) in theme.styles() {
            match style {
                BlockStyle::Flat(colour) => {
                    self.css_variables
                        .insert(format!("--cairn-{name}"), colour.to_string());
                }
                BlockStyle::Colours(set) => {
                    let selected = set.selected_colour().clone();
                    self.styles.insert(name.to_string(), set.clone());
                    self.styles.insert(
                        format!("{name}_selected"),
                        ColourSet::new(selected.clone(), selected.clone(), selected.clone())
                            .with_quaternary(selected),
                    );
                }
            }
        }
    }

    pub fn style(&self, name: &str) -> Option<&ColourSet> {
        self.styles.get(name)
    }

    /// Resolved CSS custom properties, in theme order.
    pub fn css_variables(&self) -> impl Iterator<Item = (&str, &str)> {
        self.css_variables
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn grid_unit(&self) -> f32 {
        self.grid_unit
    }

    pub fn corner_radius(&self) -> f32 {
        self.corner_radius
    }

    pub fn notch_width(&self) -> f32 {
        self.notch_width
    }

    pub fn notch_height(&self) -> f32 {
        self.notch_height
    }

    pub fn notch_offset(&self) -> f32 {
        self.notch_offset
    }

    /// Left inset of a statement socket. Bowler-hat blocks suppress it and
    /// wrap their substacks flush with the left edge.
    pub fn statement_indent(&self, hat: HatKind) -> f32 {
        match hat {
            HatKind::Bowler => 0.0,
            _ => self.statement_input_indent,
        }
    }

    pub fn cap_hat_width(&self) -> f32 {
        self.cap_hat_width
    }

    pub fn cap_hat_height(&self) -> f32 {
        self.cap_hat_height
    }

    pub fn bowler_hat_height(&self) -> f32 {
        self.bowler_hat_height
    }

    pub fn bowler_side_padding(&self) -> f32 {
        self.bowler_side_padding
    }

    pub fn min_block_width(&self) -> f32 {
        self.min_block_width
    }

    pub fn min_row_height(&self) -> f32 {
        self.min_row_height
    }

    pub fn padding(&self) -> f32 {
        self.padding
    }

    /// Approximate advance width of a text run. Field editing happens in an
    /// embedding layer with real font metrics; layout only needs a stable
    /// monotonic estimate.
    pub fn text_width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.char_width
    }

    /// The measured box of a field.
    pub fn field_size(&self, field: &Field) -> Size {
        let width = match field.kind() {
            FieldKind::Icon => self.icon_size,
            FieldKind::Dropdown(_) => {
                // Room for the current value plus the disclosure arrow.
                self.text_width(field.value()) + 2.0 * self.padding + self.grid_unit * 2.0
            }
            _ => self.text_width(field.value()).max(self.char_width) + 2.0 * self.padding,
        };
        let height = match field.kind() {
            FieldKind::Icon => self.icon_size,
            _ => self.field_height,
        };
        Size::new(width, height)
    }

    /// The box drawn for an empty value socket of the given silhouette.
    pub fn empty_socket_size(&self, shape: OutputShape) -> Size {
        match shape {
            OutputShape::Round => Size::new(10.0 * self.grid_unit, 8.0 * self.grid_unit),
            OutputShape::Hexagonal => Size::new(12.0 * self.grid_unit, 8.0 * self.grid_unit),
            OutputShape::Square => Size::new(10.0 * self.grid_unit, 8.0 * self.grid_unit),
        }
    }

    /// Vertical centerline of a field within its row.
    ///
    /// The overrides come before the base rule: bowler-hat blocks center on
    /// the full row height, and icon fields on extension-category blocks sit
    /// one grid unit lower than the base line.
    pub fn field_centerline(
        &self,
        field_kind: &FieldKind,
        hat: HatKind,
        category: &str,
        row_height: f32,
    ) -> f32 {
        if hat == HatKind::Bowler {
            return row_height / 2.0;
        }
        if matches!(field_kind, FieldKind::Icon) && category == "extension" {
            return self.min_row_height / 2.0 + self.grid_unit;
        }
        self.min_row_height / 2.0
    }
}

impl Default for ConstantProvider {
    fn default() -> Self {
        Self::new(1.0)
    }
}
