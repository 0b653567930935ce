//! Theme model: per-style colours supplied to the renderer.
//!
//! A theme maps style names to either a single flat colour (UI chrome,
//! workspace background) or a colour set of up to four slots
//! (primary/secondary/tertiary/quaternary) used for block silhouettes.
//! The renderer's constants provider is the sole consumer: it resolves
//! colour sets, synthesizes the derived "selected" styles, and publishes
//! flat colours as CSS custom properties.

use indexmap::IndexMap;

use crate::color::Color;

/// Up to four colour slots for one block style.
///
/// Primary is the fill, secondary the shadow-block fill, tertiary the
/// outline. Quaternary, when present, is the colour a block takes while one
/// of its dropdown fields is open.
#[derive(Debug, Clone, PartialEq)]
pub struct ColourSet {
    primary: Color,
    secondary: Color,
    tertiary: Color,
    quaternary: Option<Color>,
}

impl ColourSet {
    pub fn new(primary: Color, secondary: Color, tertiary: Color) -> Self {
        Self {
            primary,
            secondary,
            tertiary,
            quaternary: None,
        }
    }

    /// Returns a copy with the quaternary slot set.
    pub fn with_quaternary(mut self, quaternary: Color) -> Self {
        self.quaternary = Some(quaternary);
        self
    }

    pub fn primary(&self) -> &Color {
        &self.primary
    }

    pub fn secondary(&self) -> &Color {
        &self.secondary
    }

    pub fn tertiary(&self) -> &Color {
        &self.tertiary
    }

    pub fn quaternary(&self) -> Option<&Color> {
        self.quaternary.as_ref()
    }

    /// The colour every slot of the derived "selected" style takes:
    /// quaternary when present, tertiary otherwise.
    pub fn selected_colour(&self) -> &Color {
        self.quaternary.as_ref().unwrap_or(&self.tertiary)
    }
}

/// One named style in a theme.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockStyle {
    /// A single colour, published as a CSS custom property.
    Flat(Color),
    /// A colour set used to paint block fills and outlines.
    Colours(ColourSet),
}

/// A complete theme: an ordered map of style names to styles.
#[derive(Debug, Clone)]
pub struct Theme {
    name: String,
    block_styles: IndexMap<String, BlockStyle>,
}

impl Theme {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            block_styles: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds or replaces a style, returning self for chaining.
    pub fn with_style(mut self, name: impl Into<String>, style: BlockStyle) -> Self {
        self.block_styles.insert(name.into(), style);
        self
    }

    pub fn style(&self, name: &str) -> Option<&BlockStyle> {
        self.block_styles.get(name)
    }

    /// Iterates styles in insertion order.
    pub fn styles(&self) -> impl Iterator<Item = (&str, &BlockStyle)> {
        self.block_styles.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Default for Theme {
    /// The stock category palette plus the flat UI colours.
    fn default() -> Self {
        fn colour(hex: &str) -> Color {
            Color::new(hex).unwrap_or_default()
        }
        fn set(primary: &str, secondary: &str, tertiary: &str) -> BlockStyle {
            BlockStyle::Colours(ColourSet::new(
                colour(primary),
                colour(secondary),
                colour(tertiary),
            ))
        }

        Theme::new("classic")
            .with_style("motion", set("#4c97ff", "#4280d7", "#3373cc"))
            .with_style("looks", set("#9966ff", "#855cd6", "#774dcb"))
            .with_style("control", set("#ffab19", "#ec9c13", "#cf8b17"))
            .with_style("operators", set("#59c059", "#46b946", "#389438"))
            .with_style("variables", set("#ff8c1a", "#ff8000", "#db6e00"))
            .with_style("procedures", set("#ff6680", "#ff4d6a", "#ff3355"))
            .with_style(
                "extension",
                BlockStyle::Colours(
                    ColourSet::new(
                        colour("#0fbd8c"),
                        colour("#0da57a"),
                        colour("#0b8e69"),
                    )
                    .with_quaternary(colour("#0a7a5a")),
                ),
            )
            .with_style("workspace", BlockStyle::Flat(colour("#f9f9f9")))
            .with_style("text", BlockStyle::Flat(colour("#575e75")))
    }
}
