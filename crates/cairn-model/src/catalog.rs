//! The stock block catalog.
//!
//! Descriptor defaults pull their colours from the classic theme so that a
//! block created here matches the renderer's palette without further
//! configuration.

use cairn_core::{
    color::Color,
    theme::{BlockStyle, ColourSet, Theme},
};

use crate::{
    block::{HatKind, OutputShape},
    input::{Field, FieldKind},
    mutation::Mutation,
    registry::{BlockDescriptor, InputSpec, Registry},
    serialize::SerializedBlock,
};

fn style_colours(theme: &Theme, name: &str) -> ColourSet {
    match theme.style(name) {
        Some(BlockStyle::Colours(set)) => set.clone(),
        _ => {
            let grey = Color::new("#cccccc").unwrap_or_default();
            ColourSet::new(grey.clone(), grey.clone(), grey)
        }
    }
}

fn boolean_check() -> Vec<String> {
    vec!["Boolean".to_string()]
}

fn number_check() -> Vec<String> {
    vec!["Number".to_string()]
}

fn string_check() -> Vec<String> {
    vec!["String".to_string()]
}

/// Builds a registry holding the stock kinds.
pub fn standard() -> Registry {
    let theme = Theme::default();
    let control = style_colours(&theme, "control");
    let looks = style_colours(&theme, "looks");
    let operators = style_colours(&theme, "operators");
    let procedures = style_colours(&theme, "procedures");
    let extension = style_colours(&theme, "extension");

    let mut registry = Registry::new();

    registry.register(
        BlockDescriptor::new("event_when_started", "control")
            .with_colours(control.clone())
            .with_hat(HatKind::Cap)
            .with_next(None)
            .with_input(InputSpec::label_row("TITLE", "when started")),
    );

    registry.register(
        BlockDescriptor::new("control_wait", "control")
            .with_colours(control.clone())
            .with_previous(None)
            .with_next(None)
            .with_input(
                InputSpec::value("DURATION")
                    .with_field(Field::label("wait"))
                    .with_number_shadow("1"),
            )
            .with_input(InputSpec::label_row("UNIT", "seconds")),
    );

    registry.register(
        BlockDescriptor::new("control_repeat", "control")
            .with_colours(control.clone())
            .with_previous(None)
            .with_next(None)
            .with_input(
                InputSpec::value("TIMES")
                    .with_field(Field::label("repeat"))
                    .with_number_shadow("10"),
            )
            .with_input(InputSpec::statement("SUBSTACK")),
    );

    registry.register(
        BlockDescriptor::new("control_if", "control")
            .with_colours(control.clone())
            .with_previous(None)
            .with_next(None)
            .with_mutation(Mutation::Branches { count: 1 })
            .with_input(
                InputSpec::value("CONDITION")
                    .with_field(Field::label("if"))
                    .with_check(boolean_check()),
            )
            .with_input(InputSpec::statement("SUBSTACK")),
    );

    // Same shape as control_if but born with a second branch; the mutation
    // grows or shrinks the SUBSTACK{n} tail from there.
    registry.register(
        BlockDescriptor::new("control_if_else", "control")
            .with_colours(control)
            .with_previous(None)
            .with_next(None)
            .with_mutation(Mutation::Branches { count: 2 })
            .with_input(
                InputSpec::value("CONDITION")
                    .with_field(Field::label("if"))
                    .with_check(boolean_check()),
            )
            .with_input(InputSpec::statement("SUBSTACK")),
    );

    registry.register(
        BlockDescriptor::new("looks_say", "looks")
            .with_colours(looks)
            .with_previous(None)
            .with_next(None)
            .with_input(
                InputSpec::value("MESSAGE")
                    .with_field(Field::label("say"))
                    .with_text_shadow("Hello!"),
            ),
    );

    registry.register(
        BlockDescriptor::new("operator_equals", "operators")
            .with_colours(operators.clone())
            .with_output(Some(boolean_check()), OutputShape::Hexagonal)
            .with_input(InputSpec::value("OPERAND1").with_text_shadow(""))
            .with_input(
                InputSpec::value("OPERAND2")
                    .with_field(Field::label("="))
                    .with_text_shadow(""),
            ),
    );

    registry.register(
        BlockDescriptor::new("operator_and", "operators")
            .with_colours(operators.clone())
            .with_output(Some(boolean_check()), OutputShape::Hexagonal)
            .with_input(InputSpec::value("OPERAND1").with_check(boolean_check()))
            .with_input(
                InputSpec::value("OPERAND2")
                    .with_field(Field::label("and"))
                    .with_check(boolean_check()),
            ),
    );

    registry.register(
        BlockDescriptor::new("math_number", "operators")
            .with_colours(operators.clone())
            .with_output(Some(number_check()), OutputShape::Round)
            .with_input(
                InputSpec::dummy("NUM").with_field(Field::new("NUM", FieldKind::Number, "0")),
            ),
    );

    registry.register(
        BlockDescriptor::new("text", "operators")
            .with_colours(operators)
            .with_output(Some(string_check()), OutputShape::Square)
            .with_input(
                InputSpec::dummy("TEXT").with_field(Field::new("TEXT", FieldKind::Text, "")),
            ),
    );

    registry.register(
        BlockDescriptor::new("procedures_definition", "procedures")
            .with_colours(procedures.clone())
            .with_hat(HatKind::Bowler)
            .with_next(None)
            .with_input(
                InputSpec::value("custom_block")
                    .with_field(Field::label("define"))
                    .with_shadow_template(SerializedBlock::template("procedures_prototype")),
            ),
    );

    registry.register(
        BlockDescriptor::new("procedures_prototype", "procedures")
            .with_colours(procedures.clone())
            .with_output(None, OutputShape::Square)
            .with_mutation(Mutation::Procedure {
                proccode: String::new(),
                params: Vec::new(),
                warp: false,
            }),
    );

    registry.register(
        BlockDescriptor::new("procedures_call", "procedures")
            .with_colours(procedures.clone())
            .with_previous(None)
            .with_next(None)
            .with_mutation(Mutation::Procedure {
                proccode: String::new(),
                params: Vec::new(),
                warp: false,
            }),
    );

    registry.register(
        BlockDescriptor::new("argument_reporter_string_number", "procedures")
            .with_colours(procedures.clone())
            .with_output(
                Some(vec!["Number".to_string(), "String".to_string()]),
                OutputShape::Round,
            )
            .with_input(
                InputSpec::dummy("VALUE").with_field(Field::new("VALUE", FieldKind::Text, "")),
            ),
    );

    registry.register(
        BlockDescriptor::new("argument_reporter_boolean", "procedures")
            .with_colours(procedures)
            .with_output(Some(boolean_check()), OutputShape::Hexagonal)
            .with_input(
                InputSpec::dummy("VALUE").with_field(Field::new("VALUE", FieldKind::Text, "")),
            ),
    );

    registry.register(
        BlockDescriptor::new("extension_pen_down", "extension")
            .with_colours(extension)
            .with_previous(None)
            .with_next(None)
            .with_input(
                InputSpec::dummy("TITLE")
                    .with_field(Field::icon("pen"))
                    .with_field(Field::label("pen down")),
            ),
    );

    registry
}
