//! The block-kind registry.
//!
//! Kinds are registered by name with a [`BlockDescriptor`]: default shape
//! flags, colours, inputs, and an optional [`BlockBehavior`]. Concrete kinds
//! are composed as data plus an optional behavior implementation looked up by
//! name; nothing is copied onto instances at runtime.

use std::{collections::HashMap, rc::Rc};

use cairn_core::{color::Color, theme::ColourSet};

use crate::{
    block::{Block, BlockId, HatKind, OutputShape},
    input::{Field, Input, InputKind},
    mutation::Mutation,
    serialize::SerializedBlock,
};

/// A type-check filter: permitted logical types, or `None` for anything.
pub type Check = Option<Vec<String>>;

/// Optional per-kind hooks, composed onto a block at creation time.
pub trait BlockBehavior: std::fmt::Debug {
    /// Called once when a block of this kind is created, after the
    /// descriptor defaults have been applied.
    fn init(&self, _block: &mut Block) {}
}

/// Declares one input slot of a block kind.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    name: String,
    kind: InputKind,
    check: Check,
    fields: Vec<Field>,
    shadow: Option<SerializedBlock>,
}

impl InputSpec {
    pub fn value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: InputKind::Value,
            check: None,
            fields: Vec::new(),
            shadow: None,
        }
    }

    pub fn statement(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: InputKind::Statement,
            check: None,
            fields: Vec::new(),
            shadow: None,
        }
    }

    pub fn dummy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: InputKind::Dummy,
            check: None,
            fields: Vec::new(),
            shadow: None,
        }
    }

    /// A field-only row holding a single label.
    pub fn label_row(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::dummy(name).with_field(Field::label(text))
    }

    pub fn with_check(mut self, check: Vec<String>) -> Self {
        self.check = Some(check);
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Attaches a default shadow template: a block of `kind` whose field
    /// `field` starts at `value`. The template is respawned whenever a real
    /// block is detached from this input.
    pub fn with_shadow(
        mut self,
        kind: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let mut template = SerializedBlock::template(kind);
        template.fields.insert(field.into(), value.into());
        self.shadow = Some(template);
        self
    }

    /// Attaches a pre-built serialized block as the shadow template.
    pub fn with_shadow_template(mut self, template: SerializedBlock) -> Self {
        self.shadow = Some(template);
        self
    }

    /// A `text` shadow with the given default text.
    pub fn with_text_shadow(self, default: impl Into<String>) -> Self {
        self.with_shadow("text", "TEXT", default)
    }

    /// A `math_number` shadow with the given default number text.
    pub fn with_number_shadow(self, default: impl Into<String>) -> Self {
        self.with_shadow("math_number", "NUM", default)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> InputKind {
        self.kind
    }

    pub(crate) fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Builds a fresh input from this spec.
    pub(crate) fn build(&self) -> Input {
        let mut input = match self.kind {
            InputKind::Value => Input::value(self.name.clone(), self.check.clone()),
            InputKind::Statement => Input::statement(self.name.clone(), self.check.clone()),
            InputKind::Dummy => Input::dummy(self.name.clone()),
        };
        for field in &self.fields {
            input = input.with_field(field.clone());
        }
        if let (Some(template), Some(conn)) = (&self.shadow, input.connection_mut()) {
            conn.set_shadow_template(Some(template.clone()));
        }
        input
    }
}

/// The registered description of one block kind.
#[derive(Debug)]
pub struct BlockDescriptor {
    kind: String,
    category: String,
    colours: ColourSet,
    output: Option<Check>,
    previous: Option<Check>,
    next: Option<Check>,
    output_shape: OutputShape,
    hat: HatKind,
    inputs: Vec<InputSpec>,
    mutation: Option<Mutation>,
    behavior: Option<Rc<dyn BlockBehavior>>,
}

impl BlockDescriptor {
    pub fn new(kind: impl Into<String>, category: impl Into<String>) -> Self {
        let grey = Color::new("#cccccc").unwrap_or_default();
        Self {
            kind: kind.into(),
            category: category.into(),
            colours: ColourSet::new(grey.clone(), grey.clone(), grey),
            output: None,
            previous: None,
            next: None,
            output_shape: OutputShape::default(),
            hat: HatKind::default(),
            inputs: Vec::new(),
            mutation: None,
            behavior: None,
        }
    }

    pub fn with_colours(mut self, colours: ColourSet) -> Self {
        self.colours = colours;
        self
    }

    pub fn with_output(mut self, check: Check, shape: OutputShape) -> Self {
        self.output = Some(check);
        self.output_shape = shape;
        self
    }

    pub fn with_previous(mut self, check: Check) -> Self {
        self.previous = Some(check);
        self
    }

    pub fn with_next(mut self, check: Check) -> Self {
        self.next = Some(check);
        self
    }

    pub fn with_hat(mut self, hat: HatKind) -> Self {
        self.hat = hat;
        self
    }

    pub fn with_input(mut self, spec: InputSpec) -> Self {
        self.inputs.push(spec);
        self
    }

    pub fn with_mutation(mut self, mutation: Mutation) -> Self {
        self.mutation = Some(mutation);
        self
    }

    pub fn with_behavior(mut self, behavior: Rc<dyn BlockBehavior>) -> Self {
        self.behavior = Some(behavior);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn inputs(&self) -> &[InputSpec] {
        &self.inputs
    }

    pub fn default_mutation(&self) -> Option<&Mutation> {
        self.mutation.as_ref()
    }

    /// Builds a block instance with this descriptor's defaults and runs the
    /// behavior's init hook.
    ///
    /// The descriptor author is responsible for not declaring both an output
    /// and a previous connection; the setters enforce it.
    pub(crate) fn instantiate(&self, id: BlockId) -> Result<Block, crate::error::ModelError> {
        let mut block = Block::new(id, self.kind.clone());
        block.set_category(self.category.clone());
        block.set_colours(self.colours.clone());
        block.set_hat(self.hat);

        if let Some(check) = &self.output {
            block.set_output(true, check.clone())?;
            block.set_output_shape(self.output_shape);
        }
        if let Some(check) = &self.previous {
            block.set_previous_statement(true, check.clone())?;
        }
        if let Some(check) = &self.next {
            block.set_next_statement(true, check.clone())?;
        }
        for spec in &self.inputs {
            block.add_input(spec.build());
        }
        block.set_mutation_raw(self.mutation.clone());

        if let Some(behavior) = &self.behavior {
            behavior.init(&mut block);
        }
        Ok(block)
    }
}

/// Lookup-by-name store of block descriptors.
#[derive(Debug, Default)]
pub struct Registry {
    descriptors: HashMap<String, Rc<BlockDescriptor>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor, replacing any previous one of the same kind.
    pub fn register(&mut self, descriptor: BlockDescriptor) {
        self.descriptors
            .insert(descriptor.kind.clone(), Rc::new(descriptor));
    }

    pub fn get(&self, kind: &str) -> Option<Rc<BlockDescriptor>> {
        self.descriptors.get(kind).cloned()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.descriptors.contains_key(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instantiate_applies_defaults() {
        let descriptor = BlockDescriptor::new("looks_say", "looks")
            .with_previous(None)
            .with_next(None)
            .with_input(
                InputSpec::value("MESSAGE")
                    .with_field(Field::label("say"))
                    .with_text_shadow("hello"),
            );

        let block = descriptor.instantiate(BlockId::from("b1")).unwrap();
        assert_eq!(block.kind(), "looks_say");
        assert_eq!(block.category(), "looks");
        assert!(block.previous_connection().is_some());
        assert!(block.next_connection().is_some());
        assert!(block.output_connection().is_none());

        let input = block.input("MESSAGE").unwrap();
        let template = input.connection().unwrap().shadow_template().unwrap();
        assert_eq!(template.kind, "text");
        assert_eq!(template.fields.get("TEXT").map(String::as_str), Some("hello"));
    }

    #[test]
    fn test_registry_lookup_by_name() {
        let mut registry = Registry::new();
        registry.register(BlockDescriptor::new("text", "text"));
        assert!(registry.contains("text"));
        assert!(registry.get("nope").is_none());
    }
}
