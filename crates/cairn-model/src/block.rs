//! The structural node of the block graph.
//!
//! A [`Block`] owns its ordered input list and up to three structural
//! connections. The output and previous connections are mutually exclusive:
//! a block either produces a value or chains in a statement stack.

use std::fmt;

use serde::{Deserialize, Serialize};

use cairn_core::theme::ColourSet;

use crate::{
    connection::{Connection, ConnectionKind, Port, PortRef},
    error::ModelError,
    input::{Field, Input},
    mutation::Mutation,
};

/// A process-unique block id, stable for the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Silhouette of a value block's body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputShape {
    #[default]
    Round,
    Hexagonal,
    Square,
}

/// Top-shape variant of a stack block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HatKind {
    /// No hat; the top edge carries the previous-connection notch.
    #[default]
    None,
    /// The fixed-width event cap curve.
    Cap,
    /// The dynamic-width rounded top whose width follows the block body.
    /// Statement inputs on a bowler block render flush, without the usual
    /// indentation.
    Bowler,
}

/// A node in the visual syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    id: BlockId,
    kind: String,
    category: String,
    colours: ColourSet,
    output_shape: OutputShape,
    hat: HatKind,
    collapsed: bool,
    disabled: bool,
    shadow: bool,
    output: Option<Connection>,
    previous: Option<Connection>,
    next: Option<Connection>,
    inputs: Vec<Input>,
    mutation: Option<Mutation>,
}

impl Block {
    pub(crate) fn new(id: BlockId, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            category: String::from("misc"),
            colours: ColourSet::new(
                Default::default(),
                Default::default(),
                Default::default(),
            ),
            output_shape: OutputShape::default(),
            hat: HatKind::default(),
            collapsed: false,
            disabled: false,
            shadow: false,
            output: None,
            previous: None,
            next: None,
            inputs: Vec::new(),
            mutation: None,
        }
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub(crate) fn set_category(&mut self, category: impl Into<String>) {
        self.category = category.into();
    }

    pub fn colours(&self) -> &ColourSet {
        &self.colours
    }

    pub(crate) fn set_colours(&mut self, colours: ColourSet) {
        self.colours = colours;
    }

    pub fn output_shape(&self) -> OutputShape {
        self.output_shape
    }

    pub(crate) fn set_output_shape(&mut self, shape: OutputShape) {
        self.output_shape = shape;
    }

    pub fn hat(&self) -> HatKind {
        self.hat
    }

    pub(crate) fn set_hat(&mut self, hat: HatKind) {
        self.hat = hat;
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn set_collapsed(&mut self, collapsed: bool) {
        self.collapsed = collapsed;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// A shadow block is a non-deletable placeholder default value.
    pub fn is_shadow(&self) -> bool {
        self.shadow
    }

    pub(crate) fn set_shadow(&mut self, shadow: bool) {
        self.shadow = shadow;
    }

    pub fn mutation(&self) -> Option<&Mutation> {
        self.mutation.as_ref()
    }

    pub(crate) fn set_mutation_raw(&mut self, mutation: Option<Mutation>) {
        self.mutation = mutation;
    }

    // ---- structural connections ------------------------------------------

    pub fn output_connection(&self) -> Option<&Connection> {
        self.output.as_ref()
    }

    pub fn previous_connection(&self) -> Option<&Connection> {
        self.previous.as_ref()
    }

    pub fn next_connection(&self) -> Option<&Connection> {
        self.next.as_ref()
    }

    /// Enables or disables the previous-statement connection.
    ///
    /// Enabling when already enabled only replaces the type check. Disabling
    /// requires the connection to be unattached, and enabling is refused
    /// while an output connection exists.
    pub fn set_previous_statement(
        &mut self,
        enabled: bool,
        check: Option<Vec<String>>,
    ) -> Result<(), ModelError> {
        if enabled {
            if self.output.is_some() {
                return Err(ModelError::OutputAndPreviousExclusive(self.id.clone()));
            }
            match &mut self.previous {
                Some(conn) => conn.set_check(check),
                None => self.previous = Some(Connection::new(ConnectionKind::Previous, check)),
            }
            Ok(())
        } else {
            self.remove_structural(Port::Previous)
        }
    }

    /// Enables or disables the next-statement connection.
    pub fn set_next_statement(
        &mut self,
        enabled: bool,
        check: Option<Vec<String>>,
    ) -> Result<(), ModelError> {
        if enabled {
            match &mut self.next {
                Some(conn) => conn.set_check(check),
                None => self.next = Some(Connection::new(ConnectionKind::Next, check)),
            }
            Ok(())
        } else {
            self.remove_structural(Port::Next)
        }
    }

    /// Enables or disables the output connection.
    ///
    /// Refused while a previous connection exists.
    pub fn set_output(
        &mut self,
        enabled: bool,
        check: Option<Vec<String>>,
    ) -> Result<(), ModelError> {
        if enabled {
            if self.previous.is_some() {
                return Err(ModelError::OutputAndPreviousExclusive(self.id.clone()));
            }
            match &mut self.output {
                Some(conn) => conn.set_check(check),
                None => self.output = Some(Connection::new(ConnectionKind::Output, check)),
            }
            Ok(())
        } else {
            self.remove_structural(Port::Output)
        }
    }

    fn remove_structural(&mut self, port: Port) -> Result<(), ModelError> {
        let slot = match port {
            Port::Output => &mut self.output,
            Port::Previous => &mut self.previous,
            Port::Next => &mut self.next,
            Port::Input(_) => unreachable!("inputs are removed through the input list"),
        };
        match slot {
            Some(conn) if conn.is_attached() => Err(ModelError::ConnectionAttached(
                PortRef::new(self.id.clone(), port),
            )),
            _ => {
                *slot = None;
                Ok(())
            }
        }
    }

    /// Resolves a port to its connection, if the block has one there.
    pub fn connection(&self, port: &Port) -> Option<&Connection> {
        match port {
            Port::Output => self.output.as_ref(),
            Port::Previous => self.previous.as_ref(),
            Port::Next => self.next.as_ref(),
            Port::Input(name) => self.input(name).and_then(Input::connection),
        }
    }

    pub(crate) fn connection_mut(&mut self, port: &Port) -> Option<&mut Connection> {
        match port {
            Port::Output => self.output.as_mut(),
            Port::Previous => self.previous.as_mut(),
            Port::Next => self.next.as_mut(),
            Port::Input(name) => {
                let name = name.clone();
                self.inputs
                    .iter_mut()
                    .find(|input| input.name() == name)
                    .and_then(Input::connection_mut)
            }
        }
    }

    /// The owning block, derived from whichever upward connection is
    /// attached. Not an ownership edge.
    pub fn parent(&self) -> Option<&BlockId> {
        self.previous
            .as_ref()
            .or(self.output.as_ref())
            .and_then(Connection::target)
            .map(|target| &target.block)
    }

    // ---- inputs and fields -----------------------------------------------

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.iter().find(|input| input.name() == name)
    }

    pub(crate) fn add_input(&mut self, input: Input) {
        self.inputs.push(input);
    }

    pub(crate) fn take_inputs(&mut self) -> Vec<Input> {
        std::mem::take(&mut self.inputs)
    }

    pub(crate) fn set_inputs(&mut self, inputs: Vec<Input>) {
        self.inputs = inputs;
    }

    /// Finds a field by name across all inputs.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.inputs
            .iter()
            .flat_map(|input| input.fields())
            .find(|field| field.name() == name)
    }

    pub(crate) fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.inputs
            .iter_mut()
            .flat_map(|input| input.fields_mut().iter_mut())
            .find(|field| field.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_and_previous_are_exclusive() {
        let mut block = Block::new(BlockId::from("b1"), "test_kind");
        block.set_output(true, None).unwrap();
        assert_eq!(
            block.set_previous_statement(true, None),
            Err(ModelError::OutputAndPreviousExclusive(BlockId::from("b1")))
        );

        let mut block = Block::new(BlockId::from("b2"), "test_kind");
        block.set_previous_statement(true, None).unwrap();
        assert_eq!(
            block.set_output(true, None),
            Err(ModelError::OutputAndPreviousExclusive(BlockId::from("b2")))
        );
    }

    #[test]
    fn test_enable_twice_only_updates_check() {
        let mut block = Block::new(BlockId::from("b1"), "test_kind");
        block.set_output(true, None).unwrap();
        block
            .set_output(true, Some(vec!["Boolean".into()]))
            .unwrap();
        assert_eq!(
            block.output_connection().unwrap().check(),
            Some(&["Boolean".to_string()][..])
        );
    }

    #[test]
    fn test_disable_attached_connection_is_an_error() {
        let mut block = Block::new(BlockId::from("b1"), "test_kind");
        block.set_previous_statement(true, None).unwrap();
        block
            .connection_mut(&Port::Previous)
            .unwrap()
            .set_target(Some(PortRef::next(BlockId::from("other"))));

        assert_eq!(
            block.set_previous_statement(false, None),
            Err(ModelError::ConnectionAttached(PortRef::previous(
                BlockId::from("b1")
            )))
        );
    }

    #[test]
    fn test_disable_unattached_connection_is_fine() {
        let mut block = Block::new(BlockId::from("b1"), "test_kind");
        block.set_next_statement(true, None).unwrap();
        block.set_next_statement(false, None).unwrap();
        assert!(block.next_connection().is_none());
        // Disabling an absent connection is idempotent.
        block.set_next_statement(false, None).unwrap();
    }

    #[test]
    fn test_parent_is_derived_from_upward_connection() {
        let mut block = Block::new(BlockId::from("child"), "test_kind");
        assert!(block.parent().is_none());

        block.set_previous_statement(true, None).unwrap();
        block
            .connection_mut(&Port::Previous)
            .unwrap()
            .set_target(Some(PortRef::next(BlockId::from("parent"))));
        assert_eq!(block.parent(), Some(&BlockId::from("parent")));
    }
}
