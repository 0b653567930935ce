//! Typed attachment points between blocks.
//!
//! A [`Connection`] lives on exactly one block and optionally targets one
//! connection on another block, addressed by a [`PortRef`]. The symmetry
//! invariant (if A targets B then B targets A) is maintained by the
//! workspace, which owns both ends.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{block::BlockId, serialize::SerializedBlock};

/// The five connection kinds.
///
/// Previous/output live on the child side; next and the two input kinds live
/// on the parent side. A block has an output *or* a previous connection,
/// never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    Previous,
    Next,
    InputValue,
    InputStatement,
    Output,
}

impl ConnectionKind {
    /// Whether two kinds may attach to each other.
    ///
    /// Previous pairs with both next (stacking) and statement inputs
    /// (nesting inside a C-shape); output pairs with value inputs only.
    pub fn complements(self, other: ConnectionKind) -> bool {
        use ConnectionKind::*;
        matches!(
            (self, other),
            (Previous, Next)
                | (Next, Previous)
                | (Previous, InputStatement)
                | (InputStatement, Previous)
                | (Output, InputValue)
                | (InputValue, Output)
        )
    }

    /// Parent-side kinds own the child reached through them.
    pub fn is_superior(self) -> bool {
        matches!(
            self,
            ConnectionKind::Next | ConnectionKind::InputValue | ConnectionKind::InputStatement
        )
    }
}

/// Names one of the up-to-three structural ports or a named input port on a
/// block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Port {
    Output,
    Previous,
    Next,
    Input(String),
}

impl Port {
    pub fn input(name: impl Into<String>) -> Self {
        Port::Input(name.into())
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Output => write!(f, "output"),
            Port::Previous => write!(f, "previous"),
            Port::Next => write!(f, "next"),
            Port::Input(name) => write!(f, "input '{name}'"),
        }
    }
}

/// Addresses one connection in a workspace: a block plus one of its ports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub block: BlockId,
    pub port: Port,
}

impl PortRef {
    pub fn new(block: BlockId, port: Port) -> Self {
        Self { block, port }
    }

    pub fn output(block: BlockId) -> Self {
        Self::new(block, Port::Output)
    }

    pub fn previous(block: BlockId) -> Self {
        Self::new(block, Port::Previous)
    }

    pub fn next(block: BlockId) -> Self {
        Self::new(block, Port::Next)
    }

    pub fn input(block: BlockId, name: impl Into<String>) -> Self {
        Self::new(block, Port::input(name))
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of block '{}'", self.port, self.block)
    }
}

/// One typed socket on a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    kind: ConnectionKind,
    /// Permitted logical types; `None` accepts anything.
    check: Option<Vec<String>>,
    target: Option<PortRef>,
    /// Respawn template for the default shadow block occupying this
    /// connection. Survives the shadow being obscured by a real block.
    shadow: Option<SerializedBlock>,
}

impl Connection {
    pub fn new(kind: ConnectionKind, check: Option<Vec<String>>) -> Self {
        Self {
            kind,
            check,
            target: None,
            shadow: None,
        }
    }

    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    pub fn check(&self) -> Option<&[String]> {
        self.check.as_deref()
    }

    pub fn set_check(&mut self, check: Option<Vec<String>>) {
        self.check = check;
    }

    pub fn target(&self) -> Option<&PortRef> {
        self.target.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.target.is_some()
    }

    pub(crate) fn set_target(&mut self, target: Option<PortRef>) {
        self.target = target;
    }

    pub fn shadow_template(&self) -> Option<&SerializedBlock> {
        self.shadow.as_ref()
    }

    pub(crate) fn set_shadow_template(&mut self, shadow: Option<SerializedBlock>) {
        self.shadow = shadow;
    }

    /// Whether this connection's type checks permit the other side.
    pub fn checks_intersect(&self, other: &Connection) -> bool {
        match (&self.check, &other.check) {
            (Some(a), Some(b)) => a.iter().any(|t| b.contains(t)),
            // A side without a check accepts anything.
            _ => true,
        }
    }

    /// A value connection that only accepts Boolean blocks is highlighted as
    /// a drop-target cue during drags.
    pub fn accepts_only_boolean(&self) -> bool {
        self.kind == ConnectionKind::InputValue
            && self
                .check
                .as_deref()
                .is_some_and(|check| check == ["Boolean"])
    }
}
