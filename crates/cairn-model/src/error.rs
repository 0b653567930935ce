//! Error types for block-graph operations.
//!
//! Structural-invariant violations are fatal precondition failures: the
//! operation returns immediately and the graph is left untouched. Read
//! accessors report misses as `None` instead; only operations that require
//! their target to exist surface a hard error here.

use thiserror::Error;

use crate::{
    block::BlockId,
    connection::{ConnectionKind, PortRef},
};

/// The error type for all block-graph operations.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("unknown block kind '{0}'")]
    UnknownKind(String),

    #[error("block id '{0}' already exists in this workspace or its flyout")]
    DuplicateId(BlockId),

    #[error("no block with id '{0}'")]
    MissingBlock(BlockId),

    #[error("block '{block}' has no input named '{input}'")]
    MissingInput { block: BlockId, input: String },

    #[error("block '{block}' has no field named '{field}'")]
    MissingField { block: BlockId, field: String },

    #[error("no connection at {0}")]
    NoConnection(PortRef),

    #[error("{0} is not connected")]
    NotConnected(PortRef),

    #[error("{0} is still attached; disconnect before removing the connection")]
    ConnectionAttached(PortRef),

    #[error("{0} is already attached to another connection")]
    AlreadyConnected(PortRef),

    #[error("connection kinds {a:?} and {b:?} are not complementary")]
    IncompatibleKinds { a: ConnectionKind, b: ConnectionKind },

    #[error("type checks of {a} and {b} do not intersect")]
    IncompatibleChecks { a: PortRef, b: PortRef },

    #[error("cannot connect block '{0}' to itself")]
    SelfConnection(BlockId),

    #[error("block '{0}' cannot have both an output and a previous connection")]
    OutputAndPreviousExclusive(BlockId),

    #[error("malformed mutation form: {0}")]
    MalformedMutation(String),

    #[error("block kind '{0}' does not carry a mutation")]
    MutationUnsupported(String),
}
