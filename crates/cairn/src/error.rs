//! Error types for rendering operations.

use std::io;

use thiserror::Error;

use cairn_model::BlockId;

/// The main error type for Cairn rendering operations.
#[derive(Debug, Error)]
pub enum CairnError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("no block '{0}' in the workspace")]
    MissingBlock(BlockId),

    #[error("invalid configuration: {0}")]
    Config(String),
}
