//! Command-line entry points for rendering block programs to SVG.

pub mod args;

use std::fs;
use std::rc::Rc;

use log::{debug, info};
use thiserror::Error;

use cairn::{config::RenderConfig, BlockRenderer, CairnError};
use cairn_model::{catalog, IdPolicy, ModelError, SerializedBlock, Workspace};

use args::Args;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input file: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Render(#[from] CairnError),
}

/// Reads a block program, loads it into a workspace over the standard
/// catalog, and writes the rendered SVG document.
pub fn run(args: &Args) -> Result<(), CliError> {
    info!(input = args.input; "Reading block program");
    let source = fs::read_to_string(&args.input)?;
    let stacks: Vec<SerializedBlock> = serde_json::from_str(&source)?;
    debug!(stacks = stacks.len(); "Parsed block program");

    let config = match &args.config {
        Some(path) => {
            info!(path; "Reading render configuration");
            serde_json::from_str::<RenderConfig>(&fs::read_to_string(path)?)?
        }
        None => RenderConfig::default(),
    };

    let mut ws = Workspace::new(Rc::new(catalog::standard()));
    for stack in &stacks {
        ws.load_block(stack, IdPolicy::Keep)?;
    }

    let document = BlockRenderer::new(config).render_document(&ws)?;
    fs::write(&args.output, document.to_string())?;
    info!(output = args.output; "Wrote SVG document");
    Ok(())
}
