//! Process every query block of a markdown document

use super::CliError;
use crate::{
    config::EngineConfig,
    engine::{DocumentReport, Engine},
    note::NoteCollection,
};

/// Options for the render command
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Markdown document text
    pub document: String,
    pub config: EngineConfig,
}

/// Runs every block of the document. Failed blocks are reported inside the
/// returned report, not as an error.
pub fn execute_render(
    options: &RenderOptions,
    notes: &NoteCollection,
) -> Result<DocumentReport, CliError> {
    if options.document.trim().is_empty() {
        return Err(CliError::NoInput);
    }
    let engine = Engine::new(options.config.clone());
    Ok(engine.process_document(&options.document, notes))
}
