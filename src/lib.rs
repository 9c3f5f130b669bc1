mod block;
mod config;
mod error;
mod inline;
mod normalize;
mod page;
mod parser;
mod render;
mod typst;

pub mod generate;
pub mod import;
pub mod job;
pub mod prompts;

pub use block::{Block, Emphasis, Segment, StyledRun};
pub use config::{Config, FontConfig, GeneratorConfig, PageConfig, SpacingConfig};
pub use error::{DocumentError, GenerateError, ImportError, InlineError, RenderError};
pub use normalize::normalize;
pub use page::{HeadingStyle, PageSize, PageSpec, StyleMetrics};
pub use parser::{EMPTY_PLACEHOLDER, Line, ParseState, build_flow, classify};
pub use render::{RenderReport, Renderer};

use std::path::Path;

/// Normalize dialect text and parse it into a flow of blocks.
pub fn parse(text: &str) -> Vec<Block> {
    build_flow(&normalize(text))
}

/// Convert dialect text to Typst markup using the given config.
pub fn text_to_typst(text: &str, config: &Config) -> String {
    Renderer::from_config(config).to_typst(&parse(text), &config.page_spec())
}

/// Convert dialect text to PDF bytes using the given config.
pub fn text_to_pdf(text: &str, config: &Config) -> Result<Vec<u8>, RenderError> {
    let (bytes, _) = Renderer::from_config(config).to_pdf(&parse(text), &config.page_spec())?;
    Ok(bytes)
}

/// Render dialect text to a PDF file.
pub fn render_text(
    text: &str,
    page: &PageSpec,
    config: &Config,
    destination: &Path,
) -> Result<RenderReport, RenderError> {
    Renderer::from_config(config).render(&parse(text), page, destination)
}
