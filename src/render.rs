use std::fs;
use std::path::{Path, PathBuf};

use typst_as_lib::TypstEngine;
use typst_as_lib::typst_kit_options::TypstKitFontOptions;
use typst_library::layout::PagedDocument;
use typst_pdf::PdfOptions;

use crate::block::Block;
use crate::config::{Config, FontConfig, SpacingConfig};
use crate::error::RenderError;
use crate::page::{PageSpec, StyleMetrics};
use crate::typst;

/// Outcome of a successful render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub destination: PathBuf,
    pub pages: usize,
    pub bytes: usize,
}

impl RenderReport {
    /// Confirmation naming the file that was written.
    pub fn message(&self) -> String {
        let name = self
            .destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.destination.display().to_string());
        format!("PDF successfully created: {}", name)
    }
}

/// Lays out flows and typesets them to PDF with Typst.
///
/// Holds only immutable style settings, so one renderer can serve any
/// number of independent render calls.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    font: FontConfig,
    spacing: SpacingConfig,
}

impl Renderer {
    pub fn new(font: FontConfig, spacing: SpacingConfig) -> Self {
        Self { font, spacing }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.font.clone(), config.spacing.clone())
    }

    pub fn style(&self, page: &PageSpec) -> StyleMetrics {
        StyleMetrics::resolve(page, &self.font, &self.spacing)
    }

    /// Typst markup for a flow, spacers included.
    pub fn to_typst(&self, blocks: &[Block], page: &PageSpec) -> String {
        let style = self.style(page);
        typst::flow_to_typst(&typst::lay_out(blocks, &style), &style)
    }

    /// Typeset a flow into PDF bytes, returning them with the page count.
    pub fn to_pdf(&self, blocks: &[Block], page: &PageSpec) -> Result<(Vec<u8>, usize), RenderError> {
        let markup = self.to_typst(blocks, page);
        log::debug!("Compiling {} bytes of Typst markup", markup.len());

        let doc = self.compile(markup)?;
        let pages = doc.pages.len();
        let bytes = typst_pdf::pdf(&doc, &PdfOptions::default()).map_err(|e| RenderError::Build {
            stage: "PDF export",
            detail: format!("{:?}", e),
        })?;

        Ok((bytes, pages))
    }

    /// Render a flow to a PDF file at `destination`.
    ///
    /// A missing parent directory is created first. Only directory creation,
    /// the Typst build and the final write can fail the call; blocks that
    /// cannot be typeset are skipped.
    pub fn render(
        &self,
        blocks: &[Block],
        page: &PageSpec,
        destination: &Path,
    ) -> Result<RenderReport, RenderError> {
        log::debug!(
            "Rendering {} blocks to '{}' ({}, {}pt)",
            blocks.len(),
            destination.display(),
            page.size.name(),
            page.font_size
        );

        if let Some(parent) = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty() && !p.exists())
        {
            fs::create_dir_all(parent).map_err(|source| {
                let err = RenderError::Destination {
                    path: parent.to_path_buf(),
                    source,
                };
                log::error!("{}", err);
                err
            })?;
            log::debug!("Created directory '{}'", parent.display());
        }

        let (bytes, pages) = self.to_pdf(blocks, page).inspect_err(|err| {
            log::error!("{} (destination '{}')", err, destination.display());
        })?;

        fs::write(destination, &bytes).map_err(|source| RenderError::Write {
            path: destination.to_path_buf(),
            source,
        })?;

        let report = RenderReport {
            destination: destination.to_path_buf(),
            pages,
            bytes: bytes.len(),
        };
        log::info!("{} ({} pages)", report.message(), report.pages);
        Ok(report)
    }

    fn compile(&self, markup: String) -> Result<PagedDocument, RenderError> {
        let font_options = TypstKitFontOptions::new()
            .include_embedded_fonts(true)
            .include_system_fonts(self.font.system_fonts);

        let engine = TypstEngine::builder()
            .main_file(markup)
            .search_fonts_with(font_options)
            .build();

        let warned = engine.compile();
        let doc: PagedDocument = warned.output.map_err(|e| RenderError::Build {
            stage: "Typst compilation",
            detail: format!("{:?}", e),
        })?;
        for warning in &warned.warnings {
            log::warn!("Typst: {}", warning.message);
        }

        Ok(doc)
    }
}
