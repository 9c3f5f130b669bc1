//! Loading input files as dialect text.
//!
//! Each [`Importer`] handles a set of file extensions and is responsible for
//! translating its native formatting into the dialect's headings, bullets
//! and inline tags. [`ImporterRegistry`] picks the importer for a path.
//! Word and PowerPoint files are read straight from their zipped XML parts.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::error::ImportError;

mod docx;
mod office;
mod pptx;

pub use docx::DocxImporter;
pub use pptx::PptxImporter;

/// Converts one kind of input file to dialect text.
pub trait Importer: Send + Sync {
    fn name(&self) -> &str;

    /// Lower-case extensions without the dot.
    fn extensions(&self) -> &[&str];

    fn import(&self, path: &Path) -> Result<String, ImportError>;
}

/// Registry dispatching on file extension
#[derive(Default)]
pub struct ImporterRegistry {
    importers: Vec<Arc<dyn Importer>>,
    by_extension: HashMap<String, usize>,
}

impl ImporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the plain-text, Markdown, Word and PowerPoint importers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PlainTextImporter));
        registry.register(Arc::new(MarkdownImporter));
        registry.register(Arc::new(DocxImporter));
        registry.register(Arc::new(PptxImporter));
        registry
    }

    /// Register an importer. Later registrations win for shared extensions.
    pub fn register(&mut self, importer: Arc<dyn Importer>) {
        let idx = self.importers.len();
        for ext in importer.extensions() {
            self.by_extension.insert(ext.to_ascii_lowercase(), idx);
        }
        self.importers.push(importer);
    }

    pub fn for_path(&self, path: &Path) -> Option<&dyn Importer> {
        let ext = extension_of(path)?;
        self.by_extension
            .get(&ext)
            .map(|&idx| self.importers[idx].as_ref())
    }

    pub fn import(&self, path: &Path) -> Result<String, ImportError> {
        let importer = self.for_path(path).ok_or_else(|| {
            ImportError::Unsupported(extension_of(path).unwrap_or_else(|| "(none)".to_string()))
        })?;
        log::debug!("Importing '{}' with {}", path.display(), importer.name());
        importer.import(path)
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

fn read(path: &Path) -> Result<String, ImportError> {
    fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the file as-is; plain text is already dialect text.
pub struct PlainTextImporter;

impl Importer for PlainTextImporter {
    fn name(&self) -> &str {
        "plain text"
    }

    fn extensions(&self) -> &[&str] {
        &["txt", "text"]
    }

    fn import(&self, path: &Path) -> Result<String, ImportError> {
        read(path)
    }
}

/// Translates CommonMark into the dialect.
pub struct MarkdownImporter;

impl MarkdownImporter {
    pub fn convert(markdown: &str) -> String {
        let mut writer = DialectWriter::default();
        for event in Parser::new_ext(markdown, Options::empty()) {
            writer.event(event);
        }
        writer.finish()
    }
}

impl Importer for MarkdownImporter {
    fn name(&self) -> &str {
        "Markdown"
    }

    fn extensions(&self) -> &[&str] {
        &["md", "markdown"]
    }

    fn import(&self, path: &Path) -> Result<String, ImportError> {
        Ok(Self::convert(&read(path)?))
    }
}

#[derive(Default)]
struct DialectWriter {
    out: String,
    // One entry per open list: the next number for ordered lists
    lists: Vec<Option<u64>>,
}

impl DialectWriter {
    fn event(&mut self, event: Event) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                self.start_line();
                self.out.push_str(heading_prefix(level));
            }
            Event::End(TagEnd::Heading(_)) => self.end_block(),

            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => {
                if self.lists.is_empty() {
                    self.end_block();
                } else {
                    self.out.push(' ');
                }
            }

            Event::Start(Tag::Strong) => self.out.push_str("<b>"),
            Event::End(TagEnd::Strong) => self.out.push_str("</b>"),
            Event::Start(Tag::Emphasis) => self.out.push_str("<i>"),
            Event::End(TagEnd::Emphasis) => self.out.push_str("</i>"),

            Event::Start(Tag::List(first)) => {
                self.start_line();
                self.lists.push(first);
            }
            Event::End(TagEnd::List(_)) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.end_block();
                }
            }
            Event::Start(Tag::Item) => {
                self.start_line();
                let marker = match self.lists.last_mut() {
                    Some(Some(number)) => {
                        let marker = format!("{}. ", number);
                        *number += 1;
                        marker
                    }
                    _ => "* ".to_string(),
                };
                self.out.push_str(&marker);
            }
            Event::End(TagEnd::Item) => self.start_line(),

            Event::Start(Tag::CodeBlock(_)) => self.start_line(),
            Event::End(TagEnd::CodeBlock) => self.end_block(),

            Event::Text(text) | Event::Code(text) => push_escaped(&mut self.out, &text),
            Event::InlineHtml(html) => {
                if is_dialect_tag(&html) {
                    self.out.push_str(&html);
                } else {
                    push_escaped(&mut self.out, &html);
                }
            }
            Event::SoftBreak | Event::HardBreak => self.out.push(' '),
            Event::Rule => self.end_block(),

            _ => {}
        }
    }

    /// Make sure the next text starts a new line.
    fn start_line(&mut self) {
        let trimmed = self.out.trim_end_matches(' ').len();
        self.out.truncate(trimmed);
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    /// End the current block with one blank line.
    fn end_block(&mut self) {
        self.start_line();
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn finish(self) -> String {
        self.out.trim_end().to_string()
    }
}

fn heading_prefix(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "# ",
        HeadingLevel::H2 => "## ",
        _ => "### ",
    }
}

fn is_dialect_tag(html: &str) -> bool {
    let tag = html.trim_start_matches('<').trim_start_matches('/').trim_end_matches('>');
    html.starts_with('<') && html.ends_with('>') && matches!(tag, "b" | "i" | "u" | "B" | "I" | "U")
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    push_escaped(&mut out, text);
    out
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("# Title", "# Title")]
    #[case("#### Deep", "### Deep")]
    #[case("Some **bold** and *italic*.", "Some <b>bold</b> and <i>italic</i>.")]
    #[case("Use `a < b` here", "Use a &lt; b here")]
    #[case("Raw <u>under</u> and <span>x</span>", "Raw <u>under</u> and &lt;span&gt;x&lt;/span&gt;")]
    #[case("line one\nline two", "line one line two")]
    fn converts_inline_and_headings(#[case] markdown: &str, #[case] expected: &str) {
        assert_eq!(MarkdownImporter::convert(markdown), expected);
    }

    #[test]
    fn converts_document() {
        let md = "# Title\n\nIntro text.\n\n- one\n- two\n  - nested\n\n1. first\n2. second\n\n## Next\n\nEnd.";
        assert_eq!(
            MarkdownImporter::convert(md),
            "# Title\n\nIntro text.\n\n* one\n* two\n* nested\n\n1. first\n2. second\n\n## Next\n\nEnd."
        );
    }

    #[test]
    fn loose_list_items_stay_on_one_line() {
        assert_eq!(MarkdownImporter::convert("- a\n\n- b\n"), "* a\n* b");
    }

    #[test]
    fn registry_dispatches_on_extension() {
        let registry = ImporterRegistry::with_defaults();
        assert_eq!(registry.for_path(Path::new("notes.TXT")).unwrap().name(), "plain text");
        assert_eq!(registry.for_path(Path::new("a/b.md")).unwrap().name(), "Markdown");
        assert_eq!(registry.for_path(Path::new("r.docx")).unwrap().name(), "Word document");
        assert_eq!(
            registry.for_path(Path::new("deck.PPTX")).unwrap().name(),
            "PowerPoint presentation"
        );
        assert!(registry.for_path(Path::new("old.doc")).is_none());
        assert!(registry.for_path(Path::new("README")).is_none());
    }

    #[test]
    fn unsupported_extension_is_reported() {
        let err = ImporterRegistry::with_defaults()
            .import(Path::new("slides.key"))
            .unwrap_err();
        assert!(matches!(err, ImportError::Unsupported(ref ext) if ext == "key"));
    }

    #[test]
    fn imports_files() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("in.txt");
        let md = dir.path().join("in.md");
        fs::write(&txt, "# Kept **as is**").unwrap();
        fs::write(&md, "Some **bold**").unwrap();

        let registry = ImporterRegistry::with_defaults();
        assert_eq!(registry.import(&txt).unwrap(), "# Kept **as is**");
        assert_eq!(registry.import(&md).unwrap(), "Some <b>bold</b>");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ImporterRegistry::with_defaults()
            .import(Path::new("/no/such/file.txt"))
            .unwrap_err();
        assert!(matches!(err, ImportError::Io { .. }));
    }
}
