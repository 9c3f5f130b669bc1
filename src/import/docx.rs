//! Word documents.
//!
//! Paragraph styles map to headings and bullets, run formatting to inline
//! tags. Text boxes are skipped; table cells read as ordinary paragraphs.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;

use super::office::{Package, Run, attr, blank_line};
use super::Importer;
use crate::error::{DocumentError, ImportError};
use crate::normalize::collapse_blank_lines;

/// Typed list markers: bullet glyphs, `1.`, `a)` and `b.`
static LIST_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\*|-|•|▪|o|\d+\.|[a-zA-Z][.)])\s+").expect("valid list prefix pattern")
});

pub struct DocxImporter;

impl DocxImporter {
    /// Translate `word/document.xml`, resolving style ids through
    /// `word/styles.xml` when it is available.
    pub fn convert(document: &str, styles: Option<&str>) -> Result<String, DocumentError> {
        let names = match styles {
            Some(xml) => style_names(xml)?,
            None => HashMap::new(),
        };

        let mut reader = Reader::from_str(document);
        let mut lines = Vec::new();
        let mut paragraph: Option<Paragraph> = None;
        let mut run: Option<Run> = None;
        let mut strike = false;
        let mut in_text = false;
        let mut text_box_depth = 0usize;

        loop {
            let event = reader.read_event()?;
            if text_box_depth > 0 {
                match &event {
                    Event::Start(e) if e.local_name().as_ref() == b"txbxContent" => {
                        text_box_depth += 1
                    }
                    Event::End(e) if e.local_name().as_ref() == b"txbxContent" => {
                        text_box_depth -= 1
                    }
                    Event::Eof => break,
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"txbxContent" => text_box_depth = 1,
                    b"p" => paragraph = Some(Paragraph::default()),
                    b"r" => {
                        run = Some(Run::default());
                        strike = false;
                    }
                    b"t" => in_text = true,
                    _ => apply_property(&e, paragraph.as_mut(), run.as_mut(), &mut strike)?,
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"p" => push_paragraph(&mut lines, Paragraph::default(), &names),
                    b"tab" => {
                        if let Some(run) = run.as_mut() {
                            run.text.push('\t');
                        }
                    }
                    b"br" | b"cr" => {
                        if let Some(run) = run.as_mut() {
                            run.text.push(' ');
                        }
                    }
                    _ => apply_property(&e, paragraph.as_mut(), run.as_mut(), &mut strike)?,
                },
                Event::Text(e) if in_text => {
                    if let Some(run) = run.as_mut() {
                        run.text.push_str(&e.unescape()?);
                    }
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"t" => in_text = false,
                    b"r" => {
                        if let (Some(mut done), Some(paragraph)) = (run.take(), paragraph.as_mut()) {
                            done.emphasis.underline &= !strike;
                            paragraph.text.push_str(&done.markup());
                        }
                    }
                    b"p" => {
                        if let Some(done) = paragraph.take() {
                            push_paragraph(&mut lines, done, &names);
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(collapse_blank_lines(&lines.join("\n")))
    }
}

impl Importer for DocxImporter {
    fn name(&self) -> &str {
        "Word document"
    }

    fn extensions(&self) -> &[&str] {
        &["docx"]
    }

    fn import(&self, path: &Path) -> Result<String, ImportError> {
        read(path).map_err(|source| ImportError::Document {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn read(path: &Path) -> Result<String, DocumentError> {
    let mut package = Package::open(path)?;
    let document = package.require("word/document.xml")?;
    let styles = package.part("word/styles.xml")?;
    DocxImporter::convert(&document, styles.as_deref())
}

#[derive(Debug, Default)]
struct Paragraph {
    style: Option<String>,
    numbered: bool,
    text: String,
}

#[derive(Debug, PartialEq)]
enum Kind {
    Heading(usize),
    ListItem,
    Body,
}

/// Record paragraph and run properties on whatever is currently open.
fn apply_property(
    e: &BytesStart,
    paragraph: Option<&mut Paragraph>,
    run: Option<&mut Run>,
    strike: &mut bool,
) -> Result<(), DocumentError> {
    let name = e.local_name();
    match (name.as_ref(), paragraph, run) {
        // Run properties, only while a run is open
        (b"b", _, Some(run)) => run.emphasis.bold = toggle(e)?,
        (b"i", _, Some(run)) => run.emphasis.italic = toggle(e)?,
        (b"u", _, Some(run)) => {
            run.emphasis.underline = attr(e, b"val")?.is_none_or(|val| val != "none")
        }
        (b"strike" | b"dstrike", _, Some(_)) => *strike = toggle(e)?,
        // Paragraph properties
        (b"pStyle", Some(paragraph), None) => paragraph.style = attr(e, b"val")?,
        (b"numPr", Some(paragraph), None) => paragraph.numbered = true,
        _ => {}
    }
    Ok(())
}

/// On/off properties are on unless `w:val` says otherwise.
fn toggle(e: &BytesStart) -> Result<bool, DocumentError> {
    Ok(attr(e, b"val")?.is_none_or(|val| !matches!(val.as_str(), "0" | "false" | "off")))
}

fn style_names(xml: &str) -> Result<HashMap<String, String>, DocumentError> {
    let mut reader = Reader::from_str(xml);
    let mut names = HashMap::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"style" => {
                current = attr(&e, b"styleId")?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"name" => {
                if let (Some(id), Some(name)) = (current.as_ref(), attr(&e, b"val")?) {
                    names.insert(id.clone(), name);
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"style" => current = None,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(names)
}

fn kind(style: &str, numbered: bool, text: &str) -> Kind {
    let style: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    if let Some(level) = style.strip_prefix("heading") {
        match level.chars().next() {
            Some('1') => return Kind::Heading(1),
            Some('2') => return Kind::Heading(2),
            Some('3') => return Kind::Heading(3),
            _ => {}
        }
    }

    let list_style = ["listparagraph", "listbullet", "listnumber"]
        .iter()
        .any(|name| style.contains(name));
    if list_style || numbered || LIST_PREFIX.is_match(text) {
        Kind::ListItem
    } else {
        Kind::Body
    }
}

fn push_paragraph(lines: &mut Vec<String>, paragraph: Paragraph, names: &HashMap<String, String>) {
    let text = paragraph.text.trim();
    let style = paragraph
        .style
        .as_deref()
        .map(|id| names.get(id).map(String::as_str).unwrap_or(id))
        .unwrap_or_default();

    match kind(style, paragraph.numbered, text) {
        Kind::Heading(level) => {
            blank_line(lines);
            lines.push(format!("{} {}", "#".repeat(level), text));
        }
        Kind::ListItem if !text.is_empty() => {
            lines.push(format!("* {}", LIST_PREFIX.replace(text, "").trim()));
        }
        Kind::Body if !text.is_empty() => {
            lines.push(text.to_string());
            blank_line(lines);
        }
        _ => blank_line(lines),
    }
}
