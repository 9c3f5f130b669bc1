//! Slide decks.
//!
//! Each slide becomes a `## Slide N: <title>` heading followed by the text of
//! its other shapes. Speaker notes come first under their own heading.

use std::collections::HashMap;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::office::{Package, Run, attr, blank_line};
use super::{Importer, escape};
use crate::error::{DocumentError, ImportError};
use crate::normalize::collapse_blank_lines;

pub struct PptxImporter;

impl Importer for PptxImporter {
    fn name(&self) -> &str {
        "PowerPoint presentation"
    }

    fn extensions(&self) -> &[&str] {
        &["pptx"]
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
    let mut slides = Vec::new();

    for (idx, part) in slide_parts(&mut package)?.iter().enumerate() {
        let shapes = shapes(&package.require(part)?)?;
        let notes = match notes_part(&mut package, part)? {
            Some(notes) => speaker_notes(&package.require(&notes)?)?,
            None => Vec::new(),
        };
        if let Some(text) = slide_text(idx + 1, &shapes, &notes) {
            slides.push(text);
        }
    }
    log::debug!("Read {} slides from '{}'", slides.len(), path.display());

    Ok(collapse_blank_lines(&slides.join("\n\n")))
}

/// Slide part names in presentation order.
///
/// Falls back to the numbering of the part names when the presentation part
/// or its relationships are missing.
fn slide_parts(package: &mut Package) -> Result<Vec<String>, DocumentError> {
    let presentation = package.part("ppt/presentation.xml")?;
    let rels = package.part("ppt/_rels/presentation.xml.rels")?;

    if let (Some(presentation), Some(rels)) = (presentation, rels) {
        let rels = relationships(&rels)?;
        let parts: Vec<String> = slide_ids(&presentation)?
            .iter()
            .filter_map(|id| rels.get(id))
            .map(|rel| resolve("ppt", &rel.target))
            .collect();
        if !parts.is_empty() {
            return Ok(parts);
        }
    }

    let mut numbered: Vec<(u32, String)> = package
        .part_names()
        .into_iter()
        .filter_map(|name| {
            let number = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse()
                .ok()?;
            Some((number, name))
        })
        .collect();
    numbered.sort();
    Ok(numbered.into_iter().map(|(_, name)| name).collect())
}

fn notes_part(package: &mut Package, slide: &str) -> Result<Option<String>, DocumentError> {
    let (dir, file) = slide.rsplit_once('/').unwrap_or(("", slide));
    let Some(rels) = package.part(&format!("{dir}/_rels/{file}.rels"))? else {
        return Ok(None);
    };
    Ok(relationships(&rels)?
        .into_values()
        .find(|rel| rel.kind.ends_with("/notesSlide"))
        .map(|rel| resolve(dir, &rel.target)))
}

#[derive(Debug, Clone, PartialEq)]
struct Relationship {
    kind: String,
    target: String,
}

fn relationships(xml: &str) -> Result<HashMap<String, Relationship>, DocumentError> {
    let mut reader = Reader::from_str(xml);
    let mut rels = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(kind), Some(target)) =
                    (attr(&e, b"Id")?, attr(&e, b"Type")?, attr(&e, b"Target")?)
                {
                    rels.insert(id, Relationship { kind, target });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

/// Relationship ids of the slides listed in `ppt/presentation.xml`.
fn slide_ids(xml: &str) -> Result<Vec<String>, DocumentError> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sldId" => {
                ids.extend(attr(&e, b"r:id")?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ids)
}

/// Resolve a relationship target against the directory of its source part.
fn resolve(dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            ".." => {
                parts.pop();
            }
            "." | "" => {}
            segment => parts.push(segment),
        }
    }
    parts.join("/")
}

#[derive(Debug, Default)]
struct Shape {
    /// Placeholder type, `obj` for an untyped placeholder.
    placeholder: Option<String>,
    paragraphs: Vec<TextParagraph>,
}

#[derive(Debug, Default)]
struct TextParagraph {
    level: u32,
    /// Explicit bullet setting; otherwise indented paragraphs are bullets.
    bullet: Option<bool>,
    markup: String,
    plain: String,
}

impl Shape {
    fn is_title(&self) -> bool {
        matches!(self.placeholder.as_deref(), Some("title" | "ctrTitle"))
    }

    fn plain_text(&self) -> String {
        let lines: Vec<&str> = self
            .paragraphs
            .iter()
            .map(|p| p.plain.trim())
            .filter(|line| !line.is_empty())
            .collect();
        lines.join(" ")
    }

    /// Dialect lines for the shape: one per non-empty paragraph.
    fn body(&self) -> Option<String> {
        let lines: Vec<String> = self
            .paragraphs
            .iter()
            .filter(|p| !p.markup.trim().is_empty())
            .map(|p| {
                if p.bullet.unwrap_or(p.level > 0) {
                    format!("* {}", p.markup.trim())
                } else {
                    p.markup.trim().to_string()
                }
            })
            .collect();
        (!lines.is_empty()).then(|| lines.join("\n"))
    }
}

/// Text-bearing shapes of a slide or notes part, in document order.
fn shapes(xml: &str) -> Result<Vec<Shape>, DocumentError> {
    let mut reader = Reader::from_str(xml);
    let mut shapes = Vec::new();
    let mut shape: Option<Shape> = None;
    let mut paragraph: Option<TextParagraph> = None;
    let mut run: Option<Run> = None;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sp" => shape = Some(Shape::default()),
                b"p" => paragraph = Some(TextParagraph::default()),
                b"r" => run = Some(Run::default()),
                b"t" => in_text = true,
                _ => apply_property(&e, shape.as_mut(), paragraph.as_mut(), run.as_mut())?,
            },
            Event::Empty(e) => {
                apply_property(&e, shape.as_mut(), paragraph.as_mut(), run.as_mut())?
            }
            Event::Text(e) if in_text => {
                if let Some(run) = run.as_mut() {
                    run.text.push_str(&e.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"r" => {
                    if let (Some(done), Some(paragraph)) = (run.take(), paragraph.as_mut()) {
                        paragraph.markup.push_str(&done.markup());
                        paragraph.plain.push_str(&done.text);
                    }
                }
                b"p" => {
                    if let (Some(done), Some(shape)) = (paragraph.take(), shape.as_mut()) {
                        shape.paragraphs.push(done);
                    }
                }
                b"sp" => shapes.extend(shape.take()),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(shapes)
}

fn apply_property(
    e: &BytesStart,
    shape: Option<&mut Shape>,
    paragraph: Option<&mut TextParagraph>,
    run: Option<&mut Run>,
) -> Result<(), DocumentError> {
    let name = e.local_name();
    match (name.as_ref(), shape, paragraph, run) {
        (b"ph", Some(shape), None, None) => {
            shape.placeholder = Some(attr(e, b"type")?.unwrap_or_else(|| "obj".to_string()));
        }
        (b"pPr", _, Some(paragraph), None) => {
            paragraph.level = attr(e, b"lvl")?
                .and_then(|lvl| lvl.parse().ok())
                .unwrap_or(0);
        }
        (b"buChar" | b"buAutoNum", _, Some(paragraph), None) => paragraph.bullet = Some(true),
        (b"buNone", _, Some(paragraph), None) => paragraph.bullet = Some(false),
        (b"rPr", _, _, Some(run)) => {
            run.emphasis.bold = flag(attr(e, b"b")?);
            run.emphasis.italic = flag(attr(e, b"i")?);
            run.emphasis.underline = attr(e, b"u")?.is_some_and(|u| u != "none");
        }
        _ => {}
    }
    Ok(())
}

fn flag(value: Option<String>) -> bool {
    matches!(value.as_deref(), Some("1" | "true"))
}

/// Non-empty lines of the notes body placeholder, escaped.
fn speaker_notes(xml: &str) -> Result<Vec<String>, DocumentError> {
    Ok(shapes(xml)?
        .iter()
        .filter(|shape| shape.placeholder.as_deref() == Some("body"))
        .flat_map(|shape| &shape.paragraphs)
        .map(|p| p.plain.trim())
        .filter(|line| !line.is_empty())
        .map(escape)
        .collect())
}

fn slide_text(number: usize, shapes: &[Shape], notes: &[String]) -> Option<String> {
    let mut lines = Vec::new();

    if !notes.is_empty() {
        lines.push(format!("### Speaker Notes (Slide {number}):"));
        lines.extend(notes.iter().cloned());
        lines.push(String::new());
    }

    let title = shapes
        .iter()
        .find(|shape| shape.is_title())
        .map(Shape::plain_text)
        .filter(|title| !title.is_empty());
    if let Some(title) = title {
        blank_line(&mut lines);
        lines.push(format!("## Slide {number}: {}", escape(&title)));
    }

    let bodies: Vec<String> = shapes
        .iter()
        .filter(|shape| !shape.is_title())
        .filter_map(Shape::body)
        .collect();
    if !bodies.is_empty() {
        blank_line(&mut lines);
        lines.push(bodies.join("\n\n"));
    }

    (!lines.is_empty()).then(|| lines.join("\n"))
}
