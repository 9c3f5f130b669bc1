//! Reading Office Open XML packages: a zip archive of XML parts.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::BytesStart;
use zip::ZipArchive;
use zip::result::ZipError;

use super::escape;
use crate::block::Emphasis;
use crate::error::DocumentError;

pub(super) struct Package {
    archive: ZipArchive<File>,
}

impl Package {
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        let archive = ZipArchive::new(File::open(path)?)?;
        Ok(Self { archive })
    }

    /// The text of a part, or `None` if the package has no such part.
    pub fn part(&mut self, name: &str) -> Result<Option<String>, DocumentError> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut xml = String::new();
        entry.read_to_string(&mut xml)?;
        Ok(Some(xml))
    }

    pub fn require(&mut self, name: &str) -> Result<String, DocumentError> {
        self.part(name)?
            .ok_or_else(|| DocumentError::MissingPart(name.to_string()))
    }

    pub fn part_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }
}

/// Look up an attribute by local name, or by qualified name when `key`
/// carries a prefix (`r:id` and `id` both appear on the same element).
pub(super) fn attr(e: &BytesStart, key: &[u8]) -> Result<Option<String>, DocumentError> {
    let qualified = key.contains(&b':');
    for attribute in e.attributes() {
        let attribute = attribute?;
        let matches = if qualified {
            attribute.key.as_ref() == key
        } else {
            attribute.key.local_name().as_ref() == key
        };
        if matches {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Text of one formatted run.
#[derive(Debug, Default)]
pub(super) struct Run {
    pub emphasis: Emphasis,
    pub text: String,
}

impl Run {
    /// The run as escaped dialect text wrapped in its emphasis tags.
    pub fn markup(&self) -> String {
        if self.text.is_empty() {
            return String::new();
        }
        let tags = [
            (self.emphasis.bold, "b"),
            (self.emphasis.italic, "i"),
            (self.emphasis.underline, "u"),
        ];
        let mut out = String::new();
        for (_, tag) in tags.iter().filter(|(on, _)| *on) {
            out.push_str(&format!("<{tag}>"));
        }
        out.push_str(&escape(&self.text));
        for (_, tag) in tags.iter().rev().filter(|(on, _)| *on) {
            out.push_str(&format!("</{tag}>"));
        }
        out
    }
}

/// Append an empty line unless the last line already is one.
pub(super) fn blank_line(lines: &mut Vec<String>) {
    if lines.last().is_some_and(|line| !line.is_empty()) {
        lines.push(String::new());
    }
}

#[cfg(test)]
pub(super) fn write_package(path: &Path, parts: &[(&str, &str)]) {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, xml) in parts {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}
