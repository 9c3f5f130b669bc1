use crate::block::{Block, StyledRun};
use crate::error::InlineError;

/// Paragraph used when the source produced no blocks at all.
pub const EMPTY_PLACEHOLDER: &str =
    "The processed text was empty or resulted in no valid PDF content.";

const BULLET_MARKERS: [&str; 2] = ["* ", "- "];

/// Category of one source line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    Heading { level: u8, text: &'a str },
    ListItem { text: &'a str, last_in_run: bool },
    Blank,
    /// The unstripped line as written
    Body(&'a str),
}

/// Classify a line, looking at the raw next line to find the end of a bullet run.
///
/// Markers are matched after leading whitespace is removed, so `"* "` is a
/// bullet with empty text while `"*"` is body text.
pub fn classify<'a>(line: &'a str, next: Option<&str>) -> Line<'a> {
    let cleaned = line.trim_start();

    for (level, prefix) in [(1, "# "), (2, "## "), (3, "### ")] {
        if let Some(text) = cleaned.strip_prefix(prefix) {
            return Line::Heading {
                level,
                text: text.trim(),
            };
        }
    }

    if let Some(text) = strip_bullet(cleaned) {
        let last_in_run = next.is_none_or(|next| strip_bullet(next.trim_start()).is_none());
        return Line::ListItem {
            text: text.trim(),
            last_in_run,
        };
    }

    if cleaned.trim_end().is_empty() {
        Line::Blank
    } else {
        Line::Body(line)
    }
}

fn strip_bullet(line: &str) -> Option<&str> {
    BULLET_MARKERS
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
}

/// Pending lines of the paragraph or list currently being built.
///
/// At most one of the two buffers holds anything before a line is processed.
#[derive(Debug, Default)]
pub struct ParseState<'a> {
    paragraph: Vec<&'a str>,
    list: Vec<&'a str>,
}

impl<'a> ParseState<'a> {
    pub fn is_idle(&self) -> bool {
        self.paragraph.is_empty() && self.list.is_empty()
    }

    /// Route one classified line, pushing the blocks it completes onto `out`.
    ///
    /// Blocks are pushed as soon as they complete, so a heading that fails to
    /// parse still leaves the content flushed ahead of it in `out`.
    pub fn process(&mut self, line: Line<'a>, out: &mut Vec<Block>) -> Result<(), InlineError> {
        match line {
            Line::Heading { level, text } => {
                out.extend(self.flush_all());
                if !text.is_empty() {
                    out.push(Block::heading(level, StyledRun::parse(text)?));
                }
            }
            Line::ListItem { text, last_in_run } => {
                out.extend(self.flush_paragraph());
                if !text.is_empty() {
                    self.list.push(text);
                }
                if last_in_run {
                    out.extend(self.flush_list());
                }
            }
            Line::Blank => out.extend(self.flush_all()),
            Line::Body(raw) => {
                out.extend(self.flush_list());
                self.paragraph.push(raw);
            }
        }
        Ok(())
    }

    /// Flush the paragraph buffer, then the list buffer.
    pub fn flush_all(&mut self) -> Vec<Block> {
        let mut out: Vec<Block> = self.flush_paragraph().into_iter().collect();
        out.extend(self.flush_list());
        out
    }

    pub fn reset(&mut self) {
        self.paragraph.clear();
        self.list.clear();
    }

    fn flush_paragraph(&mut self) -> Option<Block> {
        if self.paragraph.is_empty() {
            return None;
        }
        let text = self.paragraph.join(" ");
        self.paragraph.clear();

        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        match StyledRun::parse(text) {
            Ok(content) => Some(Block::paragraph(content)),
            Err(e) => {
                log::warn!("Skipping paragraph due to error: {}. Text: '{}'", e, preview(text));
                None
            }
        }
    }

    fn flush_list(&mut self) -> Option<Block> {
        if self.list.is_empty() {
            return None;
        }
        let items: Vec<StyledRun> = self
            .list
            .drain(..)
            .filter_map(|item| match StyledRun::parse(item) {
                Ok(run) => Some(run),
                Err(e) => {
                    log::warn!("Skipping list item due to error: {}. Text: '{}'", e, preview(item));
                    None
                }
            })
            .collect();

        (!items.is_empty()).then(|| Block::bullet_list(items))
    }
}

/// Parse dialect text into a flow of headings, paragraphs and bullet lists.
///
/// Never fails: malformed lines are logged and skipped, and an empty result
/// is replaced by a single placeholder paragraph.
pub fn build_flow(source: &str) -> Vec<Block> {
    let (flow, state) = build_with_state(source);
    debug_assert!(state.is_idle());
    flow
}

fn build_with_state(source: &str) -> (Vec<Block>, ParseState<'_>) {
    let lines: Vec<&str> = source.trim().lines().collect();
    let mut state = ParseState::default();
    let mut flow = Vec::new();

    for (idx, &line) in lines.iter().enumerate() {
        let next = lines.get(idx + 1).copied();
        if let Err(e) = state.process(classify(line, next), &mut flow) {
            log::warn!(
                "Error processing line {} ('{}'): {}. Skipping effects of this line.",
                idx + 1,
                preview(line),
                e
            );
            state.reset();
        }
    }
    flow.extend(state.flush_all());

    if flow.is_empty() {
        log::debug!("Flow was empty, adding placeholder paragraph");
        flow.push(Block::paragraph(StyledRun::plain(EMPTY_PLACEHOLDER)));
    }
    log::debug!("Built flow of {} blocks from {} lines", flow.len(), lines.len());
    (flow, state)
}

fn preview(text: &str) -> String {
    let mut short: String = text.chars().take(80).collect();
    if short.len() < text.len() {
        short.push_str("...");
    }
    short
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn heading(level: u8, text: &str) -> Block {
        Block::heading(level, StyledRun::plain(text))
    }

    fn para(text: &str) -> Block {
        Block::paragraph(StyledRun::plain(text))
    }

    fn list(items: &[&str]) -> Block {
        Block::bullet_list(items.iter().map(|i| StyledRun::plain(*i)).collect())
    }

    #[rstest]
    #[case("# Title", None, Line::Heading { level: 1, text: "Title" })]
    #[case("  ## Sub  ", None, Line::Heading { level: 2, text: "Sub" })]
    #[case("### Third", None, Line::Heading { level: 3, text: "Third" })]
    #[case("#### Fourth", None, Line::Body("#### Fourth"))]
    #[case("#NoSpace", None, Line::Body("#NoSpace"))]
    #[case("# ", None, Line::Heading { level: 1, text: "" })]
    #[case("* a", Some("* b"), Line::ListItem { text: "a", last_in_run: false })]
    #[case("- a", Some("  - b"), Line::ListItem { text: "a", last_in_run: false })]
    #[case("* a", Some(""), Line::ListItem { text: "a", last_in_run: true })]
    #[case("* a", None, Line::ListItem { text: "a", last_in_run: true })]
    #[case("*a", None, Line::Body("*a"))]
    #[case("1. Item", None, Line::Body("1. Item"))]
    #[case("   \t", None, Line::Blank)]
    #[case("  indented body ", None, Line::Body("  indented body "))]
    fn classifies_lines(#[case] line: &str, #[case] next: Option<&str>, #[case] expected: Line) {
        assert_eq!(classify(line, next), expected);
    }

    #[test]
    fn mixed_document() {
        let flow = build_flow("# Title\n\nBody line one.\nBody line two.\n\n* A\n* B\n\n## Sub");
        assert_eq!(
            flow,
            vec![
                heading(1, "Title"),
                para("Body line one. Body line two."),
                list(&["A", "B"]),
                heading(2, "Sub"),
            ]
        );
    }

    #[rstest]
    #[case("")]
    #[case("\n\n   \n\t\n")]
    fn empty_input_yields_placeholder(#[case] source: &str) {
        assert_eq!(build_flow(source), vec![para(EMPTY_PLACEHOLDER)]);
    }

    #[test]
    fn buffers_are_idle_after_build() {
        for source in ["plain text", "* dangling item", "Para\n* item\nmore", "# H\n<b>oops"] {
            let (_, state) = build_with_state(source);
            assert!(state.is_idle(), "{source:?}");
        }
    }

    #[test]
    fn empty_bullet_keeps_run_together() {
        assert_eq!(build_flow("* A\n* \n* B"), vec![list(&["A", "B"])]);
    }

    #[test]
    fn blank_line_splits_list() {
        assert_eq!(build_flow("* A\n\n* B"), vec![list(&["A"]), list(&["B"])]);
    }

    #[test]
    fn mixed_markers_form_one_list() {
        assert_eq!(build_flow("* A\n- B"), vec![list(&["A", "B"])]);
    }

    #[test]
    fn body_line_ends_list_and_starts_paragraph() {
        assert_eq!(
            build_flow("Intro\n* A\n* B\nOutro"),
            vec![para("Intro"), list(&["A", "B"]), para("Outro")]
        );
    }

    #[test]
    fn empty_heading_still_flushes() {
        assert_eq!(build_flow("Before\n# \nAfter"), vec![para("Before"), para("After")]);
    }

    #[test]
    fn numbered_lines_are_paragraph_text() {
        assert_eq!(build_flow("1. One\n2. Two"), vec![para("1. One 2. Two")]);
    }

    #[test]
    fn windows_line_endings() {
        assert_eq!(
            build_flow("# T\r\n\r\nbody\r\n"),
            vec![heading(1, "T"), para("body")]
        );
    }

    #[test]
    fn malformed_heading_keeps_content_before_it() {
        let flow = build_flow("Kept.\n\nAlso kept\n# <b>broken\nAfter.\n\n## Next");
        assert_eq!(
            flow,
            vec![para("Kept."), para("Also kept"), para("After."), heading(2, "Next")]
        );
    }

    #[test]
    fn malformed_heading_directly_after_paragraph() {
        let flow = build_flow("Before paragraph.\n# <b>broken\nAfter.");
        assert_eq!(flow, vec![para("Before paragraph."), para("After.")]);
    }

    #[test]
    fn process_pushes_flushed_blocks_before_heading_error() {
        let mut state = ParseState::default();
        let mut out = Vec::new();
        state.process(Line::Body("Pending text"), &mut out).unwrap();
        assert!(out.is_empty());

        let err = state
            .process(Line::Heading { level: 1, text: "<i>broken" }, &mut out)
            .unwrap_err();
        assert_eq!(err, InlineError::Unclosed('i'));
        assert_eq!(out, vec![para("Pending text")]);
        assert!(state.is_idle());
    }

    #[test]
    fn malformed_paragraph_is_dropped() {
        let flow = build_flow("Good.\n\nBad <i>tag\n\nAlso good.");
        assert_eq!(flow, vec![para("Good."), para("Also good.")]);
    }

    #[test]
    fn malformed_list_item_is_dropped() {
        let flow = build_flow("* one\n* <u>two\n* three");
        assert_eq!(flow, vec![list(&["one", "three"])]);
    }

    #[test]
    fn list_of_only_bad_items_produces_nothing() {
        let flow = build_flow("* </b>\n\nText");
        assert_eq!(flow, vec![para("Text")]);
    }

    #[test]
    fn inline_emphasis_survives() {
        let flow = build_flow("Some <b>bold</b> text");
        let Block::Paragraph { content } = &flow[0] else {
            panic!("expected paragraph, got {:?}", flow[0]);
        };
        assert_eq!(content.segments().len(), 3);
        assert!(content.segments()[1].emphasis.bold);
    }
}
