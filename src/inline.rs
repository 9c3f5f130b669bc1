//! Parser for the dialect's inline tags (`<b>`, `<i>`, `<u>`).

use crate::block::{Emphasis, StyledRun};
use crate::error::InlineError;

const ENTITIES: [(&str, char); 4] = [("&lt;", '<'), ("&gt;", '>'), ("&amp;", '&'), ("&quot;", '"')];

impl StyledRun {
    /// Parse dialect text into a styled run.
    ///
    /// Tags must nest properly and be closed by the end of the text. Anything
    /// in angle brackets that is not one of the three tags is literal text.
    pub fn parse(markup: &str) -> Result<StyledRun, InlineError> {
        let mut run = StyledRun::default();
        let mut open: Vec<char> = Vec::new();
        let mut text = String::new();
        let mut rest = markup;

        while let Some(ch) = rest.chars().next() {
            if ch == '<' {
                if let Some(tag) = match_tag(rest) {
                    run.push(std::mem::take(&mut text), emphasis_for(&open));
                    if tag.closing {
                        match open.last() {
                            Some(&top) if top == tag.name => {
                                open.pop();
                            }
                            Some(&top) => {
                                return Err(InlineError::MismatchedClose {
                                    expected: top,
                                    found: tag.name,
                                });
                            }
                            None => return Err(InlineError::UnopenedClose(tag.name)),
                        }
                    } else {
                        open.push(tag.name);
                    }
                    rest = &rest[tag.len..];
                    continue;
                }
            } else if ch == '&' {
                if let Some((decoded, len)) = match_entity(rest) {
                    text.push(decoded);
                    rest = &rest[len..];
                    continue;
                }
            }
            text.push(ch);
            rest = &rest[ch.len_utf8()..];
        }

        if let Some(&tag) = open.last() {
            return Err(InlineError::Unclosed(tag));
        }
        run.push(text, Emphasis::PLAIN);
        Ok(run)
    }
}

struct Tag {
    name: char,
    closing: bool,
    len: usize,
}

fn match_tag(s: &str) -> Option<Tag> {
    let bytes = s.as_bytes();
    let closing = bytes.get(1) == Some(&b'/');
    let at = if closing { 2 } else { 1 };
    let name = match bytes.get(at)?.to_ascii_lowercase() {
        b'b' => 'b',
        b'i' => 'i',
        b'u' => 'u',
        _ => return None,
    };
    (bytes.get(at + 1) == Some(&b'>')).then_some(Tag {
        name,
        closing,
        len: at + 2,
    })
}

fn match_entity(s: &str) -> Option<(char, usize)> {
    ENTITIES
        .iter()
        .find(|(entity, _)| s.starts_with(entity))
        .map(|(entity, ch)| (*ch, entity.len()))
}

fn emphasis_for(open: &[char]) -> Emphasis {
    Emphasis {
        bold: open.contains(&'b'),
        italic: open.contains(&'i'),
        underline: open.contains(&'u'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Segment;
    use rstest::rstest;

    fn seg(text: &str, bold: bool, italic: bool, underline: bool) -> Segment {
        Segment {
            text: text.to_string(),
            emphasis: Emphasis {
                bold,
                italic,
                underline,
            },
        }
    }

    #[test]
    fn plain_text_is_one_segment() {
        let run = StyledRun::parse("just words").unwrap();
        assert_eq!(run.segments(), &[seg("just words", false, false, false)]);
    }

    #[test]
    fn bold_italic_underline() {
        let run = StyledRun::parse("a <b>b</b> <i>c</i> <u>d</u>").unwrap();
        assert_eq!(
            run.segments(),
            &[
                seg("a ", false, false, false),
                seg("b", true, false, false),
                seg(" ", false, false, false),
                seg("c", false, true, false),
                seg(" ", false, false, false),
                seg("d", false, false, true),
            ]
        );
        assert_eq!(run.plain_text(), "a b c d");
    }

    #[test]
    fn nested_tags_combine() {
        let run = StyledRun::parse("<b>x<i>y</i></b>").unwrap();
        assert_eq!(
            run.segments(),
            &[seg("x", true, false, false), seg("y", true, true, false)]
        );
    }

    #[test]
    fn tags_are_case_insensitive() {
        let run = StyledRun::parse("<B>loud</B>").unwrap();
        assert_eq!(run.segments(), &[seg("loud", true, false, false)]);
    }

    #[test]
    fn unknown_tags_and_entities() {
        let run = StyledRun::parse("1 <x> 2 &lt;b&gt; &amp; & co").unwrap();
        assert_eq!(run.plain_text(), "1 <x> 2 <b> & & co");
        assert_eq!(run.segments().len(), 1);
    }

    #[test]
    fn empty_tags_leave_no_segment() {
        let run = StyledRun::parse("<b></b>").unwrap();
        assert!(run.is_empty());
    }

    #[rstest]
    #[case("<b>open", InlineError::Unclosed('b'))]
    #[case("close</i>", InlineError::UnopenedClose('i'))]
    #[case("<b><i>x</b></i>", InlineError::MismatchedClose { expected: 'i', found: 'b' })]
    fn malformed_markup_is_rejected(#[case] markup: &str, #[case] expected: InlineError) {
        assert_eq!(StyledRun::parse(markup), Err(expected));
    }
}
