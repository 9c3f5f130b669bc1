use std::fmt::Write;

use crate::block::{Block, Segment, StyledRun};
use crate::page::StyleMetrics;

/// Lists with at most this many items are kept on one page.
const KEEP_TOGETHER_ITEMS: usize = 5;

/// Check each block against the style and insert the spacers between them.
///
/// Paragraphs are followed by one paragraph space and bullet lists by half of
/// one. Blocks that cannot be typeset are skipped with a warning.
pub fn lay_out(blocks: &[Block], style: &StyleMetrics) -> Vec<Block> {
    let mut out = Vec::with_capacity(blocks.len() * 2);

    for (idx, block) in blocks.iter().enumerate() {
        if let Err(reason) = check_block(block, style) {
            log::warn!("Skipping block {} due to error: {}", idx + 1, reason);
            continue;
        }
        out.push(block.clone());
        match block {
            Block::Paragraph { .. } => out.push(Block::Spacer {
                size: style.paragraph_space,
            }),
            Block::BulletList { .. } => out.push(Block::Spacer {
                size: style.list_space,
            }),
            Block::Heading { .. } | Block::Spacer { .. } => {}
        }
    }

    out
}

fn check_block(block: &Block, style: &StyleMetrics) -> Result<(), String> {
    match block {
        Block::Heading { level, content } => {
            if style.heading(*level).is_none() {
                return Err(format!("unsupported heading level {}", level));
            }
            if content.is_empty() {
                return Err("heading has no text".to_string());
            }
        }
        Block::Paragraph { content } if content.is_empty() => {
            return Err("paragraph has no text".to_string());
        }
        Block::BulletList { items } if items.iter().all(StyledRun::is_empty) => {
            return Err("bullet list has no items".to_string());
        }
        Block::Spacer { size } if !size.is_finite() || *size < 0.0 => {
            return Err(format!("invalid spacer size {}", size));
        }
        _ => {}
    }
    Ok(())
}

/// Convert a laid-out flow to Typst markup
pub fn flow_to_typst(flow: &[Block], style: &StyleMetrics) -> String {
    let mut out = String::new();
    emit_preamble(style, &mut out);

    for block in flow {
        emit_block(block, style, &mut out);
    }

    out
}

fn emit_preamble(style: &StyleMetrics, out: &mut String) {
    let _ = writeln!(out, "#set page(paper: \"{}\")", style.page.typst_paper());
    let _ = writeln!(
        out,
        "#set text(font: {}, size: {}, top-edge: \"ascender\", bottom-edge: \"descender\")",
        string_literal(&style.font_family),
        pt(style.font_size)
    );
    // Vertical rhythm comes only from explicit spacers
    let _ = writeln!(
        out,
        "#set par(leading: {}, spacing: 0pt, linebreaks: \"optimized\")",
        pt(style.leading - style.font_size)
    );
    out.push_str("#set block(spacing: 0pt)\n");
    let _ = writeln!(
        out,
        "#set list(marker: [•], indent: 0pt, body-indent: {}, spacing: {})",
        pt(style.bullet_indent),
        pt(style.leading - style.font_size)
    );
    out.push('\n');
}

fn emit_block(block: &Block, style: &StyleMetrics, out: &mut String) {
    match block {
        Block::Heading { level, content } => {
            let Some(heading) = style.heading(*level) else {
                return;
            };
            // Sticky keeps the heading on the same page as what follows
            let _ = writeln!(
                out,
                "#block(sticky: true, above: {}, below: {})[",
                pt(heading.space_before),
                pt(heading.space_after)
            );
            let _ = writeln!(
                out,
                "#set par(leading: {})",
                pt(heading.leading - heading.font_size)
            );
            let _ = write!(out, "#text(size: {}, weight: \"bold\")[", pt(heading.font_size));
            run_to_typst(content, out);
            out.push_str("]\n]\n\n");
        }
        Block::Paragraph { content } => {
            run_to_typst(content, out);
            out.push_str("\n\n");
        }
        Block::BulletList { items } => {
            let keep_together = items.len() <= KEEP_TOGETHER_ITEMS;
            if keep_together {
                out.push_str("#block(breakable: false)[\n");
            }
            for item in items.iter().filter(|item| !item.is_empty()) {
                out.push_str("- ");
                run_to_typst(item, out);
                out.push('\n');
            }
            if keep_together {
                out.push_str("]\n");
            }
            out.push('\n');
        }
        Block::Spacer { size } => {
            let _ = writeln!(out, "#v({})\n", pt(*size));
        }
    }
}

fn run_to_typst(run: &StyledRun, out: &mut String) {
    for segment in run.segments() {
        segment_to_typst(segment, out);
    }
}

/// Each segment becomes one code expression, so no source character is
/// ever read as Typst markup.
fn segment_to_typst(segment: &Segment, out: &mut String) {
    let mut expr = string_literal(&segment.text);
    if segment.emphasis.underline {
        expr = format!("underline({expr})");
    }
    if segment.emphasis.italic {
        expr = format!("emph({expr})");
    }
    if segment.emphasis.bold {
        expr = format!("strong({expr})");
    }
    out.push('#');
    out.push_str(&expr);
}

fn string_literal(text: &str) -> String {
    let mut lit = String::with_capacity(text.len() + 2);
    lit.push('"');
    for ch in text.chars() {
        match ch {
            '"' => lit.push_str("\\\""),
            '\\' => lit.push_str("\\\\"),
            '\n' => lit.push_str("\\n"),
            '\r' => lit.push_str("\\r"),
            '\t' => lit.push_str("\\t"),
            _ => lit.push(ch),
        }
    }
    lit.push('"');
    lit
}

fn pt(value: f64) -> String {
    format!("{:.2}pt", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FontConfig, SpacingConfig};
    use crate::page::{PageSize, PageSpec};
    use crate::parser::build_flow;

    fn style() -> StyleMetrics {
        StyleMetrics::resolve(
            &PageSpec::new(PageSize::Letter, 12.0),
            &FontConfig::default(),
            &SpacingConfig::default(),
        )
    }

    fn typst_for(source: &str) -> String {
        let style = style();
        flow_to_typst(&lay_out(&build_flow(source), &style), &style)
    }

    fn body(typst: &str) -> &str {
        let start = typst.find("\n\n").unwrap() + 2;
        &typst[start..]
    }

    #[test]
    fn preamble() {
        let typst = typst_for("x");
        assert!(typst.starts_with("#set page(paper: \"us-letter\")\n"));
        assert!(typst.contains("#set text(font: \"Libertinus Serif\", size: 12.00pt"));
        assert!(typst.contains("#set par(leading: 2.40pt, spacing: 0pt"));
        assert!(typst.contains("#set list(marker: [•], indent: 0pt, body-indent: 20.00pt"));
    }

    #[test]
    fn a4_paper() {
        let style = StyleMetrics::resolve(
            &PageSpec::new(PageSize::A4, 11.0),
            &FontConfig::default(),
            &SpacingConfig::default(),
        );
        assert!(flow_to_typst(&[], &style).starts_with("#set page(paper: \"a4\")\n"));
    }

    #[test]
    fn paragraph_then_spacer() {
        assert_eq!(body(&typst_for("Hello world")), "#\"Hello world\"\n\n#v(7.20pt)\n\n");
    }

    #[test]
    fn heading() {
        assert_eq!(
            body(&typst_for("# Hello")),
            "#block(sticky: true, above: 14.40pt, below: 10.80pt)[\n\
             #set par(leading: 4.32pt)\n\
             #text(size: 21.60pt, weight: \"bold\")[#\"Hello\"]\n]\n\n"
        );
    }

    #[test]
    fn emphasis() {
        assert_eq!(
            body(&typst_for("a <b>b</b> <i><u>c</u></i> <b><i>d</i></b>")),
            "#\"a \"#strong(\"b\")#\" \"#emph(underline(\"c\"))#\" \"#strong(emph(\"d\"))\n\n#v(7.20pt)\n\n"
        );
    }

    #[test]
    fn short_list_kept_together() {
        assert_eq!(
            body(&typst_for("* one\n* two")),
            "#block(breakable: false)[\n- #\"one\"\n- #\"two\"\n]\n\n#v(3.60pt)\n\n"
        );
    }

    #[test]
    fn long_list_may_break() {
        let typst = typst_for("* 1\n* 2\n* 3\n* 4\n* 5\n* 6");
        assert!(!typst.contains("breakable"));
        assert!(typst.contains("- #\"6\"\n\n#v(3.60pt)"));
    }

    #[test]
    fn escapes_string_literals() {
        assert_eq!(
            body(&typst_for(r#"say "hi" \ #set *x* _y_ $z$"#)),
            "#\"say \\\"hi\\\" \\\\ #set *x* _y_ $z$\"\n\n#v(7.20pt)\n\n"
        );
    }

    #[test]
    fn blank_line_runs_do_not_add_space() {
        let style = style();
        let single = lay_out(&build_flow("a\n\nb"), &style);
        let many = lay_out(&build_flow("a\n\n\n\n\n   \nb"), &style);
        assert_eq!(single, many);
        let spacers = single
            .iter()
            .filter(|b| matches!(b, Block::Spacer { .. }))
            .count();
        assert_eq!(spacers, 2);
    }

    #[test]
    fn headings_get_no_spacer() {
        let flow = lay_out(&build_flow("# A\n## B"), &style());
        assert_eq!(flow.len(), 2);
    }

    #[test]
    fn invalid_blocks_are_skipped() {
        let blocks = vec![
            Block::heading(4, StyledRun::plain("too deep")),
            Block::paragraph(StyledRun::default()),
            Block::bullet_list(vec![]),
            Block::Spacer { size: -1.0 },
            Block::paragraph(StyledRun::plain("kept")),
        ];
        let flow = lay_out(&blocks, &style());
        assert_eq!(
            flow,
            vec![
                Block::paragraph(StyledRun::plain("kept")),
                Block::Spacer { size: 7.2 },
            ]
        );
    }
}
