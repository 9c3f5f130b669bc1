use std::sync::LazyLock;

use regex::Regex;

static MARKDOWN_BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid bold pattern"));

static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(\s*\n)+").expect("valid blank-line pattern"));

/// Bring generated text into the dialect.
///
/// `**bold**` becomes `<b>bold</b>` and runs of blank lines collapse to a
/// single paragraph break. Running it twice is the same as running it once.
pub fn normalize(text: &str) -> String {
    let text = MARKDOWN_BOLD.replace_all(text, "<b>$1</b>");
    collapse_blank_lines(&text)
}

/// Collapse runs of blank lines to one and trim the result.
pub(crate) fn collapse_blank_lines(text: &str) -> String {
    BLANK_RUN.replace_all(text, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::normalize;
    use rstest::rstest;

    #[rstest]
    #[case("It was **bold**.", "It was <b>bold</b>.")]
    #[case("**a** and **b**", "<b>a</b> and <b>b</b>")]
    #[case("no emphasis here", "no emphasis here")]
    #[case("* bullet stays", "* bullet stays")]
    #[case("**not\nacross lines**", "**not\nacross lines**")]
    fn rewrites_markdown_bold(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[test]
    fn collapses_blank_lines() {
        assert_eq!(normalize("a\n\n\n\nb\n  \n\t\nc"), "a\n\nb\n\nc");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(normalize("\n\n  # Title\n\n"), "# Title");
    }

    #[rstest]
    #[case("It was **bold** and <i>plain</i>.\n\n\n* one\n* two")]
    #[case("***odd** stars ** left")]
    #[case("")]
    fn is_idempotent(#[case] input: &str) {
        let once = normalize(input);
        assert_eq!(normalize(&once), once);
    }
}
