//! Preset rewrite instructions for the text generator.

/// Formatting rules appended to every preset.
pub const FORMATTING_RULES: &str = "Follow these formatting rules strictly for your entire output:\n\
- Inline Emphasis: ONLY use HTML-like tags: <b>text</b> for bold, <i>text</i> for italics, and <u>text</u> for underline. You MUST NOT use markdown like **text** or *text* for inline emphasis.\n\
- Headings: Start a new line ONLY with '# ' (H1), '## ' (H2), or '### ' (H3).\n\
- Bullet Lists: Start each item on a new line ONLY with '* '.\n\
- Numbered Lists: Start each item on a new line ONLY with '1. '.\n\
- Paragraphs: Separate paragraphs with a single blank line.\n\
- Prohibited Formatting: Use NO other Markdown, HTML tags (other than <b>, <i>, <u>), or formatting conventions.";

/// System message sent with every request.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that rewrites and formats text based on user instructions. \
Your primary goal is to produce clean, well-structured text for PDF conversion using specific formatting. \
Produce only the formatted text requested.";

pub const DEFAULT_PRESET: &str = "clarity";

const PRESETS: &[(&str, &str)] = &[
    (
        "clarity",
        "Rewrite the following text to improve clarity, flow, and sentence structure. \
         Ensure the output is well-organized into paragraphs. Apply emphasis where appropriate using the allowed tags.",
    ),
    (
        "report",
        "Summarize the provided text into a concise, formal report summary. Focus on key findings, \
         conclusions, and any recommendations present in the text. Emphasize critical terms or data points using the allowed tags.",
    ),
    (
        "blog",
        "Transform the following text into an engaging blog post with a friendly and accessible tone. \
         Use short paragraphs, headings and lists to structure the content.",
    ),
    (
        "docs",
        "Format the given text as a clear and accurate technical documentation snippet. \
         Use lists for steps, features, or parameters. Emphasize function names, file paths, or commands using the allowed tags.",
    ),
    (
        "minutes",
        "Summarize the provided meeting notes into concise meeting minutes. List attendees if mentioned, \
         then key discussion points, decisions, and action items. Emphasize action item owners and dates using the allowed tags.",
    ),
    (
        "list",
        "From the text provided, extract the main items and format them as a simple list. \
         If the items imply an order, use a numbered list; otherwise, use a bulleted list.",
    ),
];

/// Names of all presets, default first.
pub fn preset_names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|(name, _)| *name)
}

/// Full instruction for a preset, formatting rules included.
pub fn preset(name: &str) -> Option<String> {
    PRESETS
        .iter()
        .find(|(preset, _)| preset.eq_ignore_ascii_case(name))
        .map(|(_, instruction)| format!("{} {}", instruction, FORMATTING_RULES))
}
