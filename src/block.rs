/// Inline emphasis applied to a stretch of text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Emphasis {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl Emphasis {
    pub const PLAIN: Emphasis = Emphasis {
        bold: false,
        italic: false,
        underline: false,
    };
}

/// A piece of text with a single emphasis set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub emphasis: Emphasis,
}

/// Text interleaved with emphasis spans. Never holds raw tag characters
/// for markup; those are decoded by [`StyledRun::parse`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyledRun {
    segments: Vec<Segment>,
}

impl StyledRun {
    /// A run of unemphasised text.
    pub fn plain(text: impl Into<String>) -> Self {
        let mut run = Self::default();
        run.push(text, Emphasis::PLAIN);
        run
    }

    /// Append text, merging with the previous segment when the emphasis matches.
    pub fn push(&mut self, text: impl Into<String>, emphasis: Emphasis) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(last) if last.emphasis == emphasis => last.text.push_str(&text),
            _ => self.segments.push(Segment { text, emphasis }),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The text with all emphasis dropped.
    pub fn plain_text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Block-level elements of a flow
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, content: StyledRun },
    Paragraph { content: StyledRun },
    BulletList { items: Vec<StyledRun> },
    /// Vertical space in points. Only inserted by the layout stage.
    Spacer { size: f64 },
}

impl Block {
    pub fn heading(level: u8, content: StyledRun) -> Self {
        Block::Heading { level, content }
    }

    pub fn paragraph(content: StyledRun) -> Self {
        Block::Paragraph { content }
    }

    pub fn bullet_list(items: Vec<StyledRun>) -> Self {
        Block::BulletList { items }
    }
}
