//! Page geometry and the style metrics derived from the base font size.

use crate::config::{FontConfig, SpacingConfig};

const POINTS_PER_INCH: f64 = 72.0;
const DEFAULT_FONT_SIZE: f64 = 12.0;
const LEADING_FACTOR: f64 = 1.2;

const HEADING_SIZE_FACTORS: [f64; 3] = [1.8, 1.4, 1.2];
const HEADING_BEFORE_FACTORS: [f64; 3] = [1.2, 1.0, 0.8];
const HEADING_AFTER_FACTORS: [f64; 3] = [1.0, 0.75, 0.5];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageSize {
    #[default]
    Letter,
    A4,
}

impl PageSize {
    /// Look up a page size by name, falling back to the default for
    /// names that are not recognised.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "letter" => PageSize::Letter,
            "a4" => PageSize::A4,
            _ => {
                let fallback = PageSize::default();
                log::warn!("Unknown page size '{}', using {}", name, fallback.name());
                fallback
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PageSize::Letter => "Letter",
            PageSize::A4 => "A4",
        }
    }

    /// Paper name understood by Typst's `page` function.
    pub fn typst_paper(&self) -> &'static str {
        match self {
            PageSize::Letter => "us-letter",
            PageSize::A4 => "a4",
        }
    }
}

/// Page size and base font size for one render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSpec {
    pub size: PageSize,
    pub font_size: f64,
}

impl PageSpec {
    pub fn new(size: PageSize, font_size: f64) -> Self {
        let font_size = if font_size.is_finite() && font_size > 0.0 {
            font_size
        } else {
            log::warn!("Invalid font size {}, using {}", font_size, DEFAULT_FONT_SIZE);
            DEFAULT_FONT_SIZE
        };
        Self { size, font_size }
    }

    pub fn from_name(size: &str, font_size: f64) -> Self {
        Self::new(PageSize::from_name(size), font_size)
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self::new(PageSize::default(), DEFAULT_FONT_SIZE)
    }
}

/// Font and spacing of one heading level, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingStyle {
    pub font_size: f64,
    pub leading: f64,
    pub space_before: f64,
    pub space_after: f64,
}

/// Every size the renderer needs, resolved once per render.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleMetrics {
    pub page: PageSize,
    pub font_family: String,
    pub font_size: f64,
    pub leading: f64,
    pub headings: [HeadingStyle; 3],
    pub paragraph_space: f64,
    pub list_space: f64,
    pub bullet_indent: f64,
}

impl StyleMetrics {
    pub fn resolve(spec: &PageSpec, font: &FontConfig, spacing: &SpacingConfig) -> Self {
        let base = spec.font_size;
        let heading_after = spacing.heading_after_inches * POINTS_PER_INCH;
        let headings = std::array::from_fn(|i| {
            let font_size = base * HEADING_SIZE_FACTORS[i];
            HeadingStyle {
                font_size,
                leading: font_size * LEADING_FACTOR,
                space_before: base * HEADING_BEFORE_FACTORS[i],
                space_after: heading_after * HEADING_AFTER_FACTORS[i],
            }
        });
        let paragraph_space = spacing.paragraph_inches * POINTS_PER_INCH;

        Self {
            page: spec.size,
            font_family: font.family.clone(),
            font_size: base,
            leading: base * LEADING_FACTOR,
            headings,
            paragraph_space,
            list_space: paragraph_space * 0.5,
            bullet_indent: spacing.bullet_indent_pt,
        }
    }

    /// Style for heading level 1..=3.
    pub fn heading(&self, level: u8) -> Option<&HeadingStyle> {
        match level {
            1..=3 => self.headings.get(usize::from(level - 1)),
            _ => None,
        }
    }
}
