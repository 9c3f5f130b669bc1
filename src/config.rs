use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::page::PageSpec;

const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub page: PageConfig,
    pub font: FontConfig,
    pub spacing: SpacingConfig,
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PageConfig {
    /// Page size name, `Letter` or `A4`. Unknown names fall back to Letter.
    pub size: String,
    pub font_size: f64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size: "Letter".to_string(),
            font_size: 12.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FontConfig {
    pub family: String,
    /// Also search fonts installed on the system, not just the embedded ones.
    pub system_fonts: bool,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            family: "Libertinus Serif".to_string(),
            system_fonts: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpacingConfig {
    pub paragraph_inches: f64,
    pub heading_after_inches: f64,
    pub bullet_indent_pt: f64,
}

impl Default for SpacingConfig {
    fn default() -> Self {
        Self {
            paragraph_inches: 0.1,
            heading_after_inches: 0.15,
            bullet_indent_pt: 20.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub api_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Tokens the model accepts. Larger sources are still sent, with a warning.
    pub context_window: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:1234/v1/chat/completions".to_string(),
            model: "qwen2.5-7b-instruct-1m".to_string(),
            timeout_secs: 180,
            max_tokens: 2000,
            temperature: 0.5,
            context_window: 8192,
        }
    }
}

impl Config {
    /// The config bundled with the crate.
    pub fn compiled_default() -> Self {
        // build.rs has already checked that the bundled file parses
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }

    /// Load config from a TOML file, or return the compiled default if it is
    /// missing or invalid.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                log::warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::compiled_default()
            }),
            Err(_) => Self::compiled_default(),
        }
    }

    /// Page geometry and base font size described by the `[page]` section.
    pub fn page_spec(&self) -> PageSpec {
        PageSpec::from_name(&self.page.size, self.page.font_size)
    }
}
