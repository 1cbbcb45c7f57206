/*!
 * Prompt templates for note field translation.
 *
 * A template is plain text with up to three placeholders: `{text}`,
 * `{source_language}` and `{target_language}`. Any other `{name}` placeholder
 * is rejected when the template is parsed.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::language_utils;

/// Instruction appended so that images embedded in notes survive translation.
pub const IMAGE_TAG_INSTRUCTION: &str =
    "Do not translate or move any <img> tags; keep them exactly as-is and in place.";

const TEXT: &str = "{text}";
const SOURCE_LANGUAGE: &str = "{source_language}";
const TARGET_LANGUAGE: &str = "{target_language}";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[A-Za-z_][A-Za-z0-9_]*\}").unwrap());

/// Translation prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

/// A prompt ready to be sent to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    /// Instructions for the model, with languages (and possibly the text) filled in
    pub instructions: String,

    /// Text to translate when it was not embedded in the instructions
    pub text: Option<String>,
}

impl RenderedPrompt {
    /// The whole prompt as one block of text, text appended after a blank line
    pub fn combined(&self) -> String {
        match &self.text {
            Some(text) => format!("{}\n\n{}", self.instructions, text),
            None => self.instructions.clone(),
        }
    }
}

impl PromptTemplate {
    /// The default instruction used when nothing else is configured.
    pub const DEFAULT: &'static str =
        "Translate the following text. Return only the translated text.";

    /// Create a new prompt template without validating it.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create a template, rejecting unknown placeholders and empty text.
    pub fn parse(template: &str) -> Result<Self, String> {
        let parsed = Self::new(template);
        parsed.validate()?;
        Ok(parsed)
    }

    /// Check the template for unknown placeholders.
    pub fn validate(&self) -> Result<(), String> {
        if self.template.trim().is_empty() {
            return Err("prompt template is empty".to_string());
        }

        let unknown: Vec<&str> = PLACEHOLDER
            .find_iter(&self.template)
            .map(|m| m.as_str())
            .filter(|p| ![TEXT, SOURCE_LANGUAGE, TARGET_LANGUAGE].contains(p))
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(format!("unknown prompt placeholder(s): {}", unknown.join(", ")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Whether the source text is embedded through `{text}`
    pub fn embeds_text(&self) -> bool {
        self.template.contains(TEXT)
    }

    /// Render the template for one piece of text.
    pub fn render(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        preserve_image_tags: bool,
    ) -> RenderedPrompt {
        let source_name = language_utils::display_name(source_language);
        let target_name = language_utils::display_name(target_language);

        let mentions_languages =
            self.template.contains(SOURCE_LANGUAGE) || self.template.contains(TARGET_LANGUAGE);

        let mut instructions = self
            .template
            .trim()
            .replace(SOURCE_LANGUAGE, &source_name)
            .replace(TARGET_LANGUAGE, &target_name);

        if preserve_image_tags {
            instructions.push_str("\n\n");
            instructions.push_str(IMAGE_TAG_INSTRUCTION);
        }

        if !mentions_languages {
            instructions.push_str(&format!(
                "\n\nSource language: {}\nTarget language: {}",
                source_name, target_name
            ));
        }

        // Substituted last so text containing placeholder-like braces is left alone
        if self.embeds_text() {
            RenderedPrompt {
                instructions: instructions.replace(TEXT, text),
                text: None,
            }
        } else {
            RenderedPrompt {
                instructions,
                text: Some(text.to_string()),
            }
        }
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}
