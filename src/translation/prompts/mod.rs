/*!
 * Prompt construction for field translation.
 *
 * This module provides:
 * - The configurable prompt template with language and text placeholders
 * - Rendering into provider-neutral instructions plus text
 */

pub mod templates;

// Re-export main types
pub use templates::{IMAGE_TAG_INSTRUCTION, PromptTemplate, RenderedPrompt};
