/*!
 * # notewai - Note translation with AI
 *
 * A Rust library that duplicates a batch of structured notes (flashcards) and
 * fills the duplicates with machine-translated text.
 *
 * ## Features
 *
 * - Translate mapped note fields using various AI providers:
 *   - OpenAI chat completions API
 *   - Google Gemini generateContent API
 * - Shared concurrency cap across the whole batch
 * - Exponential backoff for rate limits and transient network errors
 * - Per-record atomicity: a note is duplicated only if every mapped field translated
 * - Ordered batch report with a reason for every skipped note
 * - Cancellation of a running batch
 * - ISO 639-1 and ISO 639-2 language code support in prompts
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management and API key resolution
 * - `records`: Notes, fields and field mappings
 * - `translation`: Batch orchestration:
 *   - `translation::batch`: The batch orchestrator
 *   - `translation::retry`: Concurrency cap and retry policy
 *   - `translation::field`: Per-record field translation
 *   - `translation::duplicate`: Construction of translated notes
 *   - `translation::prompts`: Prompt template rendering
 * - `app_controller`: Main application controller for the CLI
 * - `language_utils`: ISO language code utilities
 * - `providers`: Client implementations for various LLM providers:
 *   - `providers::openai`: OpenAI API client
 *   - `providers::gemini`: Gemini API client
 *   - `providers::mock`: Scripted provider for tests
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod language_utils;
pub mod providers;
pub mod records;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::{Config, TranslationProvider};
pub use errors::{AppError, BatchError, ErrorKind, ProviderError};
pub use language_utils::{display_name, get_language_name};
pub use providers::{Provider, ProviderRegistry, ProviderRequest};
pub use records::{Field, FieldMapping, FieldMappingEntry, Record, RecordId};
pub use translation::{
    BatchOrchestrator, BatchReport, CancellationHandle, RecordResult, SkipReason, TranslationConfig,
};
