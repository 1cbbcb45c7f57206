/*!
 * Translation of note batches using AI providers.
 *
 * This module contains the orchestration that turns selected records into
 * translated duplicates. It is split into several submodules:
 *
 * - `model`: Configuration, request, outcome and report types
 * - `prompts`: Prompt template and rendering
 * - `retry`: Shared concurrency cap and retry with backoff
 * - `field`: Translation of one record's mapped fields
 * - `duplicate`: Construction of the translated record
 * - `cancel`: Cancellation handle for a running batch
 * - `batch`: The batch orchestrator
 */

// Re-export main types for easier usage
pub use self::batch::{BatchOrchestrator, ProgressCallback};
pub use self::cancel::CancellationHandle;
pub use self::duplicate::{IncompleteOutcomes, duplicate_record};
pub use self::field::FieldTranslator;
pub use self::model::{
    BatchReport, BatchStats, DuplicatedRecord, FieldOutcome, RecordResult, RecordState, RetryPolicy,
    SkipReason, TranslationConfig, TranslationOutcome, TranslationRequest,
};
pub use self::retry::RetryController;

// Re-export prompt types
pub use self::prompts::PromptTemplate;

// Submodules
pub mod batch;
pub mod cancel;
pub mod duplicate;
pub mod field;
pub mod model;
pub mod prompts;
pub mod retry;
