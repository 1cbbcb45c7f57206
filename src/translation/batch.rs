/*!
 * Batch translation processing.
 *
 * The orchestrator fans the selected records out concurrently, waits for every
 * record to reach a terminal state and assembles a report ordered like the
 * input. The only shared resource is the retry controller's semaphore, which
 * caps provider requests across the whole batch.
 */

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};

use crate::errors::{BatchError, ErrorKind};
use crate::providers::ProviderRegistry;
use crate::records::{FieldMapping, Record};
use crate::translation::cancel::CancellationHandle;
use crate::translation::duplicate::duplicate_record;
use crate::translation::field::{FieldTranslator, has_text};
use crate::translation::model::{
    BatchReport, FieldOutcome, RecordResult, RecordState, SkipReason, TranslationConfig,
    TranslationOutcome,
};
use crate::translation::retry::RetryController;

/// Callback receiving `(input index, new state)` for every record state change
pub type ProgressCallback = Arc<dyn Fn(usize, RecordState) + Send + Sync>;

/// Translates and duplicates a batch of records
#[derive(Clone)]
pub struct BatchOrchestrator {
    registry: ProviderRegistry,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("registry", &self.registry)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl BatchOrchestrator {
    /// Create an orchestrator over an explicit set of providers
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            progress: None,
        }
    }

    /// Observe record state changes
    pub fn with_progress(mut self, callback: impl Fn(usize, RecordState) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Translate and duplicate `records`
    ///
    /// Fails as a whole only when the configuration or mapping is unusable, in
    /// which case no request is sent.
    pub async fn run(
        &self,
        records: &[Record],
        mapping: &FieldMapping,
        config: &TranslationConfig,
    ) -> Result<BatchReport, BatchError> {
        self.run_with_cancel(records, mapping, config, &CancellationHandle::new())
            .await
    }

    /// Same as [`run`](Self::run), stopping early when `cancel` fires
    ///
    /// Records that have not resolved when cancellation is signalled are
    /// reported as `Skipped` with a `Cancelled` reason.
    pub async fn run_with_cancel(
        &self,
        records: &[Record],
        mapping: &FieldMapping,
        config: &TranslationConfig,
        cancel: &CancellationHandle,
    ) -> Result<BatchReport, BatchError> {
        config.validate(&self.registry)?;
        validate_mapping(mapping)?;
        let provider = self.registry.get(config.provider).ok_or_else(|| {
            BatchError::ConfigInvalid(format!("provider '{}' is not registered", config.provider))
        })?;

        let start_time = Instant::now();
        info!(
            "Translating {} records with {} ({}), {} -> {}, up to {} concurrent requests",
            records.len(),
            config.provider.display_name(),
            config.model,
            config.source_language,
            config.target_language,
            config.concurrency_limit
        );

        let config = Arc::new(config.clone());
        let controller = Arc::new(RetryController::new(
            config.concurrency_limit,
            config.retry,
            cancel.clone(),
        ));
        let translator = FieldTranslator::new(provider, Arc::clone(&controller), Arc::clone(&config));

        for index in 0..records.len() {
            self.notify(index, RecordState::Pending);
        }

        // Requests are capped by the controller's semaphore, not by the stream
        let mut pending = stream::iter(records.iter().enumerate())
            .map(|(index, record)| {
                let translator = &translator;
                async move {
                    let result = self.process_record(index, record, mapping, translator, cancel).await;
                    (index, result)
                }
            })
            .buffer_unordered(records.len().max(1));

        let mut slots: Vec<Option<RecordResult>> = (0..records.len()).map(|_| None).collect();
        while let Some((index, result)) = pending.next().await {
            self.notify(index, result.state());
            slots[index] = Some(result);
        }

        let results: Vec<RecordResult> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    error!("Record #{} produced no result", index);
                    RecordResult::Skipped(vec![SkipReason::Internal("no result produced".to_string())])
                })
            })
            .collect();

        let report = BatchReport::new(results, controller.retries());
        if cancel.is_cancelled() {
            warn!("Batch cancelled after {:?}", start_time.elapsed());
        }
        info!(
            "Batch finished in {:?}: {} duplicated, {} skipped, {} retries",
            start_time.elapsed(),
            report.stats.succeeded,
            report.stats.skipped,
            report.stats.retries
        );

        Ok(report)
    }

    async fn process_record(
        &self,
        index: usize,
        record: &Record,
        mapping: &FieldMapping,
        translator: &FieldTranslator,
        cancel: &CancellationHandle,
    ) -> RecordResult {
        if cancel.is_cancelled() {
            return RecordResult::Skipped(vec![SkipReason::Cancelled]);
        }

        if let Some(missing) = mapping.first_missing_field(record) {
            warn!("Record {} has no field '{}', skipping", record.id, missing);
            return RecordResult::Skipped(vec![SkipReason::MissingField(missing.to_string())]);
        }

        let has_work = mapping
            .entries()
            .iter()
            .any(|entry| record.field(&entry.source).is_some_and(has_text));
        if !has_work {
            debug!("Record {} has only empty source fields", record.id);
            return RecordResult::Skipped(vec![SkipReason::NothingToTranslate]);
        }

        self.notify(index, RecordState::InFlight);
        let outcomes = translator.translate_record(record, mapping).await;

        let reasons = skip_reasons(&outcomes);
        if !reasons.is_empty() {
            return RecordResult::Skipped(reasons);
        }

        match duplicate_record(record, mapping, &outcomes) {
            Ok(duplicate) => {
                debug!("Record {} duplicated as {}", record.id, duplicate.record.id);
                RecordResult::Duplicated(duplicate)
            }
            Err(e) => {
                error!("Failed to duplicate record {}: {}", record.id, e);
                RecordResult::Skipped(vec![SkipReason::Internal(e.to_string())])
            }
        }
    }

    fn notify(&self, index: usize, state: RecordState) {
        if let Some(callback) = &self.progress {
            callback(index, state);
        }
    }
}

/// Reasons a record cannot be duplicated, empty when every field succeeded
///
/// Cancelled fields collapse into a single `Cancelled` reason.
fn skip_reasons(outcomes: &[FieldOutcome]) -> Vec<SkipReason> {
    let mut reasons = Vec::new();
    let mut cancelled = false;

    for outcome in outcomes {
        match &outcome.outcome {
            TranslationOutcome::Success(_) => {}
            TranslationOutcome::Failure {
                kind: ErrorKind::Cancelled,
                ..
            } => cancelled = true,
            TranslationOutcome::Failure { kind, message } => reasons.push(SkipReason::FieldFailed {
                field: outcome.source_field.clone(),
                kind: *kind,
                message: message.clone(),
            }),
        }
    }

    if cancelled {
        reasons.push(SkipReason::Cancelled);
    }
    reasons
}

fn validate_mapping(mapping: &FieldMapping) -> Result<(), BatchError> {
    if mapping.is_empty() {
        return Err(BatchError::ConfigInvalid("field mapping is empty".to_string()));
    }
    if let Some(target) = mapping.duplicate_target() {
        return Err(BatchError::ConfigInvalid(format!(
            "field '{}' is the target of more than one mapping",
            target
        )));
    }
    Ok(())
}
