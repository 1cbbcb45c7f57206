/*!
 * Per-record field translation.
 *
 * Every non-empty mapped source field becomes one [`TranslationRequest`]. All
 * requests of a record run concurrently through the shared retry controller and
 * a failure never cancels its siblings, so the caller sees exactly which field
 * failed.
 */

use std::sync::Arc;

use futures::future::join_all;
use log::warn;

use crate::providers::Provider;
use crate::records::{FieldMapping, Record};
use crate::translation::model::{FieldOutcome, TranslationConfig, TranslationOutcome, TranslationRequest};
use crate::translation::retry::RetryController;

/// Translates the mapped fields of one record
#[derive(Debug, Clone)]
pub struct FieldTranslator {
    provider: Arc<dyn Provider>,
    controller: Arc<RetryController>,
    config: Arc<TranslationConfig>,
}

/// Whether a source text is worth sending to a provider
pub fn has_text(value: &str) -> bool {
    !value.trim().is_empty()
}

impl FieldTranslator {
    pub fn new(
        provider: Arc<dyn Provider>,
        controller: Arc<RetryController>,
        config: Arc<TranslationConfig>,
    ) -> Self {
        Self {
            provider,
            controller,
            config,
        }
    }

    /// Build one request per mapped source field that has text
    pub fn requests_for(&self, record: &Record, mapping: &FieldMapping) -> Vec<TranslationRequest> {
        mapping
            .entries()
            .iter()
            .filter_map(|entry| {
                let text = record.field(&entry.source)?;
                has_text(text).then(|| TranslationRequest {
                    record_id: record.id.clone(),
                    source_field: entry.source.clone(),
                    target_field: entry.target.clone(),
                    text: text.to_string(),
                    config: Arc::clone(&self.config),
                })
            })
            .collect()
    }

    /// Translate a single request through the retry controller
    pub async fn translate(&self, request: &TranslationRequest) -> FieldOutcome {
        let attempted = self
            .controller
            .execute(self.provider.as_ref(), &request.to_provider_request())
            .await;

        let outcome = match attempted.result {
            Ok(text) => TranslationOutcome::Success(text),
            Err(error) => {
                warn!(
                    "Record {} field '{}' failed: {}",
                    request.record_id, request.source_field, error
                );
                TranslationOutcome::Failure {
                    kind: error.kind,
                    message: error.message,
                }
            }
        };

        FieldOutcome {
            source_field: request.source_field.clone(),
            target_field: request.target_field.clone(),
            outcome,
            attempts: attempted.attempts,
        }
    }

    /// Translate every mapped field of a record, in mapping order
    pub async fn translate_record(&self, record: &Record, mapping: &FieldMapping) -> Vec<FieldOutcome> {
        let requests = self.requests_for(record, mapping);
        join_all(requests.iter().map(|request| self.translate(request))).await
    }
}
