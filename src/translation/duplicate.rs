use thiserror::Error;

use crate::records::{FieldMapping, Record, RecordId};
use crate::translation::field::has_text;
use crate::translation::model::{DuplicatedRecord, FieldOutcome, TranslationOutcome};

/// The duplicator was called without a successful outcome for every mapped field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no successful translation for field '{source_field}' -> '{target_field}'")]
pub struct IncompleteOutcomes {
    pub source_field: String,
    pub target_field: String,
}

/// Build the translated copy of `source`
///
/// Non-mapped fields are copied unchanged and mapped target fields receive the
/// translated text. Entries whose source field is empty keep the copied target
/// text. The new record gets a fresh identifier.
pub fn duplicate_record(
    source: &Record,
    mapping: &FieldMapping,
    outcomes: &[FieldOutcome],
) -> Result<DuplicatedRecord, IncompleteOutcomes> {
    let mut record = Record {
        id: RecordId::generate(),
        fields: source.fields.clone(),
    };

    for entry in mapping.entries() {
        if !source.field(&entry.source).is_some_and(has_text) {
            continue;
        }

        let translated = outcomes
            .iter()
            .find(|o| o.source_field == entry.source && o.target_field == entry.target)
            .and_then(|o| match &o.outcome {
                TranslationOutcome::Success(text) => Some(text),
                TranslationOutcome::Failure { .. } => None,
            })
            .ok_or_else(|| IncompleteOutcomes {
                source_field: entry.source.clone(),
                target_field: entry.target.clone(),
            })?;

        let target = record
            .fields
            .iter_mut()
            .find(|f| f.name == entry.target)
            .ok_or_else(|| IncompleteOutcomes {
                source_field: entry.source.clone(),
                target_field: entry.target.clone(),
            })?;
        target.value = translated.clone();
    }

    Ok(DuplicatedRecord {
        source_id: source.id.clone(),
        record,
    })
}
