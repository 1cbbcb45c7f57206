use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::app_config::Config;
use crate::language_utils;
use crate::providers::ProviderRegistry;
use crate::records::{Record, RecordId};
use crate::translation::{BatchOrchestrator, BatchReport, BatchStats, CancellationHandle, RecordResult};

// @module: Application controller for note batch translation

/// One line of the output file, in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum OutputEntry {
    /// The note was translated; `record` is the new note to persist
    Duplicated { source_id: RecordId, record: Record },
    /// The note was left alone
    Skipped { source_id: RecordId, reasons: Vec<String> },
}

/// Content written to the output file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFile {
    pub provider: String,
    pub model: String,
    pub source_language: String,
    pub target_language: String,
    pub stats: BatchStats,
    pub records: Vec<OutputEntry>,
}

/// Main application controller for note translation
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read the notes to translate from a JSON array of records
    pub fn read_records(path: &Path) -> Result<Vec<Record>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read records file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse records file: {}", path.display()))
    }

    /// Default output file: `<stem>.<target language code>.json` next to the input
    pub fn output_path_for(input_file: &Path, target_language: &str) -> PathBuf {
        let stem = input_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "notes".to_string());
        let code = language_utils::file_code(target_language);
        input_file.with_file_name(format!("{}.{}.json", stem, code))
    }

    /// Run the main workflow with the providers built from the configuration
    pub async fn run(&self, input_file: &Path, output_file: Option<PathBuf>) -> Result<BatchReport> {
        let registry = ProviderRegistry::from_config(&self.config)?;
        self.run_with_registry(registry, input_file, output_file).await
    }

    /// Run the workflow against an explicit provider registry
    pub async fn run_with_registry(
        &self,
        registry: ProviderRegistry,
        input_file: &Path,
        output_file: Option<PathBuf>,
    ) -> Result<BatchReport> {
        let start_time = Instant::now();
        let records = Self::read_records(input_file)?;
        let mapping = self.config.field_mapping();
        let translation_config = self.config.resolve()?;

        if records.is_empty() {
            warn!("No records found in {}", input_file.display());
        }
        if language_utils::same_language(
            &translation_config.source_language,
            &translation_config.target_language,
        ) {
            warn!(
                "Source and target language are both {}",
                language_utils::display_name(&translation_config.target_language)
            );
        }

        info!(
            "notewai: {} - {} | {} -> {} | {} notes",
            translation_config.provider.display_name(),
            translation_config.model,
            language_utils::display_name(&translation_config.source_language),
            language_utils::display_name(&translation_config.target_language),
            records.len()
        );

        let progress_bar = ProgressBar::new(records.len() as u64);
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} notes ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));

        let bar = progress_bar.clone();
        let orchestrator = BatchOrchestrator::new(registry).with_progress(move |_, state| {
            if state.is_terminal() {
                bar.inc(1);
            }
        });

        // Ctrl-C cancels the batch; unresolved notes are reported as skipped
        let cancel = CancellationHandle::new();
        let signal_handle = cancel.clone();
        let signal_task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling outstanding translations");
                signal_handle.cancel();
            }
        });

        let result = orchestrator
            .run_with_cancel(&records, &mapping, &translation_config, &cancel)
            .await;
        signal_task.abort();
        progress_bar.finish_and_clear();
        let report = result?;

        let output_path = output_file.unwrap_or_else(|| {
            Self::output_path_for(input_file, &translation_config.target_language)
        });
        let output = OutputFile {
            provider: translation_config.provider.to_string(),
            model: translation_config.model.clone(),
            source_language: translation_config.source_language.clone(),
            target_language: translation_config.target_language.clone(),
            stats: report.stats,
            records: Self::output_entries(&records, &report),
        };
        Self::write_output(&output_path, &output)?;

        Self::log_summary(&records, &report);
        info!(
            "Finished in {}. Output: {}",
            Self::format_duration(start_time.elapsed()),
            output_path.display()
        );

        Ok(report)
    }

    /// Check that the active provider accepts the configured key and model
    pub async fn check_connection(&self) -> Result<()> {
        let registry = ProviderRegistry::from_config(&self.config)?;
        let kind = self.config.translation.provider;
        let provider = registry
            .get(kind)
            .ok_or_else(|| anyhow!("No API key configured for {}", kind.display_name()))?;
        let model = self.config.translation.get_model();

        provider
            .test_connection(&model)
            .await
            .with_context(|| format!("{} connection test failed", kind.display_name()))?;
        info!("{} ({}) is reachable", kind.display_name(), model);
        Ok(())
    }

    /// Pair each result with the id of the note it came from
    pub fn output_entries(records: &[Record], report: &BatchReport) -> Vec<OutputEntry> {
        records
            .iter()
            .zip(&report.results)
            .map(|(source, result)| match result {
                RecordResult::Duplicated(duplicate) => OutputEntry::Duplicated {
                    source_id: duplicate.source_id.clone(),
                    record: duplicate.record.clone(),
                },
                RecordResult::Skipped(reasons) => OutputEntry::Skipped {
                    source_id: source.id.clone(),
                    reasons: reasons.iter().map(|r| r.to_string()).collect(),
                },
            })
            .collect()
    }

    /// Write the output file as pretty-printed JSON
    pub fn write_output(path: &Path, output: &OutputFile) -> Result<()> {
        let json = serde_json::to_string_pretty(output).context("Failed to serialize output")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write output file: {}", path.display()))
    }

    fn log_summary(records: &[Record], report: &BatchReport) {
        info!(
            "{} duplicated, {} skipped, {} retries",
            report.stats.succeeded, report.stats.skipped, report.stats.retries
        );
        for (source, result) in records.iter().zip(&report.results) {
            if let RecordResult::Skipped(reasons) = result {
                let reasons: Vec<String> = reasons.iter().map(|r| r.to_string()).collect();
                error!("Skipped note {}: {}", source.id, reasons.join("; "));
            }
        }
    }

    // Format duration in a human-readable format
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
