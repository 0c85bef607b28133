use anyhow::{Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::Config;
use crate::database::DatabaseConnection;
use crate::document::{DocumentId, SourceDocument};
use crate::errors::ConfigurationError;
use crate::file_utils::FileManager;
use crate::pipeline::{BatchHandle, BatchOptions, BatchOrchestrator, BatchResult, JobState, ProgressEvent};
use crate::providers::{self, TranslationProvider};
use crate::translation::{ProviderProfile, TranslationCache};

// @module: Application controller for document translation

/// File receiving failed segments and documents, in the output directory
pub const ISSUES_LOG_FILE: &str = "doctrans.issues.log";

/// Main application controller for document translation
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cache for this run: in memory, or backed by the SQLite cache file
    pub fn build_cache(&self) -> Result<TranslationCache> {
        let cache_config = &self.config.cache;
        if !cache_config.enabled || !cache_config.persistent {
            return Ok(TranslationCache::new(cache_config.enabled));
        }

        let db = match &cache_config.path {
            Some(path) => DatabaseConnection::new(path)?,
            None => DatabaseConnection::new_default()?,
        };
        info!("Using persistent translation cache at {:?}", db.path());
        TranslationCache::persistent(db)
    }

    /// Check provider credentials before any job starts
    pub async fn check_provider(&self, provider: &dyn TranslationProvider) -> Result<(), ConfigurationError> {
        provider
            .test_connection()
            .await
            .map_err(|e| ConfigurationError::InvalidCredentials {
                provider: self.config.translation.provider.display_name().to_string(),
                message: e.to_string(),
            })
    }

    /// Translate every document found in `inputs` with the configured provider
    pub async fn run(&self, inputs: &[PathBuf]) -> Result<BatchResult> {
        let provider = providers::build_provider(&self.config)?;
        self.check_provider(provider.as_ref()).await?;
        self.run_with_provider(inputs, provider).await
    }

    /// Translate every document found in `inputs` with `provider`
    pub async fn run_with_provider(&self, inputs: &[PathBuf], provider: Arc<dyn TranslationProvider>) -> Result<BatchResult> {
        let start_time = std::time::Instant::now();

        let files = FileManager::collect_inputs(inputs)?;
        if files.is_empty() {
            warn!("No supported documents found in {:?}", inputs);
        }

        let mut documents = Vec::with_capacity(files.len());
        for file in files {
            let document = SourceDocument::from_path(&file)
                .with_context(|| format!("Unsupported input {:?}", file))?
                .with_source_language(&self.config.source_language);
            documents.push(document);
        }

        let translation = &self.config.translation;
        let resolved = translation.resolved_provider();
        let profile = ProviderProfile::for_provider(translation.provider)
            .with_overrides(Some(resolved.concurrent_requests), resolved.rate_limit);

        let mut options = BatchOptions::new(
            &self.config.target_language,
            self.config.domain,
            provider,
            self.config.output.mode,
        )
        .with_provider_profile(profile);
        if let Some(dir) = &self.config.output.directory {
            FileManager::ensure_dir(dir)?;
            options = options.with_output_dir(dir);
        }

        let orchestrator = BatchOrchestrator::new(self.config.clone()).with_cache(self.build_cache()?);
        let handle = orchestrator.submit_batch(documents, options)?;

        Self::follow_progress(&handle).await;
        let result = handle.wait().await?;

        self.write_issues_log(&result, inputs)?;
        self.log_summary(&result, start_time.elapsed());
        Ok(result)
    }

    /// Render progress bars until the batch ends; Ctrl-C cancels the batch
    async fn follow_progress(handle: &BatchHandle) {
        let multi_progress = MultiProgress::new();
        let mut subscription = handle.subscribe();
        let mut bars: HashMap<DocumentId, ProgressBar> = HashMap::new();

        let overall = multi_progress.add(ProgressBar::new(0));
        overall.set_style(Self::bar_style("documents"));

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut interrupted = false;

        loop {
            tokio::select! {
                event = subscription.next() => {
                    let Some(event) = event else { break };
                    Self::render_event(&multi_progress, &overall, &mut bars, &event);
                }
                _ = &mut ctrl_c, if !interrupted => {
                    interrupted = true;
                    warn!("Interrupted, cancelling remaining documents...");
                    handle.cancel();
                }
            }
        }

        overall.finish();
    }

    fn render_event(
        multi_progress: &MultiProgress,
        overall: &ProgressBar,
        bars: &mut HashMap<DocumentId, ProgressBar>,
        event: &ProgressEvent,
    ) {
        overall.set_length(event.batch.documents_total as u64);
        overall.set_position(event.batch.documents_finished as u64);
        overall.set_message(format!(
            "{} translated, {} failed",
            event.batch.segments.translated, event.batch.segments.failed
        ));

        let bar = bars.entry(event.document_id).or_insert_with(|| {
            let bar = multi_progress.add(ProgressBar::new(0));
            bar.set_style(Self::bar_style("segments"));
            bar.set_prefix(event.document_name.clone());
            bar
        });

        bar.set_length(event.total as u64);
        bar.set_position((event.translated + event.failed + event.skipped) as u64);
        if event.state.is_terminal() {
            bar.finish_with_message(event.state.to_string());
        } else {
            bar.set_message(event.state.to_string());
        }
    }

    fn bar_style(unit: &str) -> ProgressStyle {
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} {{prefix:20}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}}",
                unit
            ))
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░")
    }

    /// Directory that receives the issues log
    fn issues_dir(&self, inputs: &[PathBuf]) -> PathBuf {
        if let Some(dir) = &self.config.output.directory {
            return dir.clone();
        }
        inputs
            .first()
            .map(|input| {
                if input.is_dir() {
                    input.clone()
                } else {
                    input.parent().map(Path::to_path_buf).unwrap_or_default()
                }
            })
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Append every failed segment and failed document to the issues log
    fn write_issues_log(&self, result: &BatchResult, inputs: &[PathBuf]) -> Result<()> {
        let has_issues = result.documents.iter().any(|d| d.error.is_some() || !d.failed_segments.is_empty());
        if !has_issues {
            return Ok(());
        }

        let log_path = self.issues_dir(inputs).join(ISSUES_LOG_FILE);
        for document in &result.documents {
            if let Some(message) = &document.error {
                FileManager::append_to_log_file(
                    &log_path,
                    &format!("{} [{}] {}", document.source_path.display(), document.state, message),
                )?;
            }
            for segment in &document.failed_segments {
                FileManager::append_to_log_file(
                    &log_path,
                    &format!(
                        "{} #{} ({}): {}",
                        document.source_path.display(),
                        segment.index,
                        segment.location,
                        segment.reason
                    ),
                )?;
            }
        }

        warn!("Issues written to {:?}", log_path);
        Ok(())
    }

    fn log_summary(&self, result: &BatchResult, duration: std::time::Duration) {
        for document in &result.documents {
            match document.state {
                JobState::Completed | JobState::CompletedWithErrors => {
                    if let Some(path) = &document.output_path {
                        info!("Success: {}", path.display());
                    }
                }
                JobState::Failed => error!(
                    "Failed: {} ({})",
                    document.source_path.display(),
                    document.error.as_deref().unwrap_or("unknown error")
                ),
                _ => warn!("Not finished: {} ({})", document.source_path.display(), document.state),
            }
        }

        debug!(
            "Cache: {} hits, {} misses ({:.0}% hit rate)",
            result.cache.hits,
            result.cache.misses,
            result.cache.hit_rate * 100.0
        );
        info!(
            "Translated {} segments in {} documents ({} failed, {} skipped) in {}",
            result.progress.segments.translated,
            result.documents.len(),
            result.progress.segments.failed,
            result.progress.segments.skipped,
            Self::format_duration(duration)
        );
    }

    // Format duration in a human-readable format
    pub fn format_duration(duration: std::time::Duration) -> String {
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
