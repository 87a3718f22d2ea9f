//! Per-app orchestration over a [`MetadataSource`].
//!
//! Apps are processed one after another. A failure while reading or
//! exporting one app is recorded and the batch moves on. Failing to list the
//! apps, or a credential failure on any app, ends a source's run.

use serde::Serialize;
use tracing::{info, warn};

use storemeta_metadata::{AppMetadata, ExportReport, MetadataExporter};

use crate::error::{Result, StoreError};
use crate::traits::MetadataSource;
use crate::types::{AppRef, Platform};

/// An app read (and possibly exported) successfully.
#[derive(Debug, Clone)]
pub struct ProcessedApp {
    pub metadata: AppMetadata,
    /// Present when an exporter was attached
    pub export: Option<ExportReport>,
}

/// What kind of failure left an app out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipCause {
    /// A request to the store failed
    BackendRequest,
    /// The metadata was read but could not be exported
    Export,
    Other,
}

impl SkipCause {
    pub fn of(error: &StoreError) -> Self {
        if error.is_backend_request() {
            SkipCause::BackendRequest
        } else if matches!(error, StoreError::Metadata(_)) {
            SkipCause::Export
        } else {
            SkipCause::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SkipCause::BackendRequest => "backendRequest",
            SkipCause::Export => "export",
            SkipCause::Other => "other",
        }
    }
}

/// An app left out of the batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedApp {
    pub app: AppRef,
    pub cause: SkipCause,
    pub reason: String,
}

/// Outcome of running one source.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub platform: Platform,
    pub processed: Vec<ProcessedApp>,
    pub skipped: Vec<SkippedApp>,
}

impl BatchReport {
    fn new(platform: Platform) -> Self {
        Self {
            platform,
            processed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.processed.len() + self.skipped.len()
    }
}

/// Runs sources app by app, optionally exporting each result.
pub struct Aggregator<'a> {
    exporter: Option<&'a MetadataExporter>,
}

impl<'a> Aggregator<'a> {
    /// An aggregator that only reads.
    pub fn new() -> Self {
        Self { exporter: None }
    }

    /// An aggregator that exports every app it reads.
    pub fn with_exporter(exporter: &'a MetadataExporter) -> Self {
        Self {
            exporter: Some(exporter),
        }
    }

    /// Process every app the source lists.
    ///
    /// Returns an error when the app list cannot be read or when any app
    /// fails on credentials, which would fail every remaining app too.
    pub async fn run(&self, source: &dyn MetadataSource) -> Result<BatchReport> {
        let platform = source.platform();
        let apps = source.list_apps().await?;
        info!("Processing {} app(s) from {}", apps.len(), platform);

        let mut report = BatchReport::new(platform);

        for app in apps {
            match self.process(source, &app).await {
                Ok(processed) => report.processed.push(processed),
                Err(e) if e.is_credential() => {
                    warn!("Stopping {} at {}: {}", platform, app, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!("Skipping {} on {}: {}", app, platform, e);
                    report.skipped.push(SkippedApp {
                        app,
                        cause: SkipCause::of(&e),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "{}: {} processed, {} skipped",
            platform,
            report.processed.len(),
            report.skipped.len()
        );

        Ok(report)
    }

    async fn process(&self, source: &dyn MetadataSource, app: &AppRef) -> Result<ProcessedApp> {
        info!("Processing {}", app);
        let metadata = source.fetch_app_metadata(app).await?;

        let export = match self.exporter {
            Some(exporter) => Some(exporter.export(source.platform(), &metadata).await?),
            None => None,
        };

        Ok(ProcessedApp { metadata, export })
    }
}

impl Default for Aggregator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// How a whole run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every listed app was processed
    Complete,
    /// Some apps or backends were skipped
    Partial,
    /// Nothing was processed
    Empty,
}

/// Totals across every backend of a run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: Vec<(Platform, SkippedApp)>,
    /// Backends that could not start or list their apps, with the reason
    pub failed_backends: Vec<(Platform, String)>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one backend's outcome.
    pub fn record(&mut self, platform: Platform, outcome: Result<BatchReport>) {
        match outcome {
            Ok(report) => {
                self.processed += report.processed.len();
                self.skipped
                    .extend(report.skipped.into_iter().map(|skip| (platform, skip)));
            }
            Err(e) => self.record_failure(platform, &e),
        }
    }

    /// Record a backend that never got to process any app.
    pub fn record_failure(&mut self, platform: Platform, error: &StoreError) {
        warn!("{} skipped: {}", platform, error);
        self.failed_backends.push((platform, error.to_string()));
    }

    pub fn status(&self) -> RunStatus {
        let incomplete = !self.skipped.is_empty() || !self.failed_backends.is_empty();
        match (self.processed, incomplete) {
            (0, _) => RunStatus::Empty,
            (_, true) => RunStatus::Partial,
            (_, false) => RunStatus::Complete,
        }
    }
}
