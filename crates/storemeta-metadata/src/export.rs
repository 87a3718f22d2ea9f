//! Directory-tree JSON export.
//!
//! Layout:
//!
//! ```text
//! <output-dir>/<store>/<bundle-id>/metadata.json
//! <output-dir>/<store>/<bundle-id>/localizations/<locale>.json
//! ```
//!
//! Every export produces an [`ExportReport`] describing each file it wrote
//! (or, in dry-run mode, would have written). The decisions are identical in
//! both modes; only the filesystem side effects differ.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::{AppMetadata, MetadataError, Platform, Result};

const METADATA_FILE: &str = "metadata.json";
const LOCALIZATIONS_DIR: &str = "localizations";

/// Writes [`AppMetadata`] as a tree of pretty-printed JSON files.
#[derive(Debug, Clone)]
pub struct MetadataExporter {
    output_dir: PathBuf,
    dry_run: bool,
}

/// One file the exporter wrote or would write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Outcome of exporting one app.
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    /// Files in write order: `metadata.json` first, then one per locale.
    pub files: Vec<ExportedFile>,
    /// True if nothing was written to disk.
    pub dry_run: bool,
}

impl ExportReport {
    /// Number of locale files in the report.
    pub fn locale_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetadataFile<'a> {
    app_id: &'a str,
    bundle_id: &'a str,
    current_version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version_timestamp: Option<&'a DateTime<Utc>>,
}

impl MetadataExporter {
    /// Creates an exporter rooted at `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            dry_run,
        }
    }

    /// Returns the export root.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Returns true if the exporter never touches the filesystem.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Directory holding one app's files.
    pub fn app_dir(&self, platform: Platform, bundle_id: &str) -> PathBuf {
        self.output_dir.join(platform.dir_name()).join(bundle_id)
    }

    /// Plans the files for one app without writing anything.
    ///
    /// Locales with no non-empty field get no file.
    pub fn plan(&self, platform: Platform, metadata: &AppMetadata) -> Result<Vec<ExportedFile>> {
        validate_path_component("bundle ID", &metadata.bundle_id)?;

        let app_dir = self.app_dir(platform, &metadata.bundle_id);
        let localizations_dir = app_dir.join(LOCALIZATIONS_DIR);

        let summary = MetadataFile {
            app_id: &metadata.app_id,
            bundle_id: &metadata.bundle_id,
            current_version: metadata.current_version.as_deref(),
            version_timestamp: metadata.version_timestamp.as_ref(),
        };

        let mut files = Vec::with_capacity(metadata.localizations.len() + 1);
        files.push(ExportedFile {
            path: app_dir.join(METADATA_FILE),
            contents: serde_json::to_string_pretty(&summary)?,
        });

        for localization in &metadata.localizations {
            if localization.is_empty() {
                debug!("Skipping blank locale {}", localization.locale);
                continue;
            }
            validate_path_component("locale", &localization.locale)?;
            files.push(ExportedFile {
                path: localizations_dir.join(format!("{}.json", localization.locale)),
                contents: serde_json::to_string_pretty(localization)?,
            });
        }

        Ok(files)
    }

    /// Exports one app, returning the files written (or planned, in dry-run).
    pub async fn export(&self, platform: Platform, metadata: &AppMetadata) -> Result<ExportReport> {
        let files = self.plan(platform, metadata)?;

        if self.dry_run {
            for file in &files {
                info!("[DRY RUN] Would write: {}", file.path.display());
            }
        } else {
            let localizations_dir = self
                .app_dir(platform, &metadata.bundle_id)
                .join(LOCALIZATIONS_DIR);
            fs::create_dir_all(&localizations_dir).await?;

            for file in &files {
                fs::write(&file.path, &file.contents)
                    .await
                    .map_err(|source| MetadataError::Write {
                        path: file.path.clone(),
                        source,
                    })?;
                debug!("Wrote {}", file.path.display());
            }
        }

        Ok(ExportReport {
            files,
            dry_run: self.dry_run,
        })
    }
}

/// Rejects values that would escape their directory when used as a path segment.
fn validate_path_component(kind: &str, value: &str) -> Result<()> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains('/')
        || value.contains('\\')
    {
        return Err(MetadataError::InvalidFormat(format!(
            "Invalid {} for export path: {:?}",
            kind, value
        )));
    }
    Ok(())
}
