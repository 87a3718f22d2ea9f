//! Export command

use clap::Args;
use console::style;
use std::path::{Path, PathBuf};
use tracing::debug;

use storemeta_metadata::{ExportReport, MetadataExporter};
use storemeta_stores::apple::AppStoreConnectClient;
use storemeta_stores::config::{
    is_usable, resolve_package_names, resolve_secret, AppStoreConnectConfig, GooglePlayConfig,
    GooglePlayCredentials, DEFAULT_PACKAGE_NAMES_FILE,
};
use storemeta_stores::google_play::GooglePlayMetadataSource;
use storemeta_stores::{
    Aggregator, BatchReport, MetadataSource, Platform, RunStatus, RunSummary, StoreError,
};

use crate::cli::output;
use crate::cli::{Cli, OutputFormat};
use crate::exit_codes;

/// Export listing metadata as a tree of JSON files
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// App Store Connect issuer ID
    #[arg(long, env = "ASC_ISSUER_ID")]
    pub asc_issuer_id: Option<String>,

    /// App Store Connect API key ID
    #[arg(long, env = "ASC_KEY_ID")]
    pub asc_key_id: Option<String>,

    /// Path to the App Store Connect .p8 private key
    #[arg(long, value_name = "PATH")]
    pub asc_private_key_file: Option<PathBuf>,

    /// App Store Connect private key content (base64 or PEM)
    #[arg(long, env = "ASC_PRIVATE_KEY", hide_env_values = true)]
    pub asc_private_key: Option<String>,

    /// Path to a Google Play service account JSON key
    #[arg(long, value_name = "PATH")]
    pub gp_service_account_file: Option<PathBuf>,

    /// Google Play service account JSON content
    #[arg(long, env = "GP_SERVICE_ACCOUNT", hide_env_values = true)]
    pub gp_service_account: Option<String>,

    /// Pre-issued Google Play OAuth2 access token
    #[arg(long, env = "GP_ACCESS_TOKEN", hide_env_values = true)]
    pub gp_access_token: Option<String>,

    /// Comma-separated Google Play package names
    #[arg(long, env = "GP_PACKAGE_NAMES")]
    pub gp_package_names: Option<String>,

    /// File with one Google Play package name per line
    #[arg(long, env = "GP_PACKAGE_NAMES_FILE")]
    pub gp_package_names_file: Option<String>,

    /// Root directory of the export
    #[arg(short, long, env = "OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Report what would be written without touching the filesystem
    #[arg(long)]
    pub dry_run: bool,
}

impl ExportCommand {
    /// Execute the export command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        let app_store = self.enabled(Platform::AppStore, self.app_store_config());
        let google_play = self.enabled(Platform::GooglePlay, self.google_play_config());

        if app_store.is_none() && google_play.is_none() {
            output::error("No usable store credentials were supplied");
            eprintln!();
            eprintln!("Configure at least one backend:");
            eprintln!(
                "  App Store Connect: ASC_ISSUER_ID, ASC_KEY_ID and ASC_PRIVATE_KEY \
                 (or --asc-private-key-file)"
            );
            eprintln!(
                "  Google Play:       GP_SERVICE_ACCOUNT (or --gp-service-account-file) \
                 and GP_PACKAGE_NAMES"
            );
            eprintln!(
                "                     (or GP_PACKAGE_NAMES_FILE, or {})",
                DEFAULT_PACKAGE_NAMES_FILE
            );
            return Ok(exit_codes::CONFIG_ERROR);
        }

        let rt = tokio::runtime::Runtime::new()?;
        let summary = rt.block_on(self.run(cli, app_store, google_play))?;

        self.print_summary(cli, &summary)?;
        Ok(exit_codes::SUCCESS)
    }

    fn enabled<T>(
        &self,
        platform: Platform,
        config: storemeta_stores::Result<Option<T>>,
    ) -> Option<T> {
        match config {
            Ok(Some(config)) => Some(config),
            Ok(None) => {
                debug!("{} not configured", platform);
                None
            }
            Err(e) => {
                output::error(&format!("{}: {}", platform, e));
                None
            }
        }
    }

    /// App Store Connect settings, when issuer, key ID and a key are usable.
    fn app_store_config(&self) -> storemeta_stores::Result<Option<AppStoreConnectConfig>> {
        let issuer_id = self.asc_issuer_id.as_deref();
        let key_id = self.asc_key_id.as_deref();
        if !is_usable(issuer_id) || !is_usable(key_id) {
            return Ok(None);
        }

        let private_key = resolve_secret(
            self.asc_private_key_file.as_deref(),
            self.asc_private_key.as_deref(),
        )?;

        Ok(private_key.map(|private_key| AppStoreConnectConfig {
            issuer_id: issuer_id.unwrap_or_default().trim().to_string(),
            key_id: key_id.unwrap_or_default().trim().to_string(),
            private_key,
        }))
    }

    /// Google Play settings, when credentials and at least one package are available.
    fn google_play_config(&self) -> storemeta_stores::Result<Option<GooglePlayConfig>> {
        let credentials = match resolve_secret(
            self.gp_service_account_file.as_deref(),
            self.gp_service_account.as_deref(),
        )? {
            Some(json) => GooglePlayCredentials::ServiceAccountJson(json),
            None if is_usable(self.gp_access_token.as_deref()) => {
                let token = self.gp_access_token.as_deref().unwrap_or_default();
                GooglePlayCredentials::AccessToken(token.trim().to_string())
            }
            None => return Ok(None),
        };

        let package_names = resolve_package_names(
            self.gp_package_names.as_deref(),
            self.gp_package_names_file.as_deref(),
            Path::new(DEFAULT_PACKAGE_NAMES_FILE),
        )?;

        if package_names.is_empty() {
            output::warning("Google Play credentials found but no package names configured");
            return Ok(None);
        }

        Ok(Some(GooglePlayConfig {
            credentials,
            package_names,
        }))
    }

    async fn run(
        &self,
        cli: &Cli,
        app_store: Option<AppStoreConnectConfig>,
        google_play: Option<GooglePlayConfig>,
    ) -> anyhow::Result<RunSummary> {
        let exporter = MetadataExporter::new(&self.output_dir, self.dry_run);
        let aggregator = Aggregator::with_exporter(&exporter);
        let mut summary = RunSummary::new();

        if !cli.quiet && cli.format == OutputFormat::Text {
            let mode = if exporter.is_dry_run() { " (dry run)" } else { "" };
            output::info(&format!(
                "Exporting metadata to {}{}",
                output::path(exporter.output_dir()),
                mode
            ));
        }

        if let Some(config) = app_store {
            let source = AppStoreConnectClient::new(&config)
                .map(|client| Box::new(client) as Box<dyn MetadataSource>);
            self.run_source(cli, &aggregator, &mut summary, Platform::AppStore, source)
                .await;
        }

        if let Some(config) = google_play {
            let source = GooglePlayMetadataSource::from_config(&config)
                .map(|source| Box::new(source) as Box<dyn MetadataSource>);
            self.run_source(cli, &aggregator, &mut summary, Platform::GooglePlay, source)
                .await;
        }

        Ok(summary)
    }

    async fn run_source(
        &self,
        cli: &Cli,
        aggregator: &Aggregator<'_>,
        summary: &mut RunSummary,
        platform: Platform,
        source: storemeta_stores::Result<Box<dyn MetadataSource>>,
    ) {
        let text = !cli.quiet && cli.format == OutputFormat::Text;
        if text {
            println!();
            println!("{}", output::header(&platform.to_string()));
        }

        let source = match source {
            Ok(source) => source,
            Err(e) => {
                self.report_backend_failure(platform, &e);
                summary.record_failure(platform, &e);
                return;
            }
        };

        let outcome = aggregator.run(source.as_ref()).await;
        match &outcome {
            Ok(report) if text => self.print_batch(cli, report),
            Ok(_) => {}
            Err(e) => self.report_backend_failure(platform, e),
        }
        summary.record(platform, outcome);
    }

    fn report_backend_failure(&self, platform: Platform, error: &StoreError) {
        output::error(&format!("Skipping {}: {}", platform, error));
    }

    fn print_batch(&self, cli: &Cli, report: &BatchReport) {
        for app in &report.processed {
            let locales = app.metadata.localizations.len();
            let version = app.metadata.current_version.as_deref().unwrap_or("no live version");
            output::success(&format!(
                "{} ({} locale{}, {})",
                app.metadata.bundle_id,
                locales,
                if locales == 1 { "" } else { "s" },
                version
            ));

            if let Some(export) = &app.export {
                self.print_export(cli, export);
            }
        }

        for skipped in &report.skipped {
            output::warning(&format!(
                "Skipped {} ({}): {}",
                skipped.app,
                skipped.cause.as_str(),
                skipped.reason
            ));
        }
    }

    fn print_export(&self, cli: &Cli, export: &ExportReport) {
        for line in dry_run_lines(export, cli.verbose) {
            println!("{}", line);
        }
    }

    fn print_summary(&self, cli: &Cli, summary: &RunSummary) -> anyhow::Result<()> {
        match cli.format {
            OutputFormat::Json => {
                let skipped: Vec<_> = summary
                    .skipped
                    .iter()
                    .map(|(platform, skip)| {
                        serde_json::json!({
                            "platform": platform.dir_name(),
                            "appId": &skip.app.app_id,
                            "bundleId": &skip.app.bundle_id,
                            "cause": skip.cause,
                            "reason": &skip.reason,
                        })
                    })
                    .collect();
                let failed_backends: Vec<_> = summary
                    .failed_backends
                    .iter()
                    .map(|(platform, reason)| {
                        serde_json::json!({ "platform": platform.dir_name(), "reason": reason })
                    })
                    .collect();

                let output = serde_json::json!({
                    "processed": summary.processed,
                    "skipped": skipped,
                    "failedBackends": failed_backends,
                    "dryRun": self.dry_run,
                    "outputDir": self.output_dir.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                if cli.quiet {
                    return Ok(());
                }

                println!();
                let done = format!("Done! Processed {} apps total", summary.processed);
                match summary.status() {
                    RunStatus::Complete => output::success(&done),
                    RunStatus::Partial => {
                        output::success(&done);
                        let skipped = summary.skipped.len();
                        if skipped > 0 {
                            output::warning(&format!("{} app(s) skipped", skipped));
                        }
                        for (platform, _) in &summary.failed_backends {
                            output::warning(&format!("{} was not exported", platform));
                        }
                    }
                    RunStatus::Empty => output::warning(&done),
                }
            }
        }

        Ok(())
    }
}

/// Lines describing a dry-run export; verbose adds each file's JSON.
fn dry_run_lines(export: &ExportReport, verbose: bool) -> Vec<String> {
    if !export.dry_run {
        return Vec::new();
    }

    let mut lines = Vec::new();
    for file in &export.files {
        lines.push(format!(
            "    Would write: {}",
            style(file.path.display()).dim()
        ));
        if verbose {
            lines.extend(file.contents.lines().map(|line| format!("      {}", line)));
        }
    }
    lines
}
