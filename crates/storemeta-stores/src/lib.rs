//! Store backends for storemeta
//!
//! This crate reads localized listing metadata from the stores:
//!
//! - **App Store Connect**: an ES256-signed bearer token and a walk over the
//!   app's app-info and live-version localizations
//! - **Google Play**: listings and the production track read inside a draft
//!   edit that is always discarded
//!
//! Both backends implement [`MetadataSource`]; the [`Aggregator`] drives them
//! app by app and records skipped apps instead of failing the batch.
//!
//! ## Usage
//!
//! ```ignore
//! use storemeta_stores::{apple::AppStoreConnectClient, Aggregator};
//!
//! let client = AppStoreConnectClient::new(&config)?;
//! let report = Aggregator::with_exporter(&exporter).run(&client).await?;
//! ```

pub mod aggregator;
pub mod apple;
pub mod config;
pub mod error;
pub mod google_play;
pub mod traits;
pub mod types;

pub use aggregator::{
    Aggregator, BatchReport, ProcessedApp, RunStatus, RunSummary, SkipCause, SkippedApp,
};
pub use error::{Result, StoreError};
pub use traits::MetadataSource;
pub use types::{AppRef, Platform};
