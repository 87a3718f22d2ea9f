//! Localized store listing metadata for storemeta.
//!
//! This crate holds the backend-neutral listing model, the locale merger
//! that reconciles records fetched from separate endpoints, and the JSON
//! directory exporter. It performs no network I/O.

pub mod error;
pub mod export;
pub mod merge;
pub mod types;

pub use error::MetadataError;
pub use export::{ExportReport, ExportedFile, MetadataExporter};
pub use merge::{merge_localizations, LocaleMerger};
pub use types::{AppInfoData, AppMetadata, LocalizationMetadata, Platform, VersionData};

/// Result type alias for metadata operations.
pub type Result<T> = std::result::Result<T, MetadataError>;
