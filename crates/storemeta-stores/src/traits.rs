//! Store source traits

use crate::error::Result;
use crate::types::{AppRef, Platform};
use storemeta_metadata::AppMetadata;

/// A store backend that can enumerate apps and read their listing metadata.
///
/// Implementations are read-only with respect to local state and are shared
/// across a sequential per-app loop.
#[async_trait::async_trait]
pub trait MetadataSource: Send + Sync {
    /// The store this source reads from
    fn platform(&self) -> Platform;

    /// List the apps to aggregate
    ///
    /// An error here disables the whole source for the run.
    async fn list_apps(&self) -> Result<Vec<AppRef>>;

    /// Read the complete metadata of one app
    ///
    /// An error here only affects this app.
    async fn fetch_app_metadata(&self, app: &AppRef) -> Result<AppMetadata>;
}
