//! Draft-edit read sessions
//!
//! Google Play only exposes listing and track data inside an edit. An
//! [`EditSession`] opens one, scopes every read to its ID, and deletes it
//! again when closed. [`read_app_metadata`] wraps the whole lifecycle so the
//! delete runs on every path out of the reads, including cancellation.

use serde::Deserialize;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use storemeta_metadata::{merge_localizations, AppInfoData, AppMetadata, VersionData};

use crate::error::{Result, StoreError};

/// Track holding the release currently visible to users.
pub const PRODUCTION_TRACK: &str = "production";

/// A store listing for one language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub language: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub full_description: Option<String>,
}

impl Listing {
    fn app_info(&self) -> AppInfoData {
        AppInfoData {
            name: self.title.clone(),
            subtitle: self.short_description.clone(),
            ..Default::default()
        }
    }

    fn version(&self) -> VersionData {
        VersionData {
            description: self.full_description.clone(),
            ..Default::default()
        }
    }
}

/// A release track and its releases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub track: String,
    #[serde(default)]
    pub releases: Vec<TrackRelease>,
}

/// One release on a track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRelease {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version_codes: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl TrackRelease {
    /// Display name, or the first version code when no name is set.
    pub fn display_version(&self) -> Option<String> {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| self.version_codes.first().map(String::as_str))
            .map(str::to_string)
    }
}

/// The edit operations a read session needs.
#[async_trait::async_trait]
pub trait EditsApi: Send + Sync {
    /// Create a draft edit and return its ID.
    async fn insert_edit(&self, package: &str) -> Result<String>;

    /// Discard a draft edit.
    async fn delete_edit(&self, package: &str, edit_id: &str) -> Result<()>;

    /// List the store listings of every language in the edit.
    async fn list_listings(&self, package: &str, edit_id: &str) -> Result<Vec<Listing>>;

    /// Read one track. A missing track is [`StoreError::TrackNotFound`].
    async fn get_track(&self, package: &str, edit_id: &str, track: &str) -> Result<Track>;
}

/// Lifecycle state of an [`EditSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Opened,
    Reading,
    Closed,
}

/// An open draft edit.
///
/// Reads borrow the session mutably; [`close`](Self::close) consumes it, so
/// a closed session cannot be read from or closed again. A session dropped
/// before it was closed (cancelled or unwinding) schedules the delete on the
/// current Tokio runtime.
pub struct EditSession<A: EditsApi + ?Sized + 'static> {
    api: Arc<A>,
    package: String,
    edit_id: String,
    state: SessionState,
}

impl<A: EditsApi + ?Sized + 'static> EditSession<A> {
    /// Create a draft edit for `package`.
    pub async fn open(api: Arc<A>, package: &str) -> Result<EditSession<A>> {
        let edit_id = api.insert_edit(package).await?;
        debug!("Opened edit {} for {}", edit_id, package);

        Ok(Self {
            api,
            package: package.to_string(),
            edit_id,
            state: SessionState::Opened,
        })
    }

    pub fn edit_id(&self) -> &str {
        &self.edit_id
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Store listings of every language.
    pub async fn listings(&mut self) -> Result<Vec<Listing>> {
        self.state = SessionState::Reading;
        self.api.list_listings(&self.package, &self.edit_id).await
    }

    /// First release on the production track, if any.
    ///
    /// A missing production track means the package was never released and
    /// yields `None`.
    pub async fn production_release(&mut self) -> Result<Option<TrackRelease>> {
        self.state = SessionState::Reading;

        match self
            .api
            .get_track(&self.package, &self.edit_id, PRODUCTION_TRACK)
            .await
        {
            Ok(track) => Ok(track.releases.into_iter().next()),
            Err(StoreError::TrackNotFound { .. }) => {
                debug!("{} has no {} track", self.package, PRODUCTION_TRACK);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Discard the draft edit.
    ///
    /// A failed delete is logged and otherwise ignored.
    pub async fn close(mut self) {
        let outcome = self.api.delete_edit(&self.package, &self.edit_id).await;
        self.state = SessionState::Closed;
        log_close(&self.package, &self.edit_id, outcome);
    }
}

impl<A: EditsApi + ?Sized + 'static> Drop for EditSession<A> {
    fn drop(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }

        let Ok(handle) = Handle::try_current() else {
            warn!(
                "Edit {} for {} dropped outside a runtime and was not deleted",
                self.edit_id, self.package
            );
            return;
        };

        warn!(
            "Edit {} for {} dropped before close, deleting in the background",
            self.edit_id, self.package
        );

        let api = Arc::clone(&self.api);
        let package = std::mem::take(&mut self.package);
        let edit_id = std::mem::take(&mut self.edit_id);
        handle.spawn(async move {
            let outcome = api.delete_edit(&package, &edit_id).await;
            log_close(&package, &edit_id, outcome);
        });
    }
}

fn log_close(package: &str, edit_id: &str, outcome: Result<()>) {
    match outcome {
        Ok(()) => debug!("Closed edit {} for {}", edit_id, package),
        Err(e) => {
            let cleanup = StoreError::SessionCleanup {
                edit_id: edit_id.to_string(),
                message: e.to_string(),
            };
            warn!("{} ({})", cleanup, package);
        }
    }
}

/// Read the listing metadata of one package inside a draft edit.
///
/// The edit is closed whether or not the reads succeed.
pub async fn read_app_metadata<A>(api: Arc<A>, package: &str) -> Result<AppMetadata>
where
    A: EditsApi + ?Sized + 'static,
{
    let mut session = EditSession::open(api, package).await?;
    let result = read_in_session(&mut session).await;
    session.close().await;
    result
}

async fn read_in_session<A>(session: &mut EditSession<A>) -> Result<AppMetadata>
where
    A: EditsApi + ?Sized + 'static,
{
    let listings = session.listings().await?;
    let release = session.production_release().await?;

    let mut metadata = AppMetadata::new(session.package(), session.package());
    metadata.current_version = release.as_ref().and_then(TrackRelease::display_version);
    metadata.localizations = merge_localizations(
        listings.iter().map(|l| (l.language.clone(), l.app_info())),
        listings.iter().map(|l| (l.language.clone(), l.version())),
    );

    info!(
        "Read {} listing(s) for {} (version {})",
        metadata.localizations.len(),
        session.package(),
        metadata.current_version.as_deref().unwrap_or("none")
    );

    Ok(metadata)
}
