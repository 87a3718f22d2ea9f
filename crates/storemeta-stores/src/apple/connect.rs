//! App Store Connect API integration
//!
//! Reads listing metadata by walking the app's relationships:
//! `appInfos -> appInfoLocalizations` for app-level text, and the
//! `READY_FOR_SALE` app store version `-> appStoreVersionLocalizations` for
//! release text. Every collection is followed through `links.next` until
//! exhausted.

use chrono::{DateTime, FixedOffset, Utc};
use reqwest::{Client, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use storemeta_metadata::{AppInfoData, AppMetadata, LocaleMerger, VersionData};

use super::credentials::{BearerToken, CredentialMinter};
use crate::config::AppStoreConnectConfig;
use crate::error::{Result, StoreError};
use crate::traits::MetadataSource;
use crate::types::{AppRef, Platform};

/// Base URL for App Store Connect API v1.
pub const API_BASE_URL: &str = "https://api.appstoreconnect.apple.com/v1";

/// Store state of the version currently visible to users.
const READY_FOR_SALE: &str = "READY_FOR_SALE";

/// Page size requested from collection endpoints.
const PAGE_LIMIT: u32 = 200;

/// Default retry delay in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Maximum number of retries for rate-limited requests.
const MAX_RETRIES: u32 = 3;

/// App Store Connect API client
///
/// The bearer token is minted once at construction and is not renewed; a
/// run that outlives the signing window will see its later requests
/// rejected by the API.
pub struct AppStoreConnectClient {
    /// HTTP client
    client: Client,

    /// API root, without trailing slash
    base_url: String,

    /// Token minted at construction
    token: BearerToken,

    /// Set once the expiry warning has been logged
    expiry_reported: AtomicBool,
}

impl AppStoreConnectClient {
    /// Create a new client, minting its bearer token.
    pub fn new(config: &AppStoreConnectConfig) -> Result<Self> {
        let minter = CredentialMinter::new(&config.issuer_id, &config.key_id, &config.private_key)?;
        let token = minter.mint()?;
        debug!(
            "Minted App Store Connect token for key {} (expires {})",
            minter.key_id(),
            token.expires_at()
        );

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: API_BASE_URL.to_string(),
            token,
            expiry_reported: AtomicBool::new(false),
        })
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}{}", self.base_url, endpoint)
        }
    }

    /// Logs the expiry of the token once. Returns true on the call that logged it.
    fn check_token_window(&self, now: DateTime<Utc>) -> bool {
        if !self.token.is_expired_at(now) || self.expiry_reported.swap(true, Ordering::Relaxed) {
            return false;
        }

        warn!(
            "App Store Connect token expired at {}; remaining requests will be rejected",
            self.token.expires_at()
        );
        true
    }

    /// Make an authenticated GET request with retry logic.
    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = self.url_for(endpoint);
        let mut retries = 0;

        loop {
            self.check_token_window(Utc::now());
            debug!("API request: GET {}", url);

            let response = self
                .client
                .get(&url)
                .header("Authorization", format!("Bearer {}", self.token.as_str()))
                .send()
                .await?;

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok());

                if retries >= MAX_RETRIES {
                    return Err(StoreError::RateLimited { retry_after });
                }

                let wait = retry_after.unwrap_or(RETRY_DELAY_MS / 1000);
                warn!(
                    "Rate limited, waiting {} seconds before retry ({}/{})",
                    wait,
                    retries + 1,
                    MAX_RETRIES
                );

                sleep(std::time::Duration::from_secs(wait)).await;
                retries += 1;
                continue;
            }

            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                return Err(StoreError::ApiError {
                    status: status.as_u16(),
                    message: error_text,
                });
            }

            return Ok(response.json().await?);
        }
    }

    /// Fetch every page of a collection endpoint.
    async fn get_all<A>(&self, endpoint: &str) -> Result<Vec<Resource<A>>>
    where
        A: DeserializeOwned + Default,
    {
        let mut items = Vec::new();
        let mut next = Some(endpoint.to_string());
        let mut pages = 0;

        while let Some(endpoint) = next.take() {
            let page: Page<A> = self.get_json(&endpoint).await?;
            pages += 1;
            items.extend(page.data);
            next = page.links.and_then(|links| links.next);
        }

        debug!(
            "Fetched {} item(s) in {} page(s) from {}",
            items.len(),
            pages,
            endpoint
        );
        Ok(items)
    }

    /// List every app visible to the API key.
    pub async fn list_apps(&self) -> Result<Vec<AppRef>> {
        let endpoint = format!("/apps?limit={}", PAGE_LIMIT);
        let apps: Vec<Resource<AppAttributes>> = self.get_all(&endpoint).await?;

        Ok(apps
            .into_iter()
            .map(|app| AppRef::new(app.id, app.attributes.bundle_id))
            .collect())
    }

    async fn app_infos(&self, app_id: &str) -> Result<Vec<Resource<IgnoredAny>>> {
        self.get_all(&format!("/apps/{}/appInfos?limit={}", app_id, PAGE_LIMIT))
            .await
    }

    async fn app_info_localizations(
        &self,
        app_info_id: &str,
    ) -> Result<Vec<Resource<AppInfoLocalizationAttributes>>> {
        self.get_all(&format!(
            "/appInfos/{}/appInfoLocalizations?limit={}",
            app_info_id, PAGE_LIMIT
        ))
        .await
    }

    /// Versions currently in the `READY_FOR_SALE` state, in API order.
    async fn live_versions(&self, app_id: &str) -> Result<Vec<Resource<VersionAttributes>>> {
        self.get_all(&format!(
            "/apps/{}/appStoreVersions?filter[appStoreState]={}&limit={}",
            app_id, READY_FOR_SALE, PAGE_LIMIT
        ))
        .await
    }

    async fn version_localizations(
        &self,
        version_id: &str,
    ) -> Result<Vec<Resource<VersionLocalizationAttributes>>> {
        self.get_all(&format!(
            "/appStoreVersions/{}/appStoreVersionLocalizations?limit={}",
            version_id, PAGE_LIMIT
        ))
        .await
    }

    /// Read the merged listing metadata of one app.
    pub async fn read_app_metadata(&self, app_id: &str, bundle_id: &str) -> Result<AppMetadata> {
        let mut merger = LocaleMerger::new();

        for app_info in self.app_infos(app_id).await? {
            for localization in self.app_info_localizations(&app_info.id).await? {
                let (locale, app_info) = localization.attributes.into_app_info();
                merger.insert_app_info(&locale, app_info);
            }
        }

        let mut metadata = AppMetadata::new(app_id, bundle_id);

        let live_versions = self.live_versions(app_id).await?;
        if live_versions.len() > 1 {
            debug!(
                "{} versions of {} are {}, using the first",
                live_versions.len(),
                bundle_id,
                READY_FOR_SALE
            );
        }

        if let Some(version) = live_versions.into_iter().next() {
            let version_string = version.attributes.version_string;

            for localization in self.version_localizations(&version.id).await? {
                let (locale, data) = localization.attributes.into_version(version_string.clone());
                merger.insert_version(&locale, data);
            }

            metadata.current_version = version_string;
            metadata.version_timestamp = version
                .attributes
                .created_date
                .map(|created| created.with_timezone(&Utc));
        } else {
            debug!("{} has no version {}", bundle_id, READY_FOR_SALE);
        }

        metadata.localizations = merger.into_localizations();

        info!(
            "Read {} locale(s) for {} (version {})",
            metadata.localizations.len(),
            bundle_id,
            metadata.current_version.as_deref().unwrap_or("none")
        );

        Ok(metadata)
    }
}

#[async_trait::async_trait]
impl MetadataSource for AppStoreConnectClient {
    fn platform(&self) -> Platform {
        Platform::AppStore
    }

    async fn list_apps(&self) -> Result<Vec<AppRef>> {
        AppStoreConnectClient::list_apps(self).await
    }

    async fn fetch_app_metadata(&self, app: &AppRef) -> Result<AppMetadata> {
        self.read_app_metadata(&app.app_id, &app.bundle_id).await
    }
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "A: Deserialize<'de> + Default"))]
struct Page<A> {
    data: Vec<Resource<A>>,
    #[serde(default)]
    links: Option<PageLinks>,
}

#[derive(Debug, Deserialize)]
struct PageLinks {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Resource<A> {
    id: String,
    #[serde(default)]
    attributes: A,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppAttributes {
    #[serde(default)]
    bundle_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppInfoLocalizationAttributes {
    locale: String,
    name: Option<String>,
    subtitle: Option<String>,
    privacy_policy_url: Option<String>,
    privacy_choices_url: Option<String>,
}

impl AppInfoLocalizationAttributes {
    fn into_app_info(self) -> (String, AppInfoData) {
        let app_info = AppInfoData {
            name: self.name,
            subtitle: self.subtitle,
            privacy_policy_url: self.privacy_policy_url,
            privacy_choices_url: self.privacy_choices_url,
        };
        (self.locale, app_info)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionAttributes {
    version_string: Option<String>,
    created_date: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionLocalizationAttributes {
    locale: String,
    description: Option<String>,
    keywords: Option<String>,
    whats_new: Option<String>,
    promotional_text: Option<String>,
    marketing_url: Option<String>,
    support_url: Option<String>,
}

impl VersionLocalizationAttributes {
    fn into_version(self, version_string: Option<String>) -> (String, VersionData) {
        let version = VersionData {
            version_string,
            description: self.description,
            keywords: self.keywords,
            whats_new: self.whats_new,
            promotional_text: self.promotional_text,
            marketing_url: self.marketing_url,
            support_url: self.support_url,
        };
        (self.locale, version)
    }
}
