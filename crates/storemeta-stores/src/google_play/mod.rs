//! Google Play Store integration
//!
//! Reads store listings through the Google Play Developer API. The API has
//! no read-only view of listing data, so every read happens inside a draft
//! edit that is discarded afterwards (see [`session`]).
//!
//! ## Authentication
//!
//! Uses a Google Cloud service account with Google Play Developer API access,
//! or an access token issued elsewhere.

pub mod session;

use chrono::{Duration, Utc};
use reqwest::{Client, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, warn};

use storemeta_metadata::AppMetadata;

use crate::config::{GooglePlayConfig, GooglePlayCredentials};
use crate::error::{Result, StoreError};
use crate::traits::MetadataSource;
use crate::types::{AppRef, Platform};

pub use session::{
    read_app_metadata, EditSession, EditsApi, Listing, SessionState, Track, TrackRelease,
    PRODUCTION_TRACK,
};

/// Base URL for the Android Publisher API v3.
pub const API_BASE_URL: &str = "https://androidpublisher.googleapis.com/androidpublisher/v3";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SCOPE: &str = "https://www.googleapis.com/auth/androidpublisher";

/// Default retry delay in seconds.
const RETRY_DELAY_SECS: u64 = 1;

/// Maximum number of retries for rate-limited requests.
const MAX_RETRIES: u32 = 3;

/// Google service account credentials
#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: Option<String>,
}

/// OAuth token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Token cache for thread-safe access
#[derive(Debug, Default)]
struct TokenCache {
    access_token: Option<String>,
    expires_at: Option<chrono::DateTime<Utc>>,
}

enum Auth {
    ServiceAccount {
        client_email: String,
        token_url: String,
        encoding_key: jsonwebtoken::EncodingKey,
        cache: Arc<RwLock<TokenCache>>,
    },
    Token(String),
}

/// Google Play Developer API client
pub struct GooglePlayClient {
    /// HTTP client
    client: Client,

    /// API root, without trailing slash
    base_url: String,

    auth: Auth,
}

impl GooglePlayClient {
    /// Create a new client.
    ///
    /// A malformed service-account document or private key is a
    /// [`StoreError::Credential`].
    pub fn new(credentials: &GooglePlayCredentials) -> Result<Self> {
        let auth = match credentials {
            GooglePlayCredentials::ServiceAccountJson(json) => {
                let key: ServiceAccountKey = serde_json::from_str(json).map_err(|e| {
                    StoreError::Credential(format!("Invalid service account key: {}", e))
                })?;

                let encoding_key = jsonwebtoken::EncodingKey::from_rsa_pem(
                    key.private_key.as_bytes(),
                )
                .map_err(|e| {
                    StoreError::Credential(format!("Invalid service account private key: {}", e))
                })?;

                debug!("Using service account {}", key.client_email);

                Auth::ServiceAccount {
                    client_email: key.client_email,
                    token_url: key.token_uri.unwrap_or_else(|| TOKEN_URL.to_string()),
                    encoding_key,
                    cache: Arc::new(RwLock::new(TokenCache::default())),
                }
            }
            GooglePlayCredentials::AccessToken(token) => Auth::Token(token.clone()),
        };

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: API_BASE_URL.to_string(),
            auth,
        })
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Get or refresh OAuth2 access token
    async fn get_access_token(&self) -> Result<String> {
        let (client_email, token_url, encoding_key, cache) = match &self.auth {
            Auth::Token(token) => return Ok(token.clone()),
            Auth::ServiceAccount {
                client_email,
                token_url,
                encoding_key,
                cache,
            } => (client_email, token_url, encoding_key, cache),
        };

        // Check if we have a valid cached token
        {
            let cache = cache.read().await;
            if let (Some(token), Some(expires)) = (&cache.access_token, cache.expires_at) {
                if Utc::now() < expires - Duration::minutes(5) {
                    return Ok(token.clone());
                }
            }
        }

        let now = Utc::now();
        let exp = now + Duration::hours(1);

        #[derive(Serialize)]
        struct Claims<'a> {
            iss: &'a str,
            scope: &'a str,
            aud: &'a str,
            iat: i64,
            exp: i64,
        }

        let claims = Claims {
            iss: client_email,
            scope: SCOPE,
            aud: token_url,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let jwt = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256),
            &claims,
            encoding_key,
        )?;

        debug!("Exchanging service account assertion at {}", token_url);

        let response = self
            .client
            .post(token_url)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &jwt),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(StoreError::AuthenticationFailed(error_text));
        }

        let token_response: TokenResponse = response.json().await?;

        {
            let mut cache = cache.write().await;
            cache.access_token = Some(token_response.access_token.clone());
            cache.expires_at = Some(Utc::now() + Duration::seconds(token_response.expires_in));
        }

        Ok(token_response.access_token)
    }

    /// Make an authenticated API request with retry logic.
    async fn api_request(&self, method: Method, endpoint: &str) -> Result<Response> {
        let token = self.get_access_token().await?;
        let url = format!("{}{}", self.base_url, endpoint);
        let mut retries = 0;

        loop {
            debug!("API request: {} {}", method, url);

            let mut request = self
                .client
                .request(method.clone(), &url)
                .header("Authorization", format!("Bearer {}", token));

            if method == Method::POST {
                request = request.json(&serde_json::json!({}));
            }

            let response = request.send().await?;
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

                let wait = retry_after.unwrap_or(RETRY_DELAY_SECS);
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

            return Ok(response);
        }
    }
}

#[async_trait::async_trait]
impl EditsApi for GooglePlayClient {
    async fn insert_edit(&self, package: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct EditResponse {
            id: String,
        }

        let endpoint = format!("/applications/{}/edits", package);
        let response: EditResponse = self.api_request(Method::POST, &endpoint).await?.json().await?;
        Ok(response.id)
    }

    async fn delete_edit(&self, package: &str, edit_id: &str) -> Result<()> {
        let endpoint = format!("/applications/{}/edits/{}", package, edit_id);
        self.api_request(Method::DELETE, &endpoint).await?;
        Ok(())
    }

    async fn list_listings(&self, package: &str, edit_id: &str) -> Result<Vec<Listing>> {
        #[derive(Deserialize)]
        struct ListingsResponse {
            #[serde(default)]
            listings: Vec<Listing>,
        }

        let endpoint = format!("/applications/{}/edits/{}/listings", package, edit_id);
        let response: ListingsResponse =
            self.api_request(Method::GET, &endpoint).await?.json().await?;
        Ok(response.listings)
    }

    async fn get_track(&self, package: &str, edit_id: &str, track: &str) -> Result<Track> {
        let endpoint = format!(
            "/applications/{}/edits/{}/tracks/{}",
            package, edit_id, track
        );

        match self.api_request(Method::GET, &endpoint).await {
            Ok(response) => Ok(response.json().await?),
            Err(StoreError::ApiError { status: 404, .. }) => Err(StoreError::TrackNotFound {
                package: package.to_string(),
                track: track.to_string(),
            }),
            Err(e) => Err(e),
        }
    }
}

/// Google Play as a [`MetadataSource`] over a fixed package list.
pub struct GooglePlayMetadataSource {
    client: Arc<GooglePlayClient>,
    packages: Vec<String>,
}

impl GooglePlayMetadataSource {
    pub fn new(client: GooglePlayClient, packages: Vec<String>) -> Self {
        Self {
            client: Arc::new(client),
            packages,
        }
    }

    /// Build the client from configuration.
    pub fn from_config(config: &GooglePlayConfig) -> Result<Self> {
        let client = GooglePlayClient::new(&config.credentials)?;
        Ok(Self::new(client, config.package_names.clone()))
    }
}

#[async_trait::async_trait]
impl MetadataSource for GooglePlayMetadataSource {
    fn platform(&self) -> Platform {
        Platform::GooglePlay
    }

    async fn list_apps(&self) -> Result<Vec<AppRef>> {
        Ok(self.packages.iter().map(AppRef::package).collect())
    }

    async fn fetch_app_metadata(&self, app: &AppRef) -> Result<AppMetadata> {
        read_app_metadata(Arc::clone(&self.client), &app.bundle_id).await
    }
}
