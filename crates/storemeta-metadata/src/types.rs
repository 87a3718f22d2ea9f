//! Store listing types shared by both backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The store a piece of metadata was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Apple App Store, read through App Store Connect.
    AppStore,
    /// Google Play, read through the Android Publisher API.
    GooglePlay,
}

impl Platform {
    /// Directory name used for this store in the export tree.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Platform::AppStore => "appstore",
            Platform::GooglePlay => "googleplay",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::AppStore => write!(f, "App Store Connect"),
            Platform::GooglePlay => write!(f, "Google Play"),
        }
    }
}

/// Metadata for a single app or package, as read from one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMetadata {
    /// Backend-specific identifier (App Store Connect app ID or package name).
    pub app_id: String,
    /// Bundle identifier or package name, used as the export directory key.
    pub bundle_id: String,
    /// Version string of the live release, if one is live.
    pub current_version: Option<String>,
    /// When the live version was created, as reported by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_timestamp: Option<DateTime<Utc>>,
    /// Per-locale listing data, unique by locale, in first-seen order.
    #[serde(default)]
    pub localizations: Vec<LocalizationMetadata>,
}

impl AppMetadata {
    /// Creates metadata with no version and no localizations.
    pub fn new(app_id: impl Into<String>, bundle_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            bundle_id: bundle_id.into(),
            current_version: None,
            version_timestamp: None,
            localizations: Vec::new(),
        }
    }

    /// Looks up the localization for a locale.
    pub fn localization(&self, locale: &str) -> Option<&LocalizationMetadata> {
        self.localizations.iter().find(|l| l.locale == locale)
    }

    /// Returns the locale codes in emission order.
    pub fn locales(&self) -> Vec<&str> {
        self.localizations.iter().map(|l| l.locale.as_str()).collect()
    }
}

/// Listing data for one (app, locale) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizationMetadata {
    /// Store-specific language/region tag, e.g. `en-US`.
    pub locale: String,
    /// App-level, version-independent fields.
    #[serde(default, skip_serializing_if = "app_info_is_blank")]
    pub app_info: Option<AppInfoData>,
    /// Fields tied to the live release.
    #[serde(default, skip_serializing_if = "version_is_blank")]
    pub version: Option<VersionData>,
}

impl LocalizationMetadata {
    /// Creates an empty localization for a locale.
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            app_info: None,
            version: None,
        }
    }

    /// True when neither section carries a non-empty field.
    pub fn is_empty(&self) -> bool {
        app_info_is_blank(&self.app_info) && version_is_blank(&self.version)
    }
}

/// Descriptive app-level fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfoData {
    #[serde(default, skip_serializing_if = "is_blank")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub privacy_policy_url: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub privacy_choices_url: Option<String>,
}

impl AppInfoData {
    /// True when every field is absent or empty.
    pub fn is_empty(&self) -> bool {
        is_blank(&self.name)
            && is_blank(&self.subtitle)
            && is_blank(&self.privacy_policy_url)
            && is_blank(&self.privacy_choices_url)
    }
}

/// Release-specific fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionData {
    #[serde(default, skip_serializing_if = "is_blank")]
    pub version_string: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub keywords: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub whats_new: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub promotional_text: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub marketing_url: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub support_url: Option<String>,
}

impl VersionData {
    /// True when every field is absent or empty.
    pub fn is_empty(&self) -> bool {
        is_blank(&self.version_string)
            && is_blank(&self.description)
            && is_blank(&self.keywords)
            && is_blank(&self.whats_new)
            && is_blank(&self.promotional_text)
            && is_blank(&self.marketing_url)
            && is_blank(&self.support_url)
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

fn app_info_is_blank(value: &Option<AppInfoData>) -> bool {
    value.as_ref().map_or(true, AppInfoData::is_empty)
}

fn version_is_blank(value: &Option<VersionData>) -> bool {
    value.as_ref().map_or(true, VersionData::is_empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_platform_dir_names() {
        assert_eq!(Platform::AppStore.dir_name(), "appstore");
        assert_eq!(Platform::GooglePlay.dir_name(), "googleplay");
        assert_eq!(Platform::GooglePlay.to_string(), "Google Play");
    }

    #[test]
    fn test_all_empty_app_info_is_omitted() {
        let loc = LocalizationMetadata {
            locale: "en-US".to_string(),
            app_info: Some(AppInfoData {
                name: Some(String::new()),
                subtitle: None,
                privacy_policy_url: Some(String::new()),
                privacy_choices_url: None,
            }),
            version: None,
        };

        let value = serde_json::to_value(&loc).unwrap();
        assert_eq!(value, json!({ "locale": "en-US" }));
        assert!(loc.is_empty());
    }

    #[test]
    fn test_partially_filled_section_keeps_only_non_empty_fields() {
        let loc = LocalizationMetadata {
            locale: "de-DE".to_string(),
            app_info: Some(AppInfoData {
                name: Some("Fu".to_string()),
                subtitle: Some(String::new()),
                ..Default::default()
            }),
            version: Some(VersionData {
                description: Some("Beschreibung".to_string()),
                whats_new: Some("Fehlerbehebungen".to_string()),
                ..Default::default()
            }),
        };

        let value = serde_json::to_value(&loc).unwrap();
        assert_eq!(
            value,
            json!({
                "locale": "de-DE",
                "appInfo": { "name": "Fu" },
                "version": {
                    "description": "Beschreibung",
                    "whatsNew": "Fehlerbehebungen"
                }
            })
        );
    }

    #[test]
    fn test_app_metadata_keeps_null_current_version() {
        let metadata = AppMetadata::new("123", "com.example.app");
        let value = serde_json::to_value(&metadata).unwrap();

        assert_eq!(value["currentVersion"], serde_json::Value::Null);
        assert!(value.get("versionTimestamp").is_none());
    }

    #[test]
    fn test_localization_lookup() {
        let mut metadata = AppMetadata::new("123", "com.example.app");
        metadata.localizations.push(LocalizationMetadata::new("en-US"));
        metadata.localizations.push(LocalizationMetadata::new("ja"));

        assert!(metadata.localization("ja").is_some());
        assert!(metadata.localization("fr-FR").is_none());
        assert_eq!(metadata.locales(), vec!["en-US", "ja"]);
    }
}
