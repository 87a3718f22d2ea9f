//! Backend configuration and credential source resolution.
//!
//! Values may arrive from flags, environment variables, or files. A value
//! only counts when it is non-blank and is not a literal `${PLACEHOLDER}`
//! left behind by an unexpanded template.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, StoreError};

/// Default package list read from the working directory.
pub const DEFAULT_PACKAGE_NAMES_FILE: &str = "gp-packages.txt";

/// App Store Connect API key configuration.
#[derive(Clone)]
pub struct AppStoreConnectConfig {
    /// The API Issuer ID
    pub issuer_id: String,
    /// The API Key ID
    pub key_id: String,
    /// Private key content, base64 or PEM
    pub private_key: String,
}

impl std::fmt::Debug for AppStoreConnectConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppStoreConnectConfig")
            .field("issuer_id", &self.issuer_id)
            .field("key_id", &self.key_id)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// How the Google Play client authenticates.
#[derive(Clone)]
pub enum GooglePlayCredentials {
    /// Service-account key JSON, exchanged for an OAuth2 access token
    ServiceAccountJson(String),
    /// An already-issued OAuth2 access token
    AccessToken(String),
}

impl std::fmt::Debug for GooglePlayCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GooglePlayCredentials::ServiceAccountJson(_) => {
                write!(f, "ServiceAccountJson(<redacted>)")
            }
            GooglePlayCredentials::AccessToken(_) => write!(f, "AccessToken(<redacted>)"),
        }
    }
}

/// Google Play configuration.
#[derive(Debug, Clone)]
pub struct GooglePlayConfig {
    pub credentials: GooglePlayCredentials,
    /// Packages to read, in processing order
    pub package_names: Vec<String>,
}

/// Returns true if a configured value is present and not a placeholder.
pub fn is_usable(value: Option<&str>) -> bool {
    match value {
        Some(v) => !v.trim().is_empty() && !v.starts_with("${"),
        None => false,
    }
}

/// Resolves a secret that may come from a file or inline content.
///
/// An existing file wins over inline content.
pub fn resolve_secret(file: Option<&Path>, inline: Option<&str>) -> Result<Option<String>> {
    if let Some(path) = file {
        if path.exists() {
            debug!("Reading secret from {}", path.display());
            let content = fs::read_to_string(path).map_err(|e| {
                StoreError::ConfigurationError(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                ))
            })?;
            return Ok(Some(content));
        }
    }

    if is_usable(inline) {
        return Ok(inline.map(str::to_string));
    }

    Ok(None)
}

/// Splits a comma-separated package list.
pub fn parse_package_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads one package name per line, skipping blanks and `#` comments.
pub fn read_package_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| {
        StoreError::ConfigurationError(format!("Failed to read {}: {}", path.display(), e))
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Where package names come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    List,
    File(PathBuf),
    None,
}

/// Picks the package source: inline list, explicit file, then the default file.
pub fn package_source(
    list: Option<&str>,
    file: Option<&str>,
    default_file: &Path,
) -> PackageSource {
    if is_usable(list) {
        return PackageSource::List;
    }
    if let Some(file) = file.filter(|f| is_usable(Some(f))) {
        let path = PathBuf::from(file);
        return if path.exists() {
            PackageSource::File(path)
        } else {
            PackageSource::None
        };
    }
    if default_file.exists() {
        return PackageSource::File(default_file.to_path_buf());
    }
    PackageSource::None
}

/// Resolves the package list following [`package_source`] priority.
pub fn resolve_package_names(
    list: Option<&str>,
    file: Option<&str>,
    default_file: &Path,
) -> Result<Vec<String>> {
    match package_source(list, file, default_file) {
        PackageSource::List => Ok(list.map(parse_package_list).unwrap_or_default()),
        PackageSource::File(path) => {
            debug!("Reading package names from {}", path.display());
            read_package_file(&path)
        }
        PackageSource::None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_usable() {
        assert!(is_usable(Some("abc")));
        assert!(!is_usable(Some("")));
        assert!(!is_usable(Some("   ")));
        assert!(!is_usable(Some("${ASC_KEY_ID}")));
        assert!(!is_usable(None));
    }

    #[test]
    fn test_resolve_secret_prefers_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("AuthKey.p8");
        std::fs::write(&path, "from-file").unwrap();

        let resolved = resolve_secret(Some(&path), Some("inline")).unwrap();
        assert_eq!(resolved.as_deref(), Some("from-file"));

        let missing = temp.path().join("missing.p8");
        let resolved = resolve_secret(Some(&missing), Some("inline")).unwrap();
        assert_eq!(resolved.as_deref(), Some("inline"));

        assert!(resolve_secret(Some(&missing), Some("${ASC_PRIVATE_KEY}"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_parse_package_list() {
        assert_eq!(
            parse_package_list(" com.a , ,com.b,"),
            vec!["com.a".to_string(), "com.b".to_string()]
        );
    }

    #[test]
    fn test_package_file_skips_comments_and_blanks() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("packages.txt");
        std::fs::write(&path, "# fleet\ncom.a\n\n  com.b  \n#com.c\n").unwrap();

        assert_eq!(
            read_package_file(&path).unwrap(),
            vec!["com.a".to_string(), "com.b".to_string()]
        );
    }

    #[test]
    fn test_package_source_priority() {
        let temp = TempDir::new().unwrap();
        let default_file = temp.path().join(DEFAULT_PACKAGE_NAMES_FILE);
        let explicit = temp.path().join("explicit.txt");
        std::fs::write(&default_file, "com.default\n").unwrap();
        std::fs::write(&explicit, "com.explicit\n").unwrap();
        let explicit_str = explicit.to_str().unwrap();

        assert_eq!(
            resolve_package_names(Some("com.inline"), Some(explicit_str), &default_file).unwrap(),
            vec!["com.inline".to_string()]
        );
        assert_eq!(
            resolve_package_names(None, Some(explicit_str), &default_file).unwrap(),
            vec!["com.explicit".to_string()]
        );
        assert_eq!(
            resolve_package_names(Some("${GP_PACKAGE_NAMES}"), None, &default_file).unwrap(),
            vec!["com.default".to_string()]
        );

        let nowhere = temp.path().join("nope.txt");
        assert_eq!(
            package_source(None, None, &nowhere),
            PackageSource::None
        );
        assert_eq!(
            package_source(None, Some(nowhere.to_str().unwrap()), &default_file),
            PackageSource::None
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = AppStoreConnectConfig {
            issuer_id: "issuer".to_string(),
            key_id: "KEY".to_string(),
            private_key: "super-secret".to_string(),
        };
        assert!(!format!("{:?}", config).contains("super-secret"));

        let creds = GooglePlayCredentials::AccessToken("ya29.secret".to_string());
        assert!(!format!("{:?}", creds).contains("ya29"));
    }
}
