//! Store types

use serde::{Deserialize, Serialize};
use std::fmt;

pub use storemeta_metadata::Platform;

/// An app or package to aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRef {
    /// Backend identifier (App Store Connect app ID, or the package name)
    pub app_id: String,
    /// Bundle ID or package name
    pub bundle_id: String,
}

impl AppRef {
    pub fn new(app_id: impl Into<String>, bundle_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            bundle_id: bundle_id.into(),
        }
    }

    /// A Google Play package, where both identifiers are the package name
    pub fn package(package_name: impl Into<String>) -> Self {
        let package_name = package_name.into();
        Self {
            app_id: package_name.clone(),
            bundle_id: package_name,
        }
    }
}

impl fmt::Display for AppRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.app_id == self.bundle_id {
            write!(f, "{}", self.bundle_id)
        } else {
            write!(f, "{} ({})", self.bundle_id, self.app_id)
        }
    }
}
