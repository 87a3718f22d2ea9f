//! App Store Connect backend

mod connect;
pub mod credentials;

pub use connect::{AppStoreConnectClient, API_BASE_URL};
pub use credentials::{der_to_fixed, normalize_private_key, BearerToken, CredentialMinter};
