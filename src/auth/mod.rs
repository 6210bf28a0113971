//! Login credentials and bearer sessions

pub mod credentials;
pub mod sessions;

pub use credentials::{CredentialVerifier, StaticCredentials};
pub use sessions::{bearer_token, SessionError, SessionStore};
