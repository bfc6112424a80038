//! Type definitions for pharmwatch

mod dashboard;
mod error;
mod records;

pub use dashboard::*;
pub use error::*;
pub use records::*;

/// Authenticated session issued by the identity provider
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub email: Option<String>,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            email: None,
        }
    }
}

// Keep tokens out of log output
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}
