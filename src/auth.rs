//! HTTP Basic authentication gate for the management surface.
//!
//! Credentials are configured once at startup and compared as opaque byte
//! strings; absent configuration disables authentication entirely. Every
//! handler under the management path calls [`AuthGate::require`] before any
//! argument validation so unauthenticated callers cannot probe for paths or
//! trigger side effects.

use crate::errors::AppError;
use axum_extra::headers::authorization::Basic;

/// The single shared username/password pair, set once at startup.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

// Keep the password out of startup logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Stateless allow/deny predicate over configured and supplied credentials.
#[derive(Clone, Debug, Default)]
pub struct AuthGate {
    configured: Option<Credentials>,
}

impl AuthGate {
    pub fn new(configured: Option<Credentials>) -> Self {
        Self { configured }
    }

    /// Allow iff no credentials are configured, or both username and
    /// password match exactly (case-sensitive, no hashing).
    pub fn authorize(&self, supplied: Option<(&str, &str)>) -> bool {
        match &self.configured {
            None => true,
            Some(creds) => match supplied {
                Some((user, pass)) => user == creds.username && pass == creds.password,
                None => false,
            },
        }
    }

    /// First check of every management handler: deny yields the 401
    /// challenge response, never any other error.
    pub fn require(&self, supplied: Option<&Basic>) -> Result<(), AppError> {
        if self.authorize(supplied.map(|basic| (basic.username(), basic.password()))) {
            Ok(())
        } else {
            Err(AppError::Unauthorized)
        }
    }
}
