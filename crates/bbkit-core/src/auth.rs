//! Credentials capability and the authentication guard.
//!
//! Every object that can issue API calls exposes its credentials through
//! [`Credentials`]. The guard only depends on that trait, so the client and
//! every resource handle are checked the same way.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::{Error, Result};

/// Anything that carries (possibly empty) Basic-Auth credentials.
pub trait Credentials {
    /// Username, empty when anonymous.
    fn username(&self) -> &str;

    /// Password, empty when anonymous.
    fn password(&self) -> &str;

    /// Both username and password are non-empty.
    fn has_credentials(&self) -> bool {
        !self.username().is_empty() && !self.password().is_empty()
    }
}

impl<C: Credentials + ?Sized> Credentials for &C {
    fn username(&self) -> &str {
        (**self).username()
    }

    fn password(&self) -> &str {
        (**self).password()
    }
}

/// Fail with [`Error::AuthenticationRequired`] unless `provider` has both a
/// username and a password.
///
/// Call this before doing any I/O for an operation that needs an
/// authenticated user.
pub fn require_authentication<C: Credentials + ?Sized>(provider: &C, operation: &str) -> Result<()> {
    if provider.has_credentials() {
        return Ok(());
    }

    debug!(operation = operation, "Rejected unauthenticated call");
    Err(Error::AuthenticationRequired {
        operation: operation.to_string(),
    })
}

/// `Authorization` header value for the given credentials, or `None` when
/// either part is missing.
pub fn basic_auth_header<C: Credentials + ?Sized>(provider: &C) -> Option<String> {
    if !provider.has_credentials() {
        return None;
    }
    let credentials = STANDARD.encode(format!(
        "{}:{}",
        provider.username(),
        provider.password()
    ));
    Some(format!("Basic {}", credentials))
}
