//! HTTP(S) fetch policy.
//!
//! One GET per request, bounded in time and size, with every outcome mapped
//! onto a closed [`OracleResponseCode`] so that independent nodes observing
//! the same remote behaviour derive the same code.

mod client;
mod process;
pub mod security;

pub use client::ReqwestHttpClient;
pub use security::DefaultUrlValidator;

use crate::settings::OracleServiceSettings;
use neo_primitives::OracleResponseCode;
use std::time::Duration;

/// Result of one fetch: the code and, for `Success`, the raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub code: OracleResponseCode,
    pub body: Vec<u8>,
}

impl FetchOutcome {
    pub fn success(body: Vec<u8>) -> Self {
        Self {
            code: OracleResponseCode::Success,
            body,
        }
    }

    pub fn failure(code: OracleResponseCode) -> Self {
        Self {
            code,
            body: Vec::new(),
        }
    }
}

/// Limits applied around an [`OracleHttpClient`](crate::interfaces::OracleHttpClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Bound on the whole call, body included.
    pub timeout: Duration,
    /// Largest body accepted; anything larger is `ResponseTooLarge`.
    pub max_bytes: usize,
    /// Accepted media types; empty accepts any.
    pub allowed_content_types: Vec<String>,
}

impl FetchPolicy {
    pub fn new(timeout: Duration, max_bytes: usize, allowed_content_types: Vec<String>) -> Self {
        Self {
            timeout,
            max_bytes,
            allowed_content_types,
        }
    }

    pub fn from_settings(settings: &OracleServiceSettings) -> Self {
        Self::new(
            settings.https_timeout,
            settings.max_response_size,
            settings.allowed_content_types.clone(),
        )
    }

    fn is_content_type_allowed(&self, content_type: Option<&str>) -> bool {
        if self.allowed_content_types.is_empty() {
            return true;
        }
        let Some(media_type) = content_type
            .and_then(|value| value.split(';').next())
            .map(str::trim)
        else {
            return false;
        };
        self.allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(media_type))
    }
}

/// Maps an HTTP status onto a response code. Only `200 OK` is read as a body.
pub fn status_to_code(status: u16) -> OracleResponseCode {
    match status {
        200 => OracleResponseCode::Success,
        403 => OracleResponseCode::Forbidden,
        404 => OracleResponseCode::NotFound,
        408 => OracleResponseCode::Timeout,
        _ => OracleResponseCode::Error,
    }
}
