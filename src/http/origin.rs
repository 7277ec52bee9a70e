//! Cross-origin check applied before the WebSocket upgrade.

use std::fmt;
use std::sync::Arc;

use axum::http::{header::ORIGIN, HeaderMap};

/// Wildcard entry that allows any origin.
pub const ANY_ORIGIN: &str = "*";

type OriginPredicate = dyn Fn(&HeaderMap) -> bool + Send + Sync;

/// Decides whether an upgrade request may proceed based on its headers.
#[derive(Clone)]
pub enum OriginCheck {
    /// Allowed `Origin` values. Empty rejects everything; `*` accepts everything.
    Allowlist(Arc<[String]>),
    /// Caller supplied predicate.
    Custom(Arc<OriginPredicate>),
}

impl OriginCheck {
    pub fn from_origins(origins: &[String]) -> Self {
        Self::Allowlist(origins.into())
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&HeaderMap) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(predicate))
    }

    pub fn allows(&self, headers: &HeaderMap) -> bool {
        match self {
            Self::Allowlist(origins) => {
                let origin = headers
                    .get(ORIGIN)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                origins
                    .iter()
                    .any(|allowed| allowed == ANY_ORIGIN || allowed == origin)
            }
            Self::Custom(predicate) => predicate(headers),
        }
    }
}

impl fmt::Debug for OriginCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowlist(origins) => f.debug_tuple("Allowlist").field(origins).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
