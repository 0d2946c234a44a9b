mod http;
mod strategy;
mod transport;

pub use http::HttpLoader;
pub use strategy::{FetchError, FetchMode, FetchStrategy, FetchedListing, MANIFEST_FILE};
pub use transport::{DirectTransport, ProxyTransport, Transport, URL_PLACEHOLDER};
pub(crate) use transport::encode_component;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("HTTP error {status} fetching {url}: {message}")]
    Http {
        url: String,
        status: u16,
        message: String,
        is_last_retry: bool,
    },
    #[error("Network error fetching {url}: {reason}")]
    Network {
        url: String,
        reason: String,
        is_last_retry: bool,
    },
    #[error("Timeout fetching {url}")]
    Timeout { url: String, is_last_retry: bool },
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl LoadError {
    pub fn is_last_retry(&self) -> bool {
        match self {
            Self::Http { is_last_retry, .. } => *is_last_retry,
            Self::Network { is_last_retry, .. } => *is_last_retry,
            Self::Timeout { is_last_retry, .. } => *is_last_retry,
            Self::Client(_) => true,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 401 or 403, the statuses that stop a transport chain.
    pub fn auth_status(&self) -> Option<u16> {
        self.status_code().filter(|s| *s == 401 || *s == 403)
    }
}

/// Fetches raw bodies from a URI.
///
/// Implementations only report what happened on the wire; deciding whether a
/// failure is worth another transport is up to [`FetchStrategy`].
#[async_trait]
pub trait PageLoader: Send + Sync {
    async fn load(&self, uri: &str) -> Result<String, LoadError>;

    async fn load_bytes(&self, uri: &str) -> Result<Vec<u8>, LoadError>;
}
