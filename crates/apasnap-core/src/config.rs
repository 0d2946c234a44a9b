use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::loader::{ProxyTransport, MANIFEST_FILE};
use crate::media::ExtensionSet;
use crate::view::SortKey;

/// Configuration for loading galleries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryConfig {
    /// Route manifest and listing requests through the proxy chain (default: true).
    pub proxy_enabled: bool,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub request_timeout: Option<Duration>,
    /// Retries per transport attempt for 5xx/429/network errors (default: 0).
    pub max_retries: u32,
    /// Base backoff for retries (doubled each attempt).
    pub retry_backoff: Duration,
    /// Manifest looked up next to the listing (default: `apasnap.json`).
    pub manifest_file: String,
    /// Proxy endpoints, tried in order.
    pub proxies: Vec<ProxyTransport>,
    pub extensions: ExtensionSet,
    pub default_sort: SortKey,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            proxy_enabled: true,
            request_timeout: None,
            max_retries: 0,
            retry_backoff: Duration::from_millis(200),
            manifest_file: MANIFEST_FILE.to_string(),
            proxies: ProxyTransport::defaults(),
            extensions: ExtensionSet::Strict,
            default_sort: SortKey::DateDesc,
        }
    }
}

impl GalleryConfig {
    pub fn with_proxy_enabled(mut self, enabled: bool) -> Self {
        self.proxy_enabled = enabled;
        self
    }

    /// `0` disables the timeout.
    pub fn with_request_timeout(mut self, ms: u64) -> Self {
        self.request_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, ms: u64) -> Self {
        self.retry_backoff = Duration::from_millis(ms);
        self
    }

    pub fn with_manifest_file(mut self, name: impl Into<String>) -> Self {
        self.manifest_file = name.into();
        self
    }

    pub fn with_proxies(mut self, proxies: Vec<ProxyTransport>) -> Self {
        self.proxies = proxies;
        self
    }

    pub fn with_extensions(mut self, extensions: ExtensionSet) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_default_sort(mut self, sort: SortKey) -> Self {
        self.default_sort = sort;
        self
    }
}
