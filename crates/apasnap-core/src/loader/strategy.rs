use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::transport::{DirectTransport, Transport};
use super::{LoadError, PageLoader};
use crate::media::normalize_base;

/// Manifest file looked up next to a listing.
pub const MANIFEST_FILE: &str = "apasnap.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    Direct,
    #[default]
    Proxy,
}

impl FetchMode {
    pub fn from_proxy_enabled(enabled: bool) -> Self {
        if enabled {
            Self::Proxy
        } else {
            Self::Direct
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Proxy => write!(f, "proxy"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("{}", auth_message(*status))]
    AuthDenied { status: u16, url: String },
    #[error("Could not load the directory after {attempts} attempt(s): {last}")]
    AllTransportsExhausted {
        attempts: usize,
        #[source]
        last: LoadError,
    },
    #[error("Cannot reach the directory directly; enabling proxy mode is recommended for this site")]
    DirectModeUnavailable {
        #[source]
        last: LoadError,
    },
}

fn auth_message(status: u16) -> &'static str {
    if status == 401 {
        "Access denied (401): this directory is password protected"
    } else {
        "Access forbidden (403): the server refuses access"
    }
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthDenied { .. } => "auth_denied",
            Self::AllTransportsExhausted { .. } => "all_transports_exhausted",
            Self::DirectModeUnavailable { .. } => "direct_mode_unavailable",
        }
    }
}

/// A listing body together with the transport that produced it.
#[derive(Debug, Clone)]
pub struct FetchedListing {
    pub body: String,
    pub transport: String,
    pub used_proxy: bool,
}

/// Ordered, strictly sequential transport fallback over a [`PageLoader`].
#[derive(Clone)]
pub struct FetchStrategy {
    loader: Arc<dyn PageLoader>,
    direct: Arc<dyn Transport>,
    proxies: Vec<Arc<dyn Transport>>,
    manifest_file: String,
}

impl FetchStrategy {
    pub fn new(loader: Arc<dyn PageLoader>, proxies: Vec<Arc<dyn Transport>>) -> Self {
        Self {
            loader,
            direct: Arc::new(DirectTransport),
            proxies,
            manifest_file: MANIFEST_FILE.to_string(),
        }
    }

    pub fn with_manifest_file(mut self, name: impl Into<String>) -> Self {
        self.manifest_file = name.into();
        self
    }

    pub fn loader(&self) -> &Arc<dyn PageLoader> {
        &self.loader
    }

    /// Transports tried for a listing, in order. Proxy mode without any
    /// configured proxy degrades to the direct transport.
    pub fn chain(&self, mode: FetchMode) -> Vec<Arc<dyn Transport>> {
        match mode {
            FetchMode::Proxy if !self.proxies.is_empty() => self.proxies.clone(),
            _ => vec![Arc::clone(&self.direct)],
        }
    }

    /// First transport of the mode's chain.
    pub fn primary(&self, mode: FetchMode) -> Arc<dyn Transport> {
        match mode {
            FetchMode::Proxy => self
                .proxies
                .first()
                .cloned()
                .unwrap_or_else(|| Arc::clone(&self.direct)),
            FetchMode::Direct => Arc::clone(&self.direct),
        }
    }

    pub fn manifest_url(&self, base: &str) -> String {
        format!("{}{}", normalize_base(base), self.manifest_file)
    }

    /// Fetches the manifest through the primary transport. Every failure means
    /// "no manifest".
    pub async fn fetch_manifest(&self, base: &str, mode: FetchMode) -> Option<String> {
        let target = self.manifest_url(base);
        let transport = self.primary(mode);
        let request_url = transport.build(&target);

        match self.loader.load(&request_url).await {
            Ok(body) => {
                debug!(url = %target, transport = transport.name(), "Manifest retrieved");
                Some(body)
            }
            Err(e) => {
                debug!(url = %target, transport = transport.name(), error = %e, "Manifest not available");
                None
            }
        }
    }

    /// Fetches the listing at `target`, falling through the chain on transient
    /// failures and stopping at the first 401/403.
    pub async fn fetch_listing(
        &self,
        target: &str,
        mode: FetchMode,
    ) -> Result<FetchedListing, FetchError> {
        let chain = self.chain(mode);
        let mut attempts = 0usize;
        let mut last_error = None;

        for transport in &chain {
            attempts += 1;
            let request_url = transport.build(target);

            match self.loader.load(&request_url).await {
                Ok(body) => {
                    info!(
                        url = target,
                        transport = transport.name(),
                        bytes = body.len(),
                        "Listing retrieved"
                    );
                    return Ok(FetchedListing {
                        body,
                        transport: transport.name().to_string(),
                        used_proxy: transport.is_proxy(),
                    });
                }
                Err(e) => {
                    if let Some(status) = e.auth_status() {
                        warn!(url = target, transport = transport.name(), status, "Listing access denied");
                        return Err(FetchError::AuthDenied {
                            status,
                            url: target.to_string(),
                        });
                    }
                    warn!(
                        url = target,
                        transport = transport.name(),
                        attempt = attempts,
                        error = %e,
                        "Transport failed, trying next"
                    );
                    last_error = Some(e);
                }
            }
        }

        let last = last_error.unwrap_or_else(|| LoadError::Network {
            url: target.to_string(),
            reason: "no transport available".into(),
            is_last_retry: true,
        });

        match mode {
            FetchMode::Direct => Err(FetchError::DirectModeUnavailable { last }),
            FetchMode::Proxy => Err(FetchError::AllTransportsExhausted { attempts, last }),
        }
    }
}

impl fmt::Debug for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchStrategy")
            .field("proxies", &self.proxies)
            .field("manifest_file", &self.manifest_file)
            .finish_non_exhaustive()
    }
}
