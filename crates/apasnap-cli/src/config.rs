//! TOML configuration file schema and parsing.
//!
//! Example config file:
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8080"
//! log_format = "json"
//! session_idle_secs = 900
//!
//! [fetch]
//! proxy_enabled = true
//! timeout_ms = 30000
//! max_retries = 1
//! default_sort = "name_asc"
//!
//! [[proxy]]
//! name = "corsproxy"
//! template = "https://corsproxy.io/?{url}"
//!
//! [[proxy]]
//! name = "internal"
//! template = "https://proxy.example.com/fetch?target={url}"
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::Deserialize;

use apasnap_core::loader::{MANIFEST_FILE, URL_PLACEHOLDER};
use apasnap_core::{ExtensionSet, GalleryConfig, ProxyTransport, SortKey};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    /// Replaces the built-in proxy list when non-empty.
    #[serde(default)]
    pub proxy: Vec<ProxyDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Sessions idle this long are dropped; 0 keeps them until deleted.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_format: default_log_format(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

pub fn default_listen() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

fn default_log_format() -> String {
    "pretty".into()
}

fn default_session_idle_secs() -> u64 {
    3600
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_true")]
    pub proxy_enabled: bool,

    /// Per-request timeout; 0 disables it.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub max_retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,

    /// Also accept svg images and avi videos.
    #[serde(default)]
    pub loose_extensions: bool,

    #[serde(default)]
    pub default_sort: SortKey,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            proxy_enabled: true,
            timeout_ms: default_timeout_ms(),
            max_retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
            manifest_file: default_manifest_file(),
            loose_extensions: false,
            default_sort: SortKey::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_retry_backoff_ms() -> u64 {
    200
}

fn default_manifest_file() -> String {
    MANIFEST_FILE.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyDef {
    pub name: String,
    pub template: String,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        let mut names = std::collections::HashSet::new();
        for (i, p) in self.proxy.iter().enumerate() {
            if p.name.is_empty() {
                return Err(format!("Proxy at index {} has an empty name", i));
            }
            if !names.insert(&p.name) {
                return Err(format!("Duplicate proxy name: {}", p.name));
            }
            if !p.template.contains(URL_PLACEHOLDER) {
                return Err(format!(
                    "Proxy '{}' template must contain {}: {}",
                    p.name, URL_PLACEHOLDER, p.template
                ));
            }
            let sample = p.template.replace(URL_PLACEHOLDER, "x");
            let parsed = url::Url::parse(&sample).map_err(|e| {
                format!("Invalid template for proxy '{}': {} ({})", p.name, p.template, e)
            })?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(format!(
                    "Proxy '{}' template must use http or https: {}",
                    p.name, p.template
                ));
            }
        }

        let manifest = self.fetch.manifest_file.as_str();
        if manifest.is_empty() || manifest.contains('/') {
            return Err(format!(
                "Invalid manifest_file '{}': must be a plain file name",
                manifest
            ));
        }

        match self.server.log_format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(format!(
                    "Invalid log_format '{}': must be 'pretty' or 'json'",
                    other
                ));
            }
        }

        Ok(())
    }

    pub fn to_gallery_config(&self) -> GalleryConfig {
        let fetch = &self.fetch;
        let mut c = GalleryConfig::default()
            .with_proxy_enabled(fetch.proxy_enabled)
            .with_request_timeout(fetch.timeout_ms)
            .with_max_retries(fetch.max_retries)
            .with_retry_backoff(fetch.retry_backoff_ms)
            .with_manifest_file(fetch.manifest_file.clone())
            .with_default_sort(fetch.default_sort);
        if fetch.loose_extensions {
            c = c.with_extensions(ExtensionSet::Loose);
        }
        if !self.proxy.is_empty() {
            c = c.with_proxies(
                self.proxy
                    .iter()
                    .map(|p| ProxyTransport::new(p.name.clone(), p.template.clone()))
                    .collect(),
            );
        }
        c
    }
}
