use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::GalleryError;
use crate::config::GalleryConfig;
use crate::loader::{FetchMode, FetchStrategy, HttpLoader, LoadError, PageLoader, Transport};
use crate::media::{ExtensionSet, MediaItem};
use crate::parser::{parse_directory_listing, parse_manifest, ParseOptions};
use crate::validator::{check_target, normalize_target};

/// Result of one successful load.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedGallery {
    pub url: String,
    pub items: Vec<MediaItem>,
    pub manifest_mode: bool,
    pub used_proxy: bool,
    pub transport: String,
}

/// Stateless load pipeline: validate, try the manifest, fall back to the
/// listing, parse.
#[derive(Debug, Clone)]
pub struct Gallery {
    strategy: FetchStrategy,
    extensions: ExtensionSet,
}

impl Gallery {
    pub fn new(strategy: FetchStrategy, extensions: ExtensionSet) -> Self {
        Self {
            strategy,
            extensions,
        }
    }

    pub fn from_config(config: &GalleryConfig) -> Result<Self, LoadError> {
        let loader = Arc::new(HttpLoader::from_config(config)?);
        Ok(Self::with_loader(config, loader))
    }

    pub fn with_loader(config: &GalleryConfig, loader: Arc<dyn PageLoader>) -> Self {
        let proxies: Vec<Arc<dyn Transport>> = config
            .proxies
            .iter()
            .cloned()
            .map(|p| Arc::new(p) as Arc<dyn Transport>)
            .collect();
        let strategy =
            FetchStrategy::new(loader, proxies).with_manifest_file(config.manifest_file.clone());
        Self::new(strategy, config.extensions)
    }

    pub fn strategy(&self) -> &FetchStrategy {
        &self.strategy
    }

    pub async fn load(&self, input: &str, mode: FetchMode) -> Result<LoadedGallery, GalleryError> {
        let target = normalize_target(input);
        if let Err(e) = check_target(&target) {
            warn!(url = %target, error = %e, "Rejected target URL");
            return Err(e.into());
        }

        let options = ParseOptions::new(self.extensions);

        if let Some(body) = self.strategy.fetch_manifest(&target, mode).await {
            let items = parse_manifest(&body, &target, &options);
            if !items.is_empty() {
                let transport = self.strategy.primary(mode);
                info!(url = %target, items = items.len(), transport = transport.name(), "Loaded gallery from manifest");
                return Ok(LoadedGallery {
                    url: target,
                    items,
                    manifest_mode: true,
                    used_proxy: transport.is_proxy(),
                    transport: transport.name().to_string(),
                });
            }
            debug!(url = %target, "Manifest had no usable items, falling back to listing");
        }

        let listing = self.strategy.fetch_listing(&target, mode).await?;
        let items = parse_directory_listing(&listing.body, &target, &options);
        if items.is_empty() {
            info!(url = %target, transport = %listing.transport, "Listing contains no media");
            return Err(GalleryError::NoMediaFound { url: target });
        }

        info!(url = %target, items = items.len(), transport = %listing.transport, "Loaded gallery from listing");
        Ok(LoadedGallery {
            url: target,
            items,
            manifest_mode: false,
            used_proxy: listing.used_proxy,
            transport: listing.transport,
        })
    }
}
