use serde::Serialize;

use super::{GalleryError, LoadedGallery};
use crate::demo::demo_items;
use crate::loader::FetchMode;
use crate::media::MediaItem;
use crate::view::{derive_view, ViewOptions};

/// Label shown in place of a URL while the demo collection is displayed.
pub const DEMO_LABEL: &str = "demo";

/// Identifies one load cycle. Results carrying an outdated ticket are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Gallery state owned by a presentation layer.
///
/// The collection and the error are mutually exclusive: a successful load
/// replaces the items and clears the error, a failed one leaves no items.
#[derive(Debug, Clone)]
pub struct GalleryState {
    items: Vec<MediaItem>,
    error: Option<String>,
    error_kind: Option<&'static str>,
    loaded_url: Option<String>,
    last_valid_url: Option<String>,
    proxy_enabled: bool,
    using_proxy: bool,
    manifest_mode: bool,
    loading: bool,
    generation: u64,
    pub view: ViewOptions,
}

/// Serializable summary of a [`GalleryState`].
#[derive(Debug, Clone, Serialize)]
pub struct GallerySnapshot {
    pub loaded_url: Option<String>,
    pub last_valid_url: Option<String>,
    pub item_count: usize,
    pub error: Option<String>,
    pub error_kind: Option<&'static str>,
    pub proxy_enabled: bool,
    pub using_proxy: bool,
    pub manifest_mode: bool,
    pub loading: bool,
    pub view: ViewOptions,
}

impl GalleryState {
    pub fn new(proxy_enabled: bool) -> Self {
        Self {
            items: Vec::new(),
            error: None,
            error_kind: None,
            loaded_url: None,
            last_valid_url: None,
            proxy_enabled,
            using_proxy: false,
            manifest_mode: false,
            loading: false,
            generation: 0,
            view: ViewOptions::default(),
        }
    }

    pub fn with_view(mut self, view: ViewOptions) -> Self {
        self.view = view;
        self
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn loaded_url(&self) -> Option<&str> {
        self.loaded_url.as_deref()
    }

    pub fn last_valid_url(&self) -> Option<&str> {
        self.last_valid_url.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn proxy_enabled(&self) -> bool {
        self.proxy_enabled
    }

    pub fn set_proxy_enabled(&mut self, enabled: bool) {
        self.proxy_enabled = enabled;
    }

    pub fn using_proxy(&self) -> bool {
        self.using_proxy
    }

    pub fn manifest_mode(&self) -> bool {
        self.manifest_mode
    }

    pub fn mode(&self) -> FetchMode {
        FetchMode::from_proxy_enabled(self.proxy_enabled)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.generation
    }

    /// Starts a new load cycle, superseding any load still in flight.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.items.clear();
        self.error = None;
        self.error_kind = None;
        self.loaded_url = None;
        self.using_proxy = false;
        self.manifest_mode = false;
        self.loading = true;
        LoadTicket(self.generation)
    }

    /// Applies the outcome of the load identified by `ticket`. Returns false
    /// and changes nothing when a newer cycle has started since.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<LoadedGallery, GalleryError>,
    ) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.loading = false;

        match result {
            Ok(loaded) => {
                self.items = loaded.items;
                self.loaded_url = Some(loaded.url.clone());
                self.last_valid_url = Some(loaded.url);
                self.using_proxy = loaded.used_proxy;
                self.manifest_mode = loaded.manifest_mode;
                self.error = None;
                self.error_kind = None;
            }
            Err(e) => {
                self.items.clear();
                self.error = Some(e.user_message());
                self.error_kind = Some(e.kind());
            }
        }
        true
    }

    /// Updates the enrichment fields of the item with the same id.
    pub fn apply_enrichment(&mut self, ticket: LoadTicket, enriched: &MediaItem) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        match self.items.iter_mut().find(|i| i.id == enriched.id) {
            Some(item) => {
                item.lat = enriched.lat;
                item.lng = enriched.lng;
                item.has_checked_exif = enriched.has_checked_exif;
                true
            }
            None => false,
        }
    }

    /// Current ticket, for work that targets the collection already shown.
    pub fn ticket(&self) -> LoadTicket {
        LoadTicket(self.generation)
    }

    pub fn reset(&mut self) {
        self.generation += 1;
        self.items.clear();
        self.error = None;
        self.error_kind = None;
        self.loaded_url = None;
        self.using_proxy = false;
        self.manifest_mode = false;
        self.loading = false;
        self.view.query.clear();
    }

    pub fn load_demo(&mut self) -> LoadTicket {
        let ticket = self.begin_load();
        self.items = demo_items();
        self.loaded_url = Some(DEMO_LABEL.to_string());
        self.loading = false;
        ticket
    }

    /// The displayed subset under the current view options.
    pub fn view(&self) -> Vec<MediaItem> {
        derive_view(&self.items, &self.view)
    }

    pub fn snapshot(&self) -> GallerySnapshot {
        GallerySnapshot {
            loaded_url: self.loaded_url.clone(),
            last_valid_url: self.last_valid_url.clone(),
            item_count: self.items.len(),
            error: self.error.clone(),
            error_kind: self.error_kind,
            proxy_enabled: self.proxy_enabled,
            using_proxy: self.using_proxy,
            manifest_mode: self.manifest_mode,
            loading: self.loading,
            view: self.view.clone(),
        }
    }
}

impl Default for GalleryState {
    fn default() -> Self {
        Self::new(true)
    }
}
