#![forbid(unsafe_code)]

pub mod config;
pub mod demo;
pub mod enrich;
pub mod gallery;
pub mod image_url;
pub mod loader;
pub mod media;
pub mod parser;
pub mod validator;
pub mod view;

pub use config::GalleryConfig;
pub use demo::demo_items;
pub use enrich::{extract_gps, GpsEnricher};
pub use gallery::{
    Gallery, GalleryError, GallerySnapshot, GalleryState, LoadTicket, LoadedGallery, DEMO_LABEL,
};
pub use image_url::{full_screen_url, thumbnail_url};
pub use loader::{
    DirectTransport, FetchError, FetchMode, FetchStrategy, HttpLoader, LoadError, PageLoader,
    ProxyTransport, Transport,
};
pub use media::{ExtensionSet, MediaItem, MediaType};
pub use parser::{parse_directory_listing, parse_manifest, ParseOptions};
pub use validator::{check_target, normalize_target, validate, ValidationError, ValidationResult};
pub use view::{derive_view, MediaFilter, SortKey, ViewOptions};
