//! Delivery URLs served through the wsrv.nl image cache.

use crate::loader::encode_component;

const IMAGE_CDN: &str = "https://wsrv.nl/";

fn passthrough(url: &str) -> bool {
    url.contains("wsrv.nl") || url.starts_with("blob:")
}

/// Grid thumbnail: 500px wide WebP, height follows the aspect ratio.
pub fn thumbnail_url(url: &str) -> String {
    if passthrough(url) {
        return url.to_string();
    }
    format!("{IMAGE_CDN}?url={}&w=500&output=webp&q=65", encode_component(url))
}

/// Full-resolution WebP for the viewer.
pub fn full_screen_url(url: &str) -> String {
    if passthrough(url) {
        return url.to_string();
    }
    format!("{IMAGE_CDN}?url={}&output=webp&q=85", encode_component(url))
}
