use std::fmt;

use serde::{Deserialize, Serialize};

const STRICT_IMAGE_EXT: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif", "bmp"];
const STRICT_VIDEO_EXT: &[&str] = &["mp4", "webm", "mov", "mkv"];
const LOOSE_IMAGE_EXT: &[&str] = &["svg"];
const LOOSE_VIDEO_EXT: &[&str] = &["avi"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
    Image,
    Video,
    Unknown,
}

impl MediaType {
    /// Parses the wire name (`IMAGE`, `VIDEO`), ignoring case. `UNKNOWN` and
    /// anything else yield `None`.
    pub fn from_wire(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("image") {
            Some(Self::Image)
        } else if value.eq_ignore_ascii_case("video") {
            Some(Self::Video)
        } else {
            None
        }
    }

    pub fn is_media(self) -> bool {
        self != Self::Unknown
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "IMAGE"),
            Self::Video => write!(f, "VIDEO"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Which file extensions count as media.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionSet {
    #[default]
    Strict,
    /// Strict set plus `svg` images and `avi` videos.
    Loose,
}

impl ExtensionSet {
    /// Classifies a file name or URL path by its last extension, case-insensitively.
    pub fn classify(self, filename: &str) -> MediaType {
        let path = filename.split(['#', '?']).next().unwrap_or_default();
        let ext = match path.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return MediaType::Unknown,
        };
        let ext = ext.as_str();

        if STRICT_IMAGE_EXT.contains(&ext) {
            return MediaType::Image;
        }
        if STRICT_VIDEO_EXT.contains(&ext) {
            return MediaType::Video;
        }
        if self == Self::Loose {
            if LOOSE_IMAGE_EXT.contains(&ext) {
                return MediaType::Image;
            }
            if LOOSE_VIDEO_EXT.contains(&ext) {
                return MediaType::Video;
            }
        }
        MediaType::Unknown
    }
}

/// One discovered file in a listing or manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_checked_exif: Option<bool>,
}

impl MediaItem {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        media_type: MediaType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            media_type,
            size: None,
            date: None,
            lat: None,
            lng: None,
            has_checked_exif: None,
        }
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn has_gps(&self) -> bool {
        self.lat.is_some() && self.lng.is_some()
    }
}

/// Coerces a base URL to end in exactly one slash.
pub fn normalize_base(base: &str) -> String {
    format!("{}/", base.trim_end_matches('/'))
}

/// True when `href` is already an absolute http(s) URL.
pub fn is_absolute_http(href: &str) -> bool {
    let lower = href.get(..8).unwrap_or(href).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Resolves `href` against a base: absolute http(s) hrefs are kept verbatim,
/// everything else has one leading slash stripped and is appended to the
/// normalized base.
pub fn resolve_href(href: &str, base: &str) -> String {
    if is_absolute_http(href) {
        return href.to_string();
    }
    let relative = href.strip_prefix('/').unwrap_or(href);
    format!("{}{}", normalize_base(base), relative)
}
