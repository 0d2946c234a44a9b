//! Filtering and sorting of a loaded collection.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::media::{MediaItem, MediaType};

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d-%b-%Y %H:%M",
    "%d-%b-%Y %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%b-%Y", "%Y/%m/%d"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    NameAsc,
    NameDesc,
    #[default]
    DateDesc,
    DateAsc,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NameAsc => "name_asc",
            Self::NameDesc => "name_desc",
            Self::DateDesc => "date_desc",
            Self::DateAsc => "date_asc",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name_asc" => Ok(Self::NameAsc),
            "name_desc" => Ok(Self::NameDesc),
            "date_desc" => Ok(Self::DateDesc),
            "date_asc" => Ok(Self::DateAsc),
            other => Err(format!(
                "Invalid sort '{other}': expected name_asc, name_desc, date_desc or date_asc"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaFilter {
    #[default]
    All,
    Image,
    Video,
}

impl MediaFilter {
    pub fn matches(self, media_type: MediaType) -> bool {
        match self {
            Self::All => true,
            Self::Image => media_type == MediaType::Image,
            Self::Video => media_type == MediaType::Video,
        }
    }
}

impl fmt::Display for MediaFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "ALL"),
            Self::Image => write!(f, "IMAGE"),
            Self::Video => write!(f, "VIDEO"),
        }
    }
}

impl FromStr for MediaFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else if s.eq_ignore_ascii_case("image") {
            Ok(Self::Image)
        } else if s.eq_ignore_ascii_case("video") {
            Ok(Self::Video)
        } else {
            Err(format!("Invalid type filter '{s}': expected ALL, IMAGE or VIDEO"))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOptions {
    #[serde(default)]
    pub query: String,
    #[serde(default, rename = "type")]
    pub media_filter: MediaFilter,
    #[serde(default)]
    pub sort: SortKey,
}

impl ViewOptions {
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_filter(mut self, filter: MediaFilter) -> Self {
        self.media_filter = filter;
        self
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }
}

/// Filters then sorts `items` into the displayed subset. Always works on the
/// full collection; the input is never modified.
pub fn derive_view(items: &[MediaItem], options: &ViewOptions) -> Vec<MediaItem> {
    let query = options.query.to_lowercase();

    let mut result: Vec<MediaItem> = items
        .iter()
        .filter(|item| options.media_filter.matches(item.media_type))
        .filter(|item| query.is_empty() || item.name.to_lowercase().contains(&query))
        .cloned()
        .collect();

    match options.sort {
        SortKey::NameAsc => result.sort_by(|a, b| compare_names(&a.name, &b.name)),
        SortKey::NameDesc => result.sort_by(|a, b| compare_names(&b.name, &a.name)),
        SortKey::DateDesc => result.sort_by_key(|item| std::cmp::Reverse(date_key(item))),
        SortKey::DateAsc => result.sort_by_key(date_key),
    }

    result
}

/// Compares names with accents and case folded away, falling back to the raw
/// strings so that the order stays total.
fn compare_names(a: &str, b: &str) -> Ordering {
    name_key(a).cmp(&name_key(b)).then_with(|| a.cmp(b))
}

/// `Émile.jpg` and `emile.jpg` share the key `emile.jpg`.
fn name_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Milliseconds since the epoch; missing or unparseable dates count as 0.
fn date_key(item: &MediaItem) -> i64 {
    item.date
        .as_deref()
        .and_then(parse_listing_date)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(0)
}

/// Parses the date formats commonly printed by autoindex pages and manifests.
pub fn parse_listing_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.naive_utc());
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
