use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use exif::{In, Reader, Tag, Value};
use tracing::debug;

use crate::loader::{FetchMode, FetchStrategy, PageLoader, Transport};
use crate::media::{MediaItem, MediaType};

/// Reads GPS coordinates from image EXIF data, one item at a time.
#[derive(Clone)]
pub struct GpsEnricher {
    loader: Arc<dyn PageLoader>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for GpsEnricher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpsEnricher")
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

impl GpsEnricher {
    pub fn new(loader: Arc<dyn PageLoader>, transport: Arc<dyn Transport>) -> Self {
        Self { loader, transport }
    }

    /// Enricher fetching through the same transport the manifest would use.
    pub fn from_strategy(strategy: &FetchStrategy, mode: FetchMode) -> Self {
        Self::new(Arc::clone(strategy.loader()), strategy.primary(mode))
    }

    /// Returns the item with its enrichment fields settled. Items that are not
    /// images, or were already checked, come back unchanged.
    pub async fn enrich(&self, item: &MediaItem) -> MediaItem {
        if item.media_type != MediaType::Image || item.has_checked_exif == Some(true) {
            return item.clone();
        }

        let mut enriched = item.clone();
        enriched.has_checked_exif = Some(true);

        let request_url = self.transport.build(&item.url);
        match self.loader.load_bytes(&request_url).await {
            Ok(bytes) => match extract_gps(&bytes) {
                Some((lat, lng)) => {
                    debug!(url = %item.url, lat, lng, "GPS position found");
                    enriched.lat = Some(lat);
                    enriched.lng = Some(lng);
                }
                None => debug!(url = %item.url, "No GPS position in EXIF"),
            },
            Err(e) => debug!(url = %item.url, error = %e, "Could not fetch image for EXIF"),
        }
        enriched
    }

    /// Enriches `items` sequentially, handing each result to `on_item` as soon
    /// as it is ready.
    pub async fn enrich_all<F>(&self, items: &[MediaItem], mut on_item: F)
    where
        F: FnMut(MediaItem),
    {
        for item in items {
            on_item(self.enrich(item).await);
        }
    }
}

/// Decimal latitude and longitude from EXIF GPS tags, when both are present.
pub fn extract_gps(bytes: &[u8]) -> Option<(f64, f64)> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;

    let coordinate = |value_tag: Tag, ref_tag: Tag, negative: u8| -> Option<f64> {
        let field = exif.get_field(value_tag, In::PRIMARY)?;
        let degrees = match &field.value {
            Value::Rational(parts) if parts.len() >= 3 => {
                dms_to_degrees(parts[0].to_f64(), parts[1].to_f64(), parts[2].to_f64())
            }
            _ => return None,
        };
        if !degrees.is_finite() {
            return None;
        }
        let is_negative = exif
            .get_field(ref_tag, In::PRIMARY)
            .and_then(|f| match &f.value {
                Value::Ascii(values) => values.first().and_then(|v| v.first()).copied(),
                _ => None,
            })
            .is_some_and(|c| c.eq_ignore_ascii_case(&negative));
        Some(if is_negative { -degrees } else { degrees })
    };

    let lat = coordinate(Tag::GPSLatitude, Tag::GPSLatitudeRef, b'S')?;
    let lng = coordinate(Tag::GPSLongitude, Tag::GPSLongitudeRef, b'W')?;
    Some((lat, lng))
}

fn dms_to_degrees(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}
