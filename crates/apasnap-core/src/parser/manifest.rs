use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::ParseOptions;
use crate::media::{resolve_href, MediaItem, MediaType};

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "type")]
    media_type: Option<String>,
    #[serde(default)]
    size: Option<Value>,
    #[serde(default)]
    date: Option<Value>,
}

/// Parses an `apasnap.json` body. Malformed JSON is the same as no manifest.
pub fn parse_manifest(body: &str, base: &str, options: &ParseOptions) -> Vec<MediaItem> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => parse_manifest_value(&value, base, options),
        Err(e) => {
            debug!(base, error = %e, "Manifest is not valid JSON");
            Vec::new()
        }
    }
}

pub fn parse_manifest_value(value: &Value, base: &str, options: &ParseOptions) -> Vec<MediaItem> {
    let Some(entries) = value.get("items").and_then(Value::as_array) else {
        return Vec::new();
    };

    let items: Vec<MediaItem> = entries
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let entry = ManifestEntry::deserialize(raw).ok()?;
            entry_to_item(index, entry, base, options)
        })
        .collect();

    debug!(base, entries = entries.len(), kept = items.len(), "Parsed manifest");
    items
}

fn entry_to_item(
    index: usize,
    entry: ManifestEntry,
    base: &str,
    options: &ParseOptions,
) -> Option<MediaItem> {
    let url = entry.url.filter(|u| !u.is_empty())?;
    let name = entry.name.filter(|n| !n.is_empty());

    let media_type = entry
        .media_type
        .as_deref()
        .and_then(MediaType::from_wire)
        .unwrap_or_else(|| {
            let by_name = name
                .as_deref()
                .map(|n| options.extensions.classify(n))
                .unwrap_or(MediaType::Unknown);
            if by_name.is_media() {
                by_name
            } else {
                options.extensions.classify(&url)
            }
        });

    if !media_type.is_media() {
        return None;
    }

    let mut item = MediaItem::new(
        format!("manifest-{index}-{}", options.stamp),
        name.unwrap_or_else(|| format!("File {index}")),
        resolve_href(&url, base),
        media_type,
    );
    item.size = entry.size.and_then(scalar_text);
    item.date = entry.date.and_then(scalar_text);
    Some(item)
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
