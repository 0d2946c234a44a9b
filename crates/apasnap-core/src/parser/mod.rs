mod html;
mod manifest;

pub use html::parse_directory_listing;
pub use manifest::{parse_manifest, parse_manifest_value};

use chrono::Utc;

use crate::media::ExtensionSet;

/// Settings shared by both parsers.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub extensions: ExtensionSet,
    /// Load-cycle stamp embedded in generated item ids.
    pub stamp: i64,
}

impl ParseOptions {
    pub fn new(extensions: ExtensionSet) -> Self {
        Self {
            extensions,
            stamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn with_stamp(mut self, stamp: i64) -> Self {
        self.stamp = stamp;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::new(ExtensionSet::default())
    }
}
