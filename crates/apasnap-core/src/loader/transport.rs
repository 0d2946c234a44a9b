use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

/// Placeholder substituted with the encoded target in proxy templates.
pub const URL_PLACEHOLDER: &str = "{url}";

/// Characters escaped the way `encodeURIComponent` escapes them.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub(crate) fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// One way of reaching a target URL: directly, or rewritten through a proxy.
pub trait Transport: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Builds the URL actually requested for `target`.
    fn build(&self, target: &str) -> String;

    fn is_proxy(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DirectTransport;

impl Transport for DirectTransport {
    fn name(&self) -> &str {
        "direct"
    }

    fn build(&self, target: &str) -> String {
        target.to_string()
    }

    fn is_proxy(&self) -> bool {
        false
    }
}

/// Proxy endpoint described by a template such as `https://corsproxy.io/?{url}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyTransport {
    name: String,
    template: String,
}

impl ProxyTransport {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    pub fn corsproxy() -> Self {
        Self::new("corsproxy", "https://corsproxy.io/?{url}")
    }

    pub fn allorigins() -> Self {
        Self::new("allorigins", "https://api.allorigins.win/raw?url={url}")
    }

    pub fn defaults() -> Vec<Self> {
        vec![Self::corsproxy(), Self::allorigins()]
    }

    /// Whether the template contains the `{url}` slot.
    pub fn has_placeholder(&self) -> bool {
        self.template.contains(URL_PLACEHOLDER)
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl Transport for ProxyTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(&self, target: &str) -> String {
        self.template.replace(URL_PLACEHOLDER, &encode_component(target))
    }

    fn is_proxy(&self) -> bool {
        true
    }
}
