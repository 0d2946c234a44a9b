//! Target URL gating.
//!
//! The private-network check is lexical: it inspects the literal host of the
//! URL and never resolves DNS, so a public name pointing at a private address
//! is not caught here.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::{Host, Url};

const LOCAL_HOSTNAMES: &[&str] = &["localhost", "local", "intranet", "router", "gateway"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Malformed URL: {input}")]
    MalformedUrl { input: String },
    #[error("Invalid protocol '{scheme}': use http:// or https://")]
    InvalidProtocol { scheme: String },
    #[error("Access to local addresses is not allowed ({host})")]
    LocalHostnameBlocked { host: String },
    #[error("Access to private networks is not allowed ({host})")]
    PrivateNetworkBlocked { host: String },
}

impl ValidationError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedUrl { .. } => "malformed_url",
            Self::InvalidProtocol { .. } => "invalid_protocol",
            Self::LocalHostnameBlocked { .. } => "local_hostname_blocked",
            Self::PrivateNetworkBlocked { .. } => "private_network_blocked",
        }
    }
}

/// Terminal validation verdict handed to UI error display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<Url, ValidationError>> for ValidationResult {
    fn from(result: Result<Url, ValidationError>) -> Self {
        match result {
            Ok(_) => Self {
                valid: true,
                error: None,
            },
            Err(e) => Self {
                valid: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Trims user input and prefixes `https://` when no http(s) scheme is present.
pub fn normalize_target(input: &str) -> String {
    let trimmed = input.trim();
    let head = trimmed.get(..8).unwrap_or(trimmed).to_ascii_lowercase();
    if head.starts_with("http://") || head.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

pub fn validate(input: &str) -> ValidationResult {
    check_target(input).into()
}

/// Parses `input` and applies the protocol, hostname and private-range rules.
pub fn check_target(input: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(input).map_err(|_| ValidationError::MalformedUrl {
        input: input.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ValidationError::InvalidProtocol {
            scheme: url.scheme().to_string(),
        });
    }

    let host = match url.host() {
        Some(Host::Domain(d)) => d.to_ascii_lowercase(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        None => {
            return Err(ValidationError::MalformedUrl {
                input: input.to_string(),
            })
        }
    };

    if LOCAL_HOSTNAMES.contains(&host.as_str()) {
        return Err(ValidationError::LocalHostnameBlocked { host });
    }

    if is_private_literal(&host) {
        return Err(ValidationError::PrivateNetworkBlocked { host });
    }

    Ok(url)
}

fn is_private_literal(host: &str) -> bool {
    if ["127.", "10.", "192.168.", "0.0.0.0", "fc00:", "fe80:"]
        .iter()
        .any(|prefix| host.starts_with(prefix))
    {
        return true;
    }

    // 172.16.0.0 - 172.31.255.255
    host.strip_prefix("172.")
        .and_then(|rest| rest.split_once('.'))
        .and_then(|(octet, _)| octet.parse::<u8>().ok())
        .is_some_and(|octet| (16..=31).contains(&octet))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_public_host() {
        let result = validate("https://example.com/photos/");
        assert!(result.valid);
        assert!(result.error.is_none());
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(
            check_target("not a url"),
            Err(ValidationError::MalformedUrl { .. })
        ));
        assert!(matches!(
            check_target(""),
            Err(ValidationError::MalformedUrl { .. })
        ));
    }

    #[test]
    fn rejects_non_http_schemes() {
        for input in ["ftp://example.com/", "file:///etc/passwd", "javascript:alert(1)"] {
            assert!(
                matches!(check_target(input), Err(ValidationError::InvalidProtocol { .. })),
                "{input}"
            );
        }
    }

    #[test]
    fn rejects_local_hostnames_case_insensitively() {
        for input in ["http://localhost/", "http://LOCALHOST:8080/", "https://Router/", "http://gateway/"] {
            assert!(
                matches!(check_target(input), Err(ValidationError::LocalHostnameBlocked { .. })),
                "{input}"
            );
        }
    }

    #[test]
    fn rejects_private_literals() {
        for input in [
            "http://127.0.0.1/",
            "http://10.0.0.5/",
            "http://192.168.1.1/",
            "http://172.16.0.1/",
            "http://172.31.255.255/",
            "http://0.0.0.0/",
            "http://[fe80::1]/",
            "http://[fc00::1]/",
        ] {
            assert!(
                matches!(check_target(input), Err(ValidationError::PrivateNetworkBlocked { .. })),
                "{input}"
            );
        }
    }

    #[test]
    fn allows_public_172_range_neighbours() {
        assert!(check_target("http://172.15.0.1/").is_ok());
        assert!(check_target("http://172.32.0.1/").is_ok());
    }

    #[test]
    fn private_check_is_lexical_only() {
        // localtest.me resolves to 127.0.0.1 but is accepted.
        assert!(check_target("http://localtest.me/").is_ok());
        assert!(matches!(
            check_target("http://10.example.com/"),
            Err(ValidationError::PrivateNetworkBlocked { .. })
        ));
    }

    #[test]
    fn normalize_target_adds_https() {
        assert_eq!(normalize_target("  example.com/dir "), "https://example.com/dir");
        assert_eq!(normalize_target("HTTP://example.com"), "HTTP://example.com");
        assert_eq!(normalize_target("http://example.com"), "http://example.com");
    }

    #[test]
    fn validation_result_carries_message() {
        let result = validate("ftp://example.com");
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("ftp"));
    }
}
