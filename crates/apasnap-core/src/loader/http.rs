use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, warn};

use super::{LoadError, PageLoader};

/// HTTP page loader with connection pooling and optional retries with backoff.
#[derive(Debug, Clone)]
pub struct HttpLoader {
    client: Client,
    max_retries: u32,
    base_backoff: Duration,
}

impl HttpLoader {
    pub fn new(
        timeout: Option<Duration>,
        max_retries: u32,
        base_backoff: Duration,
    ) -> Result<Self, LoadError> {
        let client = Self::build_client(timeout)?;
        Ok(Self::with_client(client, max_retries, base_backoff))
    }

    pub fn with_client(client: Client, max_retries: u32, base_backoff: Duration) -> Self {
        Self {
            client,
            max_retries,
            base_backoff,
        }
    }

    pub fn from_config(config: &crate::config::GalleryConfig) -> Result<Self, LoadError> {
        Self::new(config.request_timeout, config.max_retries, config.retry_backoff)
    }

    pub fn build_client(timeout: Option<Duration>) -> Result<Client, LoadError> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(8)
            .gzip(true)
            .user_agent(concat!("apasnap/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().map_err(|e| LoadError::Client(e.to_string()))
    }

    async fn fetch(&self, uri: &str) -> Result<Response, LoadError> {
        let mut last_error = LoadError::Network {
            url: uri.to_string(),
            reason: "no attempt made".into(),
            is_last_retry: true,
        };

        for attempt in 0..=self.max_retries {
            let is_last = attempt == self.max_retries;

            if attempt > 0 {
                let backoff = self.base_backoff * 2u32.saturating_pow(attempt - 1);
                debug!(uri, attempt, backoff_ms = backoff.as_millis(), "Retrying fetch");
                tokio::time::sleep(backoff).await;
            }

            match self.client.get(uri).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status().as_u16();
                    let message = response
                        .status()
                        .canonical_reason()
                        .unwrap_or("Unknown")
                        .to_string();
                    debug!(uri, status, attempt, "Fetch returned error status");
                    let err = LoadError::Http {
                        url: uri.to_string(),
                        status,
                        message,
                        is_last_retry: is_last,
                    };

                    if (400..500).contains(&status) && status != 429 {
                        return Err(err);
                    }
                    last_error = err;
                }
                Err(e) if e.is_timeout() => {
                    warn!(uri, attempt, "Fetch timed out");
                    last_error = LoadError::Timeout {
                        url: uri.to_string(),
                        is_last_retry: is_last,
                    };
                }
                Err(e) => {
                    debug!(uri, attempt, error = %e, "Fetch network error");
                    last_error = LoadError::Network {
                        url: uri.to_string(),
                        reason: e.to_string(),
                        is_last_retry: is_last,
                    };
                }
            }
        }

        Err(last_error)
    }

    fn body_error(uri: &str, e: reqwest::Error) -> LoadError {
        LoadError::Network {
            url: uri.to_string(),
            reason: e.to_string(),
            is_last_retry: true,
        }
    }
}

#[async_trait]
impl PageLoader for HttpLoader {
    async fn load(&self, uri: &str) -> Result<String, LoadError> {
        let response = self.fetch(uri).await?;
        response.text().await.map_err(|e| Self::body_error(uri, e))
    }

    async fn load_bytes(&self, uri: &str) -> Result<Vec<u8>, LoadError> {
        let response = self.fetch(uri).await?;
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| Self::body_error(uri, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn loader(max_retries: u32) -> HttpLoader {
        HttpLoader::new(Some(Duration::from_secs(5)), max_retries, Duration::from_millis(10))
            .unwrap()
    }

    #[tokio::test]
    async fn load_returns_body_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/photos/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><a href=\"a.jpg\">a.jpg</a></html>"))
            .mount(&server)
            .await;

        let result = loader(0).load(&format!("{}/photos/", server.uri())).await;
        assert!(result.unwrap().contains("a.jpg"));
    }

    #[tokio::test]
    async fn load_bytes_returns_raw_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .mount(&server)
            .await;

        let bytes = loader(0).load_bytes(&format!("{}/a.jpg", server.uri())).await.unwrap();
        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn load_does_not_retry_403() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/private/"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let err = loader(3).load(&format!("{}/private/", server.uri())).await.unwrap_err();
        assert_eq!(err.status_code(), Some(403));
        assert_eq!(err.auth_status(), Some(403));
    }

    #[tokio::test]
    async fn load_retries_on_500_then_succeeds() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/flaky/"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/flaky/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .mount(&server)
            .await;

        let result = loader(3).load(&format!("{}/flaky/", server.uri())).await;
        assert_eq!(result.unwrap(), "OK");
    }

    #[tokio::test]
    async fn load_returns_error_after_max_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down/"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = loader(2).load(&format!("{}/down/", server.uri())).await.unwrap_err();
        assert!(err.is_last_retry());
        assert_eq!(err.status_code(), Some(502));
        assert_eq!(err.auth_status(), None);
    }
}
