//! HTTP session against the remote timetable application.
//!
//! The application keeps all navigation state server-side, keyed by the
//! session cookie, so one `Session` must drive one extraction from the root
//! page to the info table without any other request interleaving.

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::error::{ChronosError, Result};

/// Base URL of the timetable application.
pub const ADE_BASE_URL: &str = "http://chronos.epita.net";

/// Configuration for the session client.
#[derive(Debug, Clone)]
pub struct AdeConfig {
    /// Base URL of the application (root page lives at `/`)
    pub base_url: String,
    /// User agent string
    pub user_agent: String,
    pub connect_timeout: Duration,
    /// Per-request timeout; a timeout is a transport failure like any other
    pub request_timeout: Duration,
}

impl Default for AdeConfig {
    fn default() -> Self {
        Self {
            base_url: ADE_BASE_URL.to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// A fetched page, before any status check.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: Url,
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can GET a page while keeping session cookies.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage>;
}

/// `PageFetcher` over a cookie-keeping `reqwest` client.
///
/// Each instance owns its own cookie jar, so separate instances are separate
/// remote sessions.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &AdeConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChronosError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        let response = self.client.get(url.clone()).send().await?;
        let final_url = response.url().clone();
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(FetchedPage {
            url: final_url,
            status,
            body,
        })
    }
}

/// Explicit session state threaded through navigation and week paging.
pub struct Session<F> {
    fetcher: F,
    base: Url,
    correlation_id: String,
    requests: u32,
}

impl<F: PageFetcher> Session<F> {
    pub fn new(fetcher: F, base_url: &str) -> Result<Self> {
        Ok(Self {
            fetcher,
            base: Url::parse(base_url)?,
            correlation_id: generate_correlation_id(),
            requests: 0,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolves a path or relative reference against the base URL.
    pub fn url(&self, reference: &str) -> Result<Url> {
        Ok(self.base.join(reference)?)
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Number of requests issued so far.
    pub fn requests(&self) -> u32 {
        self.requests
    }

    /// Fetches a page and returns its body.
    ///
    /// Any non-success status is a transport error.
    pub async fn get(&mut self, url: &Url) -> Result<String> {
        self.requests += 1;
        debug!(
            correlation_id = %self.correlation_id,
            request = self.requests,
            url = %url,
            "GET"
        );

        let page = self.fetcher.fetch(url).await?;
        if !page.is_success() {
            warn!(
                correlation_id = %self.correlation_id,
                url = %url,
                status = page.status,
                "Remote application returned an error status"
            );
            return Err(ChronosError::Transport {
                url: url.to_string(),
                status: page.status,
            });
        }

        Ok(page.body)
    }
}

/// Generates a unique correlation ID for request tracing.
fn generate_correlation_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    let random: u32 = rand::thread_rng().gen();
    format!("{:x}-{:08x}", timestamp & 0xFFFFFFFF, random)
}

/// In-memory fetcher for tests: serves canned pages and records every URL.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct FakeFetcher {
        pages: Arc<Mutex<HashMap<String, (u16, String)>>>,
        requested: Arc<Mutex<Vec<String>>>,
    }

    impl FakeFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn page(self, url: &str, body: &str) -> Self {
            self.status(url, 200, body)
        }

        pub fn status(self, url: &str, status: u16, body: &str) -> Self {
            self.pages
                .lock()
                .unwrap()
                .insert(url.to_string(), (status, body.to_string()));
            self
        }

        pub fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
            self.requested.lock().unwrap().push(url.to_string());
            let (status, body) = self
                .pages
                .lock()
                .unwrap()
                .get(url.as_str())
                .cloned()
                .unwrap_or((404, String::new()));
            Ok(FetchedPage {
                url: url.clone(),
                status,
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeFetcher;
    use super::*;

    #[tokio::test]
    async fn test_non_success_is_transport_error() {
        let fetcher = FakeFetcher::new()
            .page("http://ade.test/ok", "<html></html>")
            .status("http://ade.test/broken", 500, "oops");
        let mut session = Session::new(fetcher, "http://ade.test").unwrap();

        let ok = session.url("/ok").unwrap();
        assert_eq!(session.get(&ok).await.unwrap(), "<html></html>");

        let broken = session.url("/broken").unwrap();
        let err = session.get(&broken).await.unwrap_err();
        assert!(matches!(err, ChronosError::Transport { status: 500, .. }));
        assert_eq!(session.requests(), 2);
    }

    #[test]
    fn test_correlation_ids_differ() {
        assert_ne!(generate_correlation_id(), generate_correlation_id());
    }
}
