//! HTTP page fetcher implementation
//!
//! This module loads catalog pages over HTTP and exposes them as static DOM views:
//! - Building HTTP clients with the configured user agent and timeouts
//! - GET requests for navigation (non-2xx pages still load, like in a browser)
//! - Transport error classification into session failures

use crate::config::FetcherConfig;
use crate::fetcher::{Element, FetchError, Locator, PageFetcher, PageSession, StaticPage};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use media_harvest::config::FetcherConfig;
/// use media_harvest::fetcher::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.page_load_timeout())
        .connect_timeout(config.connect_timeout())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Opens HTTP-backed page sessions
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    config: FetcherConfig,
}

impl HttpPageFetcher {
    pub fn new(config: FetcherConfig) -> Self {
        Self { config }
    }
}

#[async_trait(?Send)]
impl PageFetcher for HttpPageFetcher {
    type Session = HttpSession;

    async fn open(&self) -> Result<HttpSession, FetchError> {
        tracing::debug!("Opening HTTP page session");
        let client = build_http_client(&self.config)?;
        Ok(HttpSession {
            client,
            page: None,
            generation: 0,
            closed: false,
        })
    }
}

/// A page session backed by one HTTP client
pub struct HttpSession {
    client: Client,
    page: Option<StaticPage>,
    generation: u64,
    closed: bool,
}

impl HttpSession {
    fn ensure_open(&self) -> Result<(), FetchError> {
        if self.closed {
            return Err(FetchError::SessionClosed);
        }
        Ok(())
    }

    fn page(&self) -> Result<&StaticPage, FetchError> {
        self.ensure_open()?;
        self.page.as_ref().ok_or(FetchError::NoPage)
    }
}

#[async_trait(?Send)]
impl PageSession for HttpSession {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
        self.ensure_open()?;

        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        // Drop the previous page first so its element handles go stale
        self.page = None;
        self.generation += 1;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| classify_transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("{} answered HTTP {}", url, status.as_u16());
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(url, e))?;

        self.page = Some(StaticPage::parse(&body, self.generation));
        Ok(())
    }

    async fn stop_loading(&mut self) -> Result<(), FetchError> {
        // The document is complete once the body is read; nothing else loads
        self.page().map(|_| ())
    }

    async fn title(&mut self) -> Result<String, FetchError> {
        Ok(self.page()?.title())
    }

    async fn query(
        &mut self,
        locator: &Locator,
        _timeout: Duration,
    ) -> Result<Option<Element>, FetchError> {
        self.ensure_open()?;
        let page = self.page.as_mut().ok_or(FetchError::NoPage)?;
        Ok(page.resolve(locator))
    }

    async fn read_text(&mut self, element: &Element) -> Result<String, FetchError> {
        self.page()?.text_of(element)
    }

    async fn close(&mut self) -> Result<(), FetchError> {
        self.closed = true;
        self.page = None;
        Ok(())
    }
}

/// Classifies a transport error into a navigation failure
fn classify_transport_error(url: &str, error: reqwest::Error) -> FetchError {
    let message = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else {
        error.to_string()
    };

    FetchError::Navigation {
        url: url.to_string(),
        message,
    }
}
