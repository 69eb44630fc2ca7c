//! Page fetcher capability
//!
//! This module defines what the extraction pipeline needs from a browser-like page source:
//! - Opening a session (an expensive, stateful resource reused across records)
//! - Navigating to a URL and stopping further loading
//! - Querying a text-queryable DOM view with a bounded per-call timeout
//! - Reading element text and the page title
//!
//! The shipped implementation is [`HttpPageFetcher`], which loads documents over HTTP
//! and queries them as static DOM views.

mod dom;
mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use dom::StaticPage;
pub use http::{build_http_client, HttpPageFetcher, HttpSession};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a fetcher session
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("No page loaded in this session")]
    NoPage,

    #[error("Stale element reference")]
    StaleElement,

    #[error("Session is closed")]
    SessionClosed,

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl FetchError {
    /// Returns true if the session that raised this error should be discarded
    ///
    /// Invalid URLs and stale element handles say nothing about the health of the
    /// session; everything else does.
    pub fn is_session_failure(&self) -> bool {
        !matches!(self, Self::InvalidUrl { .. } | Self::StaleElement)
    }
}

/// How a locator matches the `class` attribute of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassMatch {
    /// The attribute contains the class string anywhere
    Contains,
    /// The attribute equals the class string
    Exact,
}

impl ClassMatch {
    pub fn matches(&self, attr: &str, class: &str) -> bool {
        match self {
            Self::Contains => attr.contains(class),
            Self::Exact => attr == class,
        }
    }
}

/// A locator strategy understood by every session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Any element whose class attribute matches
    Class { class: String, matching: ClassMatch },

    /// The value element next to a label
    ///
    /// Finds the first `div` whose class matches `label_class` and whose own text contains
    /// `label_text`, then its first following sibling `div` (restricted to `value_class`
    /// when given).
    LabeledValue {
        label_class: String,
        matching: ClassMatch,
        label_text: String,
        value_class: Option<String>,
    },

    /// The first locator in the list that resolves
    AnyOf(Vec<Locator>),
}

/// Opaque handle to an element resolved by a session
///
/// Handles are only valid for the navigation that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    pub(crate) generation: u64,
    pub(crate) index: usize,
}

/// A live page session
///
/// Sessions are owned by a single processing loop and are never shared, so the
/// futures they return are not required to be `Send`.
#[async_trait(?Send)]
pub trait PageSession {
    /// Navigates to a URL
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError>;

    /// Stops any further loading of the current page
    async fn stop_loading(&mut self) -> Result<(), FetchError>;

    /// Returns the current page title
    async fn title(&mut self) -> Result<String, FetchError>;

    /// Waits up to `timeout` for the locator to resolve
    ///
    /// Returns `Ok(None)` when the timeout expires without a match.
    async fn query(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Option<Element>, FetchError>;

    /// Reads the rendered text of a resolved element
    async fn read_text(&mut self, element: &Element) -> Result<String, FetchError>;

    /// Releases the session
    async fn close(&mut self) -> Result<(), FetchError>;
}

/// Factory for page sessions
#[async_trait(?Send)]
pub trait PageFetcher {
    type Session: PageSession;

    /// Opens a new session
    async fn open(&self) -> Result<Self::Session, FetchError>;
}
