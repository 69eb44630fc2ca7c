//! Scripted in-memory fetcher for unit tests
//!
//! Pages are served from memory. A locator that does not resolve waits out its full
//! timeout, like a browser wait would, so tests should run with tokio's paused clock.

use crate::extract::MEDIA_TYPE_LABEL;
use crate::fetcher::{Element, FetchError, Locator, PageFetcher, PageSession, StaticPage};
use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

/// One scripted navigation outcome
#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    /// Serve this HTML
    Page(String),
    /// Fail the navigation with a session failure
    Crash,
    /// Serve this HTML, then crash on the first field read
    CrashDuringFields(String),
}

#[derive(Default)]
struct MockState {
    scripts: RefCell<HashMap<String, VecDeque<Scripted>>>,
    navigation_latency: Cell<Duration>,
    opened: Cell<usize>,
    closed: Cell<usize>,
    navigations: RefCell<Vec<String>>,
}

#[derive(Clone, Default)]
pub(crate) struct MockFetcher {
    state: Rc<MockState>,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Serves the same page for every navigation to `url`
    pub(crate) fn page(self, url: &str, html: &str) -> Self {
        self.script(url, vec![Scripted::Page(html.to_string())])
    }

    /// Serves the outcomes in order; the last one repeats
    pub(crate) fn script(self, url: &str, outcomes: Vec<Scripted>) -> Self {
        self.state
            .scripts
            .borrow_mut()
            .insert(url.to_string(), outcomes.into());
        self
    }

    pub(crate) fn with_navigation_latency(self, latency: Duration) -> Self {
        self.state.navigation_latency.set(latency);
        self
    }

    pub(crate) fn opened(&self) -> usize {
        self.state.opened.get()
    }

    pub(crate) fn closed(&self) -> usize {
        self.state.closed.get()
    }

    pub(crate) fn navigations(&self) -> Vec<String> {
        self.state.navigations.borrow().clone()
    }

    fn next_outcome(&self, url: &str) -> Scripted {
        let mut scripts = self.state.scripts.borrow_mut();
        match scripts.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Scripted::Crash),
            Some(queue) => queue.front().cloned().unwrap_or(Scripted::Crash),
            None => Scripted::Page(
                "<html><head><title>Page Not Found</title></head><body></body></html>"
                    .to_string(),
            ),
        }
    }
}

#[async_trait(?Send)]
impl PageFetcher for MockFetcher {
    type Session = MockSession;

    async fn open(&self) -> Result<MockSession, FetchError> {
        self.state.opened.set(self.state.opened.get() + 1);
        Ok(MockSession {
            fetcher: self.clone(),
            page: None,
            generation: 0,
            closed: false,
            crash_on_fields: false,
        })
    }
}

pub(crate) struct MockSession {
    fetcher: MockFetcher,
    page: Option<StaticPage>,
    generation: u64,
    closed: bool,
    crash_on_fields: bool,
}

impl MockSession {
    fn page_mut(&mut self) -> Result<&mut StaticPage, FetchError> {
        if self.closed {
            return Err(FetchError::SessionClosed);
        }
        self.page.as_mut().ok_or(FetchError::NoPage)
    }
}

#[async_trait(?Send)]
impl PageSession for MockSession {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
        if self.closed {
            return Err(FetchError::SessionClosed);
        }

        self.fetcher
            .state
            .navigations
            .borrow_mut()
            .push(url.to_string());
        tokio::time::sleep(self.fetcher.state.navigation_latency.get()).await;

        self.page = None;
        self.generation += 1;
        self.crash_on_fields = false;
        match self.fetcher.next_outcome(url) {
            Scripted::Page(html) => {
                self.page = Some(StaticPage::parse(&html, self.generation));
                Ok(())
            }
            Scripted::CrashDuringFields(html) => {
                self.page = Some(StaticPage::parse(&html, self.generation));
                self.crash_on_fields = true;
                Ok(())
            }
            Scripted::Crash => Err(FetchError::Navigation {
                url: url.to_string(),
                message: "browser crashed".to_string(),
            }),
        }
    }

    async fn stop_loading(&mut self) -> Result<(), FetchError> {
        self.page_mut().map(|_| ())
    }

    async fn title(&mut self) -> Result<String, FetchError> {
        Ok(self.page_mut()?.title())
    }

    async fn query(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Option<Element>, FetchError> {
        if self.crash_on_fields {
            if let Locator::LabeledValue { label_text, .. } = locator {
                if label_text != MEDIA_TYPE_LABEL {
                    // The browser died; the session stays unusable
                    self.page = None;
                    self.closed = true;
                    return Err(FetchError::SessionClosed);
                }
            }
        }

        let resolved = self.page_mut()?.resolve(locator);
        if resolved.is_none() {
            tokio::time::sleep(timeout).await;
        }
        Ok(resolved)
    }

    async fn read_text(&mut self, element: &Element) -> Result<String, FetchError> {
        self.page_mut()?.text_of(element)
    }

    async fn close(&mut self) -> Result<(), FetchError> {
        if !self.closed {
            self.closed = true;
            self.fetcher
                .state
                .closed
                .set(self.fetcher.state.closed.get() + 1);
        }
        Ok(())
    }
}

/// Builds a catalog page in the showcase layout
pub(crate) fn showcase_page(media_type: &str, fields: &[(&str, &str)]) -> String {
    catalog_page("showcase-label", "showcase-value", media_type, fields)
}

/// Builds a catalog page in the traditional layout
pub(crate) fn traditional_page(media_type: &str, fields: &[(&str, &str)]) -> String {
    catalog_page("field-name", "field-value", media_type, fields)
}

fn catalog_page(
    label_class: &str,
    value_class: &str,
    media_type: &str,
    fields: &[(&str, &str)],
) -> String {
    let mut rows = format!(
        r#"<div class="{label_class}">Media type</div><div class="{value_class}">{media_type}</div>"#
    );
    for (label, value) in fields {
        rows.push_str(&format!(
            r#"<div class="row"><div class="{label_class}">{label}</div><div class="{value_class}">{value}</div></div>"#
        ));
    }
    format!(
        "<html><head><title>Showcase Media: Specimen</title></head><body><div class=\"row\">{rows}</div></body></html>"
    )
}
