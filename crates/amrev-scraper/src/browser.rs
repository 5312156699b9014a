//! The rendered-DOM fetch seam and its Chromium implementation.
//!
//! The scraper only ever sees [`PageEngine`]: load a URL, let scripts run,
//! hand back the page source plus the HTTP status when the engine managed
//! to observe one. Status reporting is best effort by design — DevTools
//! does not always surface the main-document response — and the caller
//! downgrades an unknown status to a warning instead of failing.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EventResponseReceived, ResourceType};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::error::ScrapeError;

/// How long to wait on the DevTools event stream for the main-document
/// response after navigation has already completed.
const STATUS_EVENT_TIMEOUT: Duration = Duration::from_millis(500);

/// One fetched page: rendered source plus the engine-reported HTTP status.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub html: String,
    pub status: Option<u16>,
}

/// Capability surface of the rendered-DOM fetch engine.
///
/// The scraper drives exactly one engine per invocation and issues strictly
/// sequential fetches; implementations may assume no overlapping calls.
#[async_trait]
pub trait PageEngine {
    /// Loads `url`, lets scripts run, and returns the rendered source.
    async fn fetch(&mut self, url: &str) -> Result<FetchedPage, ScrapeError>;

    /// Releases the underlying session. Called once, on every exit path.
    async fn shutdown(&mut self) -> Result<(), ScrapeError>;
}

/// Chromium-backed [`PageEngine`] speaking the DevTools protocol.
///
/// One tab is opened at launch and reused for every navigation; the
/// storefront's session cookies survive across pages that way.
pub struct ChromeEngine {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromeEngine {
    /// Launches a Chromium instance and opens the single tab all fetches
    /// reuse.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Engine`] if the browser cannot be started or
    /// the initial tab cannot be opened.
    pub async fn launch(headless: bool) -> Result<Self, ScrapeError> {
        let mut config = BrowserConfig::builder().no_sandbox();
        if !headless {
            config = config.with_head();
        }
        let config = config
            .build()
            .map_err(|reason| ScrapeError::Engine { reason })?;

        let (browser, mut events) = Browser::launch(config).await.map_err(ScrapeError::engine)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let _ = event;
            }
        });
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(ScrapeError::engine)?;

        Ok(Self {
            browser,
            page,
            handler,
        })
    }
}

#[async_trait]
impl PageEngine for ChromeEngine {
    async fn fetch(&mut self, url: &str) -> Result<FetchedPage, ScrapeError> {
        let mut responses = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(ScrapeError::engine)?;

        self.page.goto(url).await.map_err(ScrapeError::engine)?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(ScrapeError::engine)?;
        // Nudge the viewport so lazily-loaded widgets render.
        self.page
            .evaluate("window.scrollTo(0,20)")
            .await
            .map_err(ScrapeError::engine)?;
        let html = self.page.content().await.map_err(ScrapeError::engine)?;

        // The main-document response is usually buffered by now; if the
        // engine never surfaces it the status stays unknown.
        let status = tokio::time::timeout(STATUS_EVENT_TIMEOUT, async {
            while let Some(event) = responses.next().await {
                if matches!(event.r#type, ResourceType::Document) {
                    return u16::try_from(event.response.status).ok();
                }
            }
            None
        })
        .await
        .unwrap_or(None);

        Ok(FetchedPage { html, status })
    }

    async fn shutdown(&mut self) -> Result<(), ScrapeError> {
        let closed = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(ScrapeError::engine);
        self.handler.abort();
        let _ = (&mut self.handler).await;
        closed
    }
}

/// Append-only sink capturing every fetched page's raw HTML, for debugging
/// selector drift against live markup.
pub struct PageCapture {
    file: File,
}

impl PageCapture {
    /// Creates (or truncates) the capture file at `path`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be created.
    pub fn create(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            file: File::create(path)?,
        })
    }

    pub(crate) fn write(&mut self, html: &str) -> std::io::Result<()> {
        self.file.write_all(html.as_bytes())
    }
}
