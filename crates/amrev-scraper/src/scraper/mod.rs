//! The scrape orchestrator.
//!
//! [`Scraper`] owns the browser session, the extraction adapter, and the
//! optional raw-HTML capture sink for one invocation. All fetches are
//! strictly sequential — the engine has a single tab and cannot serve
//! overlapping navigations.

mod crawl;
mod enrich;

use amrev_core::Record;
use serde_json::Value;

use crate::browser::{PageCapture, PageEngine};
use crate::error::ScrapeError;
use crate::extract::{Extractor, PageKind};
use crate::pagination::page_url;

pub struct Scraper<E> {
    engine: E,
    extractor: Extractor,
    capture: Option<PageCapture>,
}

impl<E: PageEngine> Scraper<E> {
    /// Wraps `engine` with the built-in rule sets.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] if the built-in rule sets fail to compile.
    pub fn new(engine: E) -> Result<Self, ScrapeError> {
        Ok(Self {
            engine,
            extractor: Extractor::with_default_rules()?,
            capture: None,
        })
    }

    /// Mirrors every fetched page's raw HTML into `capture`.
    #[must_use]
    pub fn with_capture(mut self, capture: PageCapture) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Fetches one rendered page through the engine.
    ///
    /// With `check_status`, a known status ≥ 400 fails with
    /// [`ScrapeError::Http`]; an unknown status only warns. Engines cannot
    /// always observe the response, and treating that as fatal would kill
    /// otherwise working crawls.
    pub(crate) async fn fetch_page(
        &mut self,
        url: &str,
        check_status: bool,
    ) -> Result<String, ScrapeError> {
        tracing::info!(%url, "downloading page");
        let page = self.engine.fetch(url).await?;

        if let Some(capture) = &mut self.capture {
            capture.write(&page.html)?;
        }

        if check_status {
            match page.status {
                Some(status) if status >= 400 => {
                    return Err(ScrapeError::Http {
                        status,
                        url: url.to_owned(),
                    });
                }
                Some(_) => {}
                None => tracing::warn!(%url, "failed to get HTTP status code"),
            }
        }

        Ok(page.html)
    }

    async fn listing_data(&mut self, url: &str) -> Result<Record, ScrapeError> {
        let html = self.fetch_page(url, true).await?;
        self.extractor
            .extract(PageKind::ReviewListing, &html, url)
            .await
    }

    /// Fetches and extracts a single reviewer profile page.
    ///
    /// A structurally broken profile page (required field missing) is
    /// reported through a `profile_error` annotation instead of an error;
    /// HTTP and normalizer failures still propagate.
    pub async fn profile_data(&mut self, url: &str) -> Result<Record, ScrapeError> {
        let html = self.fetch_page(url, true).await?;
        match self.extractor.extract(PageKind::Profile, &html, url).await {
            Ok(profile) => {
                if let Ok(pretty) = serde_json::to_string_pretty(&profile) {
                    tracing::info!("extracted profile:\n{pretty}");
                }
                Ok(profile)
            }
            Err(error @ ScrapeError::Shape { .. }) => {
                let mut profile = Record::new();
                profile.insert(
                    "profile_error".to_owned(),
                    Value::String(format!("Error: {error}")),
                );
                Ok(profile)
            }
            Err(error) => Err(error),
        }
    }

    /// Top-level review crawl: first listing page, pagination, optional
    /// profile enrichment, reassembled into one crawl result.
    ///
    /// # Errors
    ///
    /// Any [`ScrapeError`] aborts the whole invocation; no partial crawl
    /// result is ever returned.
    pub async fn run(
        &mut self,
        base_url: &str,
        download_profiles: bool,
        start_page: u32,
        stop_page: Option<u32>,
    ) -> Result<Record, ScrapeError> {
        let mut data = self.listing_data(&page_url(base_url, start_page)).await?;
        let seed = take_reviews(&mut data);

        let mut reviews = self
            .collect_reviews(base_url, seed, start_page, stop_page)
            .await?;
        if download_profiles {
            self.add_profiles(&mut reviews).await?;
        }

        data.insert("reviews".to_owned(), Value::Array(reviews));
        Ok(data)
    }

    /// Entry point when the operator's URL is itself a profile page; the
    /// crawl loop is bypassed entirely.
    ///
    /// # Errors
    ///
    /// Propagates HTTP, engine, and normalizer failures; see
    /// [`Scraper::profile_data`] for the shape-failure annotation path.
    pub async fn run_profile(&mut self, url: &str) -> Result<Record, ScrapeError> {
        self.profile_data(url).await
    }

    /// Releases the browser session.
    ///
    /// Callers must invoke this on every exit path, including after a
    /// failed crawl, so the engine process is never leaked.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Engine`] if teardown fails.
    pub async fn shutdown(mut self) -> Result<(), ScrapeError> {
        self.engine.shutdown().await
    }
}

/// Detaches the review array from a listing record; a missing or null
/// `reviews` field is an empty list.
fn take_reviews(data: &mut Record) -> Vec<Value> {
    match data.remove("reviews") {
        Some(Value::Array(reviews)) => reviews,
        _ => Vec::new(),
    }
}
