//! Listing pagination.
//!
//! The loop consumes the already-extracted first page handed over by the
//! orchestrator, then walks forward one listing at a time. Continuation is
//! decided by prefetching: page N's reviews are appended while page N+1 is
//! fetched to see whether anything is left, so the fetch one past the last
//! consumed page (or one past `stop_page`) is expected and discarded.
//!
//! There is no retry here. An HTTP failure mid-pagination aborts the whole
//! crawl — a partial listing would silently misrepresent the product.

use serde_json::Value;

use crate::browser::PageEngine;
use crate::error::ScrapeError;
use crate::extract::PageKind;
use crate::pagination::page_url;

use super::{take_reviews, Scraper};

impl<E: PageEngine> Scraper<E> {
    /// Walks listing pages starting from the `seed` reviews of `start_page`
    /// until a page comes back empty or `stop_page` (inclusive) is passed.
    ///
    /// Every review is tagged with the `url` of the listing page it was
    /// scraped from before being appended; order is listing order,
    /// page by page.
    pub(crate) async fn collect_reviews(
        &mut self,
        base_url: &str,
        seed: Vec<Value>,
        start_page: u32,
        stop_page: Option<u32>,
    ) -> Result<Vec<Value>, ScrapeError> {
        let stop_page = stop_page.unwrap_or(u32::MAX);
        let mut collected = Vec::new();
        let mut page = start_page;
        let mut current_url = page_url(base_url, page);
        let mut page_reviews = seed;

        while !page_reviews.is_empty() && page <= stop_page {
            for mut review in page_reviews {
                if let Value::Object(fields) = &mut review {
                    fields.insert("url".to_owned(), Value::String(current_url.clone()));
                }
                collected.push(review);
            }

            page += 1;
            current_url = page_url(base_url, page);
            let html = self.fetch_page(&current_url, true).await?;
            let mut next = self
                .extractor
                .extract(PageKind::ReviewListing, &html, &current_url)
                .await?;
            page_reviews = take_reviews(&mut next);
            if !page_reviews.is_empty() {
                tracing::info!(page, count = page_reviews.len(), "listing page has reviews");
            }
        }

        Ok(collected)
    }
}
