//! Paginated review crawling and reviewer-profile enrichment against a
//! browser-rendered storefront.
//!
//! The pipeline: a [`browser::PageEngine`] renders pages, the
//! [`extract::Extractor`] applies declarative rule sets from
//! [`amrev_core`], and [`scraper::Scraper`] drives pagination and the
//! per-review profile fan-out.

pub mod browser;
pub mod error;
pub mod extract;
mod normalize;
pub mod pagination;
pub mod scraper;

pub use browser::{ChromeEngine, FetchedPage, PageCapture, PageEngine};
pub use error::ScrapeError;
pub use extract::{Extractor, PageKind};
pub use scraper::Scraper;
