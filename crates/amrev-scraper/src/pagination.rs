//! Listing-page URL construction for the review crawl.
//!
//! The storefront exposes review pages through a `pageNumber` query
//! parameter appended to the product review base URL; the `ref` path
//! segment mirrors what the site's own next-page button emits, which keeps
//! the crawl indistinguishable from paging by hand.

/// Builds the listing URL for `page` under `base_url`.
///
/// `base_url` is expected to end with `/`, e.g.
/// `https://www.amazon.com/product-reviews/B01AMT0EYU/`.
#[must_use]
pub fn page_url(base_url: &str, page: u32) -> String {
    format!("{base_url}ref=cm_cr_arp_d_paging_btm_next_{page}?pageNumber={page}")
}
