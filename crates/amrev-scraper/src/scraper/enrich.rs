//! Reviewer-profile enrichment over a crawled review sequence.

use amrev_core::Record;
use serde_json::Value;

use crate::browser::PageEngine;
use crate::error::ScrapeError;

use super::Scraper;

/// HTTP failure statuses during profile enrichment that annotate the review
/// instead of aborting the batch — typically throttling or a consent wall,
/// both worth riding out for the remaining profiles.
const RECOVERABLE_PROFILE_STATUSES: [u16; 2] = [403, 503];

impl<E: PageEngine> Scraper<E> {
    /// Merges reviewer-profile data into each review, in place.
    ///
    /// Per review:
    /// - no `profile_link`: skipped with a warning, no annotation;
    /// - profile extracted but with no nested reviews: merged together with
    ///   a `profile_error` annotation flagging it for the operator;
    /// - fetch failed with a recoverable status: the review gets only the
    ///   `profile_error` annotation and the batch continues;
    /// - any other HTTP failure: the whole enrichment aborts, the failing
    ///   review unannotated.
    pub(crate) async fn add_profiles(
        &mut self,
        reviews: &mut [Value],
    ) -> Result<(), ScrapeError> {
        for review in reviews.iter_mut() {
            let Some(link) = review
                .get("profile_link")
                .and_then(Value::as_str)
                .map(str::to_owned)
            else {
                tracing::warn!("no profile link was extracted");
                continue;
            };

            let profile = match self.profile_data(&link).await {
                Ok(mut profile) => {
                    if !has_profile_reviews(&profile) && !profile.contains_key("profile_error") {
                        profile.insert(
                            "profile_error".to_owned(),
                            Value::String("No data could be extracted".to_owned()),
                        );
                    }
                    profile
                }
                Err(error @ ScrapeError::Http { status, .. }) => {
                    tracing::error!(%link, %error, "profile download failed");
                    if !RECOVERABLE_PROFILE_STATUSES.contains(&status) {
                        return Err(error);
                    }
                    let mut annotation = Record::new();
                    annotation.insert(
                        "profile_error".to_owned(),
                        Value::String(error.to_string()),
                    );
                    annotation
                }
                Err(error) => return Err(error),
            };

            if let Value::Object(fields) = review {
                for (key, value) in profile {
                    fields.insert(key, value);
                }
            }
        }
        Ok(())
    }
}

fn has_profile_reviews(profile: &Record) -> bool {
    match profile.get("profile_reviews") {
        Some(Value::Array(reviews)) => !reviews.is_empty(),
        _ => false,
    }
}
