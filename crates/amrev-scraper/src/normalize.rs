//! Field normalizers converting raw extracted text into typed JSON values.
//!
//! Every normalizer is a pure string transformation except the image probe,
//! which fetches the avatar URL and compares its byte length against the
//! storefront's blank placeholder. Failures are strict (`ScrapeError::Format`)
//! with two deliberate exceptions: a per-review rating that cannot be read
//! becomes null, and an absent helpful-vote statement counts as zero.

use serde_json::{json, Value};

use crate::error::ScrapeError;

/// Accepted calendar date layouts, tried in order; first match wins.
const DATE_FORMATS: [&str; 2] = ["%b %d, %Y", "%B %d, %Y"];

/// Byte length of the storefront's blank avatar placeholder image.
const PLACEHOLDER_AVATAR_BYTES: usize = 7186;

/// Relative tolerance when comparing an avatar against the placeholder size.
const PLACEHOLDER_REL_TOLERANCE: f64 = 0.05;

/// The registry of normalizers a rule set may name.
///
/// Names are stable and versioned together with the rule sets; resolution
/// is an explicit lookup at rule-compilation time, not dynamic dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Normalizer {
    ReviewDate,
    ProfileReviewDate,
    AverageRating,
    ReviewRating,
    Integer,
    NumRatings,
    FoundHelpful,
    VerifiedPurchase,
    ImagePresence,
}

impl Normalizer {
    pub(crate) fn resolve(name: &str) -> Option<Self> {
        match name {
            "review_date" => Some(Self::ReviewDate),
            "profile_review_date" => Some(Self::ProfileReviewDate),
            "average_rating" => Some(Self::AverageRating),
            "review_rating" => Some(Self::ReviewRating),
            "integer" => Some(Self::Integer),
            "num_ratings" => Some(Self::NumRatings),
            "found_helpful" => Some(Self::FoundHelpful),
            "verified_purchase" => Some(Self::VerifiedPurchase),
            "image_presence" => Some(Self::ImagePresence),
            _ => None,
        }
    }

    /// Applies the normalizer to a raw extracted value.
    ///
    /// `http` is only touched by [`Normalizer::ImagePresence`].
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Format`] when the input does not match the
    /// expected shape, except on the permissive paths documented above.
    pub(crate) async fn apply(
        self,
        raw: Option<&str>,
        http: &reqwest::Client,
    ) -> Result<Value, ScrapeError> {
        match self {
            Self::ReviewDate => optional(raw, |text| {
                Ok(Value::from(convert_date(tail_after(text, "on ")?)?))
            }),
            Self::ProfileReviewDate => optional(raw, |text| {
                Ok(Value::from(convert_date(tail_after(text, " · ")?)?))
            }),
            Self::AverageRating => optional(raw, |text| Ok(json!(convert_rating(text)?))),
            Self::ReviewRating => Ok(review_rating(raw)),
            Self::Integer => optional(raw, |text| Ok(json!(convert_integer(text)?))),
            Self::NumRatings => optional(raw, |text| Ok(json!(num_ratings(text)?))),
            Self::FoundHelpful => Ok(json!(found_helpful(raw)?)),
            Self::VerifiedPurchase => Ok(Value::Bool(
                raw.is_some_and(|text| text.contains("Verified Purchase")),
            )),
            Self::ImagePresence => Ok(image_presence(raw, http).await),
        }
    }
}

/// Absent input is not an error for value normalizers: the field is simply
/// null and `required`-ness is enforced by the extraction adapter.
fn optional(
    raw: Option<&str>,
    convert: impl FnOnce(&str) -> Result<Value, ScrapeError>,
) -> Result<Value, ScrapeError> {
    raw.map_or(Ok(Value::Null), convert)
}

/// Returns the text after the *last* occurrence of `sep`.
fn tail_after<'a>(text: &'a str, sep: &str) -> Result<&'a str, ScrapeError> {
    match text.rsplit_once(sep) {
        Some((_, tail)) => Ok(tail),
        None => Err(ScrapeError::format(
            text,
            format!("missing \"{sep}\" separator"),
        )),
    }
}

/// Parses a byline date like `"January 3, 2023"` into `"2023/01/03"`.
fn convert_date(text: &str) -> Result<String, ScrapeError> {
    for format in DATE_FORMATS {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(text, format) {
            return Ok(date.format("%Y/%m/%d").to_string());
        }
    }
    Err(ScrapeError::format(text, "not a recognized calendar date"))
}

/// Parses the leading number of a rating phrase like `"4.2 out of 5.0"` or
/// `"4,8 von 5"`. The decimal comma covers localized storefronts.
fn convert_rating(text: &str) -> Result<f64, ScrapeError> {
    let (value, _) = text
        .split_once(' ')
        .ok_or_else(|| ScrapeError::format(text, "expected \"<value> out of <scale>\""))?;
    value
        .replacen(',', ".", 1)
        .parse::<f64>()
        .map_err(|_| ScrapeError::format(text, "rating prefix is not a number"))
}

/// Per-review star rating, truncated to a whole number of stars.
///
/// Deliberately permissive: a review card with a missing or unreadable
/// rating widget yields null rather than failing the whole page.
fn review_rating(raw: Option<&str>) -> Value {
    match raw.map(convert_rating) {
        #[allow(clippy::cast_possible_truncation)]
        Some(Ok(value)) if value.is_finite() => json!(value.trunc() as i64),
        _ => Value::Null,
    }
}

/// Parses an integer that may carry one `,` and one `.` as thousand
/// separators. Neither is ever a decimal point in count fields.
fn convert_integer(text: &str) -> Result<i64, ScrapeError> {
    text.replacen(',', "", 1)
        .replacen('.', "", 1)
        .parse::<i64>()
        .map_err(|_| ScrapeError::format(text, "not an integer"))
}

/// Parses `"1,234 global ratings"` (any locale suffix after `" global"`).
fn num_ratings(text: &str) -> Result<i64, ScrapeError> {
    let (count, _) = text
        .split_once(" global")
        .ok_or_else(|| ScrapeError::format(text, "missing \" global\" marker"))?;
    convert_integer(count)
}

/// Parses a helpful-vote statement such as `"one person found this helpful"`
/// or `"1,384 people found this helpful"`. Absent input counts as zero.
///
/// One thousands comma is tolerated in the leading token; decimal points are
/// not. Negative counts are accepted as-is.
fn found_helpful(raw: Option<&str>) -> Result<i64, ScrapeError> {
    let Some(text) = raw else { return Ok(0) };
    let (count, _) = text.split_once(' ').ok_or_else(|| {
        ScrapeError::format(text, "expected \"<count> ... found this helpful\"")
    })?;
    if count.eq_ignore_ascii_case("one") || count.eq_ignore_ascii_case("eine") {
        return Ok(1);
    }
    count
        .replacen(',', "", 1)
        .parse::<i64>()
        .map_err(|_| ScrapeError::format(count, "not a vote count"))
}

/// Probes the avatar URL: null when the image cannot be fetched, otherwise
/// whether its size differs from the placeholder by more than the tolerance.
async fn image_presence(raw: Option<&str>, http: &reqwest::Client) -> Value {
    let Some(url) = raw else { return Value::Null };
    let response = match http.get(url).send().await {
        Ok(response) => response,
        Err(error) => {
            tracing::warn!(%url, %error, "avatar fetch failed");
            return Value::Null;
        }
    };
    if !response.status().is_success() {
        tracing::warn!(%url, status = %response.status(), "avatar fetch rejected");
        return Value::Null;
    }
    match response.bytes().await {
        #[allow(clippy::cast_precision_loss)]
        Ok(bytes) => Value::Bool(!is_close(
            bytes.len() as f64,
            PLACEHOLDER_AVATAR_BYTES as f64,
        )),
        Err(error) => {
            tracing::warn!(%url, %error, "avatar body read failed");
            Value::Null
        }
    }
}

/// Relative-tolerance closeness, `math.isclose` style.
fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= PLACEHOLDER_REL_TOLERANCE * a.abs().max(b.abs())
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
