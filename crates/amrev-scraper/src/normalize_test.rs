use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

/// Plain client for probe tests; normalizer tests that never touch the
/// network share it too since `apply` demands one.
fn test_client() -> reqwest::Client {
    reqwest::Client::new()
}

async fn apply(name: &str, raw: Option<&str>) -> Result<Value, ScrapeError> {
    let normalizer = Normalizer::resolve(name).expect("known normalizer name");
    normalizer.apply(raw, &test_client()).await
}

// ---------------------------------------------------------------------------
// registry
// ---------------------------------------------------------------------------

#[test]
fn resolve_knows_every_rule_set_name() {
    for name in [
        "review_date",
        "profile_review_date",
        "average_rating",
        "review_rating",
        "integer",
        "num_ratings",
        "found_helpful",
        "verified_purchase",
        "image_presence",
    ] {
        assert!(Normalizer::resolve(name).is_some(), "unresolved: {name}");
    }
}

#[test]
fn resolve_rejects_unknown_names() {
    assert!(Normalizer::resolve("ReviewDate").is_none());
    assert!(Normalizer::resolve("date").is_none());
}

// ---------------------------------------------------------------------------
// dates
// ---------------------------------------------------------------------------

#[test]
fn convert_date_accepts_both_month_layouts() {
    assert_eq!(convert_date("Jan 3, 2023").unwrap(), "2023/01/03");
    assert_eq!(convert_date("November 5, 2020").unwrap(), "2020/11/05");
}

#[test]
fn convert_date_rejects_other_layouts() {
    for text in ["", "No date", "2022/02/22", "3 Jan 2023"] {
        assert!(
            matches!(convert_date(text), Err(ScrapeError::Format { .. })),
            "accepted: {text:?}"
        );
    }
}

#[tokio::test]
async fn review_date_strips_the_byline_prefix() {
    let value = apply(
        "review_date",
        Some("Reviewed in the United States on January 3, 2023"),
    )
    .await
    .unwrap();
    assert_eq!(value, json!("2023/01/03"));
}

#[tokio::test]
async fn review_date_without_separator_is_an_error() {
    for text in ["", "No date", "on", "2022/02/22", " - "] {
        let result = apply("review_date", Some(text)).await;
        assert!(
            matches!(result, Err(ScrapeError::Format { .. })),
            "accepted: {text:?}"
        );
    }
}

#[tokio::test]
async fn profile_review_date_splits_on_the_last_middle_dot() {
    let value = apply(
        "profile_review_date",
        Some("Top reviewer · Reviewed in Germany · November 5, 2020"),
    )
    .await
    .unwrap();
    assert_eq!(value, json!("2020/11/05"));
}

#[tokio::test]
async fn absent_date_is_null() {
    assert_eq!(apply("review_date", None).await.unwrap(), Value::Null);
}

// ---------------------------------------------------------------------------
// ratings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn average_rating_parses_english_and_german_phrasing() {
    assert_eq!(
        apply("average_rating", Some("4.2 out of 5.0")).await.unwrap(),
        json!(4.2)
    );
    assert_eq!(
        apply("average_rating", Some("4,8 von 5")).await.unwrap(),
        json!(4.8)
    );
}

#[tokio::test]
async fn average_rating_rejects_malformed_phrases() {
    for text in ["", "4.1outof5.0", "4,1von5", "4,2von 5", " ", " 4,2", " 4.2"] {
        let result = apply("average_rating", Some(text)).await;
        assert!(
            matches!(result, Err(ScrapeError::Format { .. })),
            "accepted: {text:?}"
        );
    }
}

#[tokio::test]
async fn review_rating_truncates_to_whole_stars() {
    assert_eq!(
        apply("review_rating", Some("5.0 out of 5 stars")).await.unwrap(),
        json!(5)
    );
    assert_eq!(
        apply("review_rating", Some("4,0 von 5 Sternen")).await.unwrap(),
        json!(4)
    );
}

#[tokio::test]
async fn review_rating_is_permissive() {
    // Unreadable or missing star widgets must not fail the page.
    assert_eq!(apply("review_rating", None).await.unwrap(), Value::Null);
    assert_eq!(
        apply("review_rating", Some("no stars here")).await.unwrap(),
        Value::Null
    );
}

// ---------------------------------------------------------------------------
// counts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn integer_strips_one_separator_of_each_kind() {
    assert_eq!(apply("integer", Some("1")).await.unwrap(), json!(1));
    assert_eq!(apply("integer", Some("11")).await.unwrap(), json!(11));
    assert_eq!(apply("integer", Some("1.111")).await.unwrap(), json!(1111));
    assert_eq!(apply("integer", Some("1,111")).await.unwrap(), json!(1111));
}

#[tokio::test]
async fn num_ratings_requires_the_global_marker() {
    assert_eq!(
        apply("num_ratings", Some("1234 global ratings")).await.unwrap(),
        json!(1234)
    );
    assert_eq!(
        apply("num_ratings", Some("1.234 globale Bewertungen"))
            .await
            .unwrap(),
        json!(1234)
    );
    for text in ["", "1234", "123 ", "1 word", "1 globa"] {
        let result = apply("num_ratings", Some(text)).await;
        assert!(
            matches!(result, Err(ScrapeError::Format { .. })),
            "accepted: {text:?}"
        );
    }
}

#[tokio::test]
async fn found_helpful_defaults_to_zero_when_absent() {
    assert_eq!(apply("found_helpful", None).await.unwrap(), json!(0));
}

#[tokio::test]
async fn found_helpful_reads_the_leading_token() {
    let cases = [
        ("one person found this helpful", 1),
        ("one personfound this helpful", 1),
        ("Eine Person fand dies hilfreich", 1),
        ("2 people found this helpful", 2),
        ("3 (ignored humans) found this helpful, this is also ignored", 3),
        ("1,384 people found this helpful", 1_384),
        // Should not happen on a real page, preserved as valid regardless.
        ("-1 people found this helpful", -1),
    ];
    for (text, expected) in cases {
        assert_eq!(
            apply("found_helpful", Some(text)).await.unwrap(),
            json!(expected),
            "for {text:?}"
        );
    }
}

#[tokio::test]
async fn found_helpful_rejects_non_integer_tokens() {
    for text in [
        "oe person found this helpful",
        "2people found this helpful",
        "2.3 people found this helpful",
        "",
    ] {
        let result = apply("found_helpful", Some(text)).await;
        assert!(
            matches!(result, Err(ScrapeError::Format { .. })),
            "accepted: {text:?}"
        );
    }
}

// ---------------------------------------------------------------------------
// verified purchase
// ---------------------------------------------------------------------------

#[tokio::test]
async fn verified_purchase_is_a_substring_test() {
    assert_eq!(
        apply("verified_purchase", Some("Verified Purchase")).await.unwrap(),
        json!(true)
    );
    assert_eq!(
        apply("verified_purchase", Some("Vine Customer Review"))
            .await
            .unwrap(),
        json!(false)
    );
    assert_eq!(apply("verified_purchase", None).await.unwrap(), json!(false));
}

// ---------------------------------------------------------------------------
// image presence probe
// ---------------------------------------------------------------------------

#[tokio::test]
async fn image_presence_true_for_a_real_avatar() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/avatar.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 48_000]))
        .mount(&server)
        .await;

    let url = format!("{}/avatar.jpg", server.uri());
    let value = apply("image_presence", Some(&url)).await.unwrap();
    assert_eq!(value, json!(true));
}

#[tokio::test]
async fn image_presence_false_for_the_placeholder_size() {
    let server = MockServer::start().await;
    // Within 5% of the 7186-byte placeholder counts as blank.
    Mock::given(method("GET"))
        .and(path("/avatar.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 7_186]))
        .mount(&server)
        .await;

    let url = format!("{}/avatar.jpg", server.uri());
    let value = apply("image_presence", Some(&url)).await.unwrap();
    assert_eq!(value, json!(false));
}

#[tokio::test]
async fn image_presence_false_just_inside_the_tolerance() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/avatar.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 7_400]))
        .mount(&server)
        .await;

    let url = format!("{}/avatar.jpg", server.uri());
    let value = apply("image_presence", Some(&url)).await.unwrap();
    assert_eq!(value, json!(false));
}

#[tokio::test]
async fn image_presence_null_when_the_fetch_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/avatar.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/avatar.jpg", server.uri());
    assert_eq!(apply("image_presence", Some(&url)).await.unwrap(), Value::Null);
}

#[tokio::test]
async fn image_presence_null_when_no_image_was_extracted() {
    assert_eq!(apply("image_presence", None).await.unwrap(), Value::Null);
}

#[test]
fn is_close_uses_relative_tolerance() {
    assert!(is_close(7_186.0, 7_186.0));
    assert!(is_close(7_400.0, 7_186.0));
    assert!(!is_close(48_000.0, 7_186.0));
    assert!(!is_close(0.0, 7_186.0));
}
