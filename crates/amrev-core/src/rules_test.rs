use super::*;

#[test]
fn builtin_review_page_rules_load_and_validate() {
    let rules = RuleSet::review_page().expect("embedded review rules must load");
    assert_eq!(rules.version, 1);

    let reviews = rules.fields.get("reviews").expect("reviews rule present");
    assert!(reviews.many);
    let children = reviews.fields.as_ref().expect("reviews has nested fields");
    for field in [
        "title",
        "body",
        "rating",
        "date",
        "found_helpful",
        "review_link",
        "verified_purchase",
        "profile_link",
    ] {
        assert!(children.contains_key(field), "missing review field {field}");
    }
}

#[test]
fn builtin_review_page_marks_listing_headline_fields_required() {
    let rules = RuleSet::review_page().unwrap();
    assert!(rules.fields["average_rating"].required);
    assert!(rules.fields["num_ratings"].required);
    assert!(!rules.fields["reviews"].required);
}

#[test]
fn builtin_profile_page_rules_load_and_validate() {
    let rules = RuleSet::profile_page().expect("embedded profile rules must load");
    assert_eq!(rules.version, 1);
    assert!(rules.fields["profile_name"].required);
    assert!(rules.fields["profile_influence"].required);
    assert!(rules.fields["profile_num_reviews"].required);
    assert!(!rules.fields["profile_reviews"].required);
    assert_eq!(rules.fields["profile_image"].take, Take::Image);
}

#[test]
fn take_defaults_to_text() {
    let rules = RuleSet::from_yaml(
        "version: 1\nfields:\n  title:\n    css: \"h1\"\n",
    )
    .unwrap();
    assert_eq!(rules.fields["title"].take, Take::Text);
}

#[test]
fn rejects_empty_selector() {
    let err = RuleSet::from_yaml(
        "version: 1\nfields:\n  title:\n    css: \"  \"\n",
    )
    .unwrap_err();
    assert!(matches!(err, RuleError::Invalid { ref field, .. } if field == "title"));
}

#[test]
fn rejects_many_without_nested_fields() {
    let err = RuleSet::from_yaml(
        "version: 1\nfields:\n  items:\n    css: \"li\"\n    many: true\n",
    )
    .unwrap_err();
    assert!(matches!(err, RuleError::Invalid { ref reason, .. } if reason.contains("nested")));
}

#[test]
fn rejects_nested_fields_without_many() {
    let err = RuleSet::from_yaml(
        "version: 1\nfields:\n  item:\n    css: \"li\"\n    fields:\n      t: { css: \"a\" }\n",
    )
    .unwrap_err();
    assert!(matches!(err, RuleError::Invalid { ref reason, .. } if reason.contains("many")));
}

#[test]
fn rejects_normalizer_on_list_rule() {
    let yaml = concat!(
        "version: 1\n",
        "fields:\n",
        "  items:\n",
        "    css: \"li\"\n",
        "    many: true\n",
        "    normalizer: integer\n",
        "    fields:\n",
        "      t: { css: \"a\" }\n",
    );
    let err = RuleSet::from_yaml(yaml).unwrap_err();
    assert!(matches!(err, RuleError::Invalid { ref reason, .. } if reason.contains("normalizer")));
}

#[test]
fn rejects_nested_lists() {
    let yaml = concat!(
        "version: 1\n",
        "fields:\n",
        "  items:\n",
        "    css: \"li\"\n",
        "    many: true\n",
        "    fields:\n",
        "      inner:\n",
        "        css: \"ul\"\n",
        "        many: true\n",
        "        fields:\n",
        "          t: { css: \"a\" }\n",
    );
    let err = RuleSet::from_yaml(yaml).unwrap_err();
    assert!(
        matches!(err, RuleError::Invalid { ref reason, .. } if reason.contains("not supported"))
    );
}

#[test]
fn rejects_required_inside_list_fields() {
    let yaml = concat!(
        "version: 1\n",
        "fields:\n",
        "  items:\n",
        "    css: \"li\"\n",
        "    many: true\n",
        "    fields:\n",
        "      t: { css: \"a\", required: true }\n",
    );
    let err = RuleSet::from_yaml(yaml).unwrap_err();
    assert!(matches!(err, RuleError::Invalid { ref field, .. } if field == "t"));
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let err = RuleSet::from_yaml("version: [not an int\n").unwrap_err();
    assert!(matches!(err, RuleError::Parse(_)));
}
