//! Declarative extraction rule sets.
//!
//! A rule set maps output field names to CSS locators plus the name of the
//! normalizer that converts the matched text into a typed value. Rule sets
//! are versioned YAML documents treated strictly as data: the extraction
//! adapter resolves normalizer names against its own registry and compiles
//! the selectors, so nothing here executes.
//!
//! ## Document format
//!
//! ```yaml
//! version: 1
//! fields:
//!   average_rating:
//!     css: "span[data-hook='rating-out-of-text']"
//!     required: true
//!     normalizer: average_rating
//!   reviews:
//!     css: "div[data-hook='review']"
//!     many: true
//!     fields:
//!       title: { css: "a[data-hook='review-title'] span" }
//!       review_link: { css: "a[data-hook='review-title']", take: link }
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

/// Built-in rule set for a product review listing page.
const REVIEW_PAGE_RULES: &str = include_str!("../rules/review_page.yml");

/// Built-in rule set for a reviewer profile page.
const PROFILE_PAGE_RULES: &str = include_str!("../rules/profile_page.yml");

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule set is not valid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid rule \"{field}\": {reason}")]
    Invalid { field: String, reason: String },
}

/// How to read a value out of a matched element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Take {
    /// Concatenated text content, whitespace-collapsed.
    #[default]
    Text,
    /// The `href` attribute, resolved against the page URL.
    Link,
    /// The `src` attribute, resolved against the page URL.
    Image,
}

/// One output field: where to find it and how to interpret it.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldRule {
    /// CSS selector locating the element (or elements, with `many`).
    pub css: String,

    #[serde(default)]
    pub take: Take,

    /// Match every element and emit an array of nested records.
    #[serde(default)]
    pub many: bool,

    /// A page without this field is structurally broken, not merely sparse.
    #[serde(default)]
    pub required: bool,

    /// Name of the normalizer applied to the raw value, resolved by the
    /// extraction adapter. Absent means the raw string passes through.
    #[serde(default)]
    pub normalizer: Option<String>,

    /// Per-element sub-fields for `many` rules, matched relative to each
    /// list element.
    #[serde(default)]
    pub fields: Option<BTreeMap<String, FieldRule>>,
}

/// A versioned mapping of output field names to [`FieldRule`]s.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSet {
    pub version: u32,
    pub fields: BTreeMap<String, FieldRule>,
}

impl RuleSet {
    /// Parses and validates a rule set from a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Parse`] for malformed YAML and
    /// [`RuleError::Invalid`] for structurally inconsistent rules.
    pub fn from_yaml(yaml: &str) -> Result<Self, RuleError> {
        let rules: Self = serde_yaml::from_str(yaml)?;
        rules.validate()?;
        Ok(rules)
    }

    /// The built-in review listing page rule set.
    ///
    /// Output fields: `average_rating`, `num_ratings`, `product_title`, and
    /// `reviews` (records with `title`, `body`, `rating`, `date`,
    /// `found_helpful`, `review_link`, `verified_purchase`, `profile_link`).
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if the embedded document is malformed.
    pub fn review_page() -> Result<Self, RuleError> {
        Self::from_yaml(REVIEW_PAGE_RULES)
    }

    /// The built-in reviewer profile page rule set.
    ///
    /// Output fields: `profile_name`, `profile_influence`,
    /// `profile_num_reviews`, `profile_image`, and `profile_reviews`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if the embedded document is malformed.
    pub fn profile_page() -> Result<Self, RuleError> {
        Self::from_yaml(PROFILE_PAGE_RULES)
    }

    /// Validates structural consistency of every rule in the set.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), RuleError> {
        for (name, rule) in &self.fields {
            rule.validate(name, true)?;
        }
        Ok(())
    }
}

impl FieldRule {
    fn validate(&self, name: &str, top_level: bool) -> Result<(), RuleError> {
        let invalid = |reason: &str| RuleError::Invalid {
            field: name.to_owned(),
            reason: reason.to_owned(),
        };

        if self.css.trim().is_empty() {
            return Err(invalid("css selector is empty"));
        }
        match (self.many, &self.fields) {
            (true, None) => return Err(invalid("a `many` rule needs nested `fields`")),
            (false, Some(_)) => return Err(invalid("nested `fields` require `many`")),
            _ => {}
        }
        if self.fields.is_some() && self.normalizer.is_some() {
            return Err(invalid("a list rule cannot carry a normalizer"));
        }
        if !top_level {
            if self.many {
                return Err(invalid("nested lists are not supported"));
            }
            if self.required {
                return Err(invalid("`required` only applies to top-level fields"));
            }
        }
        if let Some(children) = &self.fields {
            for (child_name, child) in children {
                child.validate(child_name, false)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "rules_test.rs"]
mod tests;
