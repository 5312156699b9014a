//! Rule-driven extraction of structured records from rendered HTML.
//!
//! The adapter compiles both rule sets up front: CSS selectors are parsed
//! once and normalizer names resolved against the registry, so a bad rule
//! set is a construction error rather than a mid-crawl surprise.
//!
//! Extraction itself runs in two phases. A synchronous harvest walks the
//! parsed DOM and collects raw strings, resolving `link`/`image` takes
//! against the page URL. An asynchronous pass then feeds each raw value
//! through its normalizer — the avatar probe is the only normalizer doing
//! I/O, and the two-phase split keeps the non-`Send` DOM handle away from
//! await points.

use std::time::Duration;

use amrev_core::{FieldRule, Record, RuleSet, Take};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::error::ScrapeError;
use crate::normalize::Normalizer;

const IMAGE_PROBE_TIMEOUT_SECS: u64 = 30;
const IMAGE_PROBE_USER_AGENT: &str = "amrev/0.1 (review-archival)";

/// Which of the two built-in rule sets to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    ReviewListing,
    Profile,
}

impl PageKind {
    fn name(self) -> &'static str {
        match self {
            Self::ReviewListing => "review",
            Self::Profile => "profile",
        }
    }
}

/// Applies compiled rule sets to fetched pages.
pub struct Extractor {
    review: CompiledRules,
    profile: CompiledRules,
    http: reqwest::Client,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor").finish_non_exhaustive()
    }
}

impl Extractor {
    /// Compiles the built-in review and profile rule sets.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Rules`] for a malformed document,
    /// [`ScrapeError::Selector`] or [`ScrapeError::UnknownNormalizer`] for
    /// rules the adapter cannot honor, and [`ScrapeError::Client`] if the
    /// probe client cannot be built.
    pub fn with_default_rules() -> Result<Self, ScrapeError> {
        Self::new(RuleSet::review_page()?, RuleSet::profile_page()?)
    }

    /// Compiles caller-supplied rule sets (review listing, then profile).
    ///
    /// # Errors
    ///
    /// Same as [`Extractor::with_default_rules`].
    pub fn new(review: RuleSet, profile: RuleSet) -> Result<Self, ScrapeError> {
        let review = CompiledRules::compile(&review, PageKind::ReviewListing)?;
        let profile = CompiledRules::compile(&profile, PageKind::Profile)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(IMAGE_PROBE_TIMEOUT_SECS))
            .user_agent(IMAGE_PROBE_USER_AGENT)
            .build()?;
        Ok(Self {
            review,
            profile,
            http,
        })
    }

    /// Extracts one page into a [`Record`], normalizers applied.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::InvalidUrl`] — `base_url` cannot anchor relative links.
    /// - [`ScrapeError::Shape`] — a `required` field matched nothing.
    /// - [`ScrapeError::Format`] — a normalizer rejected matched text.
    pub async fn extract(
        &self,
        kind: PageKind,
        html: &str,
        base_url: &str,
    ) -> Result<Record, ScrapeError> {
        let rules = match kind {
            PageKind::ReviewListing => &self.review,
            PageKind::Profile => &self.profile,
        };
        let base = Url::parse(base_url).map_err(|e| ScrapeError::InvalidUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        let raw = rules.harvest(html, &base)?;
        self.finish(raw, &rules.fields).await
    }

    /// Second phase: run every harvested value through its normalizer.
    async fn finish(
        &self,
        raw: Vec<(String, RawValue)>,
        fields: &[(String, CompiledField)],
    ) -> Result<Record, ScrapeError> {
        let mut record = Record::new();
        for ((name, value), (_, field)) in raw.into_iter().zip(fields) {
            let normalized = match value {
                RawValue::Absent => self.normalize(field, None).await?,
                RawValue::Text(text) => self.normalize(field, Some(&text)).await?,
                RawValue::List(items) => {
                    let mut array = Vec::with_capacity(items.len());
                    for item in items {
                        let mut entry = Record::new();
                        for ((child_name, child_value), (_, child)) in
                            item.into_iter().zip(&field.children)
                        {
                            let value = match child_value {
                                RawValue::Absent => self.normalize(child, None).await?,
                                RawValue::Text(text) => {
                                    self.normalize(child, Some(&text)).await?
                                }
                                // Nested lists are rejected by rule validation.
                                RawValue::List(_) => Value::Null,
                            };
                            entry.insert(child_name, value);
                        }
                        array.push(Value::Object(entry));
                    }
                    Value::Array(array)
                }
            };
            record.insert(name, normalized);
        }
        Ok(record)
    }

    async fn normalize(
        &self,
        field: &CompiledField,
        raw: Option<&str>,
    ) -> Result<Value, ScrapeError> {
        match field.normalizer {
            Some(normalizer) => normalizer.apply(raw, &self.http).await,
            None => Ok(raw.map_or(Value::Null, |text| Value::String(text.to_owned()))),
        }
    }
}

/// A rule set with selectors parsed and normalizer names resolved.
struct CompiledRules {
    page: &'static str,
    fields: Vec<(String, CompiledField)>,
}

struct CompiledField {
    selector: Selector,
    take: Take,
    many: bool,
    required: bool,
    normalizer: Option<Normalizer>,
    children: Vec<(String, CompiledField)>,
}

impl CompiledRules {
    fn compile(rules: &RuleSet, kind: PageKind) -> Result<Self, ScrapeError> {
        rules.validate()?;
        let mut fields = Vec::with_capacity(rules.fields.len());
        for (name, rule) in &rules.fields {
            fields.push((name.clone(), CompiledField::compile(name, rule)?));
        }
        Ok(Self {
            page: kind.name(),
            fields,
        })
    }

    /// First phase: collect raw strings from the DOM, enforcing `required`.
    fn harvest(&self, html: &str, base: &Url) -> Result<Vec<(String, RawValue)>, ScrapeError> {
        let document = Html::parse_document(html);
        let root = document.root_element();
        let mut out = Vec::with_capacity(self.fields.len());
        for (name, field) in &self.fields {
            let value = if field.many {
                let mut items = Vec::new();
                for element in root.select(&field.selector) {
                    let mut item = Vec::with_capacity(field.children.len());
                    for (child_name, child) in &field.children {
                        item.push((child_name.clone(), single(&element, child, base)));
                    }
                    items.push(item);
                }
                if items.is_empty() {
                    RawValue::Absent
                } else {
                    RawValue::List(items)
                }
            } else {
                single(&root, field, base)
            };
            if field.required && matches!(value, RawValue::Absent) {
                return Err(ScrapeError::Shape {
                    field: name.clone(),
                    page: self.page,
                });
            }
            out.push((name.clone(), value));
        }
        Ok(out)
    }
}

impl CompiledField {
    fn compile(name: &str, rule: &FieldRule) -> Result<Self, ScrapeError> {
        let selector = Selector::parse(&rule.css).map_err(|e| ScrapeError::Selector {
            field: name.to_owned(),
            reason: e.to_string(),
        })?;
        let normalizer = match &rule.normalizer {
            None => None,
            Some(named) => Some(Normalizer::resolve(named).ok_or_else(|| {
                ScrapeError::UnknownNormalizer {
                    field: name.to_owned(),
                    name: named.clone(),
                }
            })?),
        };
        let mut children = Vec::new();
        if let Some(nested) = &rule.fields {
            for (child_name, child) in nested {
                children.push((child_name.clone(), Self::compile(child_name, child)?));
            }
        }
        Ok(Self {
            selector,
            take: rule.take,
            many: rule.many,
            required: rule.required,
            normalizer,
            children,
        })
    }
}

/// Raw harvest of one field before normalization.
enum RawValue {
    Absent,
    Text(String),
    List(Vec<Vec<(String, RawValue)>>),
}

fn single(scope: &ElementRef<'_>, field: &CompiledField, base: &Url) -> RawValue {
    let Some(element) = scope.select(&field.selector).next() else {
        return RawValue::Absent;
    };
    match field.take {
        Take::Text => RawValue::Text(element_text(&element)),
        Take::Link => attribute_url(&element, "href", base),
        Take::Image => attribute_url(&element, "src", base),
    }
}

fn attribute_url(element: &ElementRef<'_>, attr: &str, base: &Url) -> RawValue {
    match element
        .value()
        .attr(attr)
        .and_then(|value| base.join(value).ok())
    {
        Some(url) => RawValue::Text(url.to_string()),
        None => RawValue::Absent,
    }
}

/// Concatenated text content with whitespace runs collapsed.
fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
