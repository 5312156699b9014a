//! Shared data model for the amrev scraper: declarative extraction rule
//! sets and the loosely-typed page record they produce.

pub mod rules;

pub use rules::{FieldRule, RuleError, RuleSet, Take};

/// A single extracted page as a field-name → value mapping.
///
/// The set of output fields is owned by the rule sets, so pages are open
/// JSON objects rather than closed structs. Review and profile field
/// contracts are documented on [`RuleSet::review_page`] and
/// [`RuleSet::profile_page`].
pub type Record = serde_json::Map<String, serde_json::Value>;
