use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// A fetch returned a failure status while status checking was enabled.
    ///
    /// The display string doubles as the `profile_error` annotation payload
    /// during enrichment, so it carries the status code only.
    #[error("HTTP error: {status}")]
    Http { status: u16, url: String },

    #[error("unparseable field text \"{value}\": {reason}")]
    Format { value: String, reason: String },

    #[error("required field \"{field}\" missing from {page} page")]
    Shape { field: String, page: &'static str },

    #[error(transparent)]
    Rules(#[from] amrev_core::RuleError),

    #[error("invalid selector for field \"{field}\": {reason}")]
    Selector { field: String, reason: String },

    #[error("unknown normalizer \"{name}\" for field \"{field}\"")]
    UnknownNormalizer { field: String, name: String },

    #[error("browser engine failure: {reason}")]
    Engine { reason: String },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to write captured page: {0}")]
    Capture(#[from] std::io::Error),
}

impl ScrapeError {
    pub(crate) fn format(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn engine(reason: impl std::fmt::Display) -> Self {
        Self::Engine {
            reason: reason.to_string(),
        }
    }
}
