use thiserror::Error;

/// Failure of a whole source. Never escapes the adapter; it is logged and the
/// source contributes zero items.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source {name} unavailable: {reason}")]
    Unavailable { name: String, reason: String },

    #[error("malformed document from {name}: {reason}")]
    Parse { name: String, reason: String },
}

impl SourceError {
    pub fn unavailable(name: &str, reason: impl ToString) -> Self {
        SourceError::Unavailable {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(name: &str, reason: impl ToString) -> Self {
        SourceError::Parse {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("delivery rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
