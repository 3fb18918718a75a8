use thiserror::Error;

/// The error kinds this bot distinguishes. Format and transient-network
/// errors are caught at their respective boundaries (parsers, HTTP clients)
/// and degrade to an empty/`None` result with a log line — they are not
/// meant to propagate past the call that produced them. Only the
/// persistence layer needs to hand a typed error up to its caller so the
/// scheduler can decide to roll back and retry next tick.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("transient network failure calling {endpoint}: {source}")]
    TransientNetwork {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed response from {endpoint}: {reason}")]
    Format { endpoint: String, reason: String },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, BotError>;
