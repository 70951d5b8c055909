// src/error.rs
//! Error taxonomy of the relay. None of these are process-fatal: the
//! scheduler logs them and keeps its timers running.

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// News source unreachable or its response could not be parsed.
    #[error("news fetch failed: {0}")]
    Fetch(String),

    /// Article page unreachable (missing tags are not an error).
    #[error("metadata enrichment failed for {link}: {reason}")]
    Enrichment { link: String, reason: String },

    /// Chat platform rejected or failed a send.
    #[error("delivery to {destination} failed: {reason}")]
    Delivery { destination: String, reason: String },

    /// Ledger file unreadable, corrupt or not writable.
    #[error("ledger storage error: {0}")]
    Storage(String),

    /// Price-quote API failure.
    #[error("price quote failed: {0}")]
    Quote(String),
}

impl RelayError {
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Fetch(_) => "fetch",
            RelayError::Enrichment { .. } => "enrichment",
            RelayError::Delivery { .. } => "delivery",
            RelayError::Storage(_) => "storage",
            RelayError::Quote(_) => "quote",
        }
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
