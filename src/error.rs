//! Adapter-level error type.
//!
//! A `FetchError` is recoverable by design: the ingestion run logs it, records
//! the failed source in the summary, and moves on to the next adapter. Storage
//! and configuration errors use `anyhow` at the call sites instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("unparseable response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl FetchError {
    pub fn http(url: impl Into<String>, source: reqwest::Error) -> Self {
        FetchError::Http {
            url: url.into(),
            source,
        }
    }

    pub fn status(url: impl Into<String>, status: u16) -> Self {
        FetchError::Status {
            url: url.into(),
            status,
        }
    }

    pub fn decode(url: impl Into<String>, reason: impl Into<String>) -> Self {
        FetchError::Decode {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
