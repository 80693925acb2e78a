//! Client-side error type for the SwapGraph SDK.

use serde::Deserialize;
use thiserror::Error;

/// The universal error envelope (§7) as received over the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub correlation_id: String,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: serde_json::Value,
}

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("swapgraph API returned {status}: {envelope:?}")]
    Api { status: u16, envelope: ErrorEnvelope },

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SdkError>;
