//! Publish request decoding.

use serde::Deserialize;
use serde_json::value::RawValue;
use thiserror::Error;

/// Errors raised while turning a request body into a [`PublishRequest`].
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body could not be read from the connection.
    #[error("failed to read request body: {0}")]
    Body(String),

    /// The body is not a valid publish document.
    #[error("invalid publish request: {0}")]
    Json(#[from] serde_json::Error),
}

/// A decoded `POST /put` body.
///
/// The payload keeps the exact JSON text sent by the client.
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub channel: String,
    pub payload: Box<RawValue>,
}

impl PublishRequest {
    pub fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Literal payload text, as pushed to the queue.
    pub fn payload_text(&self) -> &str {
        self.payload.get()
    }
}
