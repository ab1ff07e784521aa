//! Typed payload helper
//!
//! Turns caller values into opaque payload bytes and back. The value is
//! wrapped in a small JSON envelope carrying the Rust type name so the
//! receiving side can refuse a payload that was produced for another type:
//!
//! ```json
//! { "type": "my_app::Order", "content": { "id": 42 } }
//! ```
//!
//! The transport never looks inside these bytes.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SerializerError {
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("type mismatch: expected {expected}, got {found}")]
    TypeMismatch { expected: String, found: String },
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    #[serde(rename = "type")]
    type_name: &'a str,
    content: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    type_name: String,
    content: serde_json::Value,
}

/// Serialize `value` into enveloped JSON bytes.
pub fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializerError> {
    let envelope = EnvelopeRef {
        type_name: std::any::type_name::<T>(),
        content: value,
    };
    serde_json::to_vec(&envelope).map_err(|e| {
        tracing::error!(
            type_name = std::any::type_name::<T>(),
            error = %e,
            "payload serialization failed"
        );
        SerializerError::Json(e)
    })
}

/// Decode bytes produced by [`to_bytes`] back into `T`.
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializerError> {
    let envelope: Envelope = serde_json::from_slice(bytes)?;
    let expected = std::any::type_name::<T>();
    if envelope.type_name != expected {
        return Err(SerializerError::TypeMismatch {
            expected: expected.to_string(),
            found: envelope.type_name,
        });
    }
    Ok(serde_json::from_value(envelope.content)?)
}
