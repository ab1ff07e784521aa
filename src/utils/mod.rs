//! The `utils` module provides the shared pieces used across `stclient`:
//! error types, logging setup and the typed payload serializer.

pub mod error;
pub mod logging;
pub mod serializer;

pub use error::{ClientError, CodecError, ConfigError};

#[cfg(test)]
mod tests;
