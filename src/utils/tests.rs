use super::error::{ClientError, CodecError, ConfigError};
use super::logging;
use super::serializer::{self, SerializerError};
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Order {
    id: u64,
    item: String,
}

#[derive(Debug, Deserialize)]
struct Invoice {
    #[allow(dead_code)]
    id: u64,
}

#[test]
fn logging_init_accepts_levels() {
    // Should not panic
    logging::init("info");
    logging::init("debug");
    logging::init("warn");
}

#[test]
fn serializer_restores_original_value() {
    let order = Order {
        id: 7,
        item: "book".to_string(),
    };
    let bytes = serializer::to_bytes(&order).unwrap();
    let back: Order = serializer::from_bytes(&bytes).unwrap();
    assert_eq!(back, order);
}

#[test]
fn serializer_envelope_names_the_type() {
    let bytes = serializer::to_bytes(&Order {
        id: 1,
        item: "pen".to_string(),
    })
    .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(value["type"].as_str().unwrap().ends_with("Order"));
    assert_eq!(value["content"]["item"], "pen");
}

#[test]
fn serializer_rejects_other_type() {
    let bytes = serializer::to_bytes(&Order {
        id: 1,
        item: "pen".to_string(),
    })
    .unwrap();
    let err = serializer::from_bytes::<Invoice>(&bytes).unwrap_err();
    assert!(matches!(err, SerializerError::TypeMismatch { .. }));
}

#[test]
fn serializer_rejects_garbage() {
    let err = serializer::from_bytes::<Order>(b"not json").unwrap_err();
    assert!(matches!(err, SerializerError::Json(_)));
}

#[test]
fn config_error_converts_into_client_error() {
    let err: ClientError = ConfigError::EmptyHost.into();
    assert!(matches!(err, ClientError::Config(ConfigError::EmptyHost)));
    assert_eq!(err.to_string(), "host cannot be empty");
}

#[test]
fn io_failures_surface_through_the_codec_variant() {
    let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset");
    match ClientError::from(CodecError::from(reset)) {
        ClientError::Codec(CodecError::Io(e)) => {
            assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
