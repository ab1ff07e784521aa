use super::codec::{FrameCodec, HEADER_LEN, LENGTH_FIELD_LEN, MAX_FRAME_LEN};
use super::message::{MAGIC, MAX_TOPIC_LEN, Message, MessageType, VERSION};
use crate::utils::error::{ClientError, CodecError};
use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

fn encode(message: Message) -> BytesMut {
    let mut buf = BytesMut::new();
    FrameCodec::new().encode(message, &mut buf).unwrap();
    buf
}

fn raw_frame(magic: u32, type_code: u32, topic_len: i32, topic: &[u8], payload: &[u8]) -> BytesMut {
    let mut buf = BytesMut::new();
    buf.put_u32((HEADER_LEN + topic.len() + payload.len()) as u32);
    buf.put_u32(magic);
    buf.put_u32(VERSION);
    buf.put_u32(type_code);
    buf.put_i32(topic_len);
    buf.put_slice(topic);
    buf.put_i64(0);
    buf.put_slice(payload);
    buf
}

#[test]
fn test_type_codes_are_distinct() {
    let kinds = [
        MessageType::Ping,
        MessageType::Pong,
        MessageType::Schedule,
        MessageType::TaskReceived,
        MessageType::TaskTriggered,
    ];
    for (i, a) in kinds.iter().enumerate() {
        assert_eq!(MessageType::from_code(a.code()), *a);
        for b in &kinds[i + 1..] {
            assert_ne!(a.code(), b.code());
        }
    }
    assert_eq!(MessageType::from_code(0x42), MessageType::Unknown(0x42));
}

#[test]
fn test_ping_message() {
    let ping = Message::ping();
    assert_eq!(ping.magic(), MAGIC);
    assert_eq!(ping.version(), VERSION);
    assert_eq!(ping.message_type(), MessageType::Ping);
    assert_eq!(ping.topic(), "CLIENT-PING");
    assert_eq!(ping.delay(), 0);
    assert_eq!(&ping.payload()[..], b"PING");
}

#[test]
fn test_schedule_validation() {
    assert!(matches!(
        Message::schedule("orders", 999, "x"),
        Err(ClientError::DelayTooShort(999))
    ));
    assert!(matches!(
        Message::schedule("", 1000, "x"),
        Err(ClientError::EmptyTopic)
    ));
    assert!(matches!(
        Message::schedule("t".repeat(MAX_TOPIC_LEN + 1), 1000, "x"),
        Err(ClientError::TopicTooLong(1025))
    ));
    assert!(matches!(
        Message::schedule("orders", 1000, Bytes::new()),
        Err(ClientError::EmptyPayload)
    ));

    let msg = Message::schedule("orders", 1000, "x").unwrap();
    assert_eq!(msg.message_type(), MessageType::Schedule);
    assert_eq!(msg.delay(), 1000);
}

#[test]
fn test_topic_length_counts_bytes() {
    let msg = Message::schedule("zamówienia", 5000, "x").unwrap();
    assert_eq!(msg.topic_length(), "zamówienia".len());
    assert_ne!(msg.topic_length(), msg.topic().chars().count());
}

#[test]
fn test_encode_layout() {
    let buf = encode(Message::schedule("ab", 1500, "xyz").unwrap());
    let expected_inner = HEADER_LEN + 2 + 3;
    assert_eq!(buf.len(), LENGTH_FIELD_LEN + expected_inner);
    assert_eq!(&buf[0..4], &(expected_inner as u32).to_be_bytes());
    assert_eq!(&buf[4..8], &MAGIC.to_be_bytes());
    assert_eq!(&buf[8..12], &VERSION.to_be_bytes());
    assert_eq!(&buf[12..16], &MessageType::Schedule.code().to_be_bytes());
    assert_eq!(&buf[16..20], &2u32.to_be_bytes());
    assert_eq!(&buf[20..22], b"ab");
    assert_eq!(&buf[22..30], &1500i64.to_be_bytes());
    assert_eq!(&buf[30..], b"xyz");
}

#[test]
fn test_round_trip() {
    let cases = [
        Message::new(MessageType::TaskTriggered, "orders", 3000, "payload"),
        Message::new(MessageType::Pong, "", 0, Bytes::new()),
        Message::new(MessageType::Schedule, "t".repeat(MAX_TOPIC_LEN), i64::MAX, vec![0u8; 4096]),
        Message::new(MessageType::Unknown(99), "future", -1, "x"),
        Message::ping(),
    ];

    for original in cases {
        let mut buf = encode(original.clone());
        let decoded = FrameCodec::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, original);
        assert!(buf.is_empty());
    }
}

#[test]
fn test_partial_delivery_byte_by_byte() {
    let original = Message::new(MessageType::TaskTriggered, "orders", 2000, "hello world");
    let frame = encode(original.clone());
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::new();

    for (i, byte) in frame.iter().enumerate() {
        buf.put_u8(*byte);
        let result = codec.decode(&mut buf).unwrap();
        if i + 1 < frame.len() {
            assert!(result.is_none(), "emitted early at byte {i}");
            assert_eq!(buf.len(), i + 1, "consumed bytes before frame was complete");
        } else {
            assert_eq!(result, Some(original.clone()));
        }
    }
}

#[test]
fn test_partial_delivery_split_inside_topic() {
    let original = Message::new(MessageType::TaskTriggered, "a-fairly-long-topic", 2000, "p");
    let frame = encode(original.clone());
    let mut codec = FrameCodec::new();

    let mut buf = BytesMut::from(&frame[..LENGTH_FIELD_LEN + HEADER_LEN + 3]);
    assert!(codec.decode(&mut buf).unwrap().is_none());
    buf.extend_from_slice(&frame[LENGTH_FIELD_LEN + HEADER_LEN + 3..]);
    assert_eq!(codec.decode(&mut buf).unwrap(), Some(original));
}

#[test]
fn test_two_frames_in_one_read() {
    let first = Message::new(MessageType::Pong, "CLIENT-PING", 0, "PONG");
    let second = Message::new(MessageType::TaskReceived, "orders", 5000, "ok");
    let mut buf = encode(first.clone());
    buf.extend_from_slice(&encode(second.clone()));

    let mut codec = FrameCodec::new();
    assert_eq!(codec.decode(&mut buf).unwrap(), Some(first));
    assert_eq!(codec.decode(&mut buf).unwrap(), Some(second));
    assert_eq!(codec.decode(&mut buf).unwrap(), None);
}

#[test]
fn test_bad_magic_is_fatal() {
    let mut buf = raw_frame(0xDEAD_BEEF, 5, 6, b"orders", b"x");
    let err = FrameCodec::new().decode(&mut buf).unwrap_err();
    assert!(matches!(err, CodecError::BadMagic { found: 0xDEAD_BEEF, .. }));
}

#[test]
fn test_oversized_topic_length_is_fatal() {
    let mut buf = BytesMut::new();
    buf.put_u32(HEADER_LEN as u32 + 2000);
    buf.put_u32(MAGIC);
    buf.put_u32(VERSION);
    buf.put_u32(5);
    buf.put_i32(2000);
    buf.put_slice(&[0u8; 8]);
    let err = FrameCodec::new().decode(&mut buf).unwrap_err();
    assert!(matches!(err, CodecError::InvalidTopicLength(2000)));
}

#[test]
fn test_negative_topic_length_is_fatal() {
    let mut buf = raw_frame(MAGIC, 5, -1, b"", b"");
    let err = FrameCodec::new().decode(&mut buf).unwrap_err();
    assert!(matches!(err, CodecError::InvalidTopicLength(-1)));
}

#[test]
fn test_topic_longer_than_frame_is_fatal() {
    let mut buf = raw_frame(MAGIC, 5, 100, b"short", b"");
    let err = FrameCodec::new().decode(&mut buf).unwrap_err();
    assert!(matches!(err, CodecError::TopicOverflow { topic_len: 100, .. }));
}

#[test]
fn test_default_frame_limit_is_ten_mebibytes() {
    assert_eq!(FrameCodec::new().max_frame_len(), MAX_FRAME_LEN);
    assert_eq!(FrameCodec::default().max_frame_len(), 10 * 1024 * 1024);
}

#[test]
fn test_frame_size_limits() {
    let mut codec = FrameCodec::with_max_frame_len(64);
    assert_eq!(codec.max_frame_len(), 64);

    let mut too_big = BytesMut::new();
    too_big.put_u32(65);
    assert!(matches!(
        codec.decode(&mut too_big),
        Err(CodecError::FrameTooLarge(65))
    ));

    let mut too_short = BytesMut::new();
    too_short.put_u32(10);
    assert!(matches!(
        codec.decode(&mut too_short),
        Err(CodecError::FrameTooShort(10))
    ));

    let mut out = BytesMut::new();
    let oversized = Message::new(MessageType::Schedule, "t", 1000, vec![1u8; 64]);
    let result = codec.encode(oversized, &mut out);
    assert!(matches!(result, Err(CodecError::FrameTooLarge(_))));
    assert!(out.is_empty());
}

#[test]
fn test_invalid_utf8_topic_is_decoded_lossily() {
    let mut buf = raw_frame(MAGIC, 5, 2, &[0xff, 0xfe], b"x");
    let message = FrameCodec::new().decode(&mut buf).unwrap().unwrap();
    assert_eq!(message.topic(), "\u{fffd}\u{fffd}");
}

#[test]
fn test_debug_truncates_payload() {
    let message = Message::new(MessageType::TaskTriggered, "orders", 1000, vec![b'a'; 500]);
    let rendered = format!("{message:?}");
    assert!(rendered.contains("(truncated)"));
    assert!(rendered.contains("payload_length: 500"));
}
