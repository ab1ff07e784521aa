//! Length-prefixed binary frame codec
//!
//! Frame layout, all integers big-endian:
//!
//! ```text
//! length(4) | magic(4) | version(4) | type(4) | topic_len(4) | topic | delay(8) | payload
//! ```
//!
//! `length` counts every byte after itself. The payload has no length field
//! of its own; it runs to the end of the frame.
//!
//! Decoding peeks at the header without consuming anything until a whole
//! frame is buffered, so a frame split across any number of reads is parsed
//! from the start once its last byte arrives. Bad magic, an out-of-range
//! topic length, or a length prefix that cannot describe a valid message are
//! errors; the connection is expected to drop the stream after any of them.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::transport::message::{MAGIC, MAX_TOPIC_LEN, Message, MessageType};
use crate::utils::error::CodecError;

/// Size of the outer length prefix.
pub const LENGTH_FIELD_LEN: usize = 4;

/// magic + version + type + topic_len + delay.
pub const HEADER_LEN: usize = 24;

/// magic + version + type + topic_len, i.e. everything before the topic.
const PREAMBLE_LEN: usize = 16;

/// Largest inner frame accepted or produced.
pub const MAX_FRAME_LEN: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_len: usize,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            max_frame_len: MAX_FRAME_LEN,
        }
    }

    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, CodecError> {
        if src.len() < LENGTH_FIELD_LEN {
            return Ok(None);
        }

        let mut peek = &src[..];
        let frame_len = peek.get_u32() as usize;
        if frame_len > self.max_frame_len {
            return Err(CodecError::FrameTooLarge(frame_len));
        }
        if frame_len < HEADER_LEN {
            return Err(CodecError::FrameTooShort(frame_len));
        }

        if src.len() < LENGTH_FIELD_LEN + HEADER_LEN {
            tracing::trace!(
                buffered = src.len(),
                "not enough data for message header"
            );
            return Ok(None);
        }

        let magic = peek.get_u32();
        if magic != MAGIC {
            return Err(CodecError::BadMagic {
                found: magic,
                expected: MAGIC,
            });
        }

        let version = peek.get_u32();
        let type_code = peek.get_u32();
        let topic_len = peek.get_i32();
        if topic_len < 0 || topic_len as usize > MAX_TOPIC_LEN {
            return Err(CodecError::InvalidTopicLength(topic_len as i64));
        }
        let topic_len = topic_len as usize;
        if HEADER_LEN + topic_len > frame_len {
            return Err(CodecError::TopicOverflow {
                topic_len,
                frame_len,
            });
        }

        let total = LENGTH_FIELD_LEN + frame_len;
        if src.len() < total {
            tracing::trace!(
                buffered = src.len(),
                expected = total,
                "waiting for the rest of the frame"
            );
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(total);
        frame.advance(LENGTH_FIELD_LEN + PREAMBLE_LEN);
        let topic_bytes = frame.split_to(topic_len);
        let delay = frame.get_i64();
        let payload = frame.freeze();

        let message = Message::from_parts(
            magic,
            version,
            MessageType::from_code(type_code),
            String::from_utf8_lossy(&topic_bytes).into_owned(),
            delay,
            payload,
        );
        tracing::trace!(?message, "decoded message");
        Ok(Some(message))
    }
}

impl Encoder<Message> for FrameCodec {
    type Error = CodecError;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<(), CodecError> {
        let topic = message.topic().as_bytes();
        if topic.len() > MAX_TOPIC_LEN {
            return Err(CodecError::InvalidTopicLength(topic.len() as i64));
        }

        let frame_len = HEADER_LEN + topic.len() + message.payload().len();
        if frame_len > self.max_frame_len {
            return Err(CodecError::FrameTooLarge(frame_len));
        }

        dst.reserve(LENGTH_FIELD_LEN + frame_len);
        dst.put_u32(frame_len as u32);
        dst.put_u32(message.magic());
        dst.put_u32(message.version());
        dst.put_u32(message.message_type().code());
        dst.put_u32(topic.len() as u32);
        dst.put_slice(topic);
        dst.put_i64(message.delay());
        dst.put_slice(message.payload());
        Ok(())
    }
}
