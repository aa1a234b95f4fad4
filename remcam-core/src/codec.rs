//! Frame codec for `tokio_util::codec::Framed` transports.
//!
//! Splits a TCP byte stream into validated [`Envelope`]s. Partial frames
//! yield `Ok(None)` until more bytes arrive; any protocol violation is an
//! error, which callers treat as fatal for that connection.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::envelope::{Envelope, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
use crate::error::RemcamError;
use crate::header::{EnvelopeHeader, HEADER_SIZE};

/// Stateless codec: every frame is self-describing.
#[derive(Debug, Default)]
pub struct EnvelopeCodec;

impl Decoder for EnvelopeCodec {
    type Item = Envelope;
    type Error = RemcamError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() > MAX_FRAME_SIZE {
            return Err(RemcamError::FrameTooLarge {
                size: src.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let header_bytes: &[u8; HEADER_SIZE] = (&src[..HEADER_SIZE])
            .try_into()
            .expect("slice is HEADER_SIZE bytes");
        let header = EnvelopeHeader::from_bytes(header_bytes)?;

        if header.payload_length as usize > MAX_PAYLOAD_SIZE {
            return Err(RemcamError::PayloadTooLarge {
                size: header.payload_length as usize,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let frame_len = HEADER_SIZE + header.payload_length as usize;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        let frame = src.split_to(frame_len);
        Envelope::from_bytes(&frame).map(Some)
    }
}

impl Encoder<Envelope> for EnvelopeCodec {
    type Error = RemcamError;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item.to_bytes());
        Ok(())
    }
}
