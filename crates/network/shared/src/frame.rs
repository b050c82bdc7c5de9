//! Binary frame envelope: `[magic: u32 BE][length: u32 BE][payload]`.
//!
//! The header is validated before any body read is issued; a frame whose
//! magic or length is wrong never reaches the message decoder. The payload
//! is a bincode-serialized [`Message`].
//!
//! Error handling: decode problems are [`FormatError`] (the caller tears
//! the connection down), encode refusals are [`CapacityError`] (the caller
//! drops that one send).

use std::io::Cursor;

use bincode::Options;

use crate::error::{CapacityError, FormatError};
use crate::message::Message;
use crate::wire;

/// Fixed 32-bit constant opening every valid frame header ("RAIL").
pub const FRAME_MAGIC: u32 = 0x5241_494C;

/// Upper bound for one serialized message payload.
pub const MAX_MSG_SIZE: u32 = 4 * 1024 * 1024;

/// Header size on the wire: magic + length.
pub const HEADER_LEN: usize = 8;

/// One bincode configuration for both directions of the codec.
fn codec_options() -> impl Options {
    bincode::options().with_fixint_encoding().allow_trailing_bytes()
}

/// Validate a received header and return the declared body length.
///
/// A short slice, a foreign magic, or an oversized length each fail here,
/// before any body allocation happens.
pub fn read_header(header: &[u8]) -> Result<u32, FormatError> {
    if header.len() != HEADER_LEN {
        return Err(FormatError::ShortHeader {
            expected: HEADER_LEN,
            got: header.len(),
        });
    }
    let magic = wire::load_u32(&header[..4])?;
    if magic != FRAME_MAGIC {
        return Err(FormatError::BadMagic(magic));
    }
    let length = wire::load_u32(&header[4..])?;
    if length > MAX_MSG_SIZE {
        return Err(FormatError::Oversize {
            len: length,
            max: MAX_MSG_SIZE,
        });
    }
    Ok(length)
}

/// Decode one message body. The decoder must consume the slice exactly;
/// trailing bytes mean the peer and we disagree about the framing, which is
/// fatal for the connection.
pub fn decode_body(body: &[u8]) -> Result<Message, FormatError> {
    let mut cursor = Cursor::new(body);
    let message: Message = codec_options()
        .deserialize_from(&mut cursor)
        .map_err(FormatError::Decode)?;
    let consumed = cursor.position() as usize;
    if consumed != body.len() {
        return Err(FormatError::TrailingBytes {
            excess: body.len() - consumed,
        });
    }
    Ok(message)
}

/// Encode one message into a ready-to-send frame.
///
/// Layout is written magic first, then a placeholder length which is
/// backpatched once the payload size is known. An oversized payload aborts
/// the send; nothing is handed to the transport.
pub fn encode(message: &Message) -> Result<Vec<u8>, CapacityError> {
    let mut out = Vec::with_capacity(64);
    wire::store_u32(&mut out, FRAME_MAGIC);
    wire::store_u32(&mut out, 0);

    codec_options()
        .serialize_into(&mut out, message)
        .map_err(CapacityError::Serialize)?;

    let size = out.len() - HEADER_LEN;
    if size > MAX_MSG_SIZE as usize {
        return Err(CapacityError::Oversize {
            size,
            max: MAX_MSG_SIZE,
        });
    }
    out[4..HEADER_LEN].copy_from_slice(&(size as u32).to_be_bytes());
    Ok(out)
}
