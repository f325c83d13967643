//! Wire protocol: framing, bit-packed codec, opcode tables, and the known
//! packet encodings (spec §4.6, §6).

pub mod codec;
pub mod dispatch;
pub mod opcodes;
pub mod packets;

use bytes::{Buf, BytesMut};

use crate::error::ProtocolError;

/// Maximum accepted frame payload size. Not named in spec.md, but every
/// length-prefixed protocol needs a ceiling to keep a hostile or corrupt
/// peer from claiming an unbounded allocation.
pub const MAX_FRAME_BYTES: u32 = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub opcode: u16,
    pub payload: Vec<u8>,
}

/// Attempts to split one length-prefixed frame off the front of `buf`.
///
/// Framing is `u32` little-endian size (covering opcode + payload), then
/// `u16` opcode, then payload. Returns `Ok(None)` when `buf` doesn't yet
/// hold a complete frame; the caller should wait for more bytes. Any size
/// prefix exceeding [`MAX_FRAME_BYTES`] is a fatal framing error (spec
/// §4.6: "Bytes outside the framing are a fatal framing error").
pub fn decode_frame(buf: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
    const LENGTH_PREFIX_BYTES: usize = 4;
    const OPCODE_BYTES: usize = 2;

    if buf.len() < LENGTH_PREFIX_BYTES {
        return Ok(None);
    }
    let size = u32::from_le_bytes(buf[..LENGTH_PREFIX_BYTES].try_into().unwrap());
    if size > MAX_FRAME_BYTES {
        return Err(ProtocolError::FrameTooLarge(size));
    }
    let total = LENGTH_PREFIX_BYTES + size as usize;
    if buf.len() < total {
        return Ok(None);
    }
    if (size as usize) < OPCODE_BYTES {
        return Err(ProtocolError::UnexpectedEof("opcode"));
    }

    buf.advance(LENGTH_PREFIX_BYTES);
    let opcode = u16::from_le_bytes(buf[..OPCODE_BYTES].try_into().unwrap());
    buf.advance(OPCODE_BYTES);
    let payload = buf[..size as usize - OPCODE_BYTES].to_vec();
    buf.advance(size as usize - OPCODE_BYTES);
    Ok(Some(Frame { opcode, payload }))
}

/// Encodes a frame for sending: length prefix, opcode, payload.
pub fn encode_frame(opcode: u16, payload: &[u8]) -> Vec<u8> {
    let size = (2 + payload.len()) as u32;
    let mut out = Vec::with_capacity(4 + size as usize);
    out.extend_from_slice(&size.to_le_bytes());
    out.extend_from_slice(&opcode.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_frame_round_trips_encode_frame() {
        let bytes = encode_frame(0x0100, &[1, 2, 3, 4]);
        let mut buf = BytesMut::from(&bytes[..]);
        let frame = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(frame.opcode, 0x0100);
        assert_eq!(frame.payload, vec![1, 2, 3, 4]);
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_frame_waits_for_more_bytes_on_partial_frame() {
        let bytes = encode_frame(0x0100, &[1, 2, 3, 4]);
        let mut buf = BytesMut::from(&bytes[..bytes.len() - 1]);
        assert_eq!(decode_frame(&mut buf).unwrap(), None);
    }

    #[test]
    fn decode_frame_rejects_oversized_length_prefix() {
        let mut buf = BytesMut::from(&(MAX_FRAME_BYTES + 1).to_le_bytes()[..]);
        assert!(decode_frame(&mut buf).is_err());
    }

    #[test]
    fn decode_frame_leaves_subsequent_frames_untouched() {
        let mut bytes = encode_frame(0x01, &[9]);
        bytes.extend(encode_frame(0x02, &[8, 7]));
        let mut buf = BytesMut::from(&bytes[..]);
        let first = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(first.opcode, 0x01);
        let second = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(second.opcode, 0x02);
        assert!(buf.is_empty());
    }
}
