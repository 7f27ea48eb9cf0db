//! MAVLink v1 frame encoding and incremental decoding.
//!
//! # Frame format
//!
//! ```text
//! 0xFE <len> <seq> <sysid> <compid> <msgid> <payload...> <crc_lo> <crc_hi>
//! ```
//!
//! - Magic: one `0xFE` start byte
//! - `len`: payload length in bytes
//! - `seq`: wrapping per-link sequence number
//! - `sysid` / `compid`: sending system and component ids
//! - `msgid`: message kind id
//! - CRC: CRC-16/X.25 over `len..payload`, then one kind-specific
//!   CRC_EXTRA byte folded in last
//!
//! The [`Decoder`] consumes the stream one byte at a time. Anything that is
//! not a plausible frame -- inter-frame noise, a truncated header, a CRC
//! mismatch -- is discarded and the decoder silently resynchronizes on the
//! next magic byte. On a noisy serial link individual byte corruption is
//! common and must not desynchronize the whole session.

use bytes::{BufMut, BytesMut};
use tracing::trace;

use uavlink_core::Result;

use crate::message::{Message, MessageKind};

/// Start-of-frame magic byte.
pub const MAGIC: u8 = 0xFE;

/// Bytes of framing overhead around the payload (magic through crc_hi).
pub const FRAME_OVERHEAD: usize = 8;

/// CRC-16/X.25 seed value.
const CRC_INIT: u16 = 0xFFFF;

/// Fold one byte into a CRC-16/X.25 accumulator.
pub(crate) fn crc_accumulate(byte: u8, crc: u16) -> u16 {
    let mut tmp = byte ^ (crc & 0xFF) as u8;
    tmp ^= tmp << 4;
    (crc >> 8) ^ ((tmp as u16) << 8) ^ ((tmp as u16) << 3) ^ ((tmp as u16) >> 4)
}

/// Compute the frame checksum over the header fields and payload, folding
/// in the kind-specific CRC_EXTRA byte last.
fn frame_crc(len: u8, seq: u8, sysid: u8, compid: u8, msgid: u8, payload: &[u8]) -> u16 {
    let mut crc = CRC_INIT;
    crc = crc_accumulate(len, crc);
    crc = crc_accumulate(seq, crc);
    crc = crc_accumulate(sysid, crc);
    crc = crc_accumulate(compid, crc);
    crc = crc_accumulate(msgid, crc);
    for &b in payload {
        crc = crc_accumulate(b, crc);
    }
    crc_accumulate(MessageKind::from_id(msgid).crc_extra(), crc)
}

/// A fully reassembled, checksum-verified frame.
///
/// This is the protocol-level unit between the byte stream and the typed
/// [`Message`] layer: the outer structure has been validated, but the
/// payload has not yet been unpacked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Wrapping per-link sequence number.
    pub seq: u8,
    /// Id of the sending system (vehicle).
    pub system_id: u8,
    /// Id of the sending component within the system.
    pub component_id: u8,
    /// Message kind id.
    pub msg_id: u8,
    /// Raw payload bytes (not yet unpacked).
    pub payload: Vec<u8>,
}

impl RawFrame {
    /// Encode this frame into raw bytes ready for transmission,
    /// computing the checksum.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(FRAME_OVERHEAD + self.payload.len());
        buf.put_u8(MAGIC);
        buf.put_u8(self.payload.len() as u8);
        buf.put_u8(self.seq);
        buf.put_u8(self.system_id);
        buf.put_u8(self.component_id);
        buf.put_u8(self.msg_id);
        buf.put_slice(&self.payload);
        let crc = frame_crc(
            self.payload.len() as u8,
            self.seq,
            self.system_id,
            self.component_id,
            self.msg_id,
            &self.payload,
        );
        buf.put_u16_le(crc);
        buf.to_vec()
    }

    /// Unpack the payload into a typed [`Message`].
    ///
    /// Fails with [`Error::Decode`](uavlink_core::Error::Decode) when a
    /// known message kind carries a wrong-sized payload. Unrecognized kinds
    /// are not an error: they unpack to [`Message::Unknown`].
    pub fn unpack(&self) -> Result<Message> {
        Message::unpack(self.msg_id, &self.payload)
    }
}

/// Counters describing what a [`Decoder`] has seen so far.
///
/// Useful for link-quality diagnostics: a rising `crc_errors` rate usually
/// means a wrong baud rate or a failing cable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Complete, checksum-valid frames produced.
    pub frames: u64,
    /// Frames dropped because their checksum did not match.
    pub crc_errors: u64,
    /// Bytes discarded while hunting for a magic byte.
    pub skipped_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Idle,
    Len,
    Seq,
    SysId,
    CompId,
    MsgId,
    Payload,
    CrcLo,
    CrcHi,
}

/// Incremental MAVLink v1 frame decoder.
///
/// Feed the byte stream through [`feed`](Decoder::feed) one byte at a time;
/// a completed, checksum-verified [`RawFrame`] is returned for the byte
/// that finishes it. The decoder owns all partial-frame state, so each
/// serial link gets exactly one `Decoder` and never shares it.
///
/// Malformed input never panics and never poisons the decoder: a bad
/// checksum or truncated header just resets the state machine, which then
/// hunts for the next magic byte.
#[derive(Debug)]
pub struct Decoder {
    state: DecodeState,
    len: u8,
    seq: u8,
    system_id: u8,
    component_id: u8,
    msg_id: u8,
    payload: Vec<u8>,
    crc_lo: u8,
    stats: DecoderStats,
}

impl Decoder {
    /// Create a decoder in the idle (hunting) state.
    pub fn new() -> Self {
        Decoder {
            state: DecodeState::Idle,
            len: 0,
            seq: 0,
            system_id: 0,
            component_id: 0,
            msg_id: 0,
            payload: Vec::new(),
            crc_lo: 0,
            stats: DecoderStats::default(),
        }
    }

    /// Feed one byte into the decoder.
    ///
    /// Returns `Some(frame)` only when this byte completes a
    /// checksum-valid frame; otherwise `None`. Purely a function of the
    /// current decoder state and the byte, so feeding a byte sequence in
    /// bulk or one byte at a time yields identical frames.
    pub fn feed(&mut self, byte: u8) -> Option<RawFrame> {
        match self.state {
            DecodeState::Idle => {
                if byte == MAGIC {
                    self.state = DecodeState::Len;
                } else {
                    self.stats.skipped_bytes += 1;
                }
                None
            }
            DecodeState::Len => {
                self.len = byte;
                self.state = DecodeState::Seq;
                None
            }
            DecodeState::Seq => {
                self.seq = byte;
                self.state = DecodeState::SysId;
                None
            }
            DecodeState::SysId => {
                self.system_id = byte;
                self.state = DecodeState::CompId;
                None
            }
            DecodeState::CompId => {
                self.component_id = byte;
                self.state = DecodeState::MsgId;
                None
            }
            DecodeState::MsgId => {
                self.msg_id = byte;
                self.payload.clear();
                self.state = if self.len == 0 {
                    DecodeState::CrcLo
                } else {
                    DecodeState::Payload
                };
                None
            }
            DecodeState::Payload => {
                self.payload.push(byte);
                if self.payload.len() == self.len as usize {
                    self.state = DecodeState::CrcLo;
                }
                None
            }
            DecodeState::CrcLo => {
                self.crc_lo = byte;
                self.state = DecodeState::CrcHi;
                None
            }
            DecodeState::CrcHi => {
                self.state = DecodeState::Idle;
                let received = u16::from_le_bytes([self.crc_lo, byte]);
                let expected = frame_crc(
                    self.len,
                    self.seq,
                    self.system_id,
                    self.component_id,
                    self.msg_id,
                    &self.payload,
                );
                if received != expected {
                    self.stats.crc_errors += 1;
                    trace!(
                        msg_id = self.msg_id,
                        received = format_args!("{received:#06X}"),
                        expected = format_args!("{expected:#06X}"),
                        "dropping frame with bad checksum"
                    );
                    return None;
                }
                self.stats.frames += 1;
                Some(RawFrame {
                    seq: self.seq,
                    system_id: self.system_id,
                    component_id: self.component_id,
                    msg_id: self.msg_id,
                    payload: std::mem::take(&mut self.payload),
                })
            }
        }
    }

    /// Feed a whole chunk, collecting every frame it completes.
    ///
    /// Exactly equivalent to calling [`feed`](Decoder::feed) for each byte
    /// in order.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Vec<RawFrame> {
        bytes.iter().filter_map(|&b| self.feed(b)).collect()
    }

    /// Discard any partial-frame state and return to hunting.
    pub fn reset(&mut self) {
        self.state = DecodeState::Idle;
        self.payload.clear();
    }

    /// Counters for frames produced, CRC drops, and skipped noise bytes.
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Attitude, Heartbeat};

    fn heartbeat_bytes(seq: u8) -> Vec<u8> {
        Message::Heartbeat(Heartbeat::default()).pack(seq, 1, 1).encode()
    }

    // ---------------------------------------------------------------
    // CRC
    // ---------------------------------------------------------------

    #[test]
    fn crc_accumulate_known_vector() {
        // CRC-16/X.25 of "123456789" (MCRF4XX variant, no final XOR) is 0x6F91.
        let mut crc = CRC_INIT;
        for b in b"123456789" {
            crc = crc_accumulate(*b, crc);
        }
        assert_eq!(crc, 0x6F91);
    }

    // ---------------------------------------------------------------
    // Encoding
    // ---------------------------------------------------------------

    #[test]
    fn encode_layout() {
        let frame = RawFrame {
            seq: 7,
            system_id: 1,
            component_id: 1,
            msg_id: 0,
            payload: vec![0; 9],
        };
        let bytes = frame.encode();
        assert_eq!(bytes.len(), FRAME_OVERHEAD + 9);
        assert_eq!(bytes[0], MAGIC);
        assert_eq!(bytes[1], 9); // len
        assert_eq!(bytes[2], 7); // seq
        assert_eq!(bytes[3], 1); // sysid
        assert_eq!(bytes[4], 1); // compid
        assert_eq!(bytes[5], 0); // msgid
    }

    #[test]
    fn encode_empty_payload() {
        let frame = RawFrame {
            seq: 0,
            system_id: 1,
            component_id: 1,
            msg_id: 200, // unknown kind, zero-length payload
            payload: vec![],
        };
        let bytes = frame.encode();
        assert_eq!(bytes.len(), FRAME_OVERHEAD);
        assert_eq!(bytes[1], 0);
    }

    // ---------------------------------------------------------------
    // Decoding -- happy path
    // ---------------------------------------------------------------

    #[test]
    fn decode_single_frame_byte_by_byte() {
        let bytes = heartbeat_bytes(3);
        let mut decoder = Decoder::new();

        let mut produced = Vec::new();
        for &b in &bytes {
            if let Some(frame) = decoder.feed(b) {
                produced.push(frame);
            }
        }

        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].seq, 3);
        assert_eq!(produced[0].msg_id, 0);
        assert_eq!(decoder.stats().frames, 1);
        assert_eq!(decoder.stats().crc_errors, 0);
    }

    #[test]
    fn decode_bulk_equals_byte_by_byte() {
        // Two frames with garbage between them, fed both ways.
        let mut stream = heartbeat_bytes(0);
        stream.extend_from_slice(&[0x11, 0x22, 0x33]);
        stream.extend_from_slice(
            &Message::Attitude(Attitude::default()).pack(1, 1, 1).encode(),
        );

        let mut bulk = Decoder::new();
        let bulk_frames = bulk.feed_bytes(&stream);

        let mut single = Decoder::new();
        let mut single_frames = Vec::new();
        for &b in &stream {
            if let Some(f) = single.feed(b) {
                single_frames.push(f);
            }
        }

        assert_eq!(bulk_frames, single_frames);
        assert_eq!(bulk.stats(), single.stats());
        assert_eq!(bulk_frames.len(), 2);
    }

    #[test]
    fn decode_frames_split_across_chunks() {
        let bytes = heartbeat_bytes(0);
        let (a, b) = bytes.split_at(4);

        let mut decoder = Decoder::new();
        assert!(decoder.feed_bytes(a).is_empty());
        let frames = decoder.feed_bytes(b);
        assert_eq!(frames.len(), 1);
    }

    // ---------------------------------------------------------------
    // Decoding -- noise and corruption
    // ---------------------------------------------------------------

    #[test]
    fn decode_skips_leading_noise() {
        let mut stream = vec![0x00, 0x42, 0x99];
        stream.extend_from_slice(&heartbeat_bytes(0));

        let mut decoder = Decoder::new();
        let frames = decoder.feed_bytes(&stream);
        assert_eq!(frames.len(), 1);
        assert_eq!(decoder.stats().skipped_bytes, 3);
    }

    #[test]
    fn decode_resynchronizes_after_crc_error() {
        // Corrupt one payload byte of the first frame, then append a
        // pristine second frame. The decoder must drop the first and still
        // parse the second.
        let mut bad = heartbeat_bytes(0);
        bad[8] ^= 0xFF;
        let good = heartbeat_bytes(1);

        let mut stream = bad;
        stream.extend_from_slice(&good);

        let mut decoder = Decoder::new();
        let frames = decoder.feed_bytes(&stream);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].seq, 1);
        assert_eq!(decoder.stats().crc_errors, 1);
        assert_eq!(decoder.stats().frames, 1);
    }

    #[test]
    fn decode_pure_noise_produces_nothing() {
        let noise: Vec<u8> = (0u8..200).filter(|&b| b != MAGIC).collect();
        let mut decoder = Decoder::new();
        assert!(decoder.feed_bytes(&noise).is_empty());
        assert_eq!(decoder.stats().frames, 0);
    }

    #[test]
    fn decode_state_valid_after_reset() {
        let bytes = heartbeat_bytes(0);
        let mut decoder = Decoder::new();

        // Feed half a frame, reset mid-frame, then feed a full frame.
        decoder.feed_bytes(&bytes[..5]);
        decoder.reset();
        let frames = decoder.feed_bytes(&bytes);
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn decode_zero_length_payload_frame() {
        let frame = RawFrame {
            seq: 9,
            system_id: 2,
            component_id: 3,
            msg_id: 250,
            payload: vec![],
        };
        let mut decoder = Decoder::new();
        let frames = decoder.feed_bytes(&frame.encode());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], frame);
    }

    // ---------------------------------------------------------------
    // Round-trip
    // ---------------------------------------------------------------

    #[test]
    fn round_trip_encode_decode() {
        let original = RawFrame {
            seq: 42,
            system_id: 1,
            component_id: 190,
            msg_id: 30,
            payload: Message::Attitude(Attitude {
                time_boot_ms: 123_456,
                roll: 0.1,
                pitch: -0.2,
                yaw: 1.5,
                rollspeed: 0.0,
                pitchspeed: 0.0,
                yawspeed: 0.01,
            })
            .payload_bytes(),
        };

        let mut decoder = Decoder::new();
        let frames = decoder.feed_bytes(&original.encode());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], original);
    }
}
