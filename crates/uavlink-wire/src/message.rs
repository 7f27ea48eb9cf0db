//! Typed telemetry/command messages and their payload codecs.
//!
//! [`Message`] is the closed, tagged enum carried through the dispatch
//! pipeline. The known variants are the kinds the controlling process
//! actually interprets (heartbeat, attitude, position, sensor offsets,
//! AHRS); every other structurally valid kind lands in
//! [`Message::Unknown`], which downstream consumers must treat as routine
//! rather than as a fault.
//!
//! Payloads use MAVLink v1 wire order: fields sorted largest-first,
//! little-endian.

use bytes::{Buf, BufMut, BytesMut};

use uavlink_core::{Error, Result};

use crate::frame::RawFrame;

/// The message kinds this layer understands, with their wire ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Vehicle liveness beacon (id 0).
    Heartbeat,
    /// Roll/pitch/yaw attitude report (id 30).
    Attitude,
    /// Fused global position report (id 33).
    GlobalPositionInt,
    /// Sensor calibration offsets (id 150).
    SensorOffsets,
    /// AHRS filter status (id 163).
    Ahrs,
    /// Structurally valid but unrecognized kind. Routed, never rejected.
    Unknown(u8),
}

impl MessageKind {
    /// Map a wire message id to a kind.
    pub fn from_id(id: u8) -> Self {
        match id {
            0 => MessageKind::Heartbeat,
            30 => MessageKind::Attitude,
            33 => MessageKind::GlobalPositionInt,
            150 => MessageKind::SensorOffsets,
            163 => MessageKind::Ahrs,
            other => MessageKind::Unknown(other),
        }
    }

    /// The numeric id carried on the wire.
    pub fn id(&self) -> u8 {
        match self {
            MessageKind::Heartbeat => 0,
            MessageKind::Attitude => 30,
            MessageKind::GlobalPositionInt => 33,
            MessageKind::SensorOffsets => 150,
            MessageKind::Ahrs => 163,
            MessageKind::Unknown(id) => *id,
        }
    }

    /// The kind-specific CRC_EXTRA byte folded into the frame checksum.
    ///
    /// Unknown kinds use 0 so that structurally valid frames of kinds this
    /// build does not recognize still checksum consistently end to end.
    pub fn crc_extra(&self) -> u8 {
        match self {
            MessageKind::Heartbeat => 50,
            MessageKind::Attitude => 39,
            MessageKind::GlobalPositionInt => 104,
            MessageKind::SensorOffsets => 134,
            MessageKind::Ahrs => 127,
            MessageKind::Unknown(_) => 0,
        }
    }

    /// Expected payload length for known kinds, `None` for unknown ones.
    pub fn payload_len(&self) -> Option<usize> {
        match self {
            MessageKind::Heartbeat => Some(9),
            MessageKind::Attitude => Some(28),
            MessageKind::GlobalPositionInt => Some(28),
            MessageKind::SensorOffsets => Some(42),
            MessageKind::Ahrs => Some(28),
            MessageKind::Unknown(_) => None,
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::Heartbeat => write!(f, "HEARTBEAT"),
            MessageKind::Attitude => write!(f, "ATTITUDE"),
            MessageKind::GlobalPositionInt => write!(f, "GLOBAL_POSITION_INT"),
            MessageKind::SensorOffsets => write!(f, "SENSOR_OFFSETS"),
            MessageKind::Ahrs => write!(f, "AHRS"),
            MessageKind::Unknown(id) => write!(f, "UNKNOWN({id})"),
        }
    }
}

/// Vehicle liveness beacon.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Heartbeat {
    /// Autopilot-specific bitfield.
    pub custom_mode: u32,
    /// Vehicle type (fixed wing, quadrotor, ...).
    pub mav_type: u8,
    /// Autopilot firmware family.
    pub autopilot: u8,
    /// System mode bitmap.
    pub base_mode: u8,
    /// Overall system state.
    pub system_status: u8,
    /// Protocol minor version.
    pub mavlink_version: u8,
}

/// Attitude report in radians and radians/second.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Attitude {
    /// Milliseconds since vehicle boot.
    pub time_boot_ms: u32,
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub rollspeed: f32,
    pub pitchspeed: f32,
    pub yawspeed: f32,
}

/// Fused global position estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalPositionInt {
    /// Milliseconds since vehicle boot.
    pub time_boot_ms: u32,
    /// Latitude in degrees * 1e7.
    pub lat: i32,
    /// Longitude in degrees * 1e7.
    pub lon: i32,
    /// Altitude above MSL in millimeters.
    pub alt: i32,
    /// Altitude above home in millimeters.
    pub relative_alt: i32,
    /// Ground speed north, cm/s.
    pub vx: i16,
    /// Ground speed east, cm/s.
    pub vy: i16,
    /// Ground speed down, cm/s.
    pub vz: i16,
    /// Compass heading in centidegrees.
    pub hdg: u16,
}

/// Sensor calibration offsets reported by the autopilot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorOffsets {
    pub mag_declination: f32,
    pub raw_press: i32,
    pub raw_temp: i32,
    pub gyro_cal_x: f32,
    pub gyro_cal_y: f32,
    pub gyro_cal_z: f32,
    pub accel_cal_x: f32,
    pub accel_cal_y: f32,
    pub accel_cal_z: f32,
    pub mag_ofs_x: i16,
    pub mag_ofs_y: i16,
    pub mag_ofs_z: i16,
}

/// AHRS filter status.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Ahrs {
    pub omega_ix: f32,
    pub omega_iy: f32,
    pub omega_iz: f32,
    pub accel_weight: f32,
    pub renorm_val: f32,
    pub error_rp: f32,
    pub error_yaw: f32,
}

/// A typed protocol message.
///
/// The closed variant set gives consumers a type-safe `match` over known
/// kinds; the `Unknown` arm is the required default for forward
/// compatibility -- an unrecognized kind is routed, logged, and otherwise
/// ignored, never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Heartbeat(Heartbeat),
    Attitude(Attitude),
    GlobalPositionInt(GlobalPositionInt),
    SensorOffsets(SensorOffsets),
    Ahrs(Ahrs),
    Unknown {
        /// Wire id of the unrecognized kind.
        msg_id: u8,
        /// Raw payload, preserved byte for byte.
        payload: Vec<u8>,
    },
}

impl Message {
    /// The kind of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Heartbeat(_) => MessageKind::Heartbeat,
            Message::Attitude(_) => MessageKind::Attitude,
            Message::GlobalPositionInt(_) => MessageKind::GlobalPositionInt,
            Message::SensorOffsets(_) => MessageKind::SensorOffsets,
            Message::Ahrs(_) => MessageKind::Ahrs,
            Message::Unknown { msg_id, .. } => MessageKind::Unknown(*msg_id),
        }
    }

    /// Serialize the payload in wire order.
    pub fn payload_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.kind().payload_len().unwrap_or(0));
        match self {
            Message::Heartbeat(m) => {
                buf.put_u32_le(m.custom_mode);
                buf.put_u8(m.mav_type);
                buf.put_u8(m.autopilot);
                buf.put_u8(m.base_mode);
                buf.put_u8(m.system_status);
                buf.put_u8(m.mavlink_version);
            }
            Message::Attitude(m) => {
                buf.put_u32_le(m.time_boot_ms);
                buf.put_f32_le(m.roll);
                buf.put_f32_le(m.pitch);
                buf.put_f32_le(m.yaw);
                buf.put_f32_le(m.rollspeed);
                buf.put_f32_le(m.pitchspeed);
                buf.put_f32_le(m.yawspeed);
            }
            Message::GlobalPositionInt(m) => {
                buf.put_u32_le(m.time_boot_ms);
                buf.put_i32_le(m.lat);
                buf.put_i32_le(m.lon);
                buf.put_i32_le(m.alt);
                buf.put_i32_le(m.relative_alt);
                buf.put_i16_le(m.vx);
                buf.put_i16_le(m.vy);
                buf.put_i16_le(m.vz);
                buf.put_u16_le(m.hdg);
            }
            Message::SensorOffsets(m) => {
                buf.put_f32_le(m.mag_declination);
                buf.put_i32_le(m.raw_press);
                buf.put_i32_le(m.raw_temp);
                buf.put_f32_le(m.gyro_cal_x);
                buf.put_f32_le(m.gyro_cal_y);
                buf.put_f32_le(m.gyro_cal_z);
                buf.put_f32_le(m.accel_cal_x);
                buf.put_f32_le(m.accel_cal_y);
                buf.put_f32_le(m.accel_cal_z);
                buf.put_i16_le(m.mag_ofs_x);
                buf.put_i16_le(m.mag_ofs_y);
                buf.put_i16_le(m.mag_ofs_z);
            }
            Message::Ahrs(m) => {
                buf.put_f32_le(m.omega_ix);
                buf.put_f32_le(m.omega_iy);
                buf.put_f32_le(m.omega_iz);
                buf.put_f32_le(m.accel_weight);
                buf.put_f32_le(m.renorm_val);
                buf.put_f32_le(m.error_rp);
                buf.put_f32_le(m.error_yaw);
            }
            Message::Unknown { payload, .. } => {
                buf.put_slice(payload);
            }
        }
        buf.to_vec()
    }

    /// Deserialize a payload for the given wire id.
    ///
    /// Known kinds require an exact payload length; anything else is a
    /// [`Error::Decode`]. Unrecognized ids always succeed as
    /// [`Message::Unknown`].
    pub fn unpack(msg_id: u8, payload: &[u8]) -> Result<Message> {
        let kind = MessageKind::from_id(msg_id);
        if let Some(expected) = kind.payload_len() {
            if payload.len() != expected {
                return Err(Error::Decode(format!(
                    "{kind} payload is {} bytes, expected {expected}",
                    payload.len()
                )));
            }
        }

        let mut buf = payload;
        let message = match kind {
            MessageKind::Heartbeat => Message::Heartbeat(Heartbeat {
                custom_mode: buf.get_u32_le(),
                mav_type: buf.get_u8(),
                autopilot: buf.get_u8(),
                base_mode: buf.get_u8(),
                system_status: buf.get_u8(),
                mavlink_version: buf.get_u8(),
            }),
            MessageKind::Attitude => Message::Attitude(Attitude {
                time_boot_ms: buf.get_u32_le(),
                roll: buf.get_f32_le(),
                pitch: buf.get_f32_le(),
                yaw: buf.get_f32_le(),
                rollspeed: buf.get_f32_le(),
                pitchspeed: buf.get_f32_le(),
                yawspeed: buf.get_f32_le(),
            }),
            MessageKind::GlobalPositionInt => Message::GlobalPositionInt(GlobalPositionInt {
                time_boot_ms: buf.get_u32_le(),
                lat: buf.get_i32_le(),
                lon: buf.get_i32_le(),
                alt: buf.get_i32_le(),
                relative_alt: buf.get_i32_le(),
                vx: buf.get_i16_le(),
                vy: buf.get_i16_le(),
                vz: buf.get_i16_le(),
                hdg: buf.get_u16_le(),
            }),
            MessageKind::SensorOffsets => Message::SensorOffsets(SensorOffsets {
                mag_declination: buf.get_f32_le(),
                raw_press: buf.get_i32_le(),
                raw_temp: buf.get_i32_le(),
                gyro_cal_x: buf.get_f32_le(),
                gyro_cal_y: buf.get_f32_le(),
                gyro_cal_z: buf.get_f32_le(),
                accel_cal_x: buf.get_f32_le(),
                accel_cal_y: buf.get_f32_le(),
                accel_cal_z: buf.get_f32_le(),
                mag_ofs_x: buf.get_i16_le(),
                mag_ofs_y: buf.get_i16_le(),
                mag_ofs_z: buf.get_i16_le(),
            }),
            MessageKind::Ahrs => Message::Ahrs(Ahrs {
                omega_ix: buf.get_f32_le(),
                omega_iy: buf.get_f32_le(),
                omega_iz: buf.get_f32_le(),
                accel_weight: buf.get_f32_le(),
                renorm_val: buf.get_f32_le(),
                error_rp: buf.get_f32_le(),
                error_yaw: buf.get_f32_le(),
            }),
            MessageKind::Unknown(id) => Message::Unknown {
                msg_id: id,
                payload: payload.to_vec(),
            },
        };
        Ok(message)
    }

    /// Pack this message into a [`RawFrame`] ready for encoding.
    pub fn pack(&self, seq: u8, system_id: u8, component_id: u8) -> RawFrame {
        RawFrame {
            seq,
            system_id,
            component_id,
            msg_id: self.kind().id(),
            payload: self.payload_bytes(),
        }
    }
}
