//! rtl_tcp wire records
//!
//! The protocol runs over a single TCP connection, big-endian throughout:
//!
//! ```text
//! server -> client   12-byte dongle-info header, sent once after accept
//!                    unframed stream of interleaved 8-bit I/Q bytes
//! client -> server   repeated 5-byte command frames
//! ```
//!
//! ```text
//! ┌───────────┬──────────────────┬────────────────────────┐
//! │ "RTL0"    │ tuner type (u32) │ tuner gain count (u32) │  header
//! └───────────┴──────────────────┴────────────────────────┘
//! ┌──────────────┬─────────────────┐
//! │ opcode (u8)  │ parameter (u32) │  command frame
//! └──────────────┴─────────────────┘
//! ```

/// Magic bytes opening the dongle-info header
pub const MAGIC: [u8; 4] = *b"RTL0";

/// Command opcodes, matching the rtl_tcp control protocol
pub mod opcode {
    pub const SET_FREQUENCY: u8 = 0x01;
    pub const SET_SAMPLE_RATE: u8 = 0x02;
    pub const SET_GAIN_MODE: u8 = 0x03;
    pub const SET_GAIN: u8 = 0x04;
    pub const SET_FREQ_CORRECTION: u8 = 0x05;
    pub const SET_IF_GAIN: u8 = 0x06;
    pub const SET_TEST_MODE: u8 = 0x07;
    pub const SET_AGC_MODE: u8 = 0x08;
    pub const SET_DIRECT_SAMPLING: u8 = 0x09;
    pub const SET_OFFSET_TUNING: u8 = 0x0a;
    pub const SET_RTL_XTAL: u8 = 0x0b;
    pub const SET_TUNER_XTAL: u8 = 0x0c;
    pub const SET_TUNER_GAIN_INDEX: u8 = 0x0d;

    /// Human-readable name for logging, `None` for unknown opcodes
    pub fn name(op: u8) -> Option<&'static str> {
        Some(match op {
            SET_FREQUENCY => "set frequency",
            SET_SAMPLE_RATE => "set sample rate",
            SET_GAIN_MODE => "set gain mode",
            SET_GAIN => "set gain",
            SET_FREQ_CORRECTION => "set frequency correction",
            SET_IF_GAIN => "set IF stage gain",
            SET_TEST_MODE => "set test mode",
            SET_AGC_MODE => "set AGC mode",
            SET_DIRECT_SAMPLING => "set direct sampling",
            SET_OFFSET_TUNING => "set offset tuning",
            SET_RTL_XTAL => "set RTL xtal",
            SET_TUNER_XTAL => "set tuner xtal",
            SET_TUNER_GAIN_INDEX => "set tuner gain by index",
            _ => return None,
        })
    }
}

/// Handshake header sent once per session, before any sample data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DongleInfo {
    pub tuner_type: u32,
    pub tuner_gain_count: u32,
}

impl DongleInfo {
    pub const WIRE_LEN: usize = 12;

    pub fn to_bytes(&self) -> [u8; Self::WIRE_LEN] {
        let mut buf = [0u8; Self::WIRE_LEN];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..8].copy_from_slice(&self.tuner_type.to_be_bytes());
        buf[8..12].copy_from_slice(&self.tuner_gain_count.to_be_bytes());
        buf
    }
}

/// One decoded control frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub opcode: u8,
    pub param: u32,
}

impl Command {
    pub const WIRE_LEN: usize = 5;

    pub fn from_bytes(raw: &[u8; Self::WIRE_LEN]) -> Self {
        Self {
            opcode: raw[0],
            param: u32::from_be_bytes([raw[1], raw[2], raw[3], raw[4]]),
        }
    }

    #[cfg(test)]
    pub fn to_bytes(&self) -> [u8; Self::WIRE_LEN] {
        let mut buf = [0u8; Self::WIRE_LEN];
        buf[0] = self.opcode;
        buf[1..5].copy_from_slice(&self.param.to_be_bytes());
        buf
    }
}
