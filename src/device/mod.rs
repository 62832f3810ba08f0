//! Receiver capability interface
//!
//! The streaming core never talks to receiver hardware directly; it goes
//! through the narrow [`SdrDevice`] trait modeled on the Mirics API
//! surface (init/uninit, retune, DC tracking, packet read). Backends are
//! selected by the `driver` configuration key.

use crate::config::TunerConfig;
use crate::error::{Error, Result};

pub mod mock;

pub use mock::MockSdr;

/// Front-end parameters passed to [`SdrDevice::init`]
#[derive(Debug, Clone)]
pub struct TunerParams {
    /// Effective gain value handed to the driver (already mapped for
    /// gain-reduction mode by the tuner)
    pub gain: i32,
    pub sample_rate_hz: u32,
    pub frequency_hz: u32,
    pub bandwidth_khz: u32,
    /// Gain-reduction mode flag, drives the 201/202 driver parameters
    pub rsp_mode: bool,
    pub lna_enabled: bool,
}

/// Per-packet status flags reported by the driver
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOutcome {
    /// Index of the first valid sample in the packet
    pub first_sample: u32,
    pub gain_changed: bool,
    pub rf_changed: bool,
    pub sample_rate_changed: bool,
}

/// Receiver driver trait
///
/// All methods return a status; any failure is fatal to the current
/// session's acquisition, and an [`Error::DeviceInit`] from `init` is
/// fatal to the process.
pub trait SdrDevice: Send {
    /// Initialize the front end at the given parameters.
    ///
    /// Returns the fixed number of I/Q sample pairs per packet that
    /// subsequent [`read_packet`](SdrDevice::read_packet) calls deliver.
    fn init(&mut self, params: &TunerParams) -> Result<usize>;

    /// Tear down the front end. Required before re-initializing at a
    /// frequency outside the current band.
    fn uninit(&mut self) -> Result<()>;

    /// In-band retune. May be rejected transiently with
    /// [`Error::FrequencyRejected`]; callers decide whether to retry.
    fn set_frequency(&mut self, frequency_hz: u32) -> Result<()>;

    /// Configure DC offset tracking in the tuner
    fn set_dc_tracking(&mut self, mode: u8, track_time: u8) -> Result<()>;

    /// Read one packet of 16-bit I/Q samples into the provided slices.
    ///
    /// Both slices must hold exactly the packet size returned by `init`.
    /// Blocks until a packet is available; the blocking duration is
    /// owned by the driver, not the caller.
    fn read_packet(&mut self, i: &mut [i16], q: &mut [i16]) -> Result<ReadOutcome>;

    /// Tuner type identifier reported in the dongle-info handshake
    fn tuner_type(&self) -> u32;

    /// Number of discrete tuner gain steps reported in the handshake
    fn tuner_gain_count(&self) -> u32;
}

/// Create a receiver backend from configuration
pub fn create_device(config: &TunerConfig) -> Result<Box<dyn SdrDevice>> {
    match config.driver.as_str() {
        "mock" => Ok(Box::new(MockSdr::new(config.mock_seed))),
        other => Err(Error::Config(format!("unknown driver '{other}'"))),
    }
}
