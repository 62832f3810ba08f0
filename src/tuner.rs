//! Tuning control: band-crossing decisions and front-end lifecycle
//!
//! The Mirics front end can be retuned cheaply only within the band it
//! was initialized in. Crossing a band boundary requires a full
//! uninit/init cycle so the driver reconfigures the analog front end.
//! [`requires_reinit`] classifies a
//! frequency change against the static allocation table; [`Tuner`]
//! drives the resulting reinit or in-band retune through the
//! [`SdrDevice`] capability interface.

use crate::config::TunerConfig;
use crate::device::{SdrDevice, TunerParams};
use crate::error::{Error, Result};

/// One contiguous range of the frequency allocation table, bounds inclusive
#[derive(Debug, Clone, Copy)]
pub struct FrequencyBand {
    pub from: u32,
    pub to: u32,
}

/// Frequency allocation table covering the full tunable spectrum
pub const FREQUENCY_BANDS: [FrequencyBand; 8] = [
    FrequencyBand { from: 0, to: 11_999_999 },
    FrequencyBand { from: 12_000_000, to: 29_999_999 },
    FrequencyBand { from: 30_000_000, to: 59_999_999 },
    FrequencyBand { from: 60_000_000, to: 119_999_999 },
    FrequencyBand { from: 120_000_000, to: 249_999_999 },
    FrequencyBand { from: 250_000_000, to: 419_999_999 },
    FrequencyBand { from: 420_000_000, to: 999_999_999 },
    FrequencyBand { from: 1_000_000_000, to: u32::MAX },
];

/// DC tracking mode applied after every init (one-shot correction)
const DC_TRACKING_MODE: u8 = 4;
/// DC tracking time constant
const DC_TRACKING_TIME: u8 = 63;

/// Give up on a rejected retune after this many attempts
const SET_FREQUENCY_RETRIES: u32 = 10;

/// Decide whether changing from `old` to `new` requires a full
/// front-end reinitialization.
///
/// Retuning is cheap only within the band containing `old`; if `new`
/// falls outside that band a reinit is required. When `old` matches no
/// table entry the answer is always "reinit": forcing a safe
/// reconfiguration beats risking an invalid tuner state.
pub fn requires_reinit(old: u32, new: u32) -> bool {
    requires_reinit_in(&FREQUENCY_BANDS, old, new)
}

fn requires_reinit_in(table: &[FrequencyBand], old: u32, new: u32) -> bool {
    for band in table {
        if old >= band.from && old <= band.to {
            return new < band.from || new > band.to;
        }
    }
    true
}

/// Tuner state and front-end lifecycle driver
///
/// Owns the current frequency and the initialized flag; the fixed
/// gain/sample-rate/bandwidth configuration is captured once at
/// construction and reused on every reinit.
pub struct Tuner {
    frequency_hz: u32,
    initialized: bool,
    samples_per_packet: usize,
    gain: i32,
    sample_rate_hz: u32,
    bandwidth_khz: u32,
    rsp_mode: bool,
    lna_enabled: bool,
}

impl Tuner {
    pub fn new(config: &TunerConfig) -> Self {
        Self {
            frequency_hz: config.frequency_hz,
            initialized: false,
            samples_per_packet: 0,
            gain: config.gain,
            sample_rate_hz: config.sample_rate_hz,
            bandwidth_khz: config.bandwidth_khz,
            rsp_mode: config.rsp_mode,
            lna_enabled: config.lna_enabled,
        }
    }

    pub fn frequency_hz(&self) -> u32 {
        self.frequency_hz
    }

    /// Sample pairs per packet as reported by the last successful init
    pub fn samples_per_packet(&self) -> usize {
        self.samples_per_packet
    }

    /// In gain-reduction mode the configured value is passed through;
    /// the legacy mode maps it onto the driver's 0..78 reduction scale.
    fn effective_gain(&self) -> i32 {
        if self.rsp_mode { self.gain } else { 78 - self.gain }
    }

    /// Full front-end reinitialization at the current frequency.
    ///
    /// Tears down an initialized front end first, then init, a retried
    /// retune to settle the RF frequency, and DC tracking setup. Any
    /// failure here is process-fatal.
    pub fn reinit(&mut self, device: &mut dyn SdrDevice) -> Result<()> {
        log::info!("reinitializing front end at {} Hz", self.frequency_hz);

        if self.initialized {
            device.uninit()?;
            self.initialized = false;
        }

        let params = TunerParams {
            gain: self.effective_gain(),
            sample_rate_hz: self.sample_rate_hz,
            frequency_hz: self.frequency_hz,
            bandwidth_khz: self.bandwidth_khz,
            rsp_mode: self.rsp_mode,
            lna_enabled: self.lna_enabled,
        };
        self.samples_per_packet = device
            .init(&params)
            .map_err(|e| Error::DeviceInit(e.to_string()))?;

        self.settle_frequency(device)?;
        device.set_dc_tracking(DC_TRACKING_MODE, DC_TRACKING_TIME)?;

        self.initialized = true;
        Ok(())
    }

    /// Retune until the driver accepts the frequency, bounded by
    /// `SET_FREQUENCY_RETRIES`.
    fn settle_frequency(&self, device: &mut dyn SdrDevice) -> Result<()> {
        for _ in 0..SET_FREQUENCY_RETRIES {
            match device.set_frequency(self.frequency_hz) {
                Ok(()) => return Ok(()),
                Err(Error::FrequencyRejected(f)) => {
                    log::warn!("retune to {f} Hz rejected, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::FrequencyRejected(self.frequency_hz))
    }

    /// Apply a requested frequency change.
    ///
    /// Crossing a band boundary triggers a full reinit; otherwise a
    /// single in-band retune is issued. The tracked frequency is updated
    /// unconditionally either way, so a transiently rejected in-band
    /// retune is not replayed on the next iteration.
    pub fn apply_frequency(
        &mut self,
        device: &mut dyn SdrDevice,
        requested: u32,
    ) -> Result<()> {
        if requires_reinit(self.frequency_hz, requested) {
            self.frequency_hz = requested;
            self.reinit(device)
        } else {
            self.frequency_hz = requested;
            if let Err(e) = device.set_frequency(requested) {
                log::warn!("in-band retune to {requested} Hz failed: {e}");
            }
            Ok(())
        }
    }

    /// Release the front end, ignoring errors (process shutdown path)
    pub fn release(&mut self, device: &mut dyn SdrDevice) {
        if self.initialized {
            if let Err(e) = device.uninit() {
                log::warn!("front-end teardown failed: {e}");
            }
            self.initialized = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::device::MockSdr;

    #[test]
    fn test_same_band_no_reinit() {
        // Both within the 60-120 MHz entry
        assert!(!requires_reinit(100_000_000, 108_000_000));
        // Both within the FM band entry boundaries
        assert!(!requires_reinit(60_000_000, 119_999_999));
    }

    #[test]
    fn test_cross_band_reinit() {
        assert!(requires_reinit(100_000_000, 433_920_000));
        assert!(requires_reinit(11_999_999, 12_000_000));
        assert!(requires_reinit(999_999_999, 1_000_000_000));
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        // Exact band edges belong to their band
        assert!(!requires_reinit(120_000_000, 249_999_999));
        assert!(!requires_reinit(1_000_000_000, u32::MAX));
        // One past the upper edge crosses
        assert!(requires_reinit(249_999_999, 250_000_000));
    }

    #[test]
    fn test_unmatched_old_frequency_forces_reinit() {
        // The production table is gap-free over u32, so exercise the
        // conservative default against a sparse table.
        let sparse = [FrequencyBand { from: 100, to: 200 }];
        assert!(requires_reinit_in(&sparse, 50, 150));
        assert!(requires_reinit_in(&sparse, 300, 150));
        assert!(!requires_reinit_in(&sparse, 150, 200));
    }

    #[test]
    fn test_reinit_tears_down_initialized_frontend() {
        let config = Config::default();
        let mut device = MockSdr::new(0);
        let stats = device.stats();
        let mut tuner = Tuner::new(&config.tuner);

        tuner.reinit(&mut device).unwrap();
        assert_eq!(stats.init_calls(), 1);
        assert_eq!(stats.uninit_calls(), 0);
        assert!(tuner.samples_per_packet() > 0);

        tuner.reinit(&mut device).unwrap();
        assert_eq!(stats.init_calls(), 2);
        assert_eq!(stats.uninit_calls(), 1);
    }

    #[test]
    fn test_rejected_retune_is_retried_during_reinit() {
        let config = Config::default();
        let mut device = MockSdr::new(0);
        let stats = device.stats();
        device.reject_next_retunes(3);
        let mut tuner = Tuner::new(&config.tuner);

        tuner.reinit(&mut device).unwrap();
        assert_eq!(stats.retune_calls(), 1);
    }

    #[test]
    fn test_apply_frequency_in_band() {
        let config = Config::default();
        let mut device = MockSdr::new(0);
        let stats = device.stats();
        let mut tuner = Tuner::new(&config.tuner);
        tuner.reinit(&mut device).unwrap();

        tuner.apply_frequency(&mut device, 108_000_000).unwrap();
        assert_eq!(tuner.frequency_hz(), 108_000_000);
        assert_eq!(stats.init_calls(), 1);
    }

    #[test]
    fn test_apply_frequency_cross_band() {
        let config = Config::default();
        let mut device = MockSdr::new(0);
        let stats = device.stats();
        let mut tuner = Tuner::new(&config.tuner);
        tuner.reinit(&mut device).unwrap();

        tuner.apply_frequency(&mut device, 433_920_000).unwrap();
        assert_eq!(tuner.frequency_hz(), 433_920_000);
        assert_eq!(stats.init_calls(), 2);
        assert_eq!(stats.uninit_calls(), 1);
    }

    #[test]
    fn test_effective_gain_mapping() {
        let mut config = Config::default();
        config.tuner.gain = 30;
        config.tuner.rsp_mode = false;
        assert_eq!(Tuner::new(&config.tuner).effective_gain(), 48);

        config.tuner.rsp_mode = true;
        assert_eq!(Tuner::new(&config.tuner).effective_gain(), 30);
    }
}
