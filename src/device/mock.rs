//! Simulated receiver for hardware-free operation and tests
//!
//! Generates a deterministic complex tone plus seeded noise at roughly
//! the configured sample rate. Call counts are shared through
//! [`MockStats`] so tests can assert how often the acquisition path
//! initialized or retuned the front end.

use super::{ReadOutcome, SdrDevice, TunerParams};
use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Sample pairs per packet, matching the Mirics driver's 336-sample
/// packets at 2.048 Msps
const SAMPLES_PER_PACKET: usize = 336;

/// Shared call counters for test assertions
#[derive(Debug, Clone, Default)]
pub struct MockStats {
    pub init_calls: Arc<AtomicUsize>,
    pub uninit_calls: Arc<AtomicUsize>,
    pub retune_calls: Arc<AtomicUsize>,
    pub packets_read: Arc<AtomicUsize>,
}

impl MockStats {
    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::Relaxed)
    }

    pub fn uninit_calls(&self) -> usize {
        self.uninit_calls.load(Ordering::Relaxed)
    }

    pub fn retune_calls(&self) -> usize {
        self.retune_calls.load(Ordering::Relaxed)
    }

    pub fn packets_read(&self) -> usize {
        self.packets_read.load(Ordering::Relaxed)
    }
}

/// Simulated SDRplay-style receiver
pub struct MockSdr {
    rng: StdRng,
    phase: f32,
    phase_step: f32,
    initialized: bool,
    frequency_hz: u32,
    packet_interval: Duration,
    stats: MockStats,
    /// Test hook: reject this many upcoming set_frequency calls
    reject_retunes: u32,
    /// Test hook: fail every read once this many packets were delivered
    fail_reads_after: Option<usize>,
}

impl MockSdr {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            phase: 0.0,
            phase_step: 0.05,
            initialized: false,
            frequency_hz: 0,
            packet_interval: Duration::ZERO,
            stats: MockStats::default(),
            reject_retunes: 0,
            fail_reads_after: None,
        }
    }

    /// Shared call counters; clone before boxing the device
    pub fn stats(&self) -> MockStats {
        self.stats.clone()
    }

    /// Make the next `n` retune requests fail with `FrequencyRejected`
    pub fn reject_next_retunes(&mut self, n: u32) {
        self.reject_retunes = n;
    }

    /// Fail packet reads once `n` packets have been delivered
    pub fn fail_reads_after(&mut self, n: usize) {
        self.fail_reads_after = Some(n);
    }
}

impl SdrDevice for MockSdr {
    fn init(&mut self, params: &TunerParams) -> Result<usize> {
        if params.sample_rate_hz == 0 {
            return Err(Error::Device("sample rate must be non-zero".to_string()));
        }
        self.initialized = true;
        self.frequency_hz = params.frequency_hz;
        // Pace reads to approximate the configured sample rate
        self.packet_interval = Duration::from_micros(
            SAMPLES_PER_PACKET as u64 * 1_000_000 / params.sample_rate_hz as u64,
        );
        self.stats.init_calls.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "mock receiver initialized: {} Hz, {} sps, gain {}",
            params.frequency_hz,
            params.sample_rate_hz,
            params.gain
        );
        Ok(SAMPLES_PER_PACKET)
    }

    fn uninit(&mut self) -> Result<()> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        self.initialized = false;
        self.stats.uninit_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn set_frequency(&mut self, frequency_hz: u32) -> Result<()> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        if self.reject_retunes > 0 {
            self.reject_retunes -= 1;
            return Err(Error::FrequencyRejected(frequency_hz));
        }
        self.frequency_hz = frequency_hz;
        self.stats.retune_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn set_dc_tracking(&mut self, _mode: u8, _track_time: u8) -> Result<()> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        Ok(())
    }

    fn read_packet(&mut self, i: &mut [i16], q: &mut [i16]) -> Result<ReadOutcome> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        if let Some(limit) = self.fail_reads_after {
            if self.stats.packets_read() >= limit {
                return Err(Error::Device("injected read failure".to_string()));
            }
        }

        for (is, qs) in i.iter_mut().zip(q.iter_mut()) {
            let noise_i: i16 = self.rng.random_range(-256..256);
            let noise_q: i16 = self.rng.random_range(-256..256);
            *is = (self.phase.cos() * 8192.0) as i16 + noise_i;
            *qs = (self.phase.sin() * 8192.0) as i16 + noise_q;
            self.phase += self.phase_step;
            if self.phase > std::f32::consts::TAU {
                self.phase -= std::f32::consts::TAU;
            }
        }

        thread::sleep(self.packet_interval);
        self.stats.packets_read.fetch_add(1, Ordering::Relaxed);
        Ok(ReadOutcome::default())
    }

    fn tuner_type(&self) -> u32 {
        0
    }

    fn tuner_gain_count(&self) -> u32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> TunerParams {
        TunerParams {
            gain: 48,
            sample_rate_hz: 2_048_000,
            frequency_hz: 100_000_000,
            bandwidth_khz: 1536,
            rsp_mode: false,
            lna_enabled: false,
        }
    }

    #[test]
    fn test_init_reports_packet_size() {
        let mut dev = MockSdr::new(1);
        let spp = dev.init(&params()).unwrap();
        assert_eq!(spp, SAMPLES_PER_PACKET);
        assert_eq!(dev.stats().init_calls(), 1);
    }

    #[test]
    fn test_read_requires_init() {
        let mut dev = MockSdr::new(1);
        let mut i = [0i16; SAMPLES_PER_PACKET];
        let mut q = [0i16; SAMPLES_PER_PACKET];
        assert!(dev.read_packet(&mut i, &mut q).is_err());
    }

    #[test]
    fn test_seeded_generator_is_deterministic() {
        let mut a = MockSdr::new(7);
        let mut b = MockSdr::new(7);
        a.init(&params()).unwrap();
        b.init(&params()).unwrap();

        let mut ia = [0i16; SAMPLES_PER_PACKET];
        let mut qa = [0i16; SAMPLES_PER_PACKET];
        let mut ib = [0i16; SAMPLES_PER_PACKET];
        let mut qb = [0i16; SAMPLES_PER_PACKET];
        a.read_packet(&mut ia, &mut qa).unwrap();
        b.read_packet(&mut ib, &mut qb).unwrap();
        assert_eq!(ia, ib);
        assert_eq!(qa, qb);
    }

    #[test]
    fn test_retune_rejection_hook() {
        let mut dev = MockSdr::new(1);
        dev.init(&params()).unwrap();
        dev.reject_next_retunes(2);

        assert!(matches!(
            dev.set_frequency(101_000_000),
            Err(Error::FrequencyRejected(_))
        ));
        assert!(dev.set_frequency(101_000_000).is_err());
        assert!(dev.set_frequency(101_000_000).is_ok());
        assert_eq!(dev.stats().retune_calls(), 1);
    }

    #[test]
    fn test_injected_read_failure() {
        let mut dev = MockSdr::new(1);
        dev.init(&params()).unwrap();
        dev.fail_reads_after(1);

        let mut i = [0i16; SAMPLES_PER_PACKET];
        let mut q = [0i16; SAMPLES_PER_PACKET];
        assert!(dev.read_packet(&mut i, &mut q).is_ok());
        assert!(dev.read_packet(&mut i, &mut q).is_err());
    }
}
