//! Acquisition loop
//!
//! Pulls fixed-size packets of 16-bit I/Q samples from the receiver,
//! converts them to the 8-bit interleaved wire format, and feeds the
//! sample queue. Each iteration first checks the pending-frequency slot
//! written by the command receiver and applies any change through the
//! tuner (in-band retune or full reinit, decided by the band table).
//!
//! Runs inline on the session thread. A packet-read failure ends the
//! session; an init/reinit failure propagates out and ends the process.

use crate::device::SdrDevice;
use crate::error::Result;
use crate::streaming::SampleQueue;
use crate::tuner::Tuner;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

pub struct Acquisition {
    device: Box<dyn SdrDevice>,
    tuner: Tuner,
    queue: Arc<SampleQueue>,
    pending_frequency: Arc<AtomicU32>,
    /// Process-level shutdown; observed in addition to the per-session flag
    running: Arc<AtomicBool>,
    /// Sample bytes left to deliver in finite-capture mode, 0 = unlimited
    capture_remaining: u64,
}

impl Acquisition {
    pub fn new(
        device: Box<dyn SdrDevice>,
        tuner: Tuner,
        queue: Arc<SampleQueue>,
        pending_frequency: Arc<AtomicU32>,
        running: Arc<AtomicBool>,
        capture_bytes: u64,
    ) -> Self {
        Self {
            device,
            tuner,
            queue,
            pending_frequency,
            running,
            capture_remaining: capture_bytes,
        }
    }

    /// Run acquisition for one session.
    ///
    /// Returns `Ok(())` for session-scoped endings (shutdown flag, read
    /// failure, capture budget exhausted) and `Err` only for
    /// process-fatal front-end failures. The shared shutdown flag is set
    /// on exit either way.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        let result = self.stream_packets(shutdown);
        shutdown.store(true, Ordering::Relaxed);
        result
    }

    fn stream_packets(&mut self, shutdown: &AtomicBool) -> Result<()> {
        // Fresh sessions always reconfigure the front end at the
        // currently tracked frequency
        self.tuner.reinit(self.device.as_mut())?;

        let mut i_samples = vec![0i16; self.tuner.samples_per_packet()];
        let mut q_samples = vec![0i16; self.tuner.samples_per_packet()];
        let mut wire = vec![0u8; self.tuner.samples_per_packet() * 2];

        while self.running.load(Ordering::Relaxed) && !shutdown.load(Ordering::Relaxed) {
            let requested = self.pending_frequency.load(Ordering::Relaxed);
            if requested != self.tuner.frequency_hz() {
                log::info!(
                    "frequency change requested: {} Hz -> {} Hz",
                    self.tuner.frequency_hz(),
                    requested
                );
                self.tuner.apply_frequency(self.device.as_mut(), requested)?;
                // A reinit may change the packet geometry
                let spp = self.tuner.samples_per_packet();
                if spp != i_samples.len() {
                    i_samples.resize(spp, 0);
                    q_samples.resize(spp, 0);
                    wire.resize(spp * 2, 0);
                }
            }

            if let Err(e) = self.device.read_packet(&mut i_samples, &mut q_samples) {
                log::warn!("packet read failed: {e}");
                break;
            }

            interleave_msb(&i_samples, &q_samples, &mut wire);

            let mut len = wire.len();
            if self.capture_remaining > 0 && self.capture_remaining <= len as u64 {
                len = self.capture_remaining as usize;
                log::info!("capture budget exhausted, ending session");
                shutdown.store(true, Ordering::Relaxed);
            }
            self.queue.push(wire[..len].to_vec());
            if self.capture_remaining > 0 {
                self.capture_remaining -= len as u64;
            }
        }

        Ok(())
    }

    /// Release the front end at process shutdown
    pub fn release(&mut self) {
        self.tuner.release(self.device.as_mut());
    }
}

/// Convert 16-bit I/Q sample pairs to the wire format: the
/// most-significant byte of each sample, I then Q interleaved.
fn interleave_msb(i_samples: &[i16], q_samples: &[i16], out: &mut [u8]) {
    debug_assert_eq!(i_samples.len(), q_samples.len());
    debug_assert_eq!(out.len(), i_samples.len() * 2);
    for (n, (&i, &q)) in i_samples.iter().zip(q_samples).enumerate() {
        out[2 * n] = (i >> 8) as u8;
        out[2 * n + 1] = (q >> 8) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::device::MockSdr;
    use crate::tuner::Tuner;

    #[test]
    fn test_interleave_takes_high_bytes() {
        let i = [0x1234, -256, 0x7fff];
        let q = [0x00ff, 0x0100, -32768];
        let mut out = [0u8; 6];
        interleave_msb(&i, &q, &mut out);
        assert_eq!(out, [0x12, 0x00, 0xff, 0x01, 0x7f, 0x80]);
    }

    fn acquisition(capture_bytes: u64) -> (Acquisition, crate::device::mock::MockStats) {
        let config = Config::default();
        let device = MockSdr::new(1);
        let stats = device.stats();
        let tuner = Tuner::new(&config.tuner);
        let queue = Arc::new(SampleQueue::new(1024));
        let pending = Arc::new(AtomicU32::new(config.tuner.frequency_hz));
        let running = Arc::new(AtomicBool::new(true));
        (
            Acquisition::new(Box::new(device), tuner, queue, pending, running, capture_bytes),
            stats,
        )
    }

    #[test]
    fn test_capture_budget_truncates_and_stops() {
        // One full packet is 672 wire bytes; ask for less
        let (mut acq, _) = acquisition(1000);
        let queue = Arc::clone(&acq.queue);
        let shutdown = AtomicBool::new(false);

        acq.run(&shutdown).unwrap();

        assert!(shutdown.load(Ordering::Relaxed));
        let total: usize = queue.drain_all().iter().map(|b| b.len()).sum();
        assert_eq!(total, 1000);
    }

    #[test]
    fn test_read_failure_is_session_fatal_only() {
        let config = Config::default();
        let mut device = MockSdr::new(1);
        device.fail_reads_after(2);
        let tuner = Tuner::new(&config.tuner);
        let queue = Arc::new(SampleQueue::new(1024));
        let pending = Arc::new(AtomicU32::new(config.tuner.frequency_hz));
        let running = Arc::new(AtomicBool::new(true));
        let mut acq =
            Acquisition::new(Box::new(device), tuner, queue, pending, running, 0);

        let shutdown = AtomicBool::new(false);
        // Session-fatal read errors surface as a clean return
        assert!(acq.run(&shutdown).is_ok());
        assert!(shutdown.load(Ordering::Relaxed));
    }

    #[test]
    fn test_pending_frequency_applied_between_packets() {
        let (mut acq, stats) = acquisition(673);
        let pending = Arc::clone(&acq.pending_frequency);
        // Cross-band change, must reinit before the second packet
        pending.store(433_920_000, Ordering::Relaxed);

        let shutdown = AtomicBool::new(false);
        acq.run(&shutdown).unwrap();

        assert_eq!(stats.init_calls(), 2);
        assert_eq!(acq.tuner.frequency_hz(), 433_920_000);
    }
}
