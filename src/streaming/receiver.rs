//! Command receiver worker
//!
//! Reads fixed 5-byte control frames from the client and applies them.
//! Frames may arrive split across socket reads, so the loop accumulates
//! into a fixed frame buffer and decodes once it is full. The only
//! command with an effect in this driver revision is `set frequency`,
//! which overwrites the shared pending-frequency slot read by the
//! acquisition loop; the remaining rtl_tcp opcodes are accepted and
//! logged but have no SDRplay equivalent. The control channel is
//! fire-and-forget: no command ever gets a response.

use crate::streaming::wire::{Command, opcode};
use std::io::Read;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

/// Bound on each read attempt so the shutdown flag stays responsive
const READ_TIMEOUT: Duration = Duration::from_secs(1);

pub struct CommandReceiver {
    pending_frequency: Arc<AtomicU32>,
    shutdown: Arc<AtomicBool>,
}

impl CommandReceiver {
    pub fn new(pending_frequency: Arc<AtomicU32>, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            pending_frequency,
            shutdown,
        }
    }

    /// Run the receive loop until the client disconnects or the session
    /// shuts down. Always leaves the shared shutdown flag set on exit.
    pub fn run(&self, mut stream: TcpStream) {
        if let Err(e) = stream.set_read_timeout(Some(READ_TIMEOUT)) {
            log::warn!("failed to set read timeout: {e}");
        }

        let mut frame = [0u8; Command::WIRE_LEN];
        let mut filled = 0;

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            match stream.read(&mut frame[filled..]) {
                Ok(0) => {
                    log::info!("command channel closed by client");
                    break;
                }
                Ok(n) => {
                    filled += n;
                    if filled == frame.len() {
                        self.apply(Command::from_bytes(&frame));
                        filled = 0;
                    }
                }
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    // Read window elapsed mid-frame or while idle; any
                    // partially accumulated frame stays valid
                    continue;
                }
                Err(e) => {
                    log::error!("command read failed: {e}");
                    break;
                }
            }
        }

        self.shutdown.store(true, Ordering::Relaxed);
        log::debug!("command receiver stopped");
    }

    /// Apply one decoded command
    fn apply(&self, cmd: Command) {
        match cmd.opcode {
            opcode::SET_FREQUENCY => {
                log::info!("set frequency {} Hz", cmd.param);
                self.pending_frequency.store(cmd.param, Ordering::Relaxed);
            }
            opcode::SET_IF_GAIN => {
                // Parameter packs stage in the high half, gain in the low
                let stage = cmd.param >> 16;
                let gain = (cmd.param & 0xffff) as u16 as i16;
                log::info!("set IF stage {stage} gain {gain} (no SDRplay equivalent, ignored)");
            }
            op => match opcode::name(op) {
                Some(name) => {
                    log::info!("{name} {} (no SDRplay equivalent, ignored)", cmd.param);
                }
                None => {
                    log::debug!("unrecognized command opcode 0x{op:02x}, ignored");
                }
            },
        }
    }

    #[cfg(test)]
    fn apply_raw(&self, raw: [u8; Command::WIRE_LEN]) {
        self.apply(Command::from_bytes(&raw));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    fn receiver() -> (CommandReceiver, Arc<AtomicU32>, Arc<AtomicBool>) {
        let pending = Arc::new(AtomicU32::new(100_000_000));
        let shutdown = Arc::new(AtomicBool::new(false));
        (
            CommandReceiver::new(Arc::clone(&pending), Arc::clone(&shutdown)),
            pending,
            shutdown,
        )
    }

    #[test]
    fn test_set_frequency_updates_pending_slot() {
        let (rx, pending, _) = receiver();
        let cmd = Command {
            opcode: opcode::SET_FREQUENCY,
            param: 433_920_000,
        };
        rx.apply_raw(cmd.to_bytes());
        assert_eq!(pending.load(Ordering::Relaxed), 433_920_000);
    }

    #[test]
    fn test_unsupported_opcodes_change_nothing() {
        let (rx, pending, shutdown) = receiver();
        for op in [0x02u8, 0x08, 0x0d, 0x0e, 0xff] {
            rx.apply_raw([op, 0, 0, 0, 1]);
        }
        assert_eq!(pending.load(Ordering::Relaxed), 100_000_000);
        assert!(!shutdown.load(Ordering::Relaxed));
    }

    #[test]
    fn test_frame_split_across_reads() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let (rx, pending, shutdown) = receiver();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            rx.run(stream);
        });

        let mut client = TcpStream::connect(addr).unwrap();
        let cmd = Command {
            opcode: opcode::SET_FREQUENCY,
            param: 144_800_000,
        };
        let bytes = cmd.to_bytes();
        // Deliver the frame in two pieces
        client.write_all(&bytes[..2]).unwrap();
        client.flush().unwrap();
        thread::sleep(Duration::from_millis(50));
        client.write_all(&bytes[2..]).unwrap();
        client.flush().unwrap();
        thread::sleep(Duration::from_millis(100));

        assert_eq!(pending.load(Ordering::Relaxed), 144_800_000);

        // Disconnect ends the worker and raises shutdown
        drop(client);
        handle.join().unwrap();
        assert!(shutdown.load(Ordering::Relaxed));
    }
}
