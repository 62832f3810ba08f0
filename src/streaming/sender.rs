//! Data sender worker
//!
//! Drains the sample queue and streams buffers to the connected client
//! in FIFO order. Each wake drains the whole queue so the producer is
//! never blocked behind socket I/O. Partial writes resume at the unsent
//! remainder of the same buffer; a zero-byte write, any I/O error, or a
//! queue stall ends the session by raising the shared shutdown flag.

use crate::error::{Error, Result};
use crate::streaming::SampleQueue;
use std::io::Write;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// No data from the acquisition path for this long means the producer
/// is dead and the session must end
const STALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound on each individual write attempt
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

pub struct DataSender {
    queue: Arc<SampleQueue>,
    shutdown: Arc<AtomicBool>,
}

impl DataSender {
    pub fn new(queue: Arc<SampleQueue>, shutdown: Arc<AtomicBool>) -> Self {
        Self { queue, shutdown }
    }

    /// Run the sender loop until the session ends.
    ///
    /// Always leaves the shared shutdown flag set on exit so the other
    /// session workers stop too.
    pub fn run(&self, mut stream: TcpStream) {
        if let Err(e) = stream.set_write_timeout(Some(WRITE_TIMEOUT)) {
            log::warn!("failed to set write timeout: {e}");
        }

        'session: loop {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            if let Err(e) = self.queue.wait_non_empty(STALL_TIMEOUT) {
                log::error!("sample queue stalled: {e}");
                break;
            }

            for buffer in self.queue.drain_all() {
                if let Err(e) = self.send_buffer(&mut stream, &buffer) {
                    match e {
                        Error::ConnectionClosed | Error::Shutdown => {
                            log::info!("data sender: {e}")
                        }
                        _ => log::error!("data sender: {e}"),
                    }
                    break 'session;
                }
            }
        }

        self.shutdown.store(true, Ordering::Relaxed);
        log::debug!("data sender stopped");
    }

    /// Transmit one buffer completely, retrying bounded write attempts
    /// until every byte is out or the session is shut down.
    fn send_buffer<W: Write>(&self, writer: &mut W, buffer: &[u8]) -> Result<()> {
        let mut index = 0;
        while index < buffer.len() {
            if self.shutdown.load(Ordering::Relaxed) {
                return Err(Error::Shutdown);
            }
            match writer.write(&buffer[index..]) {
                Ok(0) => return Err(Error::ConnectionClosed),
                Ok(n) => index += n,
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    // Write window elapsed; re-check shutdown and retry
                    continue;
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(())
    }
}
