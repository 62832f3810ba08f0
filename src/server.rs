//! Session lifecycle
//!
//! One client at a time: accept, send the dongle-info handshake, run the
//! command receiver and data sender as worker threads while acquisition
//! runs inline, then tear everything down and go back to listening.
//! Additional connection attempts simply wait in the listen backlog
//! until the current session ends.
//!
//! ```text
//! LISTENING -> ACCEPTED -> STREAMING -> TEARDOWN -> LISTENING
//!     |                                                 |
//!     +------------------ TERMINATED <------------------+   (process shutdown)
//! ```
//!
//! Transport failures end only the session; the server keeps listening.
//! A front-end init failure propagates out of [`Server::run`] and ends
//! the process with a non-zero status.

use crate::acquisition::Acquisition;
use crate::config::Config;
use crate::device::SdrDevice;
use crate::error::Result;
use crate::streaming::{CommandReceiver, DataSender, DongleInfo, SampleQueue};
use crate::tuner::Tuner;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

/// Accept-poll interval while no client is connected
const ACCEPT_POLL: Duration = Duration::from_millis(100);

pub struct Server {
    listener: TcpListener,
    queue: Arc<SampleQueue>,
    pending_frequency: Arc<AtomicU32>,
    acquisition: Acquisition,
    dongle_info: DongleInfo,
    running: Arc<AtomicBool>,
    bind_address: String,
}

impl Server {
    /// Bind the listen socket and assemble the streaming engine.
    pub fn new(
        config: Config,
        device: Box<dyn SdrDevice>,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(&config.network.bind_address)?;
        listener.set_nonblocking(true)?;

        let queue = Arc::new(SampleQueue::new(config.streaming.queue_depth));
        let pending_frequency = Arc::new(AtomicU32::new(config.tuner.frequency_hz));
        let dongle_info = DongleInfo {
            tuner_type: device.tuner_type(),
            tuner_gain_count: device.tuner_gain_count(),
        };
        let tuner = Tuner::new(&config.tuner);
        let acquisition = Acquisition::new(
            device,
            tuner,
            Arc::clone(&queue),
            Arc::clone(&pending_frequency),
            Arc::clone(&running),
            config.streaming.capture_bytes,
        );

        Ok(Self {
            listener,
            queue,
            pending_frequency,
            acquisition,
            dongle_info,
            running,
            bind_address: config.network.bind_address,
        })
    }

    /// Actual bound address (useful when the port was 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept-and-serve loop. Returns when the process running flag is
    /// cleared, or with an error on a process-fatal front-end failure.
    pub fn run(&mut self) -> Result<()> {
        log::info!("listening on {}", self.bind_address);
        log::info!(
            "use the device argument 'rtl_tcp={}' in gr-osmosdr to receive and control this server",
            self.bind_address
        );

        while self.running.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    log::info!("client accepted: {addr}");
                    self.serve_client(stream, addr)?;
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL);
                }
                Err(e) => {
                    log::error!("accept failed: {e}");
                }
            }
        }

        self.acquisition.release();
        log::info!("server stopped");
        Ok(())
    }

    /// Run one complete session: handshake, workers, acquisition, teardown.
    ///
    /// Only process-fatal errors are returned; transport failures are
    /// logged and the server goes back to listening.
    fn serve_client(&mut self, mut stream: TcpStream, addr: SocketAddr) -> Result<()> {
        // Workers get a fresh shutdown flag each session
        let shutdown = Arc::new(AtomicBool::new(false));

        // The handshake must precede any sample data
        if let Err(e) = stream.write_all(&self.dongle_info.to_bytes()) {
            log::error!("failed to send dongle information: {e}");
            let _ = stream.shutdown(Shutdown::Both);
            return Ok(());
        }

        let (data_stream, command_stream) = match (stream.try_clone(), stream.try_clone()) {
            (Ok(d), Ok(c)) => (d, c),
            (Err(e), _) | (_, Err(e)) => {
                log::error!("failed to clone client socket: {e}");
                let _ = stream.shutdown(Shutdown::Both);
                return Ok(());
            }
        };

        let sender = DataSender::new(Arc::clone(&self.queue), Arc::clone(&shutdown));
        let receiver =
            CommandReceiver::new(Arc::clone(&self.pending_frequency), Arc::clone(&shutdown));

        let sender_handle = match thread::Builder::new()
            .name("data-sender".to_string())
            .spawn(move || sender.run(data_stream))
        {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("failed to spawn data sender: {e}");
                let _ = stream.shutdown(Shutdown::Both);
                return Ok(());
            }
        };
        let receiver_handle = match thread::Builder::new()
            .name("command-receiver".to_string())
            .spawn(move || receiver.run(command_stream))
        {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("failed to spawn command receiver: {e}");
                shutdown.store(true, Ordering::Relaxed);
                let _ = stream.shutdown(Shutdown::Both);
                let _ = sender_handle.join();
                return Ok(());
            }
        };

        // STREAMING: acquisition runs inline until something ends the
        // session. Process-fatal errors are re-raised after teardown.
        let acquisition_result = self.acquisition.run(&shutdown);

        // TEARDOWN
        let _ = stream.shutdown(Shutdown::Both);
        if sender_handle.join().is_err() {
            log::error!("data sender panicked");
        }
        if receiver_handle.join().is_err() {
            log::error!("command receiver panicked");
        }

        let flushed = self.queue.drain_all().len();
        if flushed > 0 {
            log::debug!("flushed {flushed} queued buffers");
        }
        log::info!("session ended: {addr}");

        acquisition_result
    }
}
