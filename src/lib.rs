//! rsp-tcp - rtl_tcp-compatible I/Q spectrum server for SDRplay RSP receivers
//!
//! Serves one client at a time over a single TCP connection: a 12-byte
//! dongle-info handshake, then an unbounded stream of interleaved 8-bit
//! I/Q samples, while 5-byte rtl_tcp control frames (frequency changes)
//! arrive on the same socket. The receiver hardware sits behind the
//! [`device::SdrDevice`] capability trait; a deterministic mock backend
//! is built in for hardware-free runs and tests.

pub mod acquisition;
pub mod config;
pub mod device;
pub mod error;
pub mod server;
pub mod streaming;
pub mod tuner;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use server::Server;
