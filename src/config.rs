//! Configuration for the rsp-tcp daemon
//!
//! Loads configuration from a TOML file with the parameters needed to
//! serve one I/Q streaming session at a time: listen address, initial
//! tuner settings, and queue bounds. None of these are hot-reconfigurable
//! except the frequency, which clients change over the command channel.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub network: NetworkConfig,
    pub tuner: TunerConfig,
    #[serde(default)]
    pub streaming: StreamingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// TCP listen address for the combined data/command connection
    ///
    /// Examples:
    /// - `127.0.0.1:1234` - Localhost only (rtl_tcp default port)
    /// - `0.0.0.0:1234` - All interfaces
    pub bind_address: String,
}

/// Initial tuner configuration, applied at first hardware init
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TunerConfig {
    /// Receiver backend ("mock" for the simulated device)
    #[serde(default = "default_driver")]
    pub driver: String,
    /// Initial center frequency in Hz
    pub frequency_hz: u32,
    /// Gain reduction in dB (see the Mirics API spec for the valid range)
    pub gain: i32,
    /// Sample rate in Hz
    pub sample_rate_hz: u32,
    /// Analog bandwidth in kHz
    pub bandwidth_khz: u32,
    /// Gain-reduction mode: pass `gain` through unchanged instead of
    /// the legacy `78 - gain` mapping
    #[serde(default)]
    pub rsp_mode: bool,
    /// RSP LNA enable
    #[serde(default)]
    pub lna_enabled: bool,
    /// Seed for the mock device sample generator (0 = arbitrary)
    #[serde(default)]
    pub mock_seed: u64,
}

/// Streaming engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamingConfig {
    /// Maximum number of sample buffers retained between acquisition and
    /// the network sender; the oldest buffer is dropped on overflow
    pub queue_depth: usize,
    /// Stop streaming after exactly this many sample bytes (0 = unlimited)
    #[serde(default)]
    pub capture_bytes: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

fn default_driver() -> String {
    "mock".to_string()
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            queue_depth: 500,
            capture_bytes: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Sanity checks beyond what serde enforces
    fn validate(&self) -> Result<()> {
        if self.streaming.queue_depth == 0 {
            return Err(Error::Config("queue_depth must be at least 1".to_string()));
        }
        if self.tuner.sample_rate_hz == 0 {
            return Err(Error::Config("sample_rate_hz must be non-zero".to_string()));
        }
        Ok(())
    }
}

impl Default for Config {
    /// Defaults matching the classic rtl_tcp command line: 100 MHz,
    /// 2.048 Msps, gain reduction 30, listening on localhost:1234.
    fn default() -> Self {
        Self {
            network: NetworkConfig {
                bind_address: "127.0.0.1:1234".to_string(),
            },
            tuner: TunerConfig {
                driver: "mock".to_string(),
                frequency_hz: 100_000_000,
                gain: 30,
                sample_rate_hz: 2_048_000,
                bandwidth_khz: 1536,
                rsp_mode: false,
                lna_enabled: false,
                mock_seed: 0,
            },
            streaming: StreamingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
