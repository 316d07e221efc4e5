//! Server Configuration
//!
//! Every setting can come from a command-line flag or an environment
//! variable; flags win.
//!
//! ```text
//! quillkv --host 0.0.0.0 --port 6380
//! QUILLKV_PORT=6380 quillkv
//! ```

use crate::connection::DEFAULT_MAX_FRAME_SIZE;
use clap::Parser;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max frame size must be greater than zero")]
    ZeroFrameSize,
}

/// Server configuration
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "quillkv", version, about = "In-memory key-value server")]
pub struct Config {
    /// Host to bind to
    #[arg(long, env = "QUILLKV_HOST", default_value = crate::DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "QUILLKV_PORT", default_value_t = crate::DEFAULT_PORT)]
    pub port: u16,

    /// Largest request frame a client may send, in bytes
    #[arg(long, env = "QUILLKV_MAX_FRAME_SIZE", default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,

    /// Log filter used when RUST_LOG is not set (e.g. "info", "quillkv=debug")
    #[arg(long, env = "QUILLKV_LOG", default_value = "info")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_frame_size == 0 {
            return Err(ConfigError::ZeroFrameSize);
        }
        Ok(())
    }
}
