//! # Observability
//!
//! Logging bootstrap for `sessionctl` and the session crates.
//!
//! Library crates only ever use `tracing` macros. The CLI calls
//! [`init_with_config`] once at startup:
//!
//! - with the `dev` feature, structured JSONL is appended to
//!   [`LogConfig::log_path`] with sensitive fields redacted, and warnings
//!   are optionally mirrored to stderr;
//! - without it, a compact `fmt` subscriber writes to stderr.
//!
//! `RUST_LOG` wins over the configured default level.

#[cfg(feature = "dev")]
mod dev;

mod json_layer;

pub use json_layer::{JsonLayer, LogEntry};

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Included in every JSON line.
    pub service_name: String,
    /// Filter used when `RUST_LOG` is unset.
    pub default_level: String,
    /// JSONL destination; ignored without the `dev` feature.
    pub log_path: PathBuf,
    /// Mirror warnings and errors on stderr next to the file.
    pub also_stderr: bool,
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_with_config(config: LogConfig) {
    #[cfg(feature = "dev")]
    {
        dev::init_dev_subscriber(&config);
    }

    #[cfg(not(feature = "dev"))]
    {
        use tracing_subscriber::util::SubscriberInitExt;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.default_level)),
            )
            .with_writer(std::io::stderr)
            .compact()
            .finish()
            .try_init();
    }
}
