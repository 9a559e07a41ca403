//! Logging initialization.
//!
//! Thin wrapper over the observability crate so the binary does not need to
//! know where the JSONL stream lives.

use crate::Paths;

/// Initialize logging for `sessionctl`.
///
/// Structured JSONL goes to `<base>/logs/sessionctl.jsonl`; warnings and
/// errors are mirrored on stderr. `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str, paths: &Paths) {
    observability::init_with_config(observability::LogConfig {
        service_name: "sessionctl".into(),
        default_level: level.into(),
        log_path: paths.log_file(),
        also_stderr: true,
    });
}
