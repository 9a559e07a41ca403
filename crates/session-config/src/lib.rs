//! Configuration, filesystem paths and logging bootstrap shared by the
//! session crates and the `sessionctl` binary.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, CredentialMode, DEFAULT_API_BASE_URL, DEFAULT_LOGIN_PATH, DEFAULT_LOGOUT_PATH,
    DEFAULT_LOG_LEVEL, DEFAULT_STATUS_PATH,
};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
