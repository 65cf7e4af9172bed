//! Core library for zbxutil
//!
//! Shared error types, logger construction and the small helpers every
//! automation script leans on: CSV I/O, local command execution, the
//! `-debug` flag, the kill switch and secret lookup.

pub mod args;
pub mod command;
pub mod csv_io;
pub mod error;
pub mod kill_switch;
pub mod logging;
pub mod net;
pub mod secrets;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-exports
pub use args::{parse_debug_argument, DebugArgs};
pub use command::{CommandOutput, CommandRunner};
pub use csv_io::{parse_csv_into, write_csv};
pub use error::{DispatchError, Error, Result};
pub use kill_switch::{KillSwitch, DEFAULT_KILL_SWITCH};
pub use logging::{init_tracing, LogBuffer, Logger, DEFAULT_LOGGER_NAME, DEFAULT_LOG_FILE};
pub use net::is_ip;
pub use secrets::{get_secret, mask_token};
