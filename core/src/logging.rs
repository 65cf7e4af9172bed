//! Logger construction
//!
//! Library code logs through `tracing` macros. Which subscriber receives those
//! events is decided by the caller: a [`Logger`] is handed to components that
//! need one, and events they emit inside [`Logger::in_scope`] go to that
//! logger only. Nothing here installs a process-wide default except
//! [`init_tracing`], which is meant for binaries.

use std::fmt::{self, Write as _};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::Result;

/// Log file used when the caller does not name one
pub const DEFAULT_LOG_FILE: &str = "./default_util.log";

/// Name given to the default file logger
pub const DEFAULT_LOGGER_NAME: &str = "Default Util Log";

/// An explicit logging collaborator
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    dispatch: Dispatch,
}

impl Logger {
    /// Append log lines to `path`, creating the file if needed
    pub fn to_file(path: impl AsRef<Path>, name: impl Into<String>) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;

        Ok(Self::from_writer(name, Mutex::new(file)))
    }

    /// Build a logger around any `MakeWriter`
    ///
    /// Lines are plain text at INFO and above, in the shape
    /// `timestamp - LEVEL - message fields...`.
    pub fn from_writer<W>(name: impl Into<String>, writer: W) -> Self
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer)
            .with_ansi(false)
            .with_max_level(Level::INFO)
            .event_format(LineFormat)
            .finish();

        Self {
            name: Arc::from(name.into()),
            dispatch: Dispatch::new(subscriber),
        }
    }

    /// Logger that forwards to whatever subscriber is current for this thread
    pub fn current() -> Self {
        Self {
            name: Arc::from("current"),
            dispatch: tracing::dispatcher::get_default(|d| d.clone()),
        }
    }

    /// Logger name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `f` with this logger as the active subscriber
    pub fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

/// `2024-05-01 13:45:10,123 - WARN - message key=value`
struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(
            writer,
            "{} - {} - ",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("name", &self.name).finish()
    }
}

/// Install the process-wide subscriber for a binary
///
/// `RUST_LOG` takes precedence; otherwise `debug` selects between the
/// `debug` and `info` levels.
pub fn init_tracing(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

/// In-memory log sink
///
/// Cloning shares the underlying buffer, so a test can keep one handle and
/// give the other to [`Logger::from_writer`].
#[derive(Clone, Default)]
pub struct LogBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far
    pub fn contents(&self) -> String {
        let buf = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Written lines, in order
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, info, warn};

    #[test]
    fn test_logger_routes_events_to_its_writer() {
        let buffer = LogBuffer::new();
        let logger = Logger::from_writer("test", buffer.clone());

        logger.in_scope(|| {
            info!("first line");
            warn!(endpoint = "http://zbx", "second line");
        });

        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);

        let first: Vec<&str> = lines[0].splitn(3, " - ").collect();
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].len(), "2024-05-01 13:45:10,123".len());
        assert_eq!(first[1], "INFO");
        assert_eq!(first[2], "first line");

        let second: Vec<&str> = lines[1].splitn(3, " - ").collect();
        assert_eq!(second[1], "WARN");
        assert_eq!(second[2], "second line endpoint=\"http://zbx\"");
    }

    #[test]
    fn test_logger_drops_debug_events() {
        let buffer = LogBuffer::new();
        let logger = Logger::from_writer("test", buffer.clone());

        logger.in_scope(|| debug!("too chatty"));

        assert!(buffer.contents().is_empty());
    }

    #[test]
    fn test_events_outside_scope_are_not_captured() {
        let buffer = LogBuffer::new();
        let _logger = Logger::from_writer("test", buffer.clone());

        info!("nobody is listening");

        assert!(buffer.contents().is_empty());
    }

    #[test]
    fn test_current_logger_captures_active_subscriber() {
        let buffer = LogBuffer::new();
        let outer = Logger::from_writer("outer", buffer.clone());

        let current = outer.in_scope(Logger::current);
        current.in_scope(|| info!("via current"));

        assert!(buffer.contents().contains(" - INFO - via current"));
    }

    #[test]
    fn test_file_logger_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("util.log");

        let logger = Logger::to_file(&path, "file").unwrap();
        assert_eq!(logger.name(), "file");
        logger.in_scope(|| info!("written to disk"));

        let again = Logger::to_file(&path, "file").unwrap();
        again.in_scope(|| info!("appended"));

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("written to disk"));
        assert!(content.contains("appended"));
        assert_eq!(content.lines().count(), 2);
    }
}
