//! Leveled logging capability handed to bundles.
//!
//! A [`Logger`] is either backed by an externally supplied [`LogSink`] or by
//! the built-in [`ConsoleSink`], which writes one line per call:
//!
//! ```text
//! [    WARN] disk almost full {"free_mb":12}
//! ```
//!
//! The set of recognized levels is fixed when the logger is built.

use crate::error::ConfigError;
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Width of the level column in console output.
const LEVEL_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Audit,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
        LogLevel::Audit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "Debug",
            LogLevel::Info => "Info",
            LogLevel::Warn => "Warn",
            LogLevel::Error => "Error",
            LogLevel::Fatal => "Fatal",
            LogLevel::Audit => "Audit",
        }
    }

    /// Case-insensitive lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A writer the logger can forward to.
///
/// `log` is the generic entry point used for every level. A sink that has
/// its own notion of levels advertises them through `levels`; otherwise the
/// default [`LogLevel::ALL`] names are used.
pub trait LogSink: Send + Sync {
    fn log(&self, level: &str, message: &str, details: Option<&Value>);

    fn levels(&self) -> Option<Vec<String>> {
        None
    }
}

/// Built-in fallback: one formatted line per call.
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    /// `[    WARN] message details`
    pub fn format_line(level: &str, message: &str, details: Option<&Value>) -> String {
        let title: String = level.chars().take(LEVEL_WIDTH).collect::<String>().to_uppercase();
        let mut line = format!("[{title:>LEVEL_WIDTH$}] {message}");
        match details {
            None | Some(Value::Null) => {}
            Some(Value::String(text)) => {
                line.push(' ');
                line.push_str(text);
            }
            Some(other) => {
                line.push(' ');
                line.push_str(&other.to_string());
            }
        }
        line
    }
}

impl LogSink for ConsoleSink {
    fn log(&self, level: &str, message: &str, details: Option<&Value>) {
        let line = Self::format_line(level, message, details);
        let mut out = self.out.lock();
        // A broken stdout must not take the application down with it.
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

/// Sink that forwards into `tracing`, so bundle logs share the host's
/// subscriber and filters.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: &str, message: &str, details: Option<&Value>) {
        let details = details.map(Value::to_string).unwrap_or_default();
        match LogLevel::from_name(level) {
            Some(LogLevel::Debug) => debug!(details = %details, "{}", message),
            Some(LogLevel::Info) => info!(details = %details, "{}", message),
            Some(LogLevel::Warn) => warn!(details = %details, "{}", message),
            Some(LogLevel::Error) => error!(details = %details, "{}", message),
            Some(LogLevel::Fatal) => error!(fatal = true, details = %details, "{}", message),
            Some(LogLevel::Audit) => info!(target: "audit", details = %details, "{}", message),
            None => info!(level = level, details = %details, "{}", message),
        }
    }

    fn levels(&self) -> Option<Vec<String>> {
        Some(LogLevel::ALL.iter().map(|l| l.as_str().to_string()).collect())
    }
}

/// How a logger was supplied in the configuration record.
#[derive(Clone)]
pub enum LoggerSpec {
    /// An already constructed sink
    Sink(Arc<dyn LogSink>),
    /// A sink chosen by name: `console` or `tracing`
    Named(String),
}

impl LoggerSpec {
    /// `Ok(None)` selects the console fallback.
    pub fn resolve(&self) -> Result<Option<Arc<dyn LogSink>>, ConfigError> {
        match self {
            LoggerSpec::Sink(sink) => Ok(Some(sink.clone())),
            LoggerSpec::Named(name) => match name.to_ascii_lowercase().as_str() {
                "console" => Ok(None),
                "tracing" => Ok(Some(Arc::new(TracingSink))),
                _ => Err(ConfigError::InvalidLogger(name.clone())),
            },
        }
    }
}

impl fmt::Debug for LoggerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggerSpec::Sink(_) => f.write_str("LoggerSpec::Sink(..)"),
            LoggerSpec::Named(name) => write!(f, "LoggerSpec::Named({name:?})"),
        }
    }
}

/// The leveled logging capability exposed on the facade.
#[derive(Clone)]
pub struct Logger {
    levels: Arc<[String]>,
    sink: Arc<dyn LogSink>,
}

impl Logger {
    /// Console-backed logger with the default levels.
    pub fn console() -> Self {
        Self::with_sink(Arc::new(ConsoleSink::stdout()), Self::default_levels())
    }

    /// Normalizes an optional external sink into a logger.
    ///
    /// A sink that advertises its own (non-empty) level list gets exactly
    /// those levels; any other sink receives the default levels through its
    /// generic `log` entry point.
    pub fn adapt(external: Option<Arc<dyn LogSink>>) -> Self {
        match external {
            None => Self::console(),
            Some(sink) => {
                let levels = sink
                    .levels()
                    .filter(|levels| !levels.is_empty())
                    .unwrap_or_else(Self::default_levels);
                Self::with_sink(sink, levels)
            }
        }
    }

    pub fn from_spec(spec: Option<&LoggerSpec>) -> Result<Self, ConfigError> {
        match spec {
            None => Ok(Self::console()),
            Some(spec) => Ok(Self::adapt(spec.resolve()?)),
        }
    }

    pub fn with_sink(sink: Arc<dyn LogSink>, levels: Vec<String>) -> Self {
        Self {
            levels: levels.into(),
            sink,
        }
    }

    fn default_levels() -> Vec<String> {
        LogLevel::ALL.iter().map(|l| l.as_str().to_string()).collect()
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// The sink's own spelling of `level`, if recognized.
    fn recognized(&self, level: &str) -> Option<&str> {
        self.levels
            .iter()
            .find(|known| known.eq_ignore_ascii_case(level))
            .map(String::as_str)
    }

    /// Writes `message` at `level`.
    ///
    /// An unknown level or an empty message is reported once at debug level
    /// and otherwise ignored.
    pub fn log(&self, level: &str, message: &str, details: Option<&Value>) -> &Self {
        match self.recognized(level) {
            Some(known) if !message.is_empty() => self.sink.log(known, message, details),
            _ => self.self_log(),
        }
        self
    }

    fn emit(&self, level: LogLevel, message: &str) -> &Self {
        if message.is_empty() {
            self.self_log();
            return self;
        }
        let name = self.recognized(level.as_str()).unwrap_or(level.as_str());
        self.sink.log(name, message, None);
        self
    }

    fn self_log(&self) {
        let name = self
            .recognized(LogLevel::Debug.as_str())
            .unwrap_or(LogLevel::Debug.as_str());
        self.sink
            .log(name, "no level or message passed to Logger::log()", None);
    }

    pub fn debug(&self, message: impl AsRef<str>) -> &Self {
        self.emit(LogLevel::Debug, message.as_ref())
    }

    pub fn info(&self, message: impl AsRef<str>) -> &Self {
        self.emit(LogLevel::Info, message.as_ref())
    }

    pub fn warn(&self, message: impl AsRef<str>) -> &Self {
        self.emit(LogLevel::Warn, message.as_ref())
    }

    pub fn error(&self, message: impl AsRef<str>) -> &Self {
        self.emit(LogLevel::Error, message.as_ref())
    }

    pub fn fatal(&self, message: impl AsRef<str>) -> &Self {
        self.emit(LogLevel::Fatal, message.as_ref())
    }

    pub fn audit(&self, message: impl AsRef<str>) -> &Self {
        self.emit(LogLevel::Audit, message.as_ref())
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("levels", &self.levels).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        levels: Option<Vec<String>>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl LogSink for RecordingSink {
        fn log(&self, level: &str, message: &str, _details: Option<&Value>) {
            self.calls.lock().push((level.to_string(), message.to_string()));
        }

        fn levels(&self) -> Option<Vec<String>> {
            self.levels.clone()
        }
    }

    fn console_logger() -> (Logger, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let sink = Arc::new(ConsoleSink::new(buffer.clone()));
        (Logger::with_sink(sink, Logger::default_levels()), buffer)
    }

    #[test]
    fn test_warn_writes_a_single_formatted_line() {
        let (logger, buffer) = console_logger();

        logger.warn("x");

        let output = buffer.contents();
        assert_eq!(output, "[    WARN] x\n");
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn test_format_truncates_long_levels() {
        let line = ConsoleSink::format_line("verbose-trace", "m", None);
        assert_eq!(line, "[VERBOSE-] m");
    }

    #[test]
    fn test_format_appends_details() {
        assert_eq!(
            ConsoleSink::format_line("Info", "saved", Some(&json!("draft"))),
            "[    INFO] saved draft"
        );
        assert_eq!(
            ConsoleSink::format_line("Error", "failed", Some(&json!({"code": 7}))),
            "[   ERROR] failed {\"code\":7}"
        );
    }

    #[test]
    fn test_unknown_level_degrades_to_debug_self_log() {
        let (logger, buffer) = console_logger();

        logger.log("Chatter", "hello", None).log("Info", "", None);

        let output = buffer.contents();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.starts_with("[   DEBUG] no level or message")));
    }

    #[test]
    fn test_level_lookup_ignores_case() {
        let (logger, buffer) = console_logger();

        logger.log("audit", "login", None);

        assert_eq!(buffer.contents(), "[   AUDIT] login\n");
    }

    #[test]
    fn test_external_sink_levels_are_used() {
        let sink = Arc::new(RecordingSink {
            levels: Some(vec!["NOTICE".to_string(), "Warn".to_string()]),
            ..Default::default()
        });
        let logger = Logger::adapt(Some(sink.clone()));

        assert_eq!(logger.levels(), &["NOTICE".to_string(), "Warn".to_string()]);

        logger.log("notice", "hi", None).warn("careful").info("generic");

        let calls = sink.calls.lock().clone();
        assert_eq!(
            calls,
            vec![
                ("NOTICE".to_string(), "hi".to_string()),
                ("Warn".to_string(), "careful".to_string()),
                ("Info".to_string(), "generic".to_string()),
            ]
        );
    }

    #[test]
    fn test_sink_without_levels_gets_defaults() {
        let sink = Arc::new(RecordingSink::default());
        let logger = Logger::adapt(Some(sink.clone()));

        assert_eq!(logger.levels().len(), LogLevel::ALL.len());
        logger.fatal("boom");
        assert_eq!(
            sink.calls.lock().clone(),
            vec![("Fatal".to_string(), "boom".to_string())]
        );
    }

    #[test]
    fn test_named_specs() {
        assert!(LoggerSpec::Named("console".into()).resolve().unwrap().is_none());
        assert!(LoggerSpec::Named("Tracing".into()).resolve().unwrap().is_some());
        assert_eq!(
            LoggerSpec::Named("syslog".into()).resolve().err(),
            Some(ConfigError::InvalidLogger("syslog".into()))
        );
    }

    #[test]
    fn test_level_names_round_trip() {
        for level in LogLevel::ALL {
            assert_eq!(LogLevel::from_name(&level.as_str().to_lowercase()), Some(level));
        }
        assert_eq!(LogLevel::from_name("trace"), None);
    }
}
