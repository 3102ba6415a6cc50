//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the logging subsystem (service log and access log)
//! - Render events as flat JSON lines
//! - Hold the runtime-adjustable severity thresholds
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - Access records go to stdout on the `access` target, everything else
//!   to stderr
//! - Each output has its own `LogLevel`, changed at runtime through the
//!   management API without rebuilding the subscriber

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::filter::{filter_fn, FilterExt};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::layer::{Context, Filter, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Target used by the access log middleware.
pub const ACCESS_TARGET: &str = "access";

/// Error type for logging setup.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Error returned when a level name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized level: {0:?}")]
pub struct ParseLevelError(String);

/// A severity threshold that can be read and changed concurrently.
///
/// Clones share the same threshold.
#[derive(Clone)]
pub struct LogLevel {
    inner: Arc<AtomicU8>,
}

impl LogLevel {
    pub fn new(level: Level) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(level_to_u8(level))),
        }
    }

    pub fn get(&self) -> Level {
        level_from_u8(self.inner.load(Ordering::Relaxed))
    }

    pub fn set(&self, level: Level) {
        self.inner.store(level_to_u8(level), Ordering::Relaxed);
    }

    /// Whether an event at `level` passes this threshold.
    pub fn enables(&self, level: &Level) -> bool {
        *level <= self.get()
    }
}

impl fmt::Debug for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LogLevel").field(&self.get()).finish()
    }
}

impl<S> Filter<S> for LogLevel {
    fn enabled(&self, meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        self.enables(meta.level())
    }
}

/// The two independent thresholds of the process.
#[derive(Debug, Clone)]
pub struct LogLevels {
    pub service: LogLevel,
    pub access: LogLevel,
}

impl Default for LogLevels {
    fn default() -> Self {
        Self {
            service: LogLevel::new(Level::INFO),
            access: LogLevel::new(Level::INFO),
        }
    }
}

fn level_to_u8(level: Level) -> u8 {
    match level {
        Level::ERROR => 1,
        Level::WARN => 2,
        Level::INFO => 3,
        Level::DEBUG => 4,
        Level::TRACE => 5,
    }
}

fn level_from_u8(value: u8) -> Level {
    match value {
        1 => Level::ERROR,
        2 => Level::WARN,
        3 => Level::INFO,
        4 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Lowercase level name used in log lines and by the management API.
pub fn level_name(level: Level) -> &'static str {
    match level {
        Level::ERROR => "error",
        Level::WARN => "warn",
        Level::INFO => "info",
        Level::DEBUG => "debug",
        Level::TRACE => "trace",
    }
}

/// Parse a level name, case-insensitively. `warning` is accepted for `warn`.
pub fn parse_level(name: &str) -> Result<Level, ParseLevelError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "warning" => Ok(Level::WARN),
        other => Level::from_str(other).map_err(|_| ParseLevelError(name.to_string())),
    }
}

/// Flat JSON event format: `{"ts":..,"level":..,<fields>}`.
#[derive(Debug, Clone, Copy)]
pub struct JsonFormat {
    include_target: bool,
    include_message: bool,
}

impl JsonFormat {
    /// Service log lines carry target and message.
    pub fn service() -> Self {
        Self {
            include_target: true,
            include_message: true,
        }
    }

    /// Access log lines are fields only.
    pub fn access() -> Self {
        Self {
            include_target: false,
            include_message: false,
        }
    }
}

impl<S, N> FormatEvent<S, N> for JsonFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut ts = String::new();
        SystemTime.format_time(&mut Writer::new(&mut ts))?;

        let meta = event.metadata();
        let mut record = Map::new();
        record.insert("ts".into(), Value::String(ts));
        record.insert("level".into(), Value::String(level_name(*meta.level()).into()));
        if self.include_target {
            record.insert("target".into(), Value::String(meta.target().into()));
        }

        let mut visitor = JsonVisitor {
            record: &mut record,
            include_message: self.include_message,
        };
        event.record(&mut visitor);

        writeln!(writer, "{}", Value::Object(record))
    }
}

struct JsonVisitor<'a> {
    record: &'a mut Map<String, Value>,
    include_message: bool,
}

impl JsonVisitor<'_> {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            if self.include_message {
                self.record.insert("msg".into(), value);
            }
            return;
        }
        self.record.insert(field.name().into(), value);
    }
}

impl Visit for JsonVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::from(format!("{value:?}")));
    }
}

/// Layer writing service events (everything off the access target).
pub fn service_layer<S, W>(level: LogLevel, writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .event_format(JsonFormat::service())
        .with_writer(writer)
        .with_filter(level.and(filter_fn(|meta| meta.target() != ACCESS_TARGET)))
}

/// Layer writing access records only.
pub fn access_layer<S, W>(level: LogLevel, writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .event_format(JsonFormat::access())
        .with_writer(writer)
        .with_filter(level.and(filter_fn(|meta| meta.target() == ACCESS_TARGET)))
}

/// Install the process subscriber: service log on stderr, access log on stdout.
pub fn init(levels: &LogLevels) -> Result<(), LoggingError> {
    tracing_subscriber::registry()
        .with(service_layer(levels.service.clone(), std::io::stderr))
        .with(access_layer(levels.access.clone(), std::io::stdout))
        .try_init()?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io;
    use std::sync::{Arc, Mutex};

    use serde_json::Value;
    use tracing_subscriber::fmt::MakeWriter;

    /// In-memory writer collecting JSON log lines.
    #[derive(Clone, Default)]
    pub struct CapturedLines {
        buf: Arc<Mutex<Vec<u8>>>,
    }

    impl CapturedLines {
        pub fn records(&self) -> Vec<Value> {
            let buf = self.buf.lock().unwrap();
            String::from_utf8_lossy(&buf)
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    impl io::Write for CapturedLines {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.buf.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLines {
        type Writer = CapturedLines;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }
}
