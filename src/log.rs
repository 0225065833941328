//! Application logging.
//!
//! Every record accepted by the `env_logger` filter is captured into a shared [`LogBuffer`].
//! This buffer is what the engine serves to the logs pane. Echo to stderr can be switched off
//! while the terminal UI owns the screen.

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

static ECHO: AtomicBool = AtomicBool::new(true);

#[inline(always)]
pub fn is_enabled() -> bool {
    ECHO.load(Ordering::SeqCst)
}

/// Stop echoing records to stderr, records are still captured.
pub fn disable() {
    ECHO.store(false, Ordering::SeqCst)
}

pub fn enable() {
    ECHO.store(true, Ordering::SeqCst)
}

/// Single captured log record.
#[derive(PartialEq, Clone, Debug, Eq)]
pub struct LogLine {
    pub level: Level,
    pub time: String,
    pub target: String,
    pub body: String,
}

impl LogLine {
    /// Level name as it is shown to the user. Trace records keep their own name and
    /// are visible only without a level filter.
    pub fn level_name(&self) -> &'static str {
        match self.level {
            Level::Error => "error",
            Level::Warn => "warning",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
        }
    }
}

#[derive(Clone, Default)]
pub struct LogBuffer {
    lines: Arc<Mutex<Vec<LogLine>>>,
}

impl LogBuffer {
    fn lock(&self) -> MutexGuard<'_, Vec<LogLine>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, line: LogLine) {
        self.lock().push(line);
    }

    pub fn snapshot(&self) -> Vec<LogLine> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

pub struct BufferLogger {
    inner: env_logger::Logger,
    buffer: LogBuffer,
}

impl Log for BufferLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.inner.matches(record) {
            return;
        }

        self.buffer.push(LogLine {
            level: record.level(),
            time: Local::now().to_rfc3339(),
            target: record.target().to_string(),
            body: format!("{}", record.args()),
        });

        if is_enabled() {
            self.inner.log(record);
        }
    }

    fn flush(&self) {
        self.inner.flush()
    }
}

impl BufferLogger {
    pub fn new(buffer: LogBuffer) -> Self {
        Self {
            inner: env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or("info"),
            )
            .build(),
            buffer,
        }
    }

    pub fn filter(&self) -> LevelFilter {
        self.inner.filter()
    }
}

/// Install [`BufferLogger`] as a global logger. Should be called once.
pub fn install(buffer: LogBuffer) -> anyhow::Result<()> {
    let logger = BufferLogger::new(buffer);
    let filter = logger.filter();
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(filter);
    Ok(())
}
