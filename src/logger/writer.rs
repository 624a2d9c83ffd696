//! Log sink
//!
//! Process-wide writer set once at startup. Messages go to stdout/stderr
//! unless a file is configured for the access or error stream.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, OnceLock};

static LOG_WRITER: OnceLock<LogWriter> = OnceLock::new();

enum LogTarget {
    Stdout,
    Stderr,
    File(File),
}

impl LogTarget {
    fn open(path: Option<&str>, fallback: Self) -> io::Result<Self> {
        path.map_or(Ok(fallback), |p| open_log_file(p).map(Self::File))
    }

    fn write_line(&mut self, message: &str) {
        match self {
            Self::Stdout => println!("{message}"),
            Self::Stderr => eprintln!("{message}"),
            Self::File(file) => {
                let _ = writeln!(file, "{message}");
            }
        }
    }
}

pub struct LogWriter {
    access: Mutex<LogTarget>,
    error: Mutex<LogTarget>,
    debug: bool,
}

impl LogWriter {
    fn new(
        access_log_file: Option<&str>,
        error_log_file: Option<&str>,
        debug: bool,
    ) -> io::Result<Self> {
        Ok(Self {
            access: Mutex::new(LogTarget::open(access_log_file, LogTarget::Stdout)?),
            error: Mutex::new(LogTarget::open(error_log_file, LogTarget::Stderr)?),
            debug,
        })
    }

    /// Info and access lines share the access target
    pub fn write_access(&self, message: &str) {
        lock(&self.access).write_line(message);
    }

    pub fn write_error(&self, message: &str) {
        lock(&self.error).write_line(message);
    }

    pub const fn debug_enabled(&self) -> bool {
        self.debug
    }
}

// A panic mid-write must not silence logging for the rest of the process
fn lock(target: &Mutex<LogTarget>) -> MutexGuard<'_, LogTarget> {
    target
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn open_log_file(path: &str) -> io::Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global writer
///
/// Fails if a log file cannot be opened or the writer is already set.
pub fn init(
    access_log_file: Option<&str>,
    error_log_file: Option<&str>,
    debug: bool,
) -> io::Result<()> {
    let writer = LogWriter::new(access_log_file, error_log_file, debug)?;
    LOG_WRITER.set(writer).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "Log writer already initialized",
        )
    })
}

/// The global writer, if [`init`] has run
pub fn get() -> Option<&'static LogWriter> {
    LOG_WRITER.get()
}
