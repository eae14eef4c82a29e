//! Simple logging module with macros.
//!
//! Lines go to stderr as `timestamp [LEVEL] message`, coloured by level.
//! The minimum level and the timestamp prefix are process-wide switches,
//! set from the environment by [`init_from_env`].

use std::fmt::Display;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Environment variable selecting the minimum level.
pub const LOG_LEVEL_ENV: &str = "INTCODE_LOG";
/// Environment variable disabling the timestamp prefix when set to `0`.
pub const LOG_TIMESTAMP_ENV: &str = "INTCODE_LOG_TIMESTAMP";

/// Log level for filtering messages.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl Level {
    /// Parses a level name, case-insensitively.
    pub fn parse(name: &str) -> Option<Level> {
        match name.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            _ => None,
        }
    }

    const fn from_u8(value: u8) -> Level {
        match value {
            0 => Level::Debug,
            1 => Level::Info,
            2 => Level::Warn,
            _ => Level::Error,
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Debug => f.pad("DEBUG"),
            Level::Info => f.pad("INFO"),
            Level::Warn => f.pad("WARN"),
            Level::Error => f.pad("ERROR"),
        }
    }
}

pub static MIN_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);
pub static SHOW_TIMESTAMP: AtomicBool = AtomicBool::new(true);

/// Sets the minimum level that reaches stderr.
pub fn set_level(level: Level) {
    MIN_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Returns the current minimum level.
pub fn level() -> Level {
    Level::from_u8(MIN_LEVEL.load(Ordering::Relaxed))
}

/// Applies [`LOG_LEVEL_ENV`] and [`LOG_TIMESTAMP_ENV`].
///
/// Unknown level names are ignored.
pub fn init_from_env() {
    if let Some(level) = std::env::var(LOG_LEVEL_ENV)
        .ok()
        .as_deref()
        .and_then(Level::parse)
    {
        set_level(level);
    }
    if std::env::var(LOG_TIMESTAMP_ENV).is_ok_and(|v| v.trim() == "0") {
        SHOW_TIMESTAMP.store(false, Ordering::Relaxed);
    }
}

/// Converts seconds since the Unix epoch to `HH:MM:SS` of the UTC day.
fn clock(secs: u64) -> (u64, u64, u64) {
    ((secs / 3600) % 24, (secs / 60) % 60, secs % 60)
}

/// Internal logging function. Use the `debug!`, `info!`, `warn!`, or `error!` macros instead.
#[doc(hidden)]
pub fn log(level: Level, message: &str) {
    if level < self::level() {
        return;
    }

    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let mut spec = ColorSpec::new();
    match level {
        Level::Debug => {
            spec.set_fg(Some(Color::Cyan));
        }
        Level::Warn => {
            spec.set_fg(Some(Color::Yellow)).set_bold(true);
        }
        Level::Error => {
            spec.set_fg(Some(Color::Red)).set_bold(true);
        }
        Level::Info => {
            spec.clear();
        }
    }
    let _ = stderr.set_color(&spec);

    if SHOW_TIMESTAMP.load(Ordering::Relaxed) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        let (hours, mins, secs) = clock(now.as_secs());
        let _ = write!(
            stderr,
            "{:02}:{:02}:{:02}.{:03} ",
            hours,
            mins,
            secs,
            now.subsec_millis()
        );
    }
    let _ = writeln!(stderr, "[{:5}] {}", level, message);
    let _ = stderr.reset();
}

/// Logs a debug-level message.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {{
        if cfg!(not(test)) {
            $crate::utils::log::log($crate::utils::log::Level::Debug, &format!($($arg)*))
        }
    }};
}

/// Logs an info-level message.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {{
        if cfg!(not(test)) {
            $crate::utils::log::log($crate::utils::log::Level::Info, &format!($($arg)*))
        }
    }};
}

/// Logs a warning-level message.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{
        if cfg!(not(test)) {
            $crate::utils::log::log($crate::utils::log::Level::Warn, &format!($($arg)*))
        }
    }};
}

/// Logs an error-level message.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        if cfg!(not(test)) {
            $crate::utils::log::log($crate::utils::log::Level::Error, &format!($($arg)*))
        }
    }};
}
