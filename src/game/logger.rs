//! Bump-allocating game logger
//!
//! Messages are formatted into a reusable bump arena and only copied into an
//! owned `String` when they are captured. The buffer and arena sit behind
//! `RefCell` so logging works through `&GameState`.

use bumpalo::Bump;
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell};
use std::fmt::{self, Write as FmtWrite};
use std::ops::Deref;

/// How much the logger prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// No output during the game
    Silent = 0,
    /// Only the game outcome
    Minimal = 1,
    /// Turns, steps and key actions
    #[default]
    Normal = 2,
    /// Every action and state change
    Verbose = 3,
}

impl std::str::FromStr for VerbosityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silent" | "0" => Ok(VerbosityLevel::Silent),
            "minimal" | "1" => Ok(VerbosityLevel::Minimal),
            "normal" | "2" => Ok(VerbosityLevel::Normal),
            "verbose" | "3" => Ok(VerbosityLevel::Verbose),
            other => Err(format!("unknown verbosity level '{other}'")),
        }
    }
}

/// Output format for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Output destination for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputMode {
    #[default]
    Stdout,
    /// Capture only to the in-memory buffer
    Memory,
    Both,
}

/// What a log line is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogCategory {
    Turn,
    Step,
    Priority,
    Cast,
    Resolve,
    Fizzle,
    Combat,
    StateBased,
    Trigger,
    Effect,
    Mana,
    Decision,
    GameOver,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Turn => "turn",
            LogCategory::Step => "step",
            LogCategory::Priority => "priority",
            LogCategory::Cast => "cast",
            LogCategory::Resolve => "resolve",
            LogCategory::Fizzle => "fizzle",
            LogCategory::Combat => "combat",
            LogCategory::StateBased => "state_based",
            LogCategory::Trigger => "trigger",
            LogCategory::Effect => "effect",
            LogCategory::Mana => "mana",
            LogCategory::Decision => "decision",
            LogCategory::GameOver => "game_over",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: VerbosityLevel,
    pub message: String,
    pub category: Option<LogCategory>,
}

/// Read-only access to captured log entries
pub struct LogGuard<'a> {
    guard: Ref<'a, Vec<LogEntry>>,
}

impl<'a> Deref for LogGuard<'a> {
    type Target = [LogEntry];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

/// The arena is reset once it has grown past this many bytes
const BUMP_RESET_BYTES: usize = 64 * 1024;

pub struct GameLogger {
    verbosity: VerbosityLevel,
    output_format: OutputFormat,
    output_mode: OutputMode,

    /// Scratch arena for formatting
    format_bump: RefCell<Bump>,

    log_buffer: RefCell<Vec<LogEntry>>,
}

impl GameLogger {
    pub fn new() -> Self {
        Self::with_verbosity(VerbosityLevel::default())
    }

    pub fn with_verbosity(verbosity: VerbosityLevel) -> Self {
        GameLogger {
            verbosity,
            output_format: OutputFormat::default(),
            output_mode: OutputMode::default(),
            format_bump: RefCell::new(Bump::new()),
            log_buffer: RefCell::new(Vec::new()),
        }
    }

    pub fn set_output_mode(&mut self, mode: OutputMode) {
        self.output_mode = mode;
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    /// Capture to memory only (suppresses stdout)
    pub fn enable_capture(&mut self) {
        self.output_mode = OutputMode::Memory;
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self.output_mode, OutputMode::Memory | OutputMode::Both)
    }

    pub fn set_output_format(&mut self, format: OutputFormat) {
        self.output_format = format;
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: VerbosityLevel) {
        self.verbosity = verbosity;
    }

    pub fn logs(&self) -> LogGuard<'_> {
        LogGuard {
            guard: self.log_buffer.borrow(),
        }
    }

    /// Captured entries in one category
    pub fn logs_in(&self, category: LogCategory) -> Vec<LogEntry> {
        self.log_buffer
            .borrow()
            .iter()
            .filter(|entry| entry.category == Some(category))
            .cloned()
            .collect()
    }

    pub fn clear_logs(&mut self) {
        self.log_buffer.borrow_mut().clear();
        self.format_bump.borrow_mut().reset();
    }

    /// Print buffered logs that pass the verbosity filter, then clear
    pub fn flush_buffer(&mut self) {
        {
            let buffer = self.log_buffer.borrow();
            for entry in buffer.iter().filter(|e| e.level <= self.verbosity) {
                self.emit(entry.level, entry.category, &entry.message);
            }
        }
        self.clear_logs();
    }

    /// Whether a message at `level` would be printed or captured
    #[inline]
    pub fn enabled(&self, level: VerbosityLevel) -> bool {
        level != VerbosityLevel::Silent && (level <= self.verbosity || self.is_capturing())
    }

    /// Log preformatted arguments
    ///
    /// Formatting happens in the bump arena, so messages filtered out by
    /// verbosity cost nothing and printed-only messages never hit the heap.
    pub fn log(&self, level: VerbosityLevel, category: Option<LogCategory>, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }

        {
            let bump = self.format_bump.borrow();
            let mut message = bumpalo::collections::String::new_in(&bump);
            if message.write_fmt(args).is_err() {
                return;
            }

            if self.is_capturing() {
                self.log_buffer.borrow_mut().push(LogEntry {
                    level,
                    message: message.as_str().to_owned(),
                    category,
                });
            }

            let prints = matches!(self.output_mode, OutputMode::Stdout | OutputMode::Both);
            if prints && level <= self.verbosity {
                self.emit(level, category, message.as_str());
            }
        }

        let mut bump = self.format_bump.borrow_mut();
        if bump.allocated_bytes() > BUMP_RESET_BYTES {
            bump.reset();
        }
    }

    fn emit(&self, level: VerbosityLevel, category: Option<LogCategory>, message: &str) {
        match self.output_format {
            OutputFormat::Text => {
                if level == VerbosityLevel::Minimal {
                    println!("{message}");
                } else {
                    println!("  {message}");
                }
            }
            OutputFormat::Json => {
                let line = serde_json::json!({
                    "level": level,
                    "category": category.map(|c| c.as_str()),
                    "message": message,
                });
                println!("{line}");
            }
        }
    }

    #[inline]
    pub fn minimal(&self, message: &str) {
        self.log(VerbosityLevel::Minimal, None, format_args!("{message}"));
    }

    #[inline]
    pub fn normal(&self, message: &str) {
        self.log(VerbosityLevel::Normal, None, format_args!("{message}"));
    }

    #[inline]
    pub fn verbose(&self, message: &str) {
        self.log(VerbosityLevel::Verbose, None, format_args!("{message}"));
    }

    /// Log a categorized game event at Normal level
    #[inline]
    pub fn event(&self, category: LogCategory, args: fmt::Arguments<'_>) {
        self.log(VerbosityLevel::Normal, Some(category), args);
    }

    /// Log a categorized detail at Verbose level
    #[inline]
    pub fn detail(&self, category: LogCategory, args: fmt::Arguments<'_>) {
        self.log(VerbosityLevel::Verbose, Some(category), args);
    }
}

/// Log at Verbose level only when the `verbose-logging` feature is on
///
/// With the feature off the arguments are never evaluated.
#[macro_export]
macro_rules! log_if_verbose {
    ($logger:expr, $category:expr, $($arg:tt)*) => {
        #[cfg(feature = "verbose-logging")]
        {
            $logger.detail($category, format_args!($($arg)*));
        }
    };
}

impl Default for GameLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GameLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameLogger")
            .field("verbosity", &self.verbosity)
            .field("output_mode", &self.output_mode)
            .field("log_count", &self.log_buffer.borrow().len())
            .finish()
    }
}

impl Clone for GameLogger {
    fn clone(&self) -> Self {
        GameLogger {
            verbosity: self.verbosity,
            output_format: self.output_format,
            output_mode: self.output_mode,
            format_bump: RefCell::new(Bump::new()),
            log_buffer: RefCell::new(Vec::new()),
        }
    }
}

impl Serialize for GameLogger {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("GameLogger", 3)?;
        state.serialize_field("verbosity", &self.verbosity)?;
        state.serialize_field("output_format", &self.output_format)?;
        state.serialize_field("output_mode", &self.output_mode)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for GameLogger {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct GameLoggerData {
            verbosity: VerbosityLevel,
            #[serde(default)]
            output_format: OutputFormat,
            #[serde(default)]
            output_mode: OutputMode,
        }

        let data = GameLoggerData::deserialize(deserializer)?;
        let mut logger = GameLogger::with_verbosity(data.verbosity);
        logger.output_format = data.output_format;
        logger.output_mode = data.output_mode;
        Ok(logger)
    }
}
