//! Grouped, replayable ledger of everything a command did
//!
//! The same log is printed for the operator and read back later to drive a
//! revert. It is shared by handle across all steps of a run; nested owners
//! call [`ActionLog::open`]/[`ActionLog::close`] (or hold a [`LogSession`]) and
//! only the outermost release writes it to disk.

mod format;

use colored::Colorize;
use log::{debug, error, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

pub use format::{action_arity, parse_log};

/// Action types written by the handlers and read back on revert
pub mod actions {
    pub const CREATE: &str = "CREATE";
    /// `UPDATE <id> <oldVersion> <newVersion>`
    pub const UPDATE: &str = "UPDATE";
    pub const MOVED: &str = "MOVED";
    pub const ARCHIVE: &str = "ARCHIVE";
    pub const UNARCHIVE: &str = "UNARCHIVE";
    pub const DELETE: &str = "DELETE";
}

/// Name of the group entries land in before any `switch_group`
pub const DEFAULT_GROUP: &str = "_default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogErrorLevel {
    #[default]
    None,
    Warning,
    Error,
}

impl LogErrorLevel {
    /// Token written as the last line of a persisted log
    pub fn token(self) -> &'static str {
        match self {
            LogErrorLevel::None => "SUCCESS",
            LogErrorLevel::Warning => "WARNING",
            LogErrorLevel::Error => "FAILURE",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "SUCCESS" => Some(LogErrorLevel::None),
            "WARNING" => Some(LogErrorLevel::Warning),
            "FAILURE" => Some(LogErrorLevel::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
    /// Replayable fact
    Action { action: String, data: String },
    Comment(String),
    /// Free text for the operator, e.g. progress output
    Plain(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogGroup {
    pub name: String,
    pub lines: Vec<LogLine>,
}

#[derive(Debug)]
struct LogState {
    title: String,
    path: Option<PathBuf>,
    groups: Vec<LogGroup>,
    current: usize,
    error_level: LogErrorLevel,
    usages: u32,
}

/// Shared handle to an action log. Cloning shares the same log.
#[derive(Debug, Clone)]
pub struct ActionLog {
    inner: Arc<Mutex<LogState>>,
}

impl ActionLog {
    /// Memory-only log; never written to disk
    pub fn new(title: impl Into<String>) -> Self {
        Self::from_parts(title.into(), None)
    }

    /// Log persisted to `path` when its last owner closes it
    pub fn at_path(title: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::from_parts(title.into(), Some(path.into()))
    }

    fn from_parts(title: String, path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LogState {
                title,
                path,
                groups: vec![LogGroup {
                    name: DEFAULT_GROUP.to_string(),
                    lines: Vec::new(),
                }],
                current: 0,
                error_level: LogErrorLevel::None,
                usages: 0,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, LogState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read a previously closed log. The result is memory-only: replaying a
    /// log never rewrites it.
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read log file {}: {}", path.display(), e))?;
        info!("Loaded action log from {}", path.display());
        Ok(parse_log(&text))
    }

    pub fn title(&self) -> String {
        self.state().title.clone()
    }

    pub fn current_group(&self) -> String {
        let state = self.state();
        state.groups[state.current].name.clone()
    }

    /// Attribute subsequent entries to `name`. Earlier groups are kept.
    pub fn switch_group(&self, name: &str) {
        let mut state = self.state();
        match state.groups.iter().position(|g| g.name == name) {
            Some(index) => state.current = index,
            None => {
                state.groups.push(LogGroup {
                    name: name.to_string(),
                    lines: Vec::new(),
                });
                state.current = state.groups.len() - 1;
            }
        }
        debug!("Action log group switched to '{}'", name);
    }

    fn push(&self, line: LogLine) {
        let mut state = self.state();
        let current = state.current;
        state.groups[current].lines.push(line);
    }

    pub fn add_action(&self, action: &str, data: impl Into<String>) {
        let data = data.into();
        info!("[action] {} {}", action, data);
        self.push(LogLine::Action {
            action: action.to_string(),
            data,
        });
    }

    pub fn add_comment(&self, text: impl Into<String>) {
        let text = text.into();
        debug!("[comment] {}", text);
        self.push(LogLine::Comment(text));
    }

    pub fn append_line(&self, text: impl Into<String>) {
        let text = text.into();
        debug!("[line] {}", text);
        self.push(LogLine::Plain(text));
    }

    /// Comment that also raises the log to at least `Warning`
    pub fn warn(&self, text: impl Into<String>) {
        let text = text.into();
        warn!("{}", text);
        self.raise(LogErrorLevel::Warning);
        self.push(LogLine::Comment(format!("WARNING: {}", text)));
    }

    /// Comment that raises the log to `Error`
    pub fn error(&self, text: impl Into<String>) {
        let text = text.into();
        error!("{}", text);
        self.raise(LogErrorLevel::Error);
        self.push(LogLine::Comment(format!("ERROR: {}", text)));
    }

    fn raise(&self, level: LogErrorLevel) {
        let mut state = self.state();
        state.error_level = state.error_level.max(level);
    }

    pub fn error_level(&self) -> LogErrorLevel {
        self.state().error_level
    }

    pub fn set_error_level(&self, level: LogErrorLevel) {
        self.state().error_level = level;
    }

    /// Payloads recorded under `action`, in insertion order, optionally
    /// restricted to one group. Empty when nothing matches.
    pub fn get_data(&self, action: &str, group: Option<&str>) -> Vec<String> {
        let state = self.state();
        state
            .groups
            .iter()
            .filter(|g| group.map_or(true, |name| g.name == name))
            .flat_map(|g| g.lines.iter())
            .filter_map(|line| match line {
                LogLine::Action { action: a, data } if a == action => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn usages(&self) -> u32 {
        self.state().usages
    }

    /// Acquire the log. Each `open` must be matched by a `close`.
    pub fn open(&self) -> &Self {
        self.state().usages += 1;
        self
    }

    /// Release the log. The release that brings the usage count to zero
    /// writes the log if `persist` is set and a path is configured. Write
    /// failures are reported and swallowed.
    pub fn close(&self, persist: bool) {
        let (last, path) = {
            let mut state = self.state();
            state.usages = state.usages.saturating_sub(1);
            (state.usages == 0, state.path.clone())
        };

        if !last || !persist {
            return;
        }

        if let Some(path) = path {
            if let Err(e) = self.write_to(&path) {
                error!("Failed to write action log to {}: {}", path.display(), e);
                eprintln!(
                    "{} Could not write log file {}: {}",
                    "⚠".yellow(),
                    path.display(),
                    e
                );
            } else {
                info!("Action log written to {}", path.display());
            }
        }
    }

    /// Scoped acquisition: the session closes the log when released or dropped
    pub fn session(&self) -> LogSession {
        self.open();
        LogSession {
            log: self.clone(),
            released: false,
        }
    }

    fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_string())
    }
}

impl fmt::Display for ActionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.write_str(&format::render(
            &state.title,
            &state.groups,
            state.error_level,
        ))
    }
}

/// Holds one usage of an [`ActionLog`]; persists on drop unless released
/// explicitly with `persist = false`
pub struct LogSession {
    log: ActionLog,
    released: bool,
}

impl LogSession {
    pub fn log(&self) -> &ActionLog {
        &self.log
    }

    pub fn release(mut self, persist: bool) {
        self.released = true;
        self.log.close(persist);
    }
}

impl Drop for LogSession {
    fn drop(&mut self) {
        if !self.released {
            self.log.close(true);
        }
    }
}
