//! Error records and the logging error sink.
//!
//! Validation errors and runtime errors share one shape, [`ErrorRecord`]:
//! the first is returned synchronously from pipeline construction, the second
//! is handed to an [`ErrorSink`] while the pipeline keeps running.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::warn;

use crate::locale::{Localizer, Message, MessageKey};
use crate::traits::ErrorSink;

/// Underlying reason of an [`ErrorRecord`].
#[derive(Error, Debug)]
pub enum Cause {
    /// Reading or inspecting a file failed
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Walking a directory or compiling a glob failed
    #[error("{0}")]
    Walk(#[from] ignore::Error),

    /// Localizable message
    #[error("{0}")]
    Message(Message),

    /// A file worker panicked or was aborted
    #[error("worker failed: {0}")]
    Join(String),
}

impl Cause {
    /// Returns the localizable message, if this cause carries one.
    pub fn message(&self) -> Option<&Message> {
        match self {
            Cause::Message(msg) => Some(msg),
            _ => None,
        }
    }
}

impl From<Message> for Cause {
    fn from(msg: Message) -> Self {
        Cause::Message(msg)
    }
}

impl From<MessageKey> for Cause {
    fn from(key: MessageKey) -> Self {
        Cause::Message(Message::new(key))
    }
}

/// A single error attributed to a source file (and optionally a field).
///
/// `field` is empty for runtime errors; `line` is 0 when not applicable.
#[derive(Error, Debug)]
#[error("{cause} at {file}:{line}{}", field_suffix(.field))]
pub struct ErrorRecord {
    pub file: String,
    pub field: String,
    pub line: usize,
    #[source]
    pub cause: Cause,
}

fn field_suffix(field: &str) -> String {
    if field.is_empty() {
        String::new()
    } else {
        format!(" ({})", field)
    }
}

/// Synchronous configuration error returned from pipeline construction.
pub type ValidationError = ErrorRecord;

impl ErrorRecord {
    pub fn new(
        file: impl Into<String>,
        field: impl Into<String>,
        line: usize,
        cause: impl Into<Cause>,
    ) -> Self {
        Self {
            file: file.into(),
            field: field.into(),
            line,
            cause: cause.into(),
        }
    }

    /// Runtime error for `file`, with no field or line.
    pub fn runtime(file: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self::new(file, "", 0, cause)
    }

    /// Validation error on `field`, with no file or line.
    pub fn validation(field: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self::new("", field, 0, cause)
    }

    /// Qualifies the field with a parent path: `encoding` becomes
    /// `inputs[2].encoding`.
    pub fn with_field_prefix(mut self, prefix: &str) -> Self {
        self.field = if self.field.is_empty() {
            prefix.to_string()
        } else {
            format!("{}.{}", prefix, self.field)
        };
        self
    }
}

/// Error sink that logs every record and keeps it for later inspection.
#[derive(Debug, Clone)]
pub struct Handler {
    localizer: Arc<Localizer>,
    records: Arc<Mutex<Vec<ErrorRecord>>>,
}

impl Handler {
    pub fn new(localizer: Arc<Localizer>) -> Self {
        Self {
            localizer,
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of records reported so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns every record reported so far.
    pub fn take(&self) -> Vec<ErrorRecord> {
        std::mem::take(&mut *self.lock())
    }

    /// Renders every retained record in the handler's locale.
    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(|r| self.localizer.format(r)).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ErrorRecord>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Handler {
    fn default() -> Self {
        Self::new(Arc::new(Localizer::builtin()))
    }
}

impl ErrorSink for Handler {
    fn report(&self, record: ErrorRecord) {
        warn!(
            file = %record.file,
            line = record.line,
            "{}",
            self.localizer.format(&record)
        );
        self.lock().push(record);
    }
}
