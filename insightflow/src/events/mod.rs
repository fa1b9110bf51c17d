//! The event protocol stages speak while executing.
//!
//! Every stage execution yields a finite, ordered sequence of
//! [`StageEvent`]s. The terminal flag marks the event a stage considers its
//! last word; the orchestrator treats it as informational only and decides
//! halts from store contents.

mod sink;
mod stream;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
pub use stream::{event_channel, EventEmitter, StageStream};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An event emitted by a stage during execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    /// Name of the stage that produced the event.
    pub author: String,
    /// Human-readable event text.
    pub text: String,
    /// True when the stage considers this its final event.
    pub terminal: bool,
    /// When the event was produced.
    pub timestamp: DateTime<Utc>,
}

impl StageEvent {
    /// Creates a progress event.
    #[must_use]
    pub fn progress(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
            terminal: false,
            timestamp: Utc::now(),
        }
    }

    /// Creates a terminal event.
    #[must_use]
    pub fn terminal(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
            terminal: true,
            timestamp: Utc::now(),
        }
    }

    /// Returns true if this is a terminal event.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }
}

impl fmt::Display for StageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.author, self.text)
    }
}
