//! Event sink trait and implementations.

use super::StageEvent;
use async_trait::async_trait;
use tracing::{debug, info, Level};

/// Trait for sinks that observe the live event flow of a run.
///
/// The pipeline forwards every drained event here as it arrives, before the
/// run log is returned to the caller.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Receives an event asynchronously.
    async fn emit(&self, event: &StageEvent);

    /// Receives an event without blocking.
    ///
    /// Must never panic; sinks swallow their own delivery problems.
    fn try_emit(&self, event: &StageEvent);
}

/// A no-op sink that discards all events.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: &StageEvent) {
        // Intentionally empty - discards all events
    }

    fn try_emit(&self, _event: &StageEvent) {
        // Intentionally empty - discards all events
    }
}

/// A sink that logs events through the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging sink.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    fn log_event(&self, event: &StageEvent) {
        match self.level {
            Level::DEBUG => {
                debug!(
                    author = %event.author,
                    terminal = event.terminal,
                    "{}", event.text
                );
            }
            _ => {
                info!(
                    author = %event.author,
                    terminal = event.terminal,
                    "{}", event.text
                );
            }
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: &StageEvent) {
        self.log_event(event);
    }

    fn try_emit(&self, event: &StageEvent) {
        self.log_event(event);
    }
}

/// A collecting sink for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<StageEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<StageEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns the texts of events authored by the given stage.
    #[must_use]
    pub fn texts_of(&self, author: &str) -> Vec<String> {
        self.events
            .read()
            .iter()
            .filter(|e| e.author == author)
            .map(|e| e.text.clone())
            .collect()
    }

    /// Returns how many collected events were terminal.
    #[must_use]
    pub fn terminal_count(&self) -> usize {
        self.events.read().iter().filter(|e| e.terminal).count()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: &StageEvent) {
        self.events.write().push(event.clone());
    }

    fn try_emit(&self, event: &StageEvent) {
        self.events.write().push(event.clone());
    }
}
