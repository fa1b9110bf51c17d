//! Channel-backed event streams.
//!
//! A running stage writes through an [`EventEmitter`]; the consumer reads a
//! [`StageStream`]. The stream is finite (it ends when the producing task
//! drops its emitter) and consumed by value, so a drained stream cannot be
//! restarted.

use super::StageEvent;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Write half of a stage's event sequence.
///
/// Cloneable so a stage driver and the stage's own hooks can share it.
/// Sending never fails: events for a dropped consumer are discarded.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    author: String,
    tx: mpsc::UnboundedSender<StageEvent>,
}

impl EventEmitter {
    /// Returns the author name this emitter stamps on events.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Emits a progress event.
    pub fn progress(&self, text: impl Into<String>) {
        let _ = self.tx.send(StageEvent::progress(&self.author, text));
    }

    /// Emits a terminal event.
    pub fn terminal(&self, text: impl Into<String>) {
        let _ = self.tx.send(StageEvent::terminal(&self.author, text));
    }
}

/// Read half of a stage's event sequence.
#[derive(Debug)]
pub struct StageStream {
    inner: UnboundedReceiverStream<StageEvent>,
}

impl StageStream {
    /// Collects every remaining event, consuming the stream.
    pub async fn drain(mut self) -> Vec<StageEvent> {
        use futures::StreamExt;

        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        events
    }
}

impl Stream for StageStream {
    type Item = StageEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Creates a connected emitter/stream pair for one stage execution.
#[must_use]
pub fn event_channel(author: impl Into<String>) -> (EventEmitter, StageStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    let emitter = EventEmitter {
        author: author.into(),
        tx,
    };
    let stream = StageStream {
        inner: UnboundedReceiverStream::new(rx),
    };
    (emitter, stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_events_arrive_in_emission_order() {
        let (emitter, stream) = event_channel("collector");
        emitter.progress("one");
        emitter.progress("two");
        emitter.terminal("three");
        drop(emitter);

        let events = stream.drain().await;
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].text, "one");
        assert_eq!(events[2].text, "three");
        assert!(events[2].is_terminal());
    }

    #[tokio::test]
    async fn test_stream_ends_when_emitter_dropped() {
        let (emitter, mut stream) = event_channel("collector");
        emitter.progress("only");
        drop(emitter);

        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_none());
        // A finished stream stays finished.
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_emitter_survives_dropped_consumer() {
        let (emitter, stream) = event_channel("collector");
        drop(stream);
        // Must not panic.
        emitter.progress("into the void");
    }

    #[tokio::test]
    async fn test_author_stamped_on_events() {
        let (emitter, stream) = event_channel("trend_analyst");
        assert_eq!(emitter.author(), "trend_analyst");
        emitter.progress("working");
        drop(emitter);

        let events = stream.drain().await;
        assert_eq!(events[0].author, "trend_analyst");
    }
}
