//! The outcome of one pipeline run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PipelineState;
use crate::events::StageEvent;

/// Everything the caller learns from a run: final state, the full
/// ordered event log and timing. Data products stay in the store the
/// caller lent to [`execute`](super::InsightPipeline::execute).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// The run this report describes.
    pub run_id: Uuid,
    /// The final state, `Completed` or `Halted`.
    pub state: PipelineState,
    /// Every event, in run-log order.
    pub events: Vec<StageEvent>,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
}

impl PipelineReport {
    pub(crate) fn new(
        run_id: Uuid,
        state: PipelineState,
        events: Vec<StageEvent>,
        duration: std::time::Duration,
    ) -> Self {
        Self {
            run_id,
            state,
            events,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Whether the run finished every phase.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == PipelineState::Completed
    }

    /// The stage the run halted at, if it halted.
    #[must_use]
    pub fn halted_stage(&self) -> Option<&str> {
        match &self.state {
            PipelineState::Halted { stage } => Some(stage),
            _ => None,
        }
    }

    /// The halting stage's terminal error text, if the run halted.
    #[must_use]
    pub fn failure_message(&self) -> Option<&str> {
        let stage = self.halted_stage()?;
        self.events
            .iter()
            .rev()
            .find(|event| event.author == stage && event.is_terminal())
            .map(|event| event.text.as_str())
    }

    /// Events emitted by one stage, in run-log order.
    #[must_use]
    pub fn events_by(&self, author: &str) -> Vec<&StageEvent> {
        self.events
            .iter()
            .filter(|event| event.author == author)
            .collect()
    }

    /// The run's final event, if any event was emitted at all.
    #[must_use]
    pub fn final_event(&self) -> Option<&StageEvent> {
        self.events.last()
    }
}
