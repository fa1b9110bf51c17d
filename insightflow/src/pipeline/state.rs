//! Pipeline phases and the run state machine.

use serde::{Deserialize, Serialize};

/// The fixed phases of a run, in execution order.
///
/// `Analyze` covers both analyst stages; they run inside one phase
/// because the orchestrator waits on the pair before moving on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    /// Load raw records into the store.
    Collect,
    /// Clean the raw records into typed rows.
    Preprocess,
    /// Run both analysts over the cleaned data.
    Analyze,
    /// Draw charts and close the run.
    Visualize,
}

impl PipelinePhase {
    /// Every phase, in execution order.
    pub const ALL: [Self; 4] = [
        Self::Collect,
        Self::Preprocess,
        Self::Analyze,
        Self::Visualize,
    ];

    /// Lower-case label for logs and display.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Collect => "collect",
            Self::Preprocess => "preprocess",
            Self::Analyze => "analyze",
            Self::Visualize => "visualize",
        }
    }
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a run is in its lifecycle.
///
/// [`PipelineReport`](crate::pipeline::PipelineReport) only ever carries
/// `Completed` or `Halted`; the pre-run and in-flight states exist for
/// callers tracking a run externally, such as serialized progress records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// No phase has started.
    NotStarted,
    /// A phase is currently executing.
    Running {
        /// The phase being executed.
        phase: PipelinePhase,
    },
    /// Every phase finished and wrote its output.
    Completed,
    /// A stage failed to write its output key; later phases were skipped.
    Halted {
        /// The stage that failed to produce output.
        stage: String,
    },
}

impl PipelineState {
    /// Whether the run has reached a final state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Halted { .. })
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => f.write_str("not started"),
            Self::Running { phase } => write!(f, "running {phase}"),
            Self::Completed => f.write_str("completed"),
            Self::Halted { stage } => write!(f, "halted at {stage}"),
        }
    }
}
