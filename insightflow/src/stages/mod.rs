//! The stages of the analysis pipeline and their shared contract.
//!
//! Every stage follows the same three-phase shape: validate that its
//! required store keys exist, attempt its work, then degrade or halt on
//! failure. [`run_stage`] implements that shape once; concrete stages
//! supply only their differing logic through the [`Stage`] hooks.

mod collect;
mod insight;
mod preprocess;
mod visualize;

pub use collect::CollectStage;
pub use insight::{InsightKind, InsightStage};
pub use preprocess::PreprocessStage;
pub use visualize::VisualizeStage;

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::StageError;
use crate::events::{event_channel, EventEmitter, StageStream};
use crate::store::RunStore;

/// A synthetic stage output used when an external service fails.
///
/// The value lands under the stage's normal output key so downstream
/// stages cannot tell degraded output from real output; the note becomes
/// the success-shaped event announcing the substitution.
#[derive(Debug, Clone)]
pub struct Fallback {
    /// What to store under the stage's output key.
    pub value: serde_json::Value,
    /// The event text announcing degraded completion.
    pub note: String,
}

impl Fallback {
    /// Creates a fallback.
    pub fn new(value: serde_json::Value, note: impl Into<String>) -> Self {
        Self {
            value,
            note: note.into(),
        }
    }
}

/// One step of the pipeline.
///
/// Implementations write at most one store key, the one named by
/// [`output_key`](Stage::output_key), and do so only from a successful
/// [`attempt`](Stage::attempt). The driver owns every other part of the
/// contract.
#[async_trait]
pub trait Stage: Send + Sync {
    /// The stage name, used as event author and log field.
    fn name(&self) -> &str;

    /// Store keys that must exist before the stage may run.
    fn required_keys(&self) -> &'static [&'static str] {
        &[]
    }

    /// The store key this stage writes on success.
    fn output_key(&self) -> &'static str;

    /// The synthetic output used when a recoverable failure occurs.
    ///
    /// Stages without one (the default) halt on every failure.
    fn fallback(&self) -> Option<Fallback> {
        None
    }

    /// Whether this stage's success event closes the whole run.
    fn closes_run(&self) -> bool {
        false
    }

    /// A plain-language phrase for error events, `data collection` style.
    fn activity(&self) -> &str {
        self.name()
    }

    /// Performs the stage's work, returning the success event text.
    ///
    /// `progress` may be used for intermediate announcements; the final
    /// event of the execution always comes from the driver.
    async fn attempt(
        &self,
        store: &RunStore,
        progress: &EventEmitter,
    ) -> Result<String, StageError>;
}

/// Starts `stage` on a background task and returns its event stream.
///
/// The stream is lazy and finite: events arrive as the stage produces
/// them and the stream ends once the stage finishes. Each call is one
/// execution; streams are not restartable.
pub fn run_stage(stage: Arc<dyn Stage>, store: Arc<RunStore>) -> StageStream {
    let (emitter, stream) = event_channel(stage.name());
    tokio::spawn(async move {
        drive(stage.as_ref(), &store, &emitter).await;
    });
    stream
}

async fn drive(stage: &dyn Stage, store: &RunStore, emitter: &EventEmitter) {
    for key in stage.required_keys() {
        if !store.contains(key) {
            let err = StageError::missing_input(stage.name(), key);
            tracing::warn!(stage = stage.name(), key, "required input missing, halting");
            emitter.terminal(format!("Error: {err}."));
            return;
        }
    }

    match stage.attempt(store, emitter).await {
        Ok(summary) => {
            tracing::info!(stage = stage.name(), "stage complete");
            if stage.closes_run() {
                emitter.terminal(summary);
            } else {
                emitter.progress(summary);
            }
        }
        Err(err) if err.is_recoverable() => match stage.fallback() {
            Some(fallback) => {
                tracing::warn!(
                    stage = stage.name(),
                    error = %err,
                    "external service failed, storing fallback output"
                );
                store.set(stage.output_key(), fallback.value);
                emitter.progress(fallback.note);
            }
            None => halt(stage, emitter, &err),
        },
        Err(err) => halt(stage, emitter, &err),
    }
}

fn halt(stage: &dyn Stage, emitter: &EventEmitter, err: &StageError) {
    tracing::error!(stage = stage.name(), error = %err, "stage failed, halting");
    emitter.terminal(format!("Error during {}: {err}", stage.activity()));
}
