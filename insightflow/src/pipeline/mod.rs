//! The pipeline orchestrator.
//!
//! [`InsightPipeline`] wires the four phases together and drives them in
//! fixed order against a caller-provided store. After each phase it
//! checks that every stage of the phase wrote its output key; a missing
//! key halts the run and skips the remaining phases. That presence check
//! is the authoritative halt signal. The `terminal` flag on events is
//! information for callers, not what the orchestrator steers by.

mod report;
mod state;

#[cfg(test)]
mod integration_tests;

pub use report::PipelineReport;
pub use state::{PipelinePhase, PipelineState};

use std::sync::Arc;
use std::time::Instant;
use tokio_stream::StreamExt;
use tracing::Instrument as _;

use crate::backend::TextGenBackend;
use crate::config::PipelineConfig;
use crate::errors::PipelineBuildError;
use crate::events::{EventSink, NoOpEventSink, StageEvent};
use crate::render::{ChartRenderer, PngChartRenderer};
use crate::source::RecordSource;
use crate::stages::{
    CollectStage, InsightKind, InsightStage, PreprocessStage, Stage, VisualizeStage,
};
use crate::store::RunStore;

/// The fixed four-phase analysis pipeline.
///
/// Build one with [`InsightPipeline::builder`], then call
/// [`execute`](Self::execute) once per run with a fresh store. The
/// pipeline itself is reusable across runs.
pub struct InsightPipeline {
    config: PipelineConfig,
    source: Arc<dyn RecordSource>,
    trend_backend: Arc<dyn TextGenBackend>,
    anomaly_backend: Arc<dyn TextGenBackend>,
    renderer: Arc<dyn ChartRenderer>,
    sink: Arc<dyn EventSink>,
}

impl InsightPipeline {
    /// Starts assembling a pipeline.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Runs every phase against `store` and reports the outcome.
    ///
    /// Events are forwarded to the configured sink as they arrive and
    /// collected into the report's run log. The store ends up holding
    /// the data products of every stage that completed.
    pub async fn execute(&self, store: &Arc<RunStore>) -> PipelineReport {
        let span = tracing::info_span!("pipeline_run", run_id = %store.run_id());
        self.execute_inner(store).instrument(span).await
    }

    async fn execute_inner(&self, store: &Arc<RunStore>) -> PipelineReport {
        let started = Instant::now();
        let mut events = Vec::new();

        tracing::info!("pipeline run started");
        let halted = self.run_phases(store, &mut events).await;

        let state = match halted {
            Some(stage) => {
                tracing::warn!(stage = %stage, "pipeline halted");
                PipelineState::Halted { stage }
            }
            None => {
                tracing::info!(events = events.len(), "pipeline completed");
                PipelineState::Completed
            }
        };

        PipelineReport::new(store.run_id(), state, events, started.elapsed())
    }

    async fn run_phases(
        &self,
        store: &Arc<RunStore>,
        events: &mut Vec<StageEvent>,
    ) -> Option<String> {
        for phase in PipelinePhase::ALL {
            tracing::info!(phase = %phase, "phase started");
            let halted = match phase {
                PipelinePhase::Collect => {
                    let stage = Arc::new(CollectStage::new(Arc::clone(&self.source)));
                    self.run_single(stage, store, events).await
                }
                PipelinePhase::Preprocess => {
                    self.run_single(Arc::new(PreprocessStage::new()), store, events)
                        .await
                }
                PipelinePhase::Analyze => self.run_analysts(store, events).await,
                PipelinePhase::Visualize => {
                    let stage = Arc::new(VisualizeStage::new(Arc::clone(&self.renderer)));
                    self.run_single(stage, store, events).await
                }
            };

            if halted.is_some() {
                return halted;
            }
        }
        None
    }

    /// Runs one stage to completion; returns its name if it failed to
    /// write its output key.
    async fn run_single(
        &self,
        stage: Arc<dyn Stage>,
        store: &Arc<RunStore>,
        events: &mut Vec<StageEvent>,
    ) -> Option<String> {
        let name = stage.name().to_string();
        let output_key = stage.output_key();

        events.extend(self.drain_stage(stage, store).await);

        if store.contains(output_key) {
            None
        } else {
            Some(name)
        }
    }

    /// Runs the analyst pair concurrently.
    ///
    /// The run log records trend events before anomaly events so that
    /// logs are stable across schedules; the sink sees arrival order.
    async fn run_analysts(
        &self,
        store: &Arc<RunStore>,
        events: &mut Vec<StageEvent>,
    ) -> Option<String> {
        let trend = self.insight_stage(InsightKind::Trend, &self.trend_backend);
        let anomaly = self.insight_stage(InsightKind::Anomaly, &self.anomaly_backend);

        let checks = [
            (trend.name().to_string(), trend.output_key()),
            (anomaly.name().to_string(), anomaly.output_key()),
        ];

        let (trend_events, anomaly_events) = tokio::join!(
            self.drain_stage(trend, store),
            self.drain_stage(anomaly, store)
        );
        events.extend(trend_events);
        events.extend(anomaly_events);

        checks
            .iter()
            .find(|(_, key)| !store.contains(key))
            .map(|(name, _)| name.clone())
    }

    fn insight_stage(
        &self,
        kind: InsightKind,
        backend: &Arc<dyn TextGenBackend>,
    ) -> Arc<dyn Stage> {
        Arc::new(
            InsightStage::new(kind, Arc::clone(backend))
                .with_timeout(self.config.insight_timeout())
                .with_max_tokens(self.config.max_insight_tokens),
        )
    }

    async fn drain_stage(&self, stage: Arc<dyn Stage>, store: &Arc<RunStore>) -> Vec<StageEvent> {
        let mut stream = crate::stages::run_stage(stage, Arc::clone(store));
        let mut collected = Vec::new();
        while let Some(event) = stream.next().await {
            self.sink.emit(&event).await;
            collected.push(event);
        }
        collected
    }
}

/// Assembles an [`InsightPipeline`] from its collaborators.
///
/// The record source and both backends have no sensible default and
/// must be provided; the renderer defaults to PNG output under the
/// configured directory and the sink defaults to no-op.
#[derive(Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    source: Option<Arc<dyn RecordSource>>,
    trend_backend: Option<Arc<dyn TextGenBackend>>,
    anomaly_backend: Option<Arc<dyn TextGenBackend>>,
    renderer: Option<Arc<dyn ChartRenderer>>,
    sink: Option<Arc<dyn EventSink>>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the run configuration.
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the record source the collector reads from.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn RecordSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the backend behind the trend analyst.
    #[must_use]
    pub fn with_trend_backend(mut self, backend: Arc<dyn TextGenBackend>) -> Self {
        self.trend_backend = Some(backend);
        self
    }

    /// Sets the backend behind the anomaly analyst.
    #[must_use]
    pub fn with_anomaly_backend(mut self, backend: Arc<dyn TextGenBackend>) -> Self {
        self.anomaly_backend = Some(backend);
        self
    }

    /// Sets the chart renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Sets the sink that observes events in real time.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineBuildError`] if the source or either backend
    /// was never provided.
    pub fn build(self) -> Result<InsightPipeline, PipelineBuildError> {
        let source = self.source.ok_or_else(|| PipelineBuildError::missing("record source"))?;
        let trend_backend = self
            .trend_backend
            .ok_or_else(|| PipelineBuildError::missing("trend backend"))?;
        let anomaly_backend = self
            .anomaly_backend
            .ok_or_else(|| PipelineBuildError::missing("anomaly backend"))?;

        let renderer = self
            .renderer
            .unwrap_or_else(|| Arc::new(PngChartRenderer::new(self.config.out_dir.clone())));
        let sink = self.sink.unwrap_or_else(|| Arc::new(NoOpEventSink));

        Ok(InsightPipeline {
            config: self.config,
            source,
            trend_backend,
            anomaly_backend,
            renderer,
            sink,
        })
    }
}
