//! The visualization stage, the pipeline's closing act.

use async_trait::async_trait;
use std::sync::Arc;

use super::{InsightKind, Stage};
use crate::dataset::ProcessedDataset;
use crate::errors::StageError;
use crate::events::EventEmitter;
use crate::render::{ChartArtifact, ChartKind, ChartRenderer, ChartSpec};
use crate::store::{keys, RunStore};

const TIME_SERIES_TITLE: &str = "Sales Revenue Over Time";
const BAR_TITLE: &str = "Total Revenue by Product";
const SNIPPET_CHARS: usize = 70;

/// Draws the run's charts and records where they landed.
///
/// Insight text is annotation here, not input: a missing insight key
/// falls back to a placeholder line because the charts stay meaningful
/// without it. A failed render, on the other hand, halts the run; a
/// silently skipped chart would break the promise that every listed
/// chart exists.
pub struct VisualizeStage {
    renderer: Arc<dyn ChartRenderer>,
}

impl VisualizeStage {
    /// Creates the stage around a chart renderer.
    pub fn new(renderer: Arc<dyn ChartRenderer>) -> Self {
        Self { renderer }
    }
}

/// First characters of an insight, flattened to one line for captions.
fn snippet(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    flat.chars().take(SNIPPET_CHARS).collect()
}

#[async_trait]
impl Stage for VisualizeStage {
    fn name(&self) -> &str {
        "visualizer"
    }

    fn required_keys(&self) -> &'static [&'static str] {
        &[keys::PROCESSED_DATA]
    }

    fn output_key(&self) -> &'static str {
        keys::VISUALIZATION_PATHS
    }

    fn closes_run(&self) -> bool {
        true
    }

    fn activity(&self) -> &str {
        "visualization generation"
    }

    async fn attempt(
        &self,
        store: &RunStore,
        progress: &EventEmitter,
    ) -> Result<String, StageError> {
        let dataset: ProcessedDataset = store
            .processed_dataset()?
            .ok_or_else(|| StageError::missing_input(self.name(), keys::PROCESSED_DATA))?;

        let trend_text = store
            .insight(InsightKind::Trend)?
            .unwrap_or_else(|| InsightKind::Trend.placeholder().to_string());
        let anomaly_text = store
            .insight(InsightKind::Anomaly)?
            .unwrap_or_else(|| InsightKind::Anomaly.placeholder().to_string());

        let mut artifacts: Vec<ChartArtifact> = Vec::with_capacity(2);

        let time_spec = ChartSpec::new(
            ChartKind::TimeSeries,
            TIME_SERIES_TITLE,
            format!("Trend snippet: {}...", snippet(&trend_text)),
            "revenue_over_time",
        );
        let time_chart = self.renderer.render(&time_spec, &dataset)?;
        progress.progress(format!("Sales revenue chart saved to {}", time_chart.path));
        artifacts.push(time_chart);

        if dataset.has_product_names() {
            let bar_spec = ChartSpec::new(
                ChartKind::Bar,
                BAR_TITLE,
                format!("Anomaly note: {}...", snippet(&anomaly_text)),
                "revenue_by_product",
            );
            let bar_chart = self.renderer.render(&bar_spec, &dataset)?;
            progress.progress(format!("Product revenue chart saved to {}", bar_chart.path));
            artifacts.push(bar_chart);
        }

        tracing::info!(charts = artifacts.len(), "visualizations generated");
        store.set_chart_manifest(&artifacts)?;

        Ok("Visualizations generated successfully.".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::run_stage;
    use crate::testing::fixtures;
    use crate::testing::mocks::{CountingRenderer, FailingRenderer};

    fn seeded_store(with_insights: bool) -> Arc<RunStore> {
        let store = Arc::new(RunStore::new());
        store
            .set_processed_dataset(&fixtures::processed_q1_sales())
            .unwrap();
        if with_insights {
            store
                .set_insight(InsightKind::Trend, "Revenue rose sharply in March.")
                .unwrap();
            store
                .set_insight(InsightKind::Anomaly, "BetaBolt volume dipped mid-quarter.")
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_renders_both_charts_and_stores_ordered_manifest() {
        let renderer = Arc::new(CountingRenderer::new());
        let stage = Arc::new(VisualizeStage::new(
            Arc::clone(&renderer) as Arc<dyn ChartRenderer>
        ));
        let store = seeded_store(true);

        let events = run_stage(stage, Arc::clone(&store)).drain().await;

        assert_eq!(events.len(), 3);
        assert!(events[0].text.starts_with("Sales revenue chart saved to"));
        assert!(events[1].text.starts_with("Product revenue chart saved to"));
        assert_eq!(events[2].text, "Visualizations generated successfully.");
        assert!(events[2].is_terminal());
        assert!(!events[0].is_terminal());

        let manifest = store.chart_manifest().unwrap().unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest[0].kind, ChartKind::TimeSeries);
        assert_eq!(manifest[1].kind, ChartKind::Bar);

        let specs = renderer.specs();
        assert!(specs[0].caption.contains("Revenue rose sharply in March."));
        assert!(specs[1].caption.contains("BetaBolt volume dipped mid-quarter."));
    }

    #[tokio::test]
    async fn test_missing_insights_fall_back_to_placeholders() {
        let renderer = Arc::new(CountingRenderer::new());
        let stage = Arc::new(VisualizeStage::new(
            Arc::clone(&renderer) as Arc<dyn ChartRenderer>
        ));

        run_stage(stage, seeded_store(false)).drain().await;

        let specs = renderer.specs();
        assert!(specs[0].caption.contains("Trend analysis not available."));
        assert!(specs[1].caption.contains("Anomaly analysis not available."));
    }

    #[tokio::test]
    async fn test_long_insight_is_clipped_in_caption() {
        let renderer = Arc::new(CountingRenderer::new());
        let stage = Arc::new(VisualizeStage::new(
            Arc::clone(&renderer) as Arc<dyn ChartRenderer>
        ));
        let store = seeded_store(false);
        let long_insight = "word ".repeat(100);
        store.set_insight(InsightKind::Trend, long_insight).unwrap();

        run_stage(stage, Arc::clone(&store)).drain().await;

        let caption = renderer.specs()[0].caption.clone();
        let snippet_part = caption
            .strip_prefix("Trend snippet: ")
            .and_then(|rest| rest.strip_suffix("..."))
            .unwrap();
        assert_eq!(snippet_part.chars().count(), SNIPPET_CHARS);
    }

    #[tokio::test]
    async fn test_rows_without_product_names_skip_bar_chart() {
        let renderer = Arc::new(CountingRenderer::new());
        let stage = Arc::new(VisualizeStage::new(
            Arc::clone(&renderer) as Arc<dyn ChartRenderer>
        ));
        let store = Arc::new(RunStore::new());
        store
            .set_processed_dataset(&fixtures::processed_without_names())
            .unwrap();

        let events = run_stage(stage, Arc::clone(&store)).drain().await;

        assert_eq!(events.len(), 2);
        let manifest = store.chart_manifest().unwrap().unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest[0].kind, ChartKind::TimeSeries);
        assert_eq!(renderer.count(), 1);
    }

    #[tokio::test]
    async fn test_empty_dataset_still_produces_time_chart() {
        let renderer = Arc::new(CountingRenderer::new());
        let stage = Arc::new(VisualizeStage::new(
            Arc::clone(&renderer) as Arc<dyn ChartRenderer>
        ));
        let store = Arc::new(RunStore::new());
        store
            .set_processed_dataset(&ProcessedDataset::new(vec![]))
            .unwrap();

        let events = run_stage(stage, Arc::clone(&store)).drain().await;

        assert!(events.last().unwrap().is_terminal());
        let manifest = store.chart_manifest().unwrap().unwrap();
        assert_eq!(manifest.len(), 1);
    }

    #[tokio::test]
    async fn test_render_failure_halts_with_terminal_error() {
        let stage = Arc::new(VisualizeStage::new(Arc::new(FailingRenderer::new())));
        let store = seeded_store(true);

        let events = run_stage(stage, Arc::clone(&store)).drain().await;

        assert_eq!(events.len(), 1);
        assert!(events[0].is_terminal());
        assert!(events[0]
            .text
            .starts_with("Error during visualization generation:"));
        assert!(!store.contains(keys::VISUALIZATION_PATHS));
    }

    #[tokio::test]
    async fn test_missing_processed_data_is_terminal() {
        let stage = Arc::new(VisualizeStage::new(Arc::new(CountingRenderer::new())));
        let store = Arc::new(RunStore::new());

        let events = run_stage(stage, Arc::clone(&store)).drain().await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].author, "visualizer");
        assert!(events[0].is_terminal());
        assert!(events[0].text.contains("'processed_data' not found in state"));
    }
}
