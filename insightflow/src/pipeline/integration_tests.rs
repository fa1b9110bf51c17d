//! Whole-pipeline tests over mock collaborators.
//!
//! These drive [`InsightPipeline::execute`] end to end and pin the
//! run-level guarantees: the event log shape, the halt rules, fallback
//! determinism, and the independence of the two analysts.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use super::{InsightPipeline, PipelineState};
use crate::backend::TextGenBackend;
use crate::source::RecordSource;
use crate::stages::InsightKind;
use crate::store::{keys, RunStore};
use crate::testing::fixtures;
use crate::testing::mocks::{
    CountingRenderer, FailingBackend, FailingSource, ScriptedBackend, SlowBackend, StaticSource,
};

fn pipeline_with(
    source: Arc<dyn RecordSource>,
    trend: Arc<dyn TextGenBackend>,
    anomaly: Arc<dyn TextGenBackend>,
) -> (InsightPipeline, Arc<CountingRenderer>) {
    let renderer = Arc::new(CountingRenderer::new());
    let pipeline = InsightPipeline::builder()
        .with_source(source)
        .with_trend_backend(trend)
        .with_anomaly_backend(anomaly)
        .with_renderer(Arc::clone(&renderer) as Arc<dyn crate::render::ChartRenderer>)
        .build()
        .unwrap();
    (pipeline, renderer)
}

fn texts(report: &super::PipelineReport) -> Vec<&str> {
    report.events.iter().map(|e| e.text.as_str()).collect()
}

#[tokio::test]
async fn test_clean_run_completes_with_expected_event_log() {
    let (pipeline, _) = pipeline_with(
        Arc::new(StaticSource::new(fixtures::q1_sales())),
        Arc::new(ScriptedBackend::replying("Revenue is climbing.")),
        Arc::new(ScriptedBackend::replying("Nothing unusual.")),
    );
    let store = Arc::new(RunStore::new());

    let report = pipeline.execute(&store).await;

    assert!(report.is_complete());
    assert_eq!(report.state, PipelineState::Completed);
    assert_eq!(report.run_id, store.run_id());

    let authors: Vec<&str> = report.events.iter().map(|e| e.author.as_str()).collect();
    assert_eq!(
        authors,
        vec![
            "collector",
            "preprocessor",
            "trend_analyst",
            "anomaly_analyst",
            "visualizer",
            "visualizer",
            "visualizer",
        ]
    );
    assert_eq!(
        texts(&report)[..2],
        [
            "Data collection complete. 9 raw records loaded into state.",
            "Data preprocessing complete. 9 rows processed and stored in state.",
        ]
    );
    assert_eq!(
        report.final_event().unwrap().text,
        "Visualizations generated successfully."
    );

    // Exactly one terminal event in a completed run, the closing one.
    assert_eq!(report.events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(report.final_event().unwrap().is_terminal());
}

#[tokio::test]
async fn test_clean_run_stores_insights_verbatim_and_one_key_per_stage() {
    let (pipeline, _) = pipeline_with(
        Arc::new(StaticSource::new(fixtures::q1_sales())),
        Arc::new(ScriptedBackend::replying("Revenue is climbing.")),
        Arc::new(ScriptedBackend::replying("Nothing unusual.")),
    );
    let store = Arc::new(RunStore::new());

    pipeline.execute(&store).await;

    assert_eq!(
        store.insight(InsightKind::Trend).unwrap().as_deref(),
        Some("Revenue is climbing.")
    );
    assert_eq!(
        store.insight(InsightKind::Anomaly).unwrap().as_deref(),
        Some("Nothing unusual.")
    );

    let mut stored_keys = store.key_list();
    stored_keys.sort();
    assert_eq!(
        stored_keys,
        vec![
            keys::ANOMALY_INSIGHT,
            keys::PROCESSED_DATA,
            keys::RAW_DATA,
            keys::TREND_INSIGHT,
            keys::VISUALIZATION_PATHS,
        ]
    );
}

#[tokio::test]
async fn test_degraded_runs_store_identical_narratives() {
    let (pipeline, _) = pipeline_with(
        Arc::new(StaticSource::new(fixtures::q1_sales())),
        Arc::new(FailingBackend::new()),
        Arc::new(FailingBackend::new()),
    );

    let first = Arc::new(RunStore::new());
    let second = Arc::new(RunStore::new());
    let first_report = pipeline.execute(&first).await;
    let second_report = pipeline.execute(&second).await;

    let first_trend = first.insight(InsightKind::Trend).unwrap().unwrap();
    assert_eq!(
        first_trend,
        second.insight(InsightKind::Trend).unwrap().unwrap()
    );
    assert_eq!(first_trend, InsightKind::Trend.fallback_narrative());
    assert_eq!(
        first.insight(InsightKind::Anomaly).unwrap().unwrap(),
        InsightKind::Anomaly.fallback_narrative()
    );

    // Same inputs, same log, run after run.
    assert_eq!(texts(&first_report), texts(&second_report));
}

#[tokio::test]
async fn test_backend_outage_still_completes_with_charts() {
    let (pipeline, renderer) = pipeline_with(
        Arc::new(StaticSource::new(fixtures::q1_sales())),
        Arc::new(FailingBackend::new()),
        Arc::new(FailingBackend::new()),
    );
    let store = Arc::new(RunStore::new());

    let report = pipeline.execute(&store).await;

    assert_eq!(report.state, PipelineState::Completed);
    assert_eq!(renderer.count(), 2);
    let manifest = store.chart_manifest().unwrap().unwrap();
    assert!(!manifest.is_empty());

    // Degraded completions are progress events, not terminal ones.
    let degraded: Vec<_> = report
        .events
        .iter()
        .filter(|e| e.text.ends_with("completed using fallback narrative."))
        .collect();
    assert_eq!(degraded.len(), 2);
    assert!(degraded.iter().all(|e| !e.is_terminal()));
}

#[tokio::test]
async fn test_missing_file_halts_at_collector_and_nothing_runs_after() {
    let (pipeline, renderer) = pipeline_with(
        Arc::new(FailingSource::not_found("data/q2_sales.csv")),
        Arc::new(ScriptedBackend::replying("unused")),
        Arc::new(ScriptedBackend::replying("unused")),
    );
    let store = Arc::new(RunStore::new());

    let report = pipeline.execute(&store).await;

    assert_eq!(report.halted_stage(), Some("collector"));
    assert!(!report.is_complete());
    // Reports only ever carry the terminal half of the state machine.
    assert!(report.state.is_terminal());
    assert_eq!(report.events.len(), 1);
    assert!(report.events[0].is_terminal());

    let message = report.failure_message().unwrap();
    assert!(message.starts_with("Error during data collection:"));
    assert!(message.contains("data/q2_sales.csv"));

    // No later stage ran or wrote anything.
    assert!(store.is_empty());
    assert_eq!(renderer.count(), 0);
}

#[tokio::test]
async fn test_preprocess_preserves_rows_and_zero_fills() {
    let (pipeline, _) = pipeline_with(
        Arc::new(StaticSource::new(fixtures::three_row_sample())),
        Arc::new(ScriptedBackend::replying("t")),
        Arc::new(ScriptedBackend::replying("a")),
    );
    let store = Arc::new(RunStore::new());

    pipeline.execute(&store).await;

    let processed = store.processed_dataset().unwrap().unwrap();
    assert_eq!(processed.len(), 3);

    let rows = processed.records();
    assert_eq!(rows[1].product_name.as_deref(), Some("BetaBolt"));
    assert_eq!(rows[1].revenue, 0.0);
    assert_eq!(rows[1].units, 0);
    assert_eq!(rows[0].date.to_string(), "2023-01-15");
    assert_eq!(rows[2].date.to_string(), "2023-01-17");
}

#[tokio::test]
async fn test_one_analyst_failing_leaves_the_other_untouched() {
    let (pipeline, renderer) = pipeline_with(
        Arc::new(StaticSource::new(fixtures::q1_sales())),
        Arc::new(FailingBackend::new()),
        Arc::new(ScriptedBackend::replying("BetaBolt units slipped in February.")),
    );
    let store = Arc::new(RunStore::new());

    let report = pipeline.execute(&store).await;

    assert!(report.is_complete());
    assert_eq!(
        store.insight(InsightKind::Trend).unwrap().unwrap(),
        InsightKind::Trend.fallback_narrative()
    );
    assert_eq!(
        store.insight(InsightKind::Anomaly).unwrap().as_deref(),
        Some("BetaBolt units slipped in February.")
    );

    // The real anomaly text flows through to the bar chart caption.
    let captions: Vec<String> = renderer.specs().iter().map(|s| s.caption.clone()).collect();
    assert!(captions[1].contains("BetaBolt units slipped in February."));
}

#[tokio::test]
async fn test_three_row_outage_scenario_event_log() {
    let (pipeline, _) = pipeline_with(
        Arc::new(StaticSource::new(fixtures::three_row_sample())),
        Arc::new(FailingBackend::new()),
        Arc::new(FailingBackend::new()),
    );
    let store = Arc::new(RunStore::new());

    let report = pipeline.execute(&store).await;

    assert!(report.is_complete());
    assert_eq!(
        texts(&report),
        vec![
            "Data collection complete. 3 raw records loaded into state.",
            "Data preprocessing complete. 3 rows processed and stored in state.",
            "Trend analysis completed using fallback narrative.",
            "Anomaly analysis completed using fallback narrative.",
            "Sales revenue chart saved to charts/revenue_over_time.png",
            "Product revenue chart saved to charts/revenue_by_product.png",
            "Visualizations generated successfully.",
        ]
    );

    let manifest = store.chart_manifest().unwrap().unwrap();
    assert_eq!(manifest.len(), 2);
}

#[tokio::test]
async fn test_log_orders_trend_first_while_sink_sees_arrival_order() {
    let sink = Arc::new(crate::events::CollectingEventSink::new());
    let renderer = Arc::new(CountingRenderer::new());
    let pipeline = InsightPipeline::builder()
        .with_source(Arc::new(StaticSource::new(fixtures::q1_sales())))
        .with_trend_backend(Arc::new(SlowBackend::new(
            Duration::from_millis(150),
            "slow trend reply",
        )))
        .with_anomaly_backend(Arc::new(ScriptedBackend::replying("fast anomaly reply")))
        .with_renderer(renderer as Arc<dyn crate::render::ChartRenderer>)
        .with_event_sink(Arc::clone(&sink) as Arc<dyn crate::events::EventSink>)
        .build()
        .unwrap();
    let store = Arc::new(RunStore::new());

    let report = pipeline.execute(&store).await;
    assert!(report.is_complete());

    let log_authors: Vec<&str> = report.events.iter().map(|e| e.author.as_str()).collect();
    let trend_in_log = log_authors.iter().position(|a| *a == "trend_analyst").unwrap();
    let anomaly_in_log = log_authors
        .iter()
        .position(|a| *a == "anomaly_analyst")
        .unwrap();
    assert!(trend_in_log < anomaly_in_log);

    let seen = sink.events();
    assert_eq!(seen.len(), report.events.len());
    let trend_seen = seen.iter().position(|e| e.author == "trend_analyst").unwrap();
    let anomaly_seen = seen
        .iter()
        .position(|e| e.author == "anomaly_analyst")
        .unwrap();
    // The fast analyst reaches the sink first even though the log lists
    // trend before anomaly.
    assert!(anomaly_seen < trend_seen);
}

#[tokio::test]
async fn test_pipeline_is_reusable_across_runs() {
    let (pipeline, renderer) = pipeline_with(
        Arc::new(StaticSource::new(fixtures::q1_sales())),
        Arc::new(ScriptedBackend::replying("t")),
        Arc::new(ScriptedBackend::replying("a")),
    );

    let first = Arc::new(RunStore::new());
    let second = Arc::new(RunStore::new());
    let first_report = pipeline.execute(&first).await;
    let second_report = pipeline.execute(&second).await;

    assert!(first_report.is_complete());
    assert!(second_report.is_complete());
    assert_ne!(first_report.run_id, second_report.run_id);
    assert_eq!(renderer.count(), 4);
    assert!(second.contains(keys::VISUALIZATION_PATHS));
}
