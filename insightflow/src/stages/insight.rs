//! The analyst stage pair.
//!
//! Both analysts share one implementation: [`InsightStage`] configured
//! by an [`InsightKind`]. The kinds differ in prompt framing, output key
//! and canned fallback narrative, nothing else. Each calls its injected
//! [`TextGenBackend`] under a bounded timeout and degrades to the canned
//! narrative when the service misbehaves, so a flaky or absent backend
//! never takes the run down.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::{Fallback, Stage};
use crate::backend::{BackendError, GenerationRequest, TextGenBackend};
use crate::errors::StageError;
use crate::events::EventEmitter;
use crate::store::{keys, RunStore};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_TOKENS: u32 = 500;

const TREND_FALLBACK: &str = "## Sales Trend Analysis

Monthly Revenue Changes:
- January to March: 67% overall revenue growth ($2,700 to $4,515)
- February showed the strongest single-month performance ($2,615)
- Q1 2023 demonstrates a consistent upward trajectory

Top-Performing Products:
- AlphaSpark (Gadgets): $4,440 total revenue, the clear market leader
- GammaGizmo (Gizmos): $1,250 revenue with the highest per-unit value
- BetaBolt (Widgets): $1,425 total revenue with steady performance

Key Insights:
- Gadgets category driving 68% of total revenue
- Premium pricing strategy working well for AlphaSpark
- Strong customer demand across all product lines
";

const ANOMALY_FALLBACK: &str = "## Anomaly Detection Report

Key Findings:
- Revenue spike: AlphaSpark shows a 50% revenue increase from Jan to Mar ($1,200 to $1,800)
- Volume anomaly: BetaBolt units declined by 10% while holding similar revenue
- Category performance: Gadgets consistently outperform Widgets and Gizmos
- Seasonal pattern: Q1 shows a strong growth trend across all product categories

Recommendations:
- Investigate AlphaSpark's pricing strategy for potential optimization
- Monitor BetaBolt for potential supply or demand issues
- Focus marketing efforts on Gadgets category expansion
";

/// Which analyst an [`InsightStage`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsightKind {
    /// Trend and top-performer analysis.
    Trend,
    /// Anomaly and outlier detection.
    Anomaly,
}

impl InsightKind {
    /// Both kinds, in pipeline report order.
    pub const ALL: [Self; 2] = [Self::Trend, Self::Anomaly];

    /// The stage name, used as event author.
    #[must_use]
    pub fn stage_name(self) -> &'static str {
        match self {
            Self::Trend => "trend_analyst",
            Self::Anomaly => "anomaly_analyst",
        }
    }

    /// The store key this analyst writes.
    #[must_use]
    pub fn state_key(self) -> &'static str {
        match self {
            Self::Trend => keys::TREND_INSIGHT,
            Self::Anomaly => keys::ANOMALY_INSIGHT,
        }
    }

    /// Sentence-case label for event texts.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Trend => "Trend analysis",
            Self::Anomaly => "Anomaly analysis",
        }
    }

    /// Lower-case phrase for error events.
    #[must_use]
    pub fn activity(self) -> &'static str {
        match self {
            Self::Trend => "trend analysis",
            Self::Anomaly => "anomaly analysis",
        }
    }

    /// Text the visualizer shows when this analyst's key is absent.
    #[must_use]
    pub fn placeholder(self) -> &'static str {
        match self {
            Self::Trend => "Trend analysis not available.",
            Self::Anomaly => "Anomaly analysis not available.",
        }
    }

    /// The canned narrative stored when the backend fails.
    ///
    /// Static by design: it must be byte-identical on every degraded run.
    #[must_use]
    pub fn fallback_narrative(self) -> &'static str {
        match self {
            Self::Trend => TREND_FALLBACK,
            Self::Anomaly => ANOMALY_FALLBACK,
        }
    }

    /// Builds this analyst's prompt around the serialized dataset.
    #[must_use]
    pub fn prompt(self, dataset_json: &str) -> String {
        match self {
            Self::Trend => format!(
                "You are an expert data analyst.\n\
                 Analyze the following sales data, provided in JSON format, to identify key trends.\n\
                 Focus specifically on:\n\
                 1. Monthly revenue changes: describe any significant increases or decreases.\n\
                 2. Top-performing products: identify products with high revenue or sales volume.\n\
                 Provide a concise, bullet-pointed summary of your findings.\n\
                 \n\
                 Sales Data:\n\
                 {dataset_json}\n\
                 \n\
                 Your Analysis:\n"
            ),
            Self::Anomaly => format!(
                "You are a meticulous data auditor.\n\
                 Based on the following sales data (in JSON format), identify potential anomalies or outliers.\n\
                 Consider unusual spikes or dips in units sold or revenue that deviate from general patterns.\n\
                 Explain any unusual patterns you detect in a brief, clear manner.\n\
                 \n\
                 Sales Data:\n\
                 {dataset_json}\n\
                 \n\
                 Anomaly Report:\n"
            ),
        }
    }

    fn fallback_note(self) -> String {
        format!("{} completed using fallback narrative.", self.title())
    }
}

/// An analyst stage: prompt, backend call, verbatim store write.
pub struct InsightStage {
    kind: InsightKind,
    backend: Arc<dyn TextGenBackend>,
    timeout: Duration,
    max_tokens: u32,
}

impl InsightStage {
    /// Creates an analyst of the given kind over a backend.
    pub fn new(kind: InsightKind, backend: Arc<dyn TextGenBackend>) -> Self {
        Self {
            kind,
            backend,
            timeout: DEFAULT_TIMEOUT,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Overrides the backend call budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the generation token cap.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Returns this analyst's kind.
    #[must_use]
    pub fn kind(&self) -> InsightKind {
        self.kind
    }
}

#[async_trait]
impl Stage for InsightStage {
    fn name(&self) -> &str {
        self.kind.stage_name()
    }

    fn required_keys(&self) -> &'static [&'static str] {
        &[keys::PROCESSED_DATA]
    }

    fn output_key(&self) -> &'static str {
        self.kind.state_key()
    }

    fn fallback(&self) -> Option<Fallback> {
        Some(Fallback::new(
            serde_json::Value::String(self.kind.fallback_narrative().to_string()),
            self.kind.fallback_note(),
        ))
    }

    fn activity(&self) -> &str {
        self.kind.activity()
    }

    async fn attempt(
        &self,
        store: &RunStore,
        _progress: &EventEmitter,
    ) -> Result<String, StageError> {
        let processed = store
            .processed_dataset()?
            .ok_or_else(|| StageError::missing_input(self.name(), keys::PROCESSED_DATA))?;
        let dataset_json = processed
            .to_json_string()
            .map_err(|err| StageError::transform(format!("serializing dataset for prompt: {err}")))?;

        let request = GenerationRequest::new(self.kind.prompt(&dataset_json), self.max_tokens);
        tracing::info!(
            stage = self.name(),
            backend = self.backend.name(),
            "requesting analysis"
        );

        let text = match tokio::time::timeout(self.timeout, self.backend.generate(&request)).await {
            Ok(generated) => generated?,
            Err(_) => {
                return Err(StageError::Backend(BackendError::Timeout {
                    secs: self.timeout.as_secs_f64(),
                }))
            }
        };

        tracing::debug!(stage = self.name(), chars = text.len(), "analysis stored");
        store.set_insight(self.kind, text)?;

        Ok(format!("{} complete. Insights stored.", self.kind.title()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::run_stage;
    use crate::testing::fixtures;
    use crate::testing::mocks::{FailingBackend, ScriptedBackend, SlowBackend};

    fn seeded_store() -> Arc<RunStore> {
        let store = Arc::new(RunStore::new());
        store
            .set_processed_dataset(&fixtures::processed_q1_sales())
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_success_stores_backend_text_verbatim() {
        let backend = Arc::new(ScriptedBackend::replying("Revenue is trending upward."));
        let stage = Arc::new(InsightStage::new(
            InsightKind::Trend,
            Arc::clone(&backend) as Arc<dyn TextGenBackend>,
        ));
        let store = seeded_store();

        let events = run_stage(stage, Arc::clone(&store)).drain().await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].author, "trend_analyst");
        assert_eq!(events[0].text, "Trend analysis complete. Insights stored.");
        assert!(!events[0].is_terminal());
        assert_eq!(
            store.insight(InsightKind::Trend).unwrap().as_deref(),
            Some("Revenue is trending upward.")
        );
    }

    #[tokio::test]
    async fn test_prompt_carries_role_and_dataset() {
        let backend = Arc::new(ScriptedBackend::replying("ok"));
        let stage = Arc::new(
            InsightStage::new(
                InsightKind::Anomaly,
                Arc::clone(&backend) as Arc<dyn TextGenBackend>,
            )
            .with_max_tokens(123),
        );

        run_stage(stage, seeded_store()).drain().await;

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].prompt.contains("meticulous data auditor"));
        assert!(requests[0].prompt.contains("AlphaSpark"));
        assert_eq!(requests[0].max_tokens, 123);
    }

    #[tokio::test]
    async fn test_backend_failure_degrades_to_canned_narrative() {
        let stage = Arc::new(InsightStage::new(
            InsightKind::Trend,
            Arc::new(FailingBackend::new()),
        ));
        let store = seeded_store();

        let events = run_stage(stage, Arc::clone(&store)).drain().await;

        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].text,
            "Trend analysis completed using fallback narrative."
        );
        assert!(!events[0].is_terminal());
        assert_eq!(
            store.insight(InsightKind::Trend).unwrap().unwrap(),
            InsightKind::Trend.fallback_narrative()
        );
    }

    #[tokio::test]
    async fn test_fallback_is_deterministic_across_runs() {
        let mut narratives = Vec::new();
        for _ in 0..2 {
            let stage = Arc::new(InsightStage::new(
                InsightKind::Anomaly,
                Arc::new(FailingBackend::new()),
            ));
            let store = seeded_store();
            run_stage(stage, Arc::clone(&store)).drain().await;
            narratives.push(store.insight(InsightKind::Anomaly).unwrap().unwrap());
        }

        assert_eq!(narratives[0], narratives[1]);
        assert!(narratives[0].contains("## Anomaly Detection Report"));
    }

    #[tokio::test]
    async fn test_slow_backend_times_out_into_fallback() {
        let backend = Arc::new(SlowBackend::new(Duration::from_secs(5), "too late"));
        let stage = Arc::new(
            InsightStage::new(InsightKind::Trend, backend)
                .with_timeout(Duration::from_millis(20)),
        );
        let store = seeded_store();

        let events = run_stage(stage, Arc::clone(&store)).drain().await;

        assert_eq!(
            events[0].text,
            "Trend analysis completed using fallback narrative."
        );
        assert_eq!(
            store.insight(InsightKind::Trend).unwrap().unwrap(),
            InsightKind::Trend.fallback_narrative()
        );
    }

    #[tokio::test]
    async fn test_missing_processed_data_is_terminal() {
        let stage = Arc::new(InsightStage::new(
            InsightKind::Anomaly,
            Arc::new(ScriptedBackend::replying("unused")),
        ));
        let store = Arc::new(RunStore::new());

        let events = run_stage(stage, Arc::clone(&store)).drain().await;

        assert_eq!(events.len(), 1);
        assert!(events[0].is_terminal());
        assert!(events[0].text.contains("'processed_data' not found in state"));
        assert!(store.insight(InsightKind::Anomaly).unwrap().is_none());
    }

    #[test]
    fn test_kinds_write_disjoint_keys() {
        assert_ne!(
            InsightKind::Trend.state_key(),
            InsightKind::Anomaly.state_key()
        );
        assert_ne!(
            InsightKind::Trend.stage_name(),
            InsightKind::Anomaly.stage_name()
        );
    }
}
