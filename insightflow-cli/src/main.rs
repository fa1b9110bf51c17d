//! Command-line runner for the insightflow pipeline.
//!
//! Reads a sales CSV, runs the four analysis phases, prints every stage
//! event as it arrives, and exits non-zero when the run halts. Backend
//! credentials come from `GOOGLE_AI_API_KEY` and `OPENAI_API_KEY`; a
//! missing key is only a warning because the analysts degrade to canned
//! narratives when their backend rejects them.

use anyhow::Context as _;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use insightflow::backend::{GeminiBackend, OpenAiBackend};
use insightflow::config::{BackendConfig, PipelineConfig};
use insightflow::events::{EventSink, StageEvent};
use insightflow::pipeline::InsightPipeline;
use insightflow::source::CsvFileSource;
use insightflow::store::RunStore;

#[derive(Parser, Debug)]
#[command(name = "insightflow")]
#[command(about = "Run the sales analysis pipeline over a CSV export")]
#[command(version)]
struct Cli {
    /// Path to the sales CSV export
    #[arg(long, default_value = "data/sample_sales_data.csv")]
    data: PathBuf,

    /// Directory chart PNGs are written into
    #[arg(long, default_value = "results")]
    out_dir: PathBuf,

    /// Model override for the trend analyst (Gemini)
    #[arg(long)]
    trend_model: Option<String>,

    /// Model override for the anomaly analyst (OpenAI)
    #[arg(long)]
    anomaly_model: Option<String>,

    /// Seconds to wait for each analyst call before falling back
    #[arg(long, default_value_t = 30.0)]
    timeout_secs: f64,
}

/// Prints each stage event to stdout as it arrives.
#[derive(Debug, Clone, Copy)]
struct StdoutSink;

#[async_trait::async_trait]
impl EventSink for StdoutSink {
    async fn emit(&self, event: &StageEvent) {
        println!("{event}");
    }

    fn try_emit(&self, event: &StageEvent) {
        println!("{event}");
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn keyed_config(env_var: &str, model: Option<String>) -> BackendConfig {
    let api_key = match std::env::var(env_var) {
        Ok(key) if !key.is_empty() => key,
        _ => {
            tracing::warn!(
                "{env_var} is not set; analyst calls will fail and fall back to canned narratives"
            );
            String::new()
        }
    };

    let mut config = BackendConfig::new(api_key);
    if let Some(model) = model {
        config = config.with_model(model);
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = PipelineConfig::new()
        .with_out_dir(cli.out_dir.clone())
        .with_insight_timeout(cli.timeout_secs);

    let trend = GeminiBackend::from_config(&keyed_config("GOOGLE_AI_API_KEY", cli.trend_model));
    let anomaly = OpenAiBackend::from_config(&keyed_config("OPENAI_API_KEY", cli.anomaly_model));

    let pipeline = InsightPipeline::builder()
        .with_config(config)
        .with_source(Arc::new(CsvFileSource::new(&cli.data)))
        .with_trend_backend(Arc::new(trend))
        .with_anomaly_backend(Arc::new(anomaly))
        .with_event_sink(Arc::new(StdoutSink))
        .build()
        .context("assembling the pipeline")?;

    let store = Arc::new(RunStore::new());
    let report = pipeline.execute(&store).await;

    println!();
    println!(
        "Run {} {} in {} ms.",
        report.run_id, report.state, report.duration_ms
    );
    if let Some(manifest) = store.chart_manifest()? {
        for chart in &manifest {
            println!("  chart: {}", chart.path);
        }
    }

    if let Some(stage) = report.halted_stage() {
        anyhow::bail!("pipeline halted at {stage}");
    }
    Ok(())
}
