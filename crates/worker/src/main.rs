//! `assessor-worker` -- batch property validation and assessment analysis.
//!
//! Reads a JSON array of property records, validates and auto-fixes them,
//! runs outlier detection, market-trend estimation and appeal-risk scoring,
//! and writes a JSON report.
//!
//! # Environment variables
//!
//! | Variable                          | Required | Default        | Description                              |
//! |-----------------------------------|----------|----------------|------------------------------------------|
//! | `ASSESSOR_INPUT_PATH`             | yes      | --             | JSON array of property records           |
//! | `ASSESSOR_OUTPUT_PATH`            | no       | stdout         | Report destination                       |
//! | `ASSESSOR_HISTORY_PATH`           | no       | --             | JSON map of id to assessment history     |
//! | `ASSESSOR_CHUNK_SIZE`             | no       | `100`          | Records per chunk between progress events|
//! | `ASSESSOR_OUTLIER_THRESHOLD`      | no       | `15`           | Percent deviation from the group median  |
//! | `ASSESSOR_OUTLIER_METHOD`         | no       | `hybrid`       | `statistical`, `comparative`, `hybrid`   |
//! | `ASSESSOR_OUTLIER_GROUP_BY`       | no       | `both`         | `neighborhood`, `propertyType`, `both`   |
//! | `ASSESSOR_TREND_PERIOD`           | no       | `year`         | `month`, `quarter`, `year`               |
//! | `ASSESSOR_TREND_AREA`             | no       | `neighborhood` | `neighborhood`, `city`, `county`, `zipCode` |
//! | `ASSESSOR_SIGNIFICANCE_THRESHOLD` | no       | `5`            | Minimum significant trend, percent       |
//! | `ASSESSOR_AUTO_FIX`               | no       | `true`         | Run auto-fix before analysis             |
//! | `ASSESSOR_INSIGHT_IDS`            | no       | --             | Comma-separated ids for insight reports  |

use std::sync::Arc;

use assessor_core::batch::BatchProcessor;
use assessor_core::intelligence::AssessmentIntelligenceEngine;
use assessor_core::validation::ValidationRuleEngine;
use assessor_events::EventBus;
use assessor_worker::config::WorkerConfig;
use assessor_worker::pipeline::{self, AssessmentPipeline};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "assessor_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = WorkerConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid worker configuration");
        std::process::exit(1);
    });

    tracing::info!(
        input = %config.input_path.display(),
        chunk_size = config.chunk_size,
        auto_fix = config.auto_fix,
        "Starting assessor-worker",
    );

    let bus = Arc::new(EventBus::default());
    let logger = tokio::spawn(pipeline::log_events(bus.subscribe()));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping at the next chunk boundary");
            on_signal.cancel();
        }
    });

    let validator = Arc::new(ValidationRuleEngine::with_default_rules());
    let pipeline = AssessmentPipeline::new(
        config,
        BatchProcessor::new(validator),
        AssessmentIntelligenceEngine::new(),
        Arc::clone(&bus),
    );

    let outcome = pipeline.run_from_config(&cancel).await;

    // Close the bus so the logger drains and exits.
    drop(pipeline);
    drop(bus);
    let _ = logger.await;

    match outcome {
        Ok(report) => tracing::info!(
            run_id = %report.run_id,
            record_count = report.record_count,
            outliers = report.outliers.len(),
            "Assessment run finished",
        ),
        Err(e) => {
            tracing::error!(error = %e, "Assessment run failed");
            std::process::exit(1);
        }
    }
}
