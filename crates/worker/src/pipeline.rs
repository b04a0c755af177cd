//! Batch assessment pipeline.
//!
//! One run validates every record, optionally auto-fixes them, then runs
//! the collection-level analyses (outliers, market trends, appeal risk) and
//! per-subject insights over the fixed records. Validation and auto-fix are
//! chunked with a yield point per chunk; progress is published on the
//! [`EventBus`].

use std::path::Path;
use std::sync::Arc;

use assessor_core::batch::{partition_results, BatchOptions, BatchProcessor};
use assessor_core::error::CoreError;
use assessor_core::intelligence::{AssessmentHistory, AssessmentIntelligenceEngine};
use assessor_core::types::PropertyRecord;
use assessor_events::bus::{
    EVENT_ANALYSIS_COMPLETED, EVENT_AUTO_FIX_COMPLETED, EVENT_BATCH_PROGRESS, EVENT_RUN_COMPLETED,
    EVENT_RUN_STARTED,
};
use assessor_events::{AssessmentEvent, EventBus};
use serde_json::json;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::report::{AssessmentReport, AutoFixSummary, ValidationSummary};

pub const STAGE_VALIDATION: &str = "validation";
pub const STAGE_AUTO_FIX: &str = "autofix";

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

/// Read a JSON array of property records.
pub async fn load_records(path: &Path) -> WorkerResult<Vec<PropertyRecord>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| WorkerError::io(path, e))?;
    Ok(serde_json::from_str(&raw)?)
}

/// Read a JSON object mapping property id to its assessment history.
pub async fn load_history(path: &Path) -> WorkerResult<AssessmentHistory> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| WorkerError::io(path, e))?;
    Ok(serde_json::from_str(&raw)?)
}

/// Write the report as pretty JSON to `path`, or to stdout.
pub async fn write_report(report: &AssessmentReport, path: Option<&Path>) -> WorkerResult<()> {
    let mut body = serde_json::to_vec_pretty(report)?;
    body.push(b'\n');

    match path {
        Some(path) => tokio::fs::write(path, body)
            .await
            .map_err(|e| WorkerError::io(path, e)),
        None => {
            use tokio::io::AsyncWriteExt;
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(&body)
                .await
                .map_err(|e| WorkerError::io("<stdout>", e))?;
            stdout.flush().await.map_err(|e| WorkerError::io("<stdout>", e))
        }
    }
}

// ---------------------------------------------------------------------------
// AssessmentPipeline
// ---------------------------------------------------------------------------

/// Runs validation and analysis over a record collection with engines that
/// are constructed once by the caller.
pub struct AssessmentPipeline {
    config: WorkerConfig,
    processor: BatchProcessor,
    intelligence: AssessmentIntelligenceEngine,
    bus: Arc<EventBus>,
}

impl AssessmentPipeline {
    pub fn new(
        config: WorkerConfig,
        processor: BatchProcessor,
        intelligence: AssessmentIntelligenceEngine,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            config,
            processor,
            intelligence,
            bus,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Load inputs named by the configuration, run, and write the report.
    pub async fn run_from_config(
        &self,
        cancel: &CancellationToken,
    ) -> WorkerResult<AssessmentReport> {
        let records = load_records(&self.config.input_path).await?;
        let history = match &self.config.history_path {
            Some(path) => Some(load_history(path).await?),
            None => None,
        };

        let report = self.run(records, history.as_ref(), cancel).await?;
        write_report(&report, self.config.output_path.as_deref()).await?;
        Ok(report)
    }

    /// Run every stage over `records`.
    ///
    /// Returns [`CoreError::Cancelled`] (wrapped) when `cancel` fires before
    /// the run completes.
    pub async fn run(
        &self,
        records: Vec<PropertyRecord>,
        history: Option<&AssessmentHistory>,
        cancel: &CancellationToken,
    ) -> WorkerResult<AssessmentReport> {
        let run_id = Uuid::now_v7();
        let total = records.len();

        tracing::info!(%run_id, record_count = total, "Assessment run started");
        self.bus.publish(
            AssessmentEvent::new(EVENT_RUN_STARTED)
                .with_run(run_id)
                .with_payload(json!({ "recordCount": total })),
        );

        let options = BatchOptions::chunked(self.config.chunk_size);
        let validator = self.processor.validator();

        // -- Validation --
        let mut progress = self.progress_publisher(run_id, STAGE_VALIDATION);
        let results = self
            .processor
            .process_batch_yielding(
                &records,
                |r| validator.validate(r),
                options,
                Some(&mut progress),
                Some(cancel),
            )
            .await?;
        let validation = ValidationSummary::from(partition_results(results));
        tracing::info!(
            %run_id,
            valid = validation.valid_count,
            invalid = validation.invalid_count,
            average_score = validation.average_score,
            "Validation complete",
        );

        // -- Auto-fix --
        let (analysed, auto_fix) = if self.config.auto_fix {
            let mut progress = self.progress_publisher(run_id, STAGE_AUTO_FIX);
            let outcomes = self
                .processor
                .process_batch_yielding(
                    &records,
                    |r| validator.auto_fix(r),
                    options,
                    Some(&mut progress),
                    Some(cancel),
                )
                .await?;
            let summary = AutoFixSummary::tally(&records, &outcomes);
            tracing::info!(
                %run_id,
                fixed = summary.fixed_count,
                fixed_issues = summary.fixed_issue_count,
                "Auto-fix complete",
            );
            self.bus.publish(
                AssessmentEvent::new(EVENT_AUTO_FIX_COMPLETED)
                    .with_run(run_id)
                    .with_payload(serde_json::to_value(summary)?),
            );
            let fixed: Vec<PropertyRecord> = outcomes.into_iter().map(|o| o.record).collect();
            (fixed, Some(summary))
        } else {
            (records, None)
        };

        // -- Analysis --
        ensure_not_cancelled(cancel, total)?;
        let outliers = self
            .intelligence
            .detect_outliers(&analysed, &self.config.outlier_options());
        let market_trends = self
            .intelligence
            .analyze_market_trends(&analysed, &self.config.trend_options());
        let appeal_risks = self.intelligence.predict_appeal_risk(&analysed, history);

        ensure_not_cancelled(cancel, total)?;
        let subjects = self
            .processor
            .select_by_ids(&analysed, &self.config.insight_ids);
        if subjects.len() < self.config.insight_ids.len() {
            tracing::warn!(
                %run_id,
                requested = self.config.insight_ids.len(),
                found = subjects.len(),
                "Some insight ids did not match any record",
            );
        }
        let insights = subjects
            .iter()
            .map(|s| {
                self.intelligence
                    .get_property_assessment_insights(s, &analysed, history)
            })
            .collect();

        tracing::info!(
            %run_id,
            outliers = outliers.len(),
            trends = market_trends.len(),
            "Analysis complete",
        );
        self.bus.publish(
            AssessmentEvent::new(EVENT_ANALYSIS_COMPLETED)
                .with_run(run_id)
                .with_payload(json!({
                    "outlierCount": outliers.len(),
                    "trendCount": market_trends.len(),
                    "appealRiskCount": appeal_risks.len(),
                })),
        );

        let report = AssessmentReport {
            run_id,
            record_count: total,
            validation,
            auto_fix,
            outliers,
            market_trends,
            appeal_risks,
            insights,
        };

        self.bus
            .publish(AssessmentEvent::new(EVENT_RUN_COMPLETED).with_run(run_id));
        Ok(report)
    }

    fn progress_publisher<'a>(
        &'a self,
        run_id: Uuid,
        stage: &'a str,
    ) -> impl FnMut(usize, usize) + Send + 'a {
        move |processed, total| {
            self.bus.publish(
                AssessmentEvent::batch_progress(stage, processed, total).with_run(run_id),
            );
        }
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken, total: usize) -> Result<(), CoreError> {
    if cancel.is_cancelled() {
        return Err(CoreError::Cancelled {
            processed: total,
            total,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Event logging
// ---------------------------------------------------------------------------

/// Drain `rx` and log each event until the bus is dropped.
pub async fn log_events(mut rx: broadcast::Receiver<AssessmentEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) if event.event_type == EVENT_BATCH_PROGRESS => {
                tracing::debug!(
                    stage = %event.payload["stage"],
                    processed = %event.payload["processed"],
                    total = %event.payload["total"],
                    "Batch progress",
                );
            }
            Ok(event) => {
                tracing::debug!(
                    event_type = %event.event_type,
                    run_id = ?event.run_id,
                    payload = %event.payload,
                    "Assessment event",
                );
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event logger lagged behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
