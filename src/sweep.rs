use std::thread;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::config::SweepConfig;
use crate::errors::SweepError;
use crate::runner::Probe;
use crate::types::{Dataset, RunInvocation, SweepRange, SweepSample};

/// Why a parameter has no sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// The run ended without printing a metric line.
    NoMatch,
    /// Launch or read failed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRun {
    pub parameter: i64,
    pub reason: SkipReason,
}

/// Everything one sweep produced.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub device_name: String,
    pub range: SweepRange,
    pub dataset: Dataset,
    pub attempted: usize,
    pub skipped: Vec<SkippedRun>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SweepReport {
    /// The dataset, or [`SweepError::NoDataCollected`] when it is empty.
    pub fn into_dataset(self) -> Result<Dataset, SweepError> {
        if self.dataset.is_empty() {
            return Err(SweepError::NoDataCollected);
        }
        Ok(self.dataset)
    }
}

/// Run `probe` once per parameter of `config.range`, in order.
///
/// Only one run is ever live. A failed or non-matching run is recorded as
/// skipped and the sweep moves on; nothing is retried.
pub fn run_sweep<P: Probe + ?Sized>(config: &SweepConfig, probe: &mut P) -> SweepReport {
    info!(
        "Starting benchmark on {}, range {} to {} (step {})",
        config.device_name,
        config.range.start(),
        config.range.end(),
        config.range.step()
    );

    let started_at = Utc::now();
    let mut dataset = Dataset::new();
    let mut skipped = Vec::new();
    let mut attempted = 0;

    for (i, index) in config.range.iter().enumerate() {
        if i > 0 && !config.cooldown_delay.is_zero() {
            thread::sleep(config.cooldown_delay);
        }

        let _span = info_span!("run", index).entered();
        attempted += 1;

        let invocation = RunInvocation::new(&config.program_path, &config.device_name, index);
        match probe.measure(&invocation) {
            Ok(Some(metric)) => {
                info!("Index: {index} -> VS invocations: {metric}");
                dataset.push(SweepSample {
                    parameter: index,
                    metric,
                });
            }
            Ok(None) => {
                info!("No invocation count reported for index {index}");
                skipped.push(SkippedRun {
                    parameter: index,
                    reason: SkipReason::NoMatch,
                });
            }
            Err(err) => {
                warn!("Error at index {index}: {err}");
                skipped.push(SkippedRun {
                    parameter: index,
                    reason: SkipReason::Failed(err.to_string()),
                });
            }
        }
    }

    SweepReport {
        device_name: config.device_name.clone(),
        range: config.range,
        dataset,
        attempted,
        skipped,
        started_at,
        finished_at: Utc::now(),
    }
}
