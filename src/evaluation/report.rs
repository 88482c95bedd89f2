use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use super::checks::{Diagnostics, QualityCheck, QualitySummary, Thresholds};
use super::metrics::{AggregateMetric, MetricsCsvRow};
use super::EvaluationRecord;
use crate::retriever::RetrieverStats;
use crate::util::{write_csv, write_json_pretty, write_jsonl};

pub const METRICS_FILE: &str = "metrics.csv";
pub const SUMMARY_FILE: &str = "summary.json";
pub const RECORDS_FILE: &str = "eval_records.jsonl";

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSummary {
    pub generated_at: String,
    pub benchmark_path: String,
    pub corpus_path: String,
    pub example_count: usize,
    pub evaluated_count: usize,
    pub truncated: bool,
    pub top_k: usize,
    pub use_hints: bool,
    pub global: AggregateMetric,
    pub by: Vec<AggregateMetric>,
    pub thresholds: Thresholds,
    pub checks: Vec<QualityCheck>,
    pub check_summary: QualitySummary,
    pub diagnostics: Diagnostics,
    pub notices: Vec<String>,
    pub retriever: RetrieverStats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub metrics: PathBuf,
    pub summary: PathBuf,
    pub records: PathBuf,
}

impl ReportPaths {
    pub fn in_dir(output_dir: &Path) -> Self {
        Self {
            metrics: output_dir.join(METRICS_FILE),
            summary: output_dir.join(SUMMARY_FILE),
            records: output_dir.join(RECORDS_FILE),
        }
    }
}

/// Writes the three report files; `summary.json` goes last so its presence
/// implies the others are complete.
pub fn write_report(
    output_dir: &Path,
    summary: &EvaluationSummary,
    records: &[EvaluationRecord],
) -> Result<ReportPaths> {
    let paths = ReportPaths::in_dir(output_dir);

    let csv_rows = summary
        .by
        .iter()
        .map(MetricsCsvRow::from)
        .collect::<Vec<MetricsCsvRow<'_>>>();
    write_csv(&paths.metrics, &csv_rows)?;
    write_jsonl(&paths.records, records)?;
    write_json_pretty(&paths.summary, summary)?;

    info!(
        metrics = %paths.metrics.display(),
        records = %paths.records.display(),
        summary = %paths.summary.display(),
        "wrote evaluation report"
    );
    Ok(paths)
}
