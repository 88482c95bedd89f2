use serde::{Deserialize, Serialize};

use super::metrics::{AggregateMetric, MetricScope};
use crate::error::RagError;

pub const DEFAULT_MIN_COVERAGE_AT_5: f64 = 0.50;
pub const DEFAULT_MIN_HIT_AT_1: f64 = 0.35;
pub const DIAGNOSTIC_GROUP_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub min_coverage_at_5: f64,
    pub min_hit_at_1: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_coverage_at_5: DEFAULT_MIN_COVERAGE_AT_5,
            min_hit_at_1: DEFAULT_MIN_HIT_AT_1,
        }
    }
}

impl Thresholds {
    fn violated_by(&self, row: &AggregateMetric) -> bool {
        row.coverage_at_5 < self.min_coverage_at_5 || row.hit_at_1 < self.min_hit_at_1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityCheck {
    pub check_id: String,
    pub name: String,
    pub metric: String,
    pub observed: f64,
    pub threshold: f64,
    pub result: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QualitySummary {
    pub total_checks: usize,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub weakest_groups: Vec<AggregateMetric>,
    pub groups_below_threshold: Vec<AggregateMetric>,
}

pub fn build_threshold_checks(global: &AggregateMetric, thresholds: &Thresholds) -> Vec<QualityCheck> {
    let check = |check_id: &str, name: &str, metric: &str, observed: f64, threshold: f64| {
        QualityCheck {
            check_id: check_id.to_string(),
            name: name.to_string(),
            metric: metric.to_string(),
            observed,
            threshold,
            result: if observed >= threshold { "pass" } else { "failed" }.to_string(),
        }
    };

    vec![
        check(
            "E-001",
            "Global coverage@5 at or above minimum",
            "coverage@5",
            global.coverage_at_5,
            thresholds.min_coverage_at_5,
        ),
        check(
            "E-002",
            "Global hit@1 at or above minimum",
            "hit@1",
            global.hit_at_1,
            thresholds.min_hit_at_1,
        ),
    ]
}

pub fn summarize_checks(checks: &[QualityCheck]) -> QualitySummary {
    let passed = checks.iter().filter(|check| check.result == "pass").count();
    let failed = checks
        .iter()
        .filter(|check| check.result == "failed")
        .count();

    QualitySummary {
        total_checks: checks.len(),
        passed,
        failed,
    }
}

/// The error to raise, once the report is on disk, when the global row falls
/// under either threshold.
pub fn threshold_violation(global: &AggregateMetric, thresholds: &Thresholds) -> Option<RagError> {
    thresholds
        .violated_by(global)
        .then(|| RagError::ThresholdViolation {
            coverage_at_5: global.coverage_at_5,
            hit_at_1: global.hit_at_1,
            min_coverage_at_5: thresholds.min_coverage_at_5,
            min_hit_at_1: thresholds.min_hit_at_1,
        })
}

/// Weakest non-global groups (ascending hit@1, then coverage@5) and every
/// group under either threshold, both in report order otherwise.
pub fn diagnose(rows: &[AggregateMetric], thresholds: &Thresholds, limit: usize) -> Diagnostics {
    let groups = rows
        .iter()
        .filter(|row| row.scope != MetricScope::Global)
        .collect::<Vec<&AggregateMetric>>();

    let mut weakest = groups.clone();
    weakest.sort_by(|left, right| {
        left.hit_at_1
            .total_cmp(&right.hit_at_1)
            .then(left.coverage_at_5.total_cmp(&right.coverage_at_5))
    });

    Diagnostics {
        weakest_groups: weakest.into_iter().take(limit).cloned().collect(),
        groups_below_threshold: groups
            .into_iter()
            .filter(|row| thresholds.violated_by(row))
            .cloned()
            .collect(),
    }
}
