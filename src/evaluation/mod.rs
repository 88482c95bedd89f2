//! Offline retrieval evaluation against a labeled benchmark.
//!
//! Every example is retrieved once; the first relevant position inside the
//! top five decides hit@1, coverage@5, and the reciprocal rank.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::model::LabeledExample;
use crate::retriever::{Query, Retriever};

mod checks;
mod metrics;
mod report;

pub use checks::{
    DIAGNOSTIC_GROUP_LIMIT, Thresholds, build_threshold_checks, diagnose, summarize_checks,
    threshold_violation,
};
pub use metrics::{AggregateMetric, GroupDimension, aggregate};
pub use report::{EvaluationSummary, write_report};

/// Positions scanned for the first relevant document.
pub const RANK_WINDOW: usize = 5;
pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRecord {
    pub example_id: String,
    pub language: String,
    pub grade: String,
    pub subject: String,
    pub query: String,
    pub expected_doc_ids: Vec<String>,
    pub retrieved_doc_ids: Vec<String>,
    pub rank: Option<usize>,
    #[serde(rename = "hit@1")]
    pub hit_at_1: bool,
    #[serde(rename = "coverage@5")]
    pub coverage_at_5: bool,
    pub reciprocal_rank: f64,
}

#[derive(Debug, Clone)]
pub struct EvaluationOptions {
    pub top_k: usize,
    pub use_hints: bool,
    pub dimensions: Vec<GroupDimension>,
    pub time_budget: Option<Duration>,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            use_hints: true,
            dimensions: GroupDimension::ALL.to_vec(),
            time_budget: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EvaluationRun {
    pub records: Vec<EvaluationRecord>,
    pub rows: Vec<AggregateMetric>,
    pub skipped: usize,
    pub notices: Vec<String>,
}

impl EvaluationRun {
    pub fn truncated(&self) -> bool {
        self.skipped > 0
    }

    pub fn global(&self) -> &AggregateMetric {
        // aggregate() always emits the global row first
        &self.rows[0]
    }
}

pub fn evaluate(
    examples: &[LabeledExample],
    retriever: &Retriever,
    options: &EvaluationOptions,
) -> EvaluationRun {
    let started = Instant::now();
    let mut records = Vec::with_capacity(examples.len());
    let mut skipped = 0_usize;

    for (position, example) in examples.iter().enumerate() {
        if let Some(budget) = options.time_budget
            && started.elapsed() >= budget
        {
            skipped = examples.len() - position;
            warn!(
                evaluated = position,
                skipped,
                budget_ms = budget.as_millis() as u64,
                "evaluation time budget exceeded"
            );
            break;
        }

        let record = evaluate_example(example, retriever, options);
        debug!(
            example_id = %record.example_id,
            rank = ?record.rank,
            "evaluated example"
        );
        records.push(record);
    }

    let mut notices = Vec::new();
    if skipped > 0 {
        notices.push(format!(
            "time budget exceeded after {} example(s); {skipped} skipped",
            records.len()
        ));
    }

    let rows = aggregate(&records, &options.dimensions);
    EvaluationRun {
        records,
        rows,
        skipped,
        notices,
    }
}

pub fn evaluate_example(
    example: &LabeledExample,
    retriever: &Retriever,
    options: &EvaluationOptions,
) -> EvaluationRecord {
    let mut query = Query::new(example.query.as_str());
    if options.use_hints {
        query = query
            .with_grade_hint(Some(example.grade.as_str()))
            .with_subject_hint(Some(example.subject.as_str()));
    }

    let result = retriever.retrieve(&query, options.top_k);
    let retrieved_doc_ids = result
        .doc_ids()
        .map(ToOwned::to_owned)
        .collect::<Vec<String>>();

    let expected = example.expected_doc_ids().collect::<HashSet<&str>>();
    let rank = first_relevant_rank(&retrieved_doc_ids, &expected);

    EvaluationRecord {
        example_id: example.id.clone(),
        language: example.language.clone(),
        grade: example.grade.clone(),
        subject: example.subject.clone(),
        query: example.query.clone(),
        expected_doc_ids: example.expected_doc_ids().map(ToOwned::to_owned).collect(),
        retrieved_doc_ids,
        rank,
        hit_at_1: rank == Some(1),
        coverage_at_5: rank.is_some(),
        reciprocal_rank: rank.map(|rank| 1.0 / rank as f64).unwrap_or(0.0),
    }
}

/// 1-based position of the first retrieved id found in `expected`, scanning
/// at most [`RANK_WINDOW`] results.
pub fn first_relevant_rank(retrieved: &[String], expected: &HashSet<&str>) -> Option<usize> {
    retrieved
        .iter()
        .take(RANK_WINDOW)
        .position(|doc_id| expected.contains(doc_id.as_str()))
        .map(|index| index + 1)
}
