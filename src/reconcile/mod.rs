//! Repairs stale benchmark references against the current corpus.
//!
//! A reference is kept when it already names an indexed document, mapped when
//! only its directory prefix is stale, and otherwise fuzzy-matched through
//! progressively wider candidate pools. Anything that cannot be matched with
//! enough confidence is left exactly as written.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{CorpusIndex, ExpectedReference, LabeledExample};
use crate::normalize::{base_name, canonical_subject, file_stem, level_tokens_for_grade};

mod matching;

use matching::MatchIndex;

pub const DEFAULT_ACCEPTANCE_THRESHOLD: f64 = 2.2;
pub const DEFAULT_FUZZY_WEIGHT: f64 = 2.0;
pub const DEFAULT_LEVEL_BONUS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub acceptance_threshold: f64,
    pub fuzzy_weight: f64,
    pub level_bonus: f64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
            fuzzy_weight: DEFAULT_FUZZY_WEIGHT,
            level_bonus: DEFAULT_LEVEL_BONUS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    Kept,
    Mapped,
    Unresolved,
}

impl DecisionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kept => "kept",
            Self::Mapped => "mapped",
            Self::Unresolved => "unresolved",
        }
    }
}

/// One row of the decision log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationDecision {
    pub example_id: String,
    pub status: DecisionStatus,
    pub original_reference: String,
    pub resolved_reference: String,
    pub canonical_subject: String,
    pub level_tokens_used: String,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileCounts {
    pub references: usize,
    pub kept: usize,
    pub mapped: usize,
    pub unresolved: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    pub examples: Vec<LabeledExample>,
    pub decisions: Vec<ReconciliationDecision>,
}

impl ReconcileOutcome {
    pub fn counts(&self) -> ReconcileCounts {
        let mut counts = ReconcileCounts {
            references: self.decisions.len(),
            ..ReconcileCounts::default()
        };
        for decision in &self.decisions {
            match decision.status {
                DecisionStatus::Kept => counts.kept += 1,
                DecisionStatus::Mapped => counts.mapped += 1,
                DecisionStatus::Unresolved => counts.unresolved += 1,
            }
        }
        counts
    }
}

pub fn reconcile(
    examples: &[LabeledExample],
    index: &CorpusIndex,
    config: &ReconcileConfig,
) -> ReconcileOutcome {
    Reconciler::new(index, *config).reconcile(examples)
}

pub struct Reconciler<'a> {
    index: &'a CorpusIndex,
    matcher: MatchIndex<'a>,
    config: ReconcileConfig,
}

impl<'a> Reconciler<'a> {
    pub fn new(index: &'a CorpusIndex, config: ReconcileConfig) -> Self {
        Self {
            index,
            matcher: MatchIndex::new(index),
            config,
        }
    }

    pub fn reconcile(&self, examples: &[LabeledExample]) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome {
            examples: Vec::with_capacity(examples.len()),
            decisions: Vec::new(),
        };

        for example in examples {
            let subject = canonical_subject(&example.subject);
            let level_tokens = level_tokens_for_grade(&example.grade);

            let mut repaired = example.clone();
            repaired.expected = example
                .expected
                .iter()
                .map(|reference| {
                    let decision = self.resolve(example, reference, &subject, &level_tokens);
                    let resolved = if decision.resolved_reference == reference.raw {
                        reference.clone()
                    } else {
                        ExpectedReference::parse(&decision.resolved_reference)
                    };
                    outcome.decisions.push(decision);
                    resolved
                })
                .collect();
            outcome.examples.push(repaired);
        }

        outcome
    }

    fn resolve(
        &self,
        example: &LabeledExample,
        reference: &ExpectedReference,
        subject: &str,
        level_tokens: &[String],
    ) -> ReconciliationDecision {
        let decision = |status: DecisionStatus, resolved: String, score: Option<f64>| {
            ReconciliationDecision {
                example_id: example.id.clone(),
                status,
                original_reference: reference.raw.clone(),
                resolved_reference: resolved,
                canonical_subject: subject.to_string(),
                level_tokens_used: level_tokens.join(","),
                score,
            }
        };

        if self.index.contains(&reference.doc_id) {
            return decision(DecisionStatus::Kept, reference.raw.clone(), None);
        }

        let basename = base_name(&reference.doc_id);
        if basename.is_empty() {
            return decision(DecisionStatus::Unresolved, reference.raw.clone(), None);
        }
        if let Some(record) = self.index.get(basename) {
            return decision(
                DecisionStatus::Mapped,
                reference.with_doc_id(&record.id),
                None,
            );
        }

        let stem = file_stem(basename);
        let mut best_seen: Option<f64> = None;
        for pool in self.matcher.pools(subject, level_tokens) {
            let Some(best) = self
                .matcher
                .best_in_pool(&pool, stem, level_tokens, &self.config)
            else {
                continue;
            };

            debug!(
                example_id = %example.id,
                reference = %reference.raw,
                pool_size = pool.len(),
                best_score = best.score,
                "scored candidate pool"
            );

            best_seen = Some(best_seen.map_or(best.score, |seen| seen.max(best.score)));
            if best.score >= self.config.acceptance_threshold {
                let record = self.matcher.record(best.position);
                return decision(
                    DecisionStatus::Mapped,
                    reference.with_doc_id(&record.id),
                    Some(best.score),
                );
            }
        }

        decision(DecisionStatus::Unresolved, reference.raw.clone(), best_seen)
    }
}
