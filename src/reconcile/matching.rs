use std::collections::{HashMap, HashSet};

use crate::model::{CorpusIndex, DocumentRecord};
use crate::normalize::{
    SUBJECT_AUTRES, canonical_grade, canonical_subject, detect_level_token, file_stem, fold,
    infer_subject, norm_token, word_tokens,
};

use super::ReconcileConfig;

/// Precomputed matching features for one corpus document.
#[derive(Debug)]
struct Candidate {
    subject: String,
    level_token: Option<String>,
    folded_path: String,
    tokens: HashSet<String>,
    norm_stem: String,
}

impl Candidate {
    fn from_record(record: &DocumentRecord) -> Self {
        let subject = if record.subject.trim().is_empty() {
            infer_subject(&record.path, &record.id)
                .unwrap_or(SUBJECT_AUTRES)
                .to_string()
        } else {
            canonical_subject(&record.subject)
        };

        let level_token = detect_level_token(&record.path).or_else(|| {
            record
                .level
                .as_deref()
                .and_then(canonical_grade)
                .map(|grade| grade.level_token())
        });

        let stem = file_stem(&record.id);
        let mut tokens = word_tokens(stem).into_iter().collect::<HashSet<String>>();
        tokens.extend(word_tokens(&record.path));

        Self {
            subject,
            level_token: level_token.map(|token| token.to_lowercase()),
            folded_path: fold(&record.path),
            tokens,
            norm_stem: norm_token(stem),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMatch {
    pub position: usize,
    pub score: f64,
}

/// Candidate pools keyed by canonical subject and level token, built once
/// per corpus.
pub struct MatchIndex<'a> {
    index: &'a CorpusIndex,
    candidates: Vec<Candidate>,
    by_subject_level: HashMap<(String, String), Vec<usize>>,
    by_subject: HashMap<String, Vec<usize>>,
}

impl<'a> MatchIndex<'a> {
    pub fn new(index: &'a CorpusIndex) -> Self {
        let candidates = index
            .records()
            .iter()
            .map(Candidate::from_record)
            .collect::<Vec<Candidate>>();

        let mut by_subject_level = HashMap::<(String, String), Vec<usize>>::new();
        let mut by_subject = HashMap::<String, Vec<usize>>::new();
        for (position, candidate) in candidates.iter().enumerate() {
            by_subject
                .entry(candidate.subject.clone())
                .or_default()
                .push(position);
            if let Some(level_token) = &candidate.level_token {
                by_subject_level
                    .entry((candidate.subject.clone(), level_token.clone()))
                    .or_default()
                    .push(position);
            }
        }

        Self {
            index,
            candidates,
            by_subject_level,
            by_subject,
        }
    }

    pub fn record(&self, position: usize) -> &'a DocumentRecord {
        &self.index.records()[position]
    }

    /// Pools in search order: subject and level, subject only, everything.
    /// Empty pools are left out; each pool lists positions in corpus order.
    pub fn pools(&self, subject: &str, level_tokens: &[String]) -> Vec<Vec<usize>> {
        let mut pools = Vec::with_capacity(3);

        let mut subject_level = level_tokens
            .iter()
            .filter_map(|token| {
                self.by_subject_level
                    .get(&(subject.to_string(), token.to_lowercase()))
            })
            .flatten()
            .copied()
            .collect::<Vec<usize>>();
        subject_level.sort_unstable();
        subject_level.dedup();
        if !subject_level.is_empty() {
            pools.push(subject_level);
        }

        if let Some(subject_only) = self.by_subject.get(subject)
            && !subject_only.is_empty()
        {
            pools.push(subject_only.clone());
        }

        if !self.candidates.is_empty() {
            pools.push((0..self.candidates.len()).collect());
        }
        pools
    }

    /// Best candidate of `pool` for `reference_stem`; ties keep the earliest.
    pub fn best_in_pool(
        &self,
        pool: &[usize],
        reference_stem: &str,
        level_tokens: &[String],
        config: &ReconcileConfig,
    ) -> Option<ScoredMatch> {
        let reference_tokens = word_tokens(reference_stem)
            .into_iter()
            .collect::<HashSet<String>>();
        let reference_norm = norm_token(reference_stem);
        let folded_levels = level_tokens
            .iter()
            .map(|token| fold(token))
            .collect::<Vec<String>>();

        let mut best: Option<ScoredMatch> = None;
        for &position in pool {
            let candidate = &self.candidates[position];
            let score = score_candidate(
                candidate,
                &reference_tokens,
                &reference_norm,
                &folded_levels,
                config,
            );
            if best.as_ref().is_none_or(|current| score > current.score) {
                best = Some(ScoredMatch { position, score });
            }
        }
        best
    }
}

fn score_candidate(
    candidate: &Candidate,
    reference_tokens: &HashSet<String>,
    reference_norm: &str,
    folded_levels: &[String],
    config: &ReconcileConfig,
) -> f64 {
    let overlap = reference_tokens
        .iter()
        .filter(|token| candidate.tokens.contains(token.as_str()))
        .count() as f64;

    let level_bonus = if folded_levels
        .iter()
        .any(|level| !level.is_empty() && candidate.folded_path.contains(level.as_str()))
    {
        config.level_bonus
    } else {
        0.0
    };

    let similarity = strsim::normalized_levenshtein(reference_norm, &candidate.norm_stem);

    overlap + level_bonus + config.fuzzy_weight * similarity
}
