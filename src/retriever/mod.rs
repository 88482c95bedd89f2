//! Keyword-overlap relevance scoring over a [`CorpusIndex`].
//!
//! Each document is reduced once, at construction, to a token set built from
//! its title, path segments, metadata tags, and configured synonym
//! expansions. A query scores a document by the fraction of its keywords
//! that start one of those tokens, so `math` finds `maths` while `aire`
//! never matches inside `primaire`.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;
use serde::Serialize;

use crate::model::{CorpusIndex, DocumentRecord};
use crate::normalize::{canonical_grade, canonical_subject, fold, word_tokens};

mod config;
#[cfg(test)]
mod tests;

pub use config::{RetrieverConfig, SynonymRule, TriggerMatch};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Query {
    pub text: String,
    pub grade_hint: Option<String>,
    pub subject_hint: Option<String>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_grade_hint(mut self, grade: Option<&str>) -> Self {
        self.grade_hint = non_blank(grade);
        self
    }

    pub fn with_subject_hint(mut self, subject: Option<&str>) -> Self {
        self.subject_hint = non_blank(subject);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedDocument {
    pub rank: usize,
    pub score: f64,
    pub matched_keywords: Vec<String>,
    pub document: DocumentRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub keywords: Vec<String>,
    pub hits: Vec<RetrievedDocument>,
}

impl RetrievalResult {
    pub fn doc_ids(&self) -> impl Iterator<Item = &str> {
        self.hits.iter().map(|hit| hit.document.id.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RetrieverStats {
    pub documents_loaded: usize,
    pub queries: u64,
    pub queries_with_hits: u64,
    pub cache_hits: u64,
    pub hit_rate: f64,
}

type CacheKey = (Query, usize);

pub struct Retriever {
    index: Arc<CorpusIndex>,
    doc_tokens: Vec<HashSet<String>>,
    stopwords: HashSet<String>,
    min_token_chars: usize,
    default_max_docs: usize,
    cache: Option<Mutex<LruCache<CacheKey, RetrievalResult>>>,
    queries: AtomicU64,
    queries_with_hits: AtomicU64,
    cache_hits: AtomicU64,
}

impl Retriever {
    pub fn new(index: Arc<CorpusIndex>, config: &RetrieverConfig) -> Self {
        let synonyms = config
            .synonyms
            .iter()
            .map(|rule| SynonymRule {
                trigger: fold(rule.trigger.trim()),
                match_mode: rule.match_mode,
                tokens: rule.tokens.iter().flat_map(|token| word_tokens(token)).collect(),
            })
            .collect::<Vec<SynonymRule>>();

        let doc_tokens = index
            .records()
            .iter()
            .map(|record| document_tokens(record, &synonyms))
            .collect();

        let cache = NonZeroUsize::new(config.cache_capacity)
            .map(|capacity| Mutex::new(LruCache::new(capacity)));

        Self {
            index,
            doc_tokens,
            stopwords: config.stopwords.iter().map(|word| fold(word.trim())).collect(),
            min_token_chars: config.min_token_chars,
            default_max_docs: config.default_max_docs,
            cache,
            queries: AtomicU64::new(0),
            queries_with_hits: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
        }
    }

    pub fn default_max_docs(&self) -> usize {
        self.default_max_docs
    }

    /// Ranks documents for `query`, keeping at most `max_docs` non-zero hits.
    pub fn retrieve(&self, query: &Query, max_docs: usize) -> RetrievalResult {
        self.queries.fetch_add(1, Ordering::Relaxed);

        let key = (query.clone(), max_docs);
        let cached = self.cache.as_ref().and_then(|cache| {
            cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&key)
                .cloned()
        });

        let result = match cached {
            Some(result) => {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                result
            }
            None => {
                let result = self.score(query, max_docs);
                if let Some(cache) = &self.cache {
                    cache
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .put(key, result.clone());
                }
                result
            }
        };

        if !result.hits.is_empty() {
            self.queries_with_hits.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    pub fn stats(&self) -> RetrieverStats {
        let queries = self.queries.load(Ordering::Relaxed);
        let queries_with_hits = self.queries_with_hits.load(Ordering::Relaxed);
        RetrieverStats {
            documents_loaded: self.index.len(),
            queries,
            queries_with_hits,
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            hit_rate: if queries == 0 {
                0.0
            } else {
                queries_with_hits as f64 / queries as f64
            },
        }
    }

    /// Query keywords after folding, stopword removal, length filtering, and
    /// merging hint tokens, de-duplicated in first-seen order.
    pub fn keywords(&self, query: &Query) -> Vec<String> {
        let mut candidates = word_tokens(&query.text);

        if let Some(grade) = &query.grade_hint {
            candidates.extend(word_tokens(grade));
            if let Some(canonical) = canonical_grade(grade) {
                candidates.extend(word_tokens(&canonical.to_string()));
            }
        }
        if let Some(subject) = &query.subject_hint {
            candidates.extend(word_tokens(subject));
            candidates.extend(word_tokens(&canonical_subject(subject)));
        }

        let mut seen = HashSet::<String>::new();
        candidates
            .into_iter()
            .filter(|token| token.chars().count() >= self.min_token_chars)
            .filter(|token| !self.stopwords.contains(token))
            .filter(|token| seen.insert(token.clone()))
            .collect()
    }

    fn score(&self, query: &Query, max_docs: usize) -> RetrievalResult {
        let keywords = self.keywords(query);
        if keywords.is_empty() || max_docs == 0 {
            return RetrievalResult {
                keywords,
                hits: Vec::new(),
            };
        }

        let mut scored = Vec::<(usize, f64, Vec<String>)>::new();
        for (position, tokens) in self.doc_tokens.iter().enumerate() {
            let matched = keywords
                .iter()
                .filter(|keyword| matches_token_start(tokens, keyword))
                .cloned()
                .collect::<Vec<String>>();
            if matched.is_empty() {
                continue;
            }
            let score = matched.len() as f64 / keywords.len() as f64;
            scored.push((position, score, matched));
        }

        scored.sort_by(|left, right| right.1.total_cmp(&left.1).then(left.0.cmp(&right.0)));
        scored.truncate(max_docs);

        let records = self.index.records();
        let hits = scored
            .into_iter()
            .enumerate()
            .map(|(rank, (position, score, matched_keywords))| RetrievedDocument {
                rank: rank + 1,
                score,
                matched_keywords,
                document: records[position].clone(),
            })
            .collect();

        RetrievalResult { keywords, hits }
    }
}

fn document_tokens(record: &DocumentRecord, synonyms: &[SynonymRule]) -> HashSet<String> {
    let mut tokens = HashSet::<String>::new();
    tokens.extend(word_tokens(&record.title));
    tokens.extend(word_tokens(&record.path));
    tokens.extend(word_tokens(&record.id));

    let mut tags = word_tokens(&record.subject);
    if let Some(level) = &record.level {
        tags.extend(word_tokens(level));
    }
    tags.extend(word_tokens(&record.cycle));
    tags.extend(word_tokens(&record.language));
    tokens.extend(tags);

    let expansions = tokens
        .iter()
        .flat_map(|token| {
            synonyms
                .iter()
                .filter(move |rule| rule.matches(token))
                .flat_map(|rule| rule.tokens.iter().cloned())
        })
        .collect::<Vec<String>>();
    tokens.extend(expansions);

    tokens
}

fn matches_token_start(tokens: &HashSet<String>, keyword: &str) -> bool {
    tokens.contains(keyword) || tokens.iter().any(|token| token.starts_with(keyword))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}
