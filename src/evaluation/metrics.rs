use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::EvaluationRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricScope {
    Global,
    Lang,
    LangGrade,
    LangSubject,
}

impl MetricScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Lang => "lang",
            Self::LangGrade => "lang_grade",
            Self::LangSubject => "lang_subject",
        }
    }
}

/// Grouping dimensions beyond the always-present global row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupDimension {
    Language,
    LanguageGrade,
    LanguageSubject,
}

impl GroupDimension {
    pub const ALL: [GroupDimension; 3] = [
        GroupDimension::Language,
        GroupDimension::LanguageGrade,
        GroupDimension::LanguageSubject,
    ];

    fn key(self, record: &EvaluationRecord) -> GroupKey {
        let lang = record.language.clone();
        match self {
            Self::Language => (MetricScope::Lang, lang, String::new(), String::new()),
            Self::LanguageGrade => (
                MetricScope::LangGrade,
                lang,
                record.grade.clone(),
                String::new(),
            ),
            Self::LanguageSubject => (
                MetricScope::LangSubject,
                lang,
                String::new(),
                record.subject.clone(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetric {
    pub scope: MetricScope,
    pub lang: String,
    pub grade: String,
    pub subject: String,
    pub count: usize,
    #[serde(rename = "hit@1")]
    pub hit_at_1: f64,
    #[serde(rename = "coverage@5")]
    pub coverage_at_5: f64,
    #[serde(rename = "mrr@5")]
    pub mrr_at_5: f64,
}

impl AggregateMetric {
    /// `lang=fr grade=5e_primaire`-style label for logs.
    pub fn label(&self) -> String {
        let mut parts = vec![self.scope.as_str().to_string()];
        if self.scope != MetricScope::Global {
            parts.push(format!("lang={}", self.lang));
        }
        if self.scope == MetricScope::LangGrade {
            parts.push(format!("grade={}", self.grade));
        }
        if self.scope == MetricScope::LangSubject {
            parts.push(format!("subject={}", self.subject));
        }
        parts.join(" ")
    }
}

/// `metrics.csv` row; means carry exactly four decimals.
#[derive(Debug, Serialize)]
pub struct MetricsCsvRow<'a> {
    pub scope: &'static str,
    pub lang: &'a str,
    pub grade: &'a str,
    pub subject: &'a str,
    pub count: usize,
    #[serde(rename = "hit@1")]
    pub hit_at_1: String,
    #[serde(rename = "coverage@5")]
    pub coverage_at_5: String,
    #[serde(rename = "mrr@5")]
    pub mrr_at_5: String,
}

impl<'a> From<&'a AggregateMetric> for MetricsCsvRow<'a> {
    fn from(row: &'a AggregateMetric) -> Self {
        Self {
            scope: row.scope.as_str(),
            lang: &row.lang,
            grade: &row.grade,
            subject: &row.subject,
            count: row.count,
            hit_at_1: format!("{:.4}", row.hit_at_1),
            coverage_at_5: format!("{:.4}", row.coverage_at_5),
            mrr_at_5: format!("{:.4}", row.mrr_at_5),
        }
    }
}

type GroupKey = (MetricScope, String, String, String);

#[derive(Debug, Default)]
struct Accumulator {
    count: usize,
    hits: usize,
    covered: usize,
    reciprocal_ranks: f64,
}

impl Accumulator {
    fn add(&mut self, record: &EvaluationRecord) {
        self.count += 1;
        self.hits += usize::from(record.hit_at_1);
        self.covered += usize::from(record.coverage_at_5);
        self.reciprocal_ranks += record.reciprocal_rank;
    }

    fn into_metric(self, key: GroupKey) -> AggregateMetric {
        let (scope, lang, grade, subject) = key;
        AggregateMetric {
            scope,
            lang,
            grade,
            subject,
            count: self.count,
            hit_at_1: mean(self.hits as f64, self.count),
            coverage_at_5: mean(self.covered as f64, self.count),
            mrr_at_5: mean(self.reciprocal_ranks, self.count),
        }
    }
}

/// Global row first, then each requested dimension with keys sorted.
pub fn aggregate(records: &[EvaluationRecord], dimensions: &[GroupDimension]) -> Vec<AggregateMetric> {
    let mut dimensions = dimensions.to_vec();
    dimensions.sort();
    dimensions.dedup();

    let mut global = Accumulator::default();
    let mut groups = BTreeMap::<GroupKey, Accumulator>::new();
    for record in records {
        global.add(record);
        for dimension in &dimensions {
            groups.entry(dimension.key(record)).or_default().add(record);
        }
    }

    let mut rows = Vec::with_capacity(groups.len() + 1);
    rows.push(global.into_metric((
        MetricScope::Global,
        String::new(),
        String::new(),
        String::new(),
    )));
    rows.extend(
        groups
            .into_iter()
            .map(|(key, accumulator)| accumulator.into_metric(key)),
    );
    rows
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        round4(total / count as f64)
    }
}
