use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub title: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    pub cycle: String,
    pub language: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingested_at: Option<String>,
}

/// Immutable, ordered set of documents with unique ids. Rebuilt from source
/// data on every run.
#[derive(Debug, Clone, Default)]
pub struct CorpusIndex {
    records: Vec<DocumentRecord>,
    by_id: HashMap<String, usize>,
}

impl CorpusIndex {
    /// Builds an index keeping the first record for any repeated id.
    pub fn from_records(records: Vec<DocumentRecord>) -> Self {
        let mut kept = Vec::with_capacity(records.len());
        let mut by_id = HashMap::with_capacity(records.len());
        for record in records {
            if by_id.contains_key(&record.id) {
                continue;
            }
            by_id.insert(record.id.clone(), kept.len());
            kept.push(record);
        }
        Self {
            records: kept,
            by_id,
        }
    }

    pub fn records(&self) -> &[DocumentRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&DocumentRecord> {
        self.by_id.get(id).map(|index| &self.records[*index])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A benchmark reference such as `Guide.pdf#p.12`.
///
/// Only `#p.N` yields a page; any other fragment is kept verbatim in
/// `anchor` so remapping never loses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedReference {
    pub raw: String,
    pub doc_id: String,
    pub anchor: Option<String>,
    pub page: Option<u32>,
}

impl ExpectedReference {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let Some((name, anchor)) = trimmed.split_once('#') else {
            return Self {
                raw: raw.to_string(),
                doc_id: trimmed.to_string(),
                anchor: None,
                page: None,
            };
        };

        let anchor = anchor.trim();
        let page = anchor.strip_prefix("p.").and_then(|rest| {
            rest.chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>()
                .parse::<u32>()
                .ok()
        });

        Self {
            raw: raw.to_string(),
            doc_id: name.trim().to_string(),
            anchor: Some(anchor.to_string()).filter(|value| !value.is_empty()),
            page,
        }
    }

    /// Reference text pointing at `doc_id` with this reference's fragment.
    pub fn with_doc_id(&self, doc_id: &str) -> String {
        match &self.anchor {
            Some(anchor) => format!("{doc_id}#{anchor}"),
            None => doc_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    pub id: String,
    pub query: String,
    pub language: String,
    pub grade: String,
    pub subject: String,
    pub expected: Vec<ExpectedReference>,
}

impl LabeledExample {
    pub fn expected_doc_ids(&self) -> impl Iterator<Item = &str> {
        self.expected.iter().map(|reference| reference.doc_id.as_str())
    }
}
