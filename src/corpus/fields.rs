use std::collections::HashMap;

use serde_json::Value;

use crate::model::DocumentRecord;
use crate::normalize::{
    DEFAULT_LANGUAGE, SUBJECT_AUTRES, base_name, canonical_grade, canonical_language,
    canonical_subject, detect_cycle, detect_level_token, file_stem, infer_subject,
    normalize_whitespace,
};

pub const PATH_ALIASES: &[&str] = &["file_path", "path", "file", "chemin"];
pub const ID_ALIASES: &[&str] = &["id", "doc_id"];
pub const TITLE_ALIASES: &[&str] = &["titre", "title"];
pub const SUBJECT_ALIASES: &[&str] = &["matiere", "matière", "subject"];
pub const GRADE_ALIASES: &[&str] = &["grade_level", "grade", "niveau", "level"];
pub const LANGUAGE_ALIASES: &[&str] = &["langue", "language", "lang"];
pub const CHECKSUM_ALIASES: &[&str] = &["checksum", "checksum_sha256", "sha256"];
pub const SOURCE_URL_ALIASES: &[&str] = &["source_url", "url"];
pub const INGESTED_ALIASES: &[&str] = &["ingested", "ingested_at", "downloaded_at"];
pub const CYCLE_ALIASES: &[&str] = &["cycle"];

/// Catalog columns the curation tooling writes; absent ones are reported but
/// never required.
pub const RECOMMENDED_CATALOG_COLUMNS: &[&str] = &[
    "id",
    "titre",
    "source_url",
    "langue",
    "grade_level",
    "matiere",
    "type_doc",
    "file_path",
    "checksum",
    "licence",
    "ingested",
    "validated",
    "notes",
];

/// One source row with lowercased keys and only non-empty values.
#[derive(Debug, Default)]
pub struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut fields = HashMap::new();
        for (key, value) in pairs {
            let key = key.trim().trim_start_matches('\u{feff}').to_lowercase();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                continue;
            }
            fields.entry(key).or_insert_with(|| value.to_string());
        }
        Self { fields }
    }

    pub fn from_json_object(object: &serde_json::Map<String, Value>) -> Self {
        let rendered = object
            .iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    Value::String(text) => text.clone(),
                    Value::Number(number) => number.to_string(),
                    Value::Bool(flag) => flag.to_string(),
                    Value::Null | Value::Array(_) | Value::Object(_) => return None,
                };
                Some((key.as_str(), text))
            })
            .collect::<Vec<(&str, String)>>();

        Self::from_pairs(rendered.iter().map(|(key, value)| (*key, value.as_str())))
    }

    /// Value of the first alias present.
    pub fn first(&self, aliases: &[&str]) -> Option<&str> {
        aliases
            .iter()
            .find_map(|alias| self.fields.get(*alias))
            .map(String::as_str)
    }
}

/// Counts of fields filled in by defaults while building records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DefaultedFields {
    pub title: usize,
    pub language: usize,
    pub subject_inferred: usize,
    pub subject_unknown: usize,
    pub grade_unrecognized: usize,
}

impl DefaultedFields {
    pub fn notices(&self) -> Vec<String> {
        let mut notices = Vec::new();
        if self.title > 0 {
            notices.push(format!("{} record(s) had no title; used file stem", self.title));
        }
        if self.language > 0 {
            notices.push(format!(
                "{} record(s) had no language; defaulted to {DEFAULT_LANGUAGE}",
                self.language
            ));
        }
        if self.subject_inferred > 0 {
            notices.push(format!(
                "{} record(s) had no subject; inferred from path",
                self.subject_inferred
            ));
        }
        if self.subject_unknown > 0 {
            notices.push(format!(
                "{} record(s) had no recognizable subject; set to {SUBJECT_AUTRES}",
                self.subject_unknown
            ));
        }
        if self.grade_unrecognized > 0 {
            notices.push(format!(
                "{} record(s) carried a grade outside the canonical vocabulary",
                self.grade_unrecognized
            ));
        }
        notices
    }
}

/// Normalizes one source row. Returns `None` when the row has neither a path
/// nor an id to derive the document identity from.
pub fn build_record(raw: &RawRecord, defaulted: &mut DefaultedFields) -> Option<DocumentRecord> {
    let path = raw.first(PATH_ALIASES).map(|value| value.replace('\\', "/"));
    let id = match (&path, raw.first(ID_ALIASES)) {
        (Some(path), _) => base_name(path).to_string(),
        (None, Some(id)) => base_name(id).to_string(),
        (None, None) => return None,
    };
    if id.is_empty() {
        return None;
    }
    let path = path.unwrap_or_else(|| id.clone());

    let title = match raw.first(TITLE_ALIASES) {
        Some(title) => normalize_whitespace(title),
        None => {
            defaulted.title += 1;
            file_stem(&id).to_string()
        }
    };

    let subject = match raw.first(SUBJECT_ALIASES).map(canonical_subject) {
        Some(subject) if !subject.is_empty() => subject,
        _ => match infer_subject(&path, &id) {
            Some(subject) => {
                defaulted.subject_inferred += 1;
                subject.to_string()
            }
            None => {
                defaulted.subject_unknown += 1;
                SUBJECT_AUTRES.to_string()
            }
        },
    };

    let grade_column = raw.first(GRADE_ALIASES);
    let grade = grade_column
        .and_then(canonical_grade)
        .or_else(|| detect_level_token(&path).and_then(|token| canonical_grade(&token)));
    if grade.is_none() && grade_column.is_some() {
        defaulted.grade_unrecognized += 1;
    }

    let cycle = grade
        .map(|grade| grade.cycle)
        .or_else(|| raw.first(CYCLE_ALIASES).and_then(detect_cycle))
        .or_else(|| detect_cycle(&path))
        .map(|cycle| cycle.as_str())
        .unwrap_or("autre")
        .to_string();

    let language = match raw.first(LANGUAGE_ALIASES) {
        Some(language) => canonical_language(language),
        None => {
            defaulted.language += 1;
            DEFAULT_LANGUAGE.to_string()
        }
    };

    Some(DocumentRecord {
        id,
        title,
        subject,
        level: grade.map(|grade| grade.to_string()),
        cycle,
        language,
        path,
        checksum: raw.first(CHECKSUM_ALIASES).map(ToOwned::to_owned),
        source_url: raw.first(SOURCE_URL_ALIASES).map(ToOwned::to_owned),
        ingested_at: raw.first(INGESTED_ALIASES).map(ToOwned::to_owned),
    })
}
