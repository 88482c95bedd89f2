//! Labeled benchmark (JSONL) reading and writing.
//!
//! Each line keeps its original JSON object so a rewrite only touches
//! `expected_doc_ids` and leaves every other field, and the key order, as the
//! annotators wrote it.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::RagError;
use crate::model::{ExpectedReference, LabeledExample};

pub const EXPECTED_FIELD: &str = "expected_doc_ids";

#[derive(Debug, Clone)]
pub struct BenchmarkEntry {
    pub line_no: usize,
    pub fields: Map<String, Value>,
    pub example: LabeledExample,
}

impl BenchmarkEntry {
    /// Replaces the expected references of this entry, in both the parsed
    /// example and the raw JSON object.
    pub fn set_expected(&mut self, references: Vec<ExpectedReference>) {
        self.fields.insert(
            EXPECTED_FIELD.to_string(),
            Value::Array(
                references
                    .iter()
                    .map(|reference| Value::String(reference.raw.clone()))
                    .collect(),
            ),
        );
        self.example.expected = references;
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadedBenchmark {
    pub entries: Vec<BenchmarkEntry>,
    pub notices: Vec<String>,
}

impl LoadedBenchmark {
    pub fn examples(&self) -> Vec<LabeledExample> {
        self.entries
            .iter()
            .map(|entry| entry.example.clone())
            .collect()
    }
}

#[derive(Debug, Default)]
struct MissingFields {
    id: usize,
    language: usize,
    grade: usize,
    subject: usize,
    expected: usize,
}

pub fn load_benchmark(path: &Path) -> Result<LoadedBenchmark> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read benchmark {}", path.display()))?;
    let source_name = path.display().to_string();
    let loaded = parse_benchmark(&raw, &source_name)?;

    for notice in &loaded.notices {
        warn!(source = %source_name, "{notice}");
    }
    info!(
        source = %source_name,
        examples = loaded.entries.len(),
        "loaded benchmark"
    );
    Ok(loaded)
}

pub fn parse_benchmark(raw: &str, source_name: &str) -> Result<LoadedBenchmark> {
    let mut entries = Vec::<BenchmarkEntry>::new();
    let mut missing = MissingFields::default();

    for (offset, line) in raw.lines().enumerate() {
        let line_no = offset + 1;
        let line = line.trim().trim_start_matches('\u{feff}');
        if line.is_empty() {
            continue;
        }

        let label = format!("line {line_no}");
        let value: Value = serde_json::from_str(line)
            .map_err(|err| RagError::malformed(source_name, &label, err.to_string()))?;
        let Value::Object(fields) = value else {
            return Err(RagError::malformed(source_name, label, "line is not a JSON object").into());
        };

        let example = parse_example(&fields, line_no, &mut missing)
            .map_err(|message| RagError::malformed(source_name, &label, message))?;
        entries.push(BenchmarkEntry {
            line_no,
            fields,
            example,
        });
    }

    let mut notices = Vec::new();
    let mut note = |count: usize, message: &str| {
        if count > 0 {
            notices.push(format!("{count} example(s) {message}"));
        }
    };
    note(missing.id, "had no id; used line_<n>");
    note(missing.language, "had no lang; grouped under an empty language");
    note(missing.grade, "had no grade; grouped under an empty grade");
    note(missing.subject, "had no subject; grouped under an empty subject");
    note(missing.expected, "had no expected_doc_ids; they can only miss");

    Ok(LoadedBenchmark { entries, notices })
}

pub fn render_benchmark(entries: &[BenchmarkEntry]) -> Result<String> {
    let mut out = String::new();
    for entry in entries {
        let line = serde_json::to_string(&entry.fields)
            .with_context(|| format!("failed to serialize benchmark line {}", entry.line_no))?;
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

fn parse_example(
    fields: &Map<String, Value>,
    line_no: usize,
    missing: &mut MissingFields,
) -> std::result::Result<LabeledExample, String> {
    let query = match fields.get("query") {
        Some(Value::String(query)) if !query.trim().is_empty() => query.clone(),
        Some(Value::String(_)) | None => return Err("missing required field `query`".to_string()),
        Some(_) => return Err("field `query` is not a string".to_string()),
    };

    let id = match text_field(fields, &["id"])? {
        Some(id) => id,
        None => {
            missing.id += 1;
            format!("line_{line_no}")
        }
    };
    let language = text_field(fields, &["lang", "language"])?.unwrap_or_else(|| {
        missing.language += 1;
        String::new()
    });
    let grade = text_field(fields, &["grade"])?.unwrap_or_else(|| {
        missing.grade += 1;
        String::new()
    });
    let subject = text_field(fields, &["subject"])?.unwrap_or_else(|| {
        missing.subject += 1;
        String::new()
    });

    let expected = match fields.get(EXPECTED_FIELD) {
        None | Some(Value::Null) => {
            missing.expected += 1;
            Vec::new()
        }
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(reference) => Ok(ExpectedReference::parse(reference)),
                _ => Err(format!("`{EXPECTED_FIELD}` must only contain strings")),
            })
            .collect::<std::result::Result<Vec<ExpectedReference>, String>>()?,
        Some(_) => return Err(format!("`{EXPECTED_FIELD}` is not a list")),
    };

    Ok(LabeledExample {
        id,
        query,
        language,
        grade,
        subject,
        expected,
    })
}

/// First present alias as text; numbers are accepted for ids and grades.
fn text_field(
    fields: &Map<String, Value>,
    aliases: &[&str],
) -> std::result::Result<Option<String>, String> {
    for alias in aliases {
        match fields.get(*alias) {
            None | Some(Value::Null) => continue,
            Some(Value::String(text)) if text.trim().is_empty() => continue,
            Some(Value::String(text)) => return Ok(Some(text.trim().to_string())),
            Some(Value::Number(number)) => return Ok(Some(number.to_string())),
            Some(_) => return Err(format!("field `{alias}` is not a string")),
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_examples_with_aliases_and_anchors() {
        let raw = r#"
{"id":"q1","query":"Comment calculer l'aire ?","lang":"fr","grade":"5e_primaire","subject":"mathématiques","expected_doc_ids":["Guide.pdf#p.12","Autre.pdf"]}

{"id":"q2","query":"Photosynthèse","language":"français","grade":"3e_secondaire","subject":"sciences","expected_doc_ids":[]}
"#;
        let loaded = parse_benchmark(raw, "gold.jsonl").expect("benchmark parses");
        assert_eq!(loaded.entries.len(), 2);

        let first = &loaded.entries[0];
        assert_eq!(first.line_no, 2);
        assert_eq!(first.example.language, "fr");
        assert_eq!(
            first.example.expected_doc_ids().collect::<Vec<&str>>(),
            vec!["Guide.pdf", "Autre.pdf"]
        );
        assert_eq!(first.example.expected[0].page, Some(12));

        assert_eq!(loaded.entries[1].example.language, "français");
        assert!(loaded.notices.is_empty(), "{:?}", loaded.notices);
    }

    #[test]
    fn missing_optional_fields_default_with_notices() {
        let raw = r#"{"query":"fractions","expected_doc_ids":["A.pdf"]}"#;
        let loaded = parse_benchmark(raw, "gold.jsonl").expect("benchmark parses");

        let example = &loaded.entries[0].example;
        assert_eq!(example.id, "line_1");
        assert_eq!(example.language, "");
        assert_eq!(loaded.notices.len(), 4);
        assert!(loaded.notices[0].contains("had no id"));
    }

    #[test]
    fn missing_query_is_malformed_and_names_line() {
        let raw = "{\"id\":\"ok\",\"query\":\"x\"}\n{\"id\":\"bad\"}\n";
        let error = parse_benchmark(raw, "gold.jsonl").expect_err("line 2 lacks query");
        let message = error.to_string();
        assert!(message.contains("line 2"), "{message}");
        assert!(message.contains("query"), "{message}");
    }

    #[test]
    fn invalid_json_is_malformed() {
        let error = parse_benchmark("{not json}\n", "gold.jsonl").expect_err("invalid json");
        assert!(error.to_string().contains("line 1"));
    }

    #[test]
    fn render_preserves_unknown_fields_and_key_order() {
        let raw = r#"{"id":"q1","notes":"keep me","query":"x","expected_doc_ids":["Old.pdf#p.3"],"lang":"fr"}"#;
        let mut loaded = parse_benchmark(raw, "gold.jsonl").expect("benchmark parses");

        assert_eq!(render_benchmark(&loaded.entries).expect("render"), format!("{raw}\n"));

        loaded.entries[0].set_expected(vec![ExpectedReference::parse("New.pdf#p.3")]);
        assert_eq!(
            render_benchmark(&loaded.entries).expect("render"),
            "{\"id\":\"q1\",\"notes\":\"keep me\",\"query\":\"x\",\"expected_doc_ids\":[\"New.pdf#p.3\"],\"lang\":\"fr\"}\n"
        );
    }
}
