//! Builds a [`CorpusIndex`] from a CSV catalog or a JSON manifest.
//!
//! Both formats are read through the same alias table so a renamed column
//! (`file_path` vs `path`, `matiere` vs `subject`) never changes document
//! identity: the id is always the base name of the resolved file.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::RagError;
use crate::model::{CorpusIndex, DocumentRecord};

mod fields;

pub use fields::RECOMMENDED_CATALOG_COLUMNS;
use fields::{DefaultedFields, RawRecord, build_record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Catalog,
    Manifest,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("csv") => Ok(Self::Catalog),
            Some("json") => Ok(Self::Manifest),
            _ => bail!(
                "unsupported corpus source (expected .csv catalog or .json manifest): {}",
                path.display()
            ),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Manifest => "manifest",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedCorpus {
    pub index: CorpusIndex,
    pub source_rows: usize,
    /// Catalog header as read, empty for manifests.
    pub columns: Vec<String>,
    pub notices: Vec<String>,
}

pub fn load_corpus(path: &Path) -> Result<LoadedCorpus> {
    let format = SourceFormat::from_path(path)?;
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let source_name = path.display().to_string();

    let loaded = match format {
        SourceFormat::Catalog => parse_catalog(&raw, &source_name)?,
        SourceFormat::Manifest => parse_manifest(&raw, &source_name)?,
    };

    for notice in &loaded.notices {
        warn!(source = %source_name, "{notice}");
    }
    info!(
        source = %source_name,
        format = format.as_str(),
        rows = loaded.source_rows,
        documents = loaded.index.len(),
        "loaded corpus index"
    );

    Ok(loaded)
}

pub fn parse_catalog(raw: &[u8], source_name: &str) -> Result<LoadedCorpus> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw);

    let headers = reader
        .headers()
        .map_err(|err| RagError::malformed(source_name, "header", err.to_string()))?
        .iter()
        .map(|header| header.trim_start_matches('\u{feff}').to_string())
        .collect::<Vec<String>>();

    let mut rows = Vec::<(String, RawRecord)>::new();
    for (offset, row) in reader.records().enumerate() {
        // header is line 1
        let label = format!("row {}", offset + 2);
        let row = row.map_err(|err| RagError::malformed(source_name, &label, err.to_string()))?;
        let record = RawRecord::from_pairs(
            headers
                .iter()
                .map(String::as_str)
                .zip(row.iter()),
        );
        rows.push((label, record));
    }

    let mut loaded = assemble(rows);
    loaded.columns = headers;
    Ok(loaded)
}

pub fn parse_manifest(raw: &[u8], source_name: &str) -> Result<LoadedCorpus> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|err| RagError::malformed(source_name, "document", err.to_string()))?;

    let wrapped = match &value {
        Value::Array(entries) => Some(entries),
        Value::Object(object) => ["docs", "documents"]
            .iter()
            .find_map(|key| match object.get(*key) {
                Some(Value::Array(entries)) => Some(entries),
                _ => None,
            }),
        _ => None,
    };
    let Some(entries) = wrapped else {
        return Err(RagError::malformed(
            source_name,
            "document",
            "expected a list of records or an object with a `docs` or `documents` list",
        )
        .into());
    };

    let mut rows = Vec::<(String, RawRecord)>::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let label = format!("entry {index}");
        let Value::Object(object) = entry else {
            return Err(RagError::malformed(source_name, label, "record is not an object").into());
        };
        rows.push((label, RawRecord::from_json_object(object)));
    }

    Ok(assemble(rows))
}

fn assemble(rows: Vec<(String, RawRecord)>) -> LoadedCorpus {
    let source_rows = rows.len();
    let mut defaulted = DefaultedFields::default();
    let mut notices = Vec::<String>::new();
    let mut seen = HashSet::<String>::new();
    let mut records = Vec::<DocumentRecord>::with_capacity(source_rows);

    for (label, raw) in rows {
        let Some(record) = build_record(&raw, &mut defaulted) else {
            notices.push(format!("{label}: skipped, no file path or id to identify it"));
            continue;
        };
        if !seen.insert(record.id.clone()) {
            notices.push(format!("{label}: skipped, duplicate id {}", record.id));
            continue;
        }
        records.push(record);
    }

    notices.extend(defaulted.notices());

    LoadedCorpus {
        index: CorpusIndex::from_records(records),
        source_rows,
        columns: Vec::new(),
        notices,
    }
}
