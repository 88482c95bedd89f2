use std::path::Path;

use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::cli::ManifestArgs;
use crate::corpus::{LoadedCorpus, RECOMMENDED_CATALOG_COLUMNS, SourceFormat, load_corpus};
use crate::model::DocumentRecord;
use crate::util::{sha256_file, write_json_pretty};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ChecksumReport {
    pub computed: usize,
    pub already_present: usize,
    pub missing_files: Vec<String>,
}

pub fn run(args: ManifestArgs) -> Result<()> {
    if SourceFormat::from_path(&args.catalog)? != SourceFormat::Catalog {
        bail!("manifest expects a .csv catalog, got {}", args.catalog.display());
    }

    let loaded = load_corpus(&args.catalog)?;
    for column in missing_recommended_columns(&loaded) {
        warn!(column, "catalog is missing recommended column");
    }

    let mut records = loaded.index.records().to_vec();
    if let Some(corpus_root) = &args.corpus_root {
        let report = fill_checksums(&mut records, corpus_root)?;
        for missing in &report.missing_files {
            warn!(path = %missing, "document file not found under corpus root");
        }
        info!(
            computed = report.computed,
            already_present = report.already_present,
            missing = report.missing_files.len(),
            "checksums resolved"
        );
    }

    if args.dry_run {
        info!(
            documents = records.len(),
            catalog = %args.catalog.display(),
            "manifest dry-run complete"
        );
        return Ok(());
    }

    write_json_pretty(&args.output, &records)?;
    info!(path = %args.output.display(), documents = records.len(), "wrote manifest");
    Ok(())
}

pub fn missing_recommended_columns(loaded: &LoadedCorpus) -> Vec<&'static str> {
    RECOMMENDED_CATALOG_COLUMNS
        .iter()
        .copied()
        .filter(|column| {
            !loaded
                .columns
                .iter()
                .any(|present| present.trim().eq_ignore_ascii_case(column))
        })
        .collect()
}

/// Hashes every document that has no checksum yet and whose file exists under
/// `corpus_root`.
pub fn fill_checksums(records: &mut [DocumentRecord], corpus_root: &Path) -> Result<ChecksumReport> {
    let mut report = ChecksumReport::default();

    for record in records.iter_mut() {
        if record.checksum.is_some() {
            report.already_present += 1;
            continue;
        }

        let file_path = corpus_root.join(&record.path);
        if !file_path.is_file() {
            report.missing_files.push(record.path.clone());
            continue;
        }

        record.checksum = Some(sha256_file(&file_path)?);
        report.computed += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::corpus::parse_catalog;

    #[test]
    fn missing_columns_are_reported_case_insensitively() {
        let csv = "ID,Titre,File_Path,matiere,langue,grade_level,checksum\nA.pdf,A,A.pdf,math,fr,5e primaire,\n";
        let loaded = parse_catalog(csv.as_bytes(), "catalog.csv").expect("catalog parses");

        assert_eq!(
            missing_recommended_columns(&loaded),
            vec![
                "source_url",
                "type_doc",
                "licence",
                "ingested",
                "validated",
                "notes"
            ]
        );
    }

    #[test]
    fn checksums_are_filled_only_where_missing_and_file_exists() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("primaire")).expect("mkdir");
        fs::write(dir.path().join("primaire/A.pdf"), b"abc").expect("write doc");

        let csv = "\
file_path,checksum
primaire/A.pdf,
primaire/B.pdf,
primaire/C.pdf,known
";
        let loaded = parse_catalog(csv.as_bytes(), "catalog.csv").expect("catalog parses");
        let mut records = loaded.index.records().to_vec();

        let report = fill_checksums(&mut records, dir.path()).expect("checksums");
        assert_eq!(
            report,
            ChecksumReport {
                computed: 1,
                already_present: 1,
                missing_files: vec!["primaire/B.pdf".to_string()],
            }
        );
        assert_eq!(
            records[0].checksum.as_deref(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
        assert_eq!(records[1].checksum, None);
        assert_eq!(records[2].checksum.as_deref(), Some("known"));
    }
}
