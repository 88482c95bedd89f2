use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let count = file
            .read(&mut buf)
            .with_context(|| format!("failed to read file for hashing: {}", path.display()))?;
        if count == 0 {
            break;
        }
        hasher.update(&buf[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Writes `data` next to `path` under a temporary name, then renames it into
/// place so readers never observe a partially written file.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_directory(parent)?;
    }

    let tmp_path = temp_sibling(path);
    {
        let mut file = File::create(&tmp_path)
            .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;
        file.write_all(data)
            .with_context(|| format!("failed to write temp file: {}", tmp_path.display()))?;
        file.sync_all()
            .with_context(|| format!("failed to flush temp file: {}", tmp_path.display()))?;
    }

    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "failed to move {} into place at {}",
            tmp_path.display(),
            path.display()
        )
    })
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;
    data.push(b'\n');
    write_atomic(path, &data)
}

pub fn write_jsonl<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut data = Vec::<u8>::new();
    for row in rows {
        serde_json::to_writer(&mut data, row)
            .with_context(|| format!("failed to serialize jsonl row: {}", path.display()))?;
        data.push(b'\n');
    }
    write_atomic(path, &data)
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::<u8>::new());
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to serialize csv row: {}", path.display()))?;
    }
    let data = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("failed to finalize csv {}: {}", path.display(), err))?;
    write_atomic(path, &data)
}

/// Copies `path` to `<stem>.backup_<timestamp>.<ext>` beside it and returns
/// the backup location.
pub fn backup_with_timestamp(path: &Path, ts: DateTime<Utc>) -> Result<PathBuf> {
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("backup");
    let backup_name = match path.extension().and_then(|value| value.to_str()) {
        Some(ext) => format!("{stem}.backup_{}.{ext}", utc_compact_string(ts)),
        None => format!("{stem}.backup_{}", utc_compact_string(ts)),
    };
    let backup_path = path.with_file_name(backup_name);

    fs::copy(path, &backup_path).with_context(|| {
        format!(
            "failed to back up {} to {}",
            path.display(),
            backup_path.display()
        )
    })?;

    Ok(backup_path)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("output");
    path.with_file_name(format!(".{name}.tmp-{}", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn write_atomic_replaces_existing_file_and_leaves_no_temp() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("summary.json");

        write_atomic(&path, b"first").expect("first write");
        write_atomic(&path, b"second").expect("second write");

        assert_eq!(fs::read_to_string(&path).expect("read back"), "second");
        let leftovers = fs::read_dir(path.parent().expect("parent"))
            .expect("list dir")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp-"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn backup_name_carries_compact_timestamp() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gold.jsonl");
        fs::write(&path, "{}\n").expect("seed file");

        let ts = Utc.with_ymd_and_hms(2025, 9, 7, 19, 56, 8).unwrap();
        let backup = backup_with_timestamp(&path, ts).expect("backup");

        assert_eq!(
            backup.file_name().and_then(|name| name.to_str()),
            Some("gold.backup_20250907T195608Z.jsonl")
        );
        assert_eq!(fs::read_to_string(backup).expect("read backup"), "{}\n");
    }

    #[test]
    fn sha256_file_matches_known_digest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc.pdf");
        fs::write(&path, b"abc").expect("write");

        assert_eq!(
            sha256_file(&path).expect("hash"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
