use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::benchmark::{BenchmarkEntry, load_benchmark, render_benchmark};
use crate::cli::ReconcileArgs;
use crate::config::AppConfig;
use crate::corpus::load_corpus;
use crate::model::LabeledExample;
use crate::reconcile::{DecisionStatus, Reconciler};
use crate::util::{backup_with_timestamp, write_atomic, write_csv};

pub fn run(args: ReconcileArgs) -> Result<()> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(threshold) = args.acceptance_threshold {
        config.reconcile.acceptance_threshold = threshold;
    }

    let loaded = load_corpus(&args.corpus)?;
    let benchmark = load_benchmark(&args.benchmark)?;
    let examples = benchmark.examples();

    let outcome = Reconciler::new(&loaded.index, config.reconcile).reconcile(&examples);
    let counts = outcome.counts();

    let mut entries = benchmark.entries;
    let changed = apply_repairs(&mut entries, outcome.examples);

    for decision in &outcome.decisions {
        if decision.status == DecisionStatus::Unresolved {
            warn!(
                example_id = %decision.example_id,
                reference = %decision.original_reference,
                status = decision.status.as_str(),
                best_score = ?decision.score,
                "reference left unresolved"
            );
        }
    }

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| sibling_with_suffix(&args.benchmark, "reconciled.jsonl"));
    let decisions_path = args
        .decisions
        .clone()
        .unwrap_or_else(|| sibling_with_suffix(&args.benchmark, "reconcile_decisions.csv"));
    if output_path == args.benchmark {
        bail!(
            "refusing to overwrite the live benchmark without --apply: {}",
            output_path.display()
        );
    }

    let rendered = render_benchmark(&entries)?;
    write_atomic(&output_path, rendered.as_bytes())?;
    write_csv(&decisions_path, &outcome.decisions)?;

    info!(
        references = counts.references,
        kept = counts.kept,
        mapped = counts.mapped,
        unresolved = counts.unresolved,
        examples_changed = changed,
        output = %output_path.display(),
        decisions = %decisions_path.display(),
        "reconciliation completed"
    );

    if args.apply {
        let backup = backup_with_timestamp(&args.benchmark, Utc::now())?;
        write_atomic(&args.benchmark, rendered.as_bytes())
            .with_context(|| format!("failed to replace {}", args.benchmark.display()))?;
        info!(
            benchmark = %args.benchmark.display(),
            backup = %backup.display(),
            "applied reconciled benchmark"
        );
    }

    Ok(())
}

/// Rewrites `expected_doc_ids` only on entries whose references changed.
pub fn apply_repairs(
    entries: &mut [BenchmarkEntry],
    repaired: Vec<LabeledExample>,
) -> usize {
    let mut changed = 0;
    for (entry, example) in entries.iter_mut().zip(repaired) {
        if entry.example.expected != example.expected {
            entry.set_expected(example.expected);
            changed += 1;
        }
    }
    changed
}

/// `data/gold.jsonl` + `reconciled.jsonl` -> `data/gold.reconciled.jsonl`.
fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("benchmark");
    path.with_file_name(format!("{stem}.{suffix}"))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::benchmark::parse_benchmark;
    use crate::model::CorpusIndex;
    use crate::reconcile::{ReconcileConfig, reconcile};

    #[test]
    fn only_changed_entries_are_rewritten_and_key_order_survives() {
        let corpus = br#"[
            {"id": "Lingala-Guide-2e.pdf", "path": "primaire/2eme_PR/Lingala-Guide-2e.pdf", "subject": "lingala"}
        ]"#;
        let loaded = crate::corpus::parse_manifest(corpus, "manifest.json").expect("manifest");
        let index: &CorpusIndex = &loaded.index;

        let raw = concat!(
            r#"{"id":"q1","query":"x","expected_doc_ids":["old/Lingala-Guide-2e.pdf#p.3"],"reviewer":"ak"}"#,
            "\n",
            r#"{"query":"y","id":"q2","expected_doc_ids":["Lingala-Guide-2e.pdf"]}"#,
            "\n",
        );
        let mut benchmark = parse_benchmark(raw, "gold.jsonl").expect("benchmark");
        let outcome = reconcile(&benchmark.examples(), index, &ReconcileConfig::default());

        let changed = apply_repairs(&mut benchmark.entries, outcome.examples);
        assert_eq!(changed, 1);
        assert_eq!(
            render_benchmark(&benchmark.entries).expect("render"),
            concat!(
                r#"{"id":"q1","query":"x","expected_doc_ids":["Lingala-Guide-2e.pdf#p.3"],"reviewer":"ak"}"#,
                "\n",
                r#"{"query":"y","id":"q2","expected_doc_ids":["Lingala-Guide-2e.pdf"]}"#,
                "\n",
            )
        );
    }

    #[test]
    fn default_outputs_sit_beside_the_benchmark() {
        assert_eq!(
            sibling_with_suffix(Path::new("data/eval/gold.jsonl"), "reconciled.jsonl"),
            PathBuf::from("data/eval/gold.reconciled.jsonl")
        );
    }

    #[test]
    fn apply_backs_up_then_replaces_benchmark() {
        let dir = tempfile::tempdir().expect("tempdir");
        let corpus = dir.path().join("manifest.json");
        let benchmark = dir.path().join("gold.jsonl");
        fs::write(&corpus, r#"[{"id": "A.pdf", "path": "primaire/A.pdf"}]"#).expect("corpus");
        fs::write(
            &benchmark,
            "{\"id\":\"q1\",\"query\":\"x\",\"expected_doc_ids\":[\"old/A.pdf\"]}\n",
        )
        .expect("benchmark");

        run(ReconcileArgs {
            corpus: corpus.clone(),
            benchmark: benchmark.clone(),
            config: None,
            output: None,
            decisions: None,
            apply: true,
            acceptance_threshold: None,
        })
        .expect("reconcile runs");

        let replaced = fs::read_to_string(&benchmark).expect("benchmark");
        assert_eq!(replaced, "{\"id\":\"q1\",\"query\":\"x\",\"expected_doc_ids\":[\"A.pdf\"]}\n");

        let backups = fs::read_dir(dir.path())
            .expect("list dir")
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("gold.backup_"))
            .collect::<Vec<String>>();
        assert_eq!(backups.len(), 1);

        let decisions =
            fs::read_to_string(dir.path().join("gold.reconcile_decisions.csv")).expect("decisions");
        assert!(decisions.starts_with(
            "example_id,status,original_reference,resolved_reference,canonical_subject,level_tokens_used,score\n"
        ));
        assert!(decisions.contains("q1,mapped,old/A.pdf,A.pdf,"));
        assert!(dir.path().join("gold.reconciled.jsonl").exists());
    }
}
