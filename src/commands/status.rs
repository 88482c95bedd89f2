use std::fs;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::benchmark::load_benchmark;
use crate::cli::StatusArgs;
use crate::corpus::load_corpus;
use crate::evaluation::AggregateMetric;

/// The parts of `summary.json` that status reports on.
#[derive(Debug, Deserialize)]
struct SummarySnapshot {
    generated_at: String,
    example_count: usize,
    evaluated_count: usize,
    truncated: bool,
    global: AggregateMetric,
}

pub fn run(args: StatusArgs) -> Result<()> {
    let summary_path = args.output_dir.join("summary.json");

    info!(
        corpus = %args.corpus.display(),
        benchmark = %args.benchmark.display(),
        output_dir = %args.output_dir.display(),
        "status requested"
    );

    if args.corpus.exists() {
        let loaded = load_corpus(&args.corpus)?;
        info!(
            path = %args.corpus.display(),
            rows = loaded.source_rows,
            documents = loaded.index.len(),
            notices = loaded.notices.len(),
            "corpus status"
        );
    } else {
        warn!(path = %args.corpus.display(), "corpus source missing");
    }

    if args.benchmark.exists() {
        let benchmark = load_benchmark(&args.benchmark)?;
        let references = benchmark
            .entries
            .iter()
            .map(|entry| entry.example.expected.len())
            .sum::<usize>();
        info!(
            path = %args.benchmark.display(),
            examples = benchmark.entries.len(),
            references,
            "benchmark status"
        );
    } else {
        warn!(path = %args.benchmark.display(), "benchmark missing");
    }

    if summary_path.exists() {
        let raw = fs::read(&summary_path)
            .with_context(|| format!("failed to read {}", summary_path.display()))?;
        let summary: SummarySnapshot = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", summary_path.display()))?;

        info!(
            generated_at = %summary.generated_at,
            examples = summary.example_count,
            evaluated = summary.evaluated_count,
            truncated = summary.truncated,
            hit_at_1 = summary.global.hit_at_1,
            coverage_at_5 = summary.global.coverage_at_5,
            mrr_at_5 = summary.global.mrr_at_5,
            "last evaluation"
        );
    } else {
        warn!(path = %summary_path.display(), "no evaluation summary yet");
    }

    Ok(())
}
