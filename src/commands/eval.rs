use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::benchmark::load_benchmark;
use crate::cli::EvalArgs;
use crate::config::{AppConfig, resolve_thresholds};
use crate::corpus::load_corpus;
use crate::evaluation::{
    DIAGNOSTIC_GROUP_LIMIT, EvaluationOptions, EvaluationSummary, GroupDimension,
    build_threshold_checks, diagnose, evaluate, summarize_checks, threshold_violation,
    write_report,
};
use crate::retriever::Retriever;
use crate::util::now_utc_string;

pub fn run(args: EvalArgs) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref())?;
    let thresholds = resolve_thresholds(
        args.min_coverage_at_5,
        args.min_hit_at_1,
        &config.thresholds,
    )?;

    let loaded = load_corpus(&args.corpus)?;
    if loaded.index.is_empty() {
        warn!(corpus = %args.corpus.display(), "corpus has no documents; every example will miss");
    }
    let mut notices = loaded.notices.clone();
    let retriever = Retriever::new(Arc::new(loaded.index), &config.retriever);

    let benchmark = load_benchmark(&args.benchmark)?;
    notices.extend(benchmark.notices.iter().cloned());
    let examples = benchmark.examples();

    let dimensions = if args.group_by.is_empty() {
        GroupDimension::ALL.to_vec()
    } else {
        args.group_by.iter().map(|group| group.dimension()).collect()
    };
    let options = EvaluationOptions {
        top_k: args.top_k,
        use_hints: !args.no_hints,
        dimensions,
        time_budget: args.time_budget_ms.map(Duration::from_millis),
    };

    info!(
        examples = examples.len(),
        top_k = options.top_k,
        use_hints = options.use_hints,
        "evaluation started"
    );
    let run = evaluate(&examples, &retriever, &options);
    notices.extend(run.notices.iter().cloned());

    let global = run.global().clone();
    let checks = build_threshold_checks(&global, &thresholds);
    let diagnostics = diagnose(&run.rows, &thresholds, DIAGNOSTIC_GROUP_LIMIT);

    for row in &diagnostics.groups_below_threshold {
        warn!(
            group = %row.label(),
            count = row.count,
            hit_at_1 = row.hit_at_1,
            coverage_at_5 = row.coverage_at_5,
            "group below threshold"
        );
    }

    let summary = EvaluationSummary {
        generated_at: now_utc_string(),
        benchmark_path: args.benchmark.display().to_string(),
        corpus_path: args.corpus.display().to_string(),
        example_count: examples.len(),
        evaluated_count: run.records.len(),
        truncated: run.truncated(),
        top_k: options.top_k,
        use_hints: options.use_hints,
        global: global.clone(),
        by: run.rows.clone(),
        thresholds,
        check_summary: summarize_checks(&checks),
        checks,
        diagnostics,
        notices,
        retriever: retriever.stats(),
    };
    write_report(&args.output_dir, &summary, &run.records)?;

    info!(
        count = global.count,
        hit_at_1 = global.hit_at_1,
        coverage_at_5 = global.coverage_at_5,
        mrr_at_5 = global.mrr_at_5,
        truncated = run.truncated(),
        "evaluation completed"
    );

    if let Some(violation) = threshold_violation(&global, &thresholds) {
        return Err(violation.into());
    }
    Ok(())
}
