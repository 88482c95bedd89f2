use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::QueryArgs;
use crate::config::AppConfig;
use crate::corpus::load_corpus;
use crate::retriever::{Query, RetrievalResult, Retriever, RetrieverStats};

#[derive(Debug, Serialize)]
struct QueryResponse<'a> {
    query: &'a Query,
    max_docs: usize,
    returned: usize,
    duration_ms: f64,
    keywords: &'a [String],
    stats: RetrieverStats,
    results: &'a RetrievalResult,
}

pub fn run(args: QueryArgs) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref())?;
    let loaded = load_corpus(&args.corpus)?;
    let retriever = Retriever::new(Arc::new(loaded.index), &config.retriever);

    let query = Query::new(args.query.as_str())
        .with_grade_hint(args.grade.as_deref())
        .with_subject_hint(args.subject.as_deref());
    let max_docs = args.max_docs.unwrap_or(retriever.default_max_docs());

    let started = Instant::now();
    let result = retriever.retrieve(&query, max_docs);
    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

    info!(
        keywords = result.keywords.len(),
        returned = result.hits.len(),
        duration_ms,
        "query completed"
    );

    if args.json {
        write_json_response(&QueryResponse {
            query: &query,
            max_docs,
            returned: result.hits.len(),
            duration_ms,
            keywords: &result.keywords,
            stats: retriever.stats(),
            results: &result,
        })
    } else {
        write_text_response(&query, &result, &retriever.stats())
    }
}

fn write_json_response(response: &QueryResponse<'_>) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, response)
        .context("failed to serialize query json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn write_text_response(query: &Query, result: &RetrievalResult, stats: &RetrieverStats) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(output, "Query: {}", query.text)?;
    if let Some(grade) = &query.grade_hint {
        writeln!(output, "Grade hint: {grade}")?;
    }
    if let Some(subject) = &query.subject_hint {
        writeln!(output, "Subject hint: {subject}")?;
    }
    writeln!(output, "Keywords: {}", result.keywords.join(", "))?;
    writeln!(
        output,
        "Corpus: documents={} queries={} cache_hits={}",
        stats.documents_loaded, stats.queries, stats.cache_hits
    )?;
    writeln!(output, "Results: {}", result.hits.len())?;

    for hit in &result.hits {
        let document = &hit.document;
        writeln!(
            output,
            "{}.\t{}\tscore={:.3}\t{}\t{}",
            hit.rank,
            document.id,
            hit.score,
            document.subject,
            document.level.as_deref().unwrap_or("-"),
        )?;
        writeln!(output, "\ttitle: {}", document.title)?;
        writeln!(output, "\tpath: {}", document.path)?;
        writeln!(output, "\tmatched: {}", hit.matched_keywords.join(", "))?;
        if let Some(source_url) = &document.source_url {
            writeln!(output, "\tsource_url: {source_url}")?;
        }
    }

    output.flush()?;
    Ok(())
}
