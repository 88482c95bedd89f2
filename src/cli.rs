use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::evaluation::GroupDimension;

#[derive(Parser, Debug)]
#[command(
    name = "curriculum-rag",
    version,
    about = "Curriculum document retrieval, benchmark evaluation, and reference reconciliation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a CSV catalog into a JSON manifest.
    Manifest(ManifestArgs),
    /// Run one retrieval and print the ranked documents.
    Query(QueryArgs),
    /// Score the retriever against a labeled benchmark.
    Eval(EvalArgs),
    /// Repair stale document references in a benchmark.
    Reconcile(ReconcileArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ManifestArgs {
    #[arg(long, default_value = "data/catalog.csv")]
    pub catalog: PathBuf,

    /// Directory the catalog paths are relative to; enables checksum filling.
    #[arg(long)]
    pub corpus_root: Option<PathBuf>,

    #[arg(long, default_value = "data/index/manifest.json")]
    pub output: PathBuf,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[arg(long, default_value = "data/index/manifest.json")]
    pub corpus: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub query: String,

    #[arg(long)]
    pub grade: Option<String>,

    #[arg(long)]
    pub subject: Option<String>,

    #[arg(long)]
    pub max_docs: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum GroupBy {
    Lang,
    LangGrade,
    LangSubject,
}

impl GroupBy {
    pub fn dimension(self) -> GroupDimension {
        match self {
            Self::Lang => GroupDimension::Language,
            Self::LangGrade => GroupDimension::LanguageGrade,
            Self::LangSubject => GroupDimension::LanguageSubject,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct EvalArgs {
    #[arg(long, default_value = "data/index/manifest.json")]
    pub corpus: PathBuf,

    #[arg(long, default_value = "data/eval/gold.jsonl")]
    pub benchmark: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, default_value = "artifacts/eval")]
    pub output_dir: PathBuf,

    #[arg(long, default_value_t = 5)]
    pub top_k: usize,

    /// Do not pass each example's grade and subject to the retriever.
    #[arg(long, default_value_t = false)]
    pub no_hints: bool,

    /// Grouping dimensions; all of them when omitted.
    #[arg(long = "group-by", value_enum)]
    pub group_by: Vec<GroupBy>,

    /// Overrides config and FAIL_COV5.
    #[arg(long = "min-coverage-at-5")]
    pub min_coverage_at_5: Option<f64>,

    /// Overrides config and FAIL_HIT1.
    #[arg(long = "min-hit-at-1")]
    pub min_hit_at_1: Option<f64>,

    #[arg(long)]
    pub time_budget_ms: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct ReconcileArgs {
    #[arg(long, default_value = "data/index/manifest.json")]
    pub corpus: PathBuf,

    #[arg(long, default_value = "data/eval/gold.jsonl")]
    pub benchmark: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Defaults to `<benchmark>.reconciled.jsonl`.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Defaults to `<benchmark>.reconcile_decisions.csv`.
    #[arg(long)]
    pub decisions: Option<PathBuf>,

    /// Back up the live benchmark and replace it with the reconciled copy.
    #[arg(long, default_value_t = false)]
    pub apply: bool,

    #[arg(long)]
    pub acceptance_threshold: Option<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "data/index/manifest.json")]
    pub corpus: PathBuf,

    #[arg(long, default_value = "data/eval/gold.jsonl")]
    pub benchmark: PathBuf,

    #[arg(long, default_value = "artifacts/eval")]
    pub output_dir: PathBuf,
}
