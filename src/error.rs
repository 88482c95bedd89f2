use thiserror::Error;

/// Failures that callers are expected to tell apart from ordinary I/O or
/// parse errors carried by `anyhow`.
#[derive(Error, Debug)]
pub enum RagError {
    /// A catalog, manifest, or benchmark record could not be parsed, or lacks
    /// a field nothing else can stand in for.
    #[error("malformed input in {source_name} ({record}): {message}")]
    MalformedInput {
        source_name: String,
        record: String,
        message: String,
    },

    /// The global evaluation row fell below at least one acceptance minimum.
    /// Raised only after the report has been written.
    #[error(
        "evaluation below thresholds: coverage@5={coverage_at_5:.4} (min {min_coverage_at_5:.2}), hit@1={hit_at_1:.4} (min {min_hit_at_1:.2})"
    )]
    ThresholdViolation {
        coverage_at_5: f64,
        hit_at_1: f64,
        min_coverage_at_5: f64,
        min_hit_at_1: f64,
    },
}

impl RagError {
    pub fn malformed(
        source_name: impl Into<String>,
        record: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::MalformedInput {
            source_name: source_name.into(),
            record: record.into(),
            message: message.into(),
        }
    }

    /// Process exit code used by `main` for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MalformedInput { .. } => 1,
            Self::ThresholdViolation { .. } => 2,
        }
    }
}
