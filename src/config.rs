use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::evaluation::Thresholds;
use crate::reconcile::ReconcileConfig;
use crate::retriever::RetrieverConfig;

pub const FAIL_COVERAGE_ENV: &str = "FAIL_COV5";
pub const FAIL_HIT_ENV: &str = "FAIL_HIT1";

/// Optional JSON configuration; every section and field falls back to its
/// default when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub retriever: RetrieverConfig,
    pub reconcile: ReconcileConfig,
    pub thresholds: ThresholdOverrides,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdOverrides {
    pub min_coverage_at_5: Option<f64>,
    pub min_hit_at_1: Option<f64>,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate().with_context(|| format!("invalid config {}", path.display()))?;

        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("thresholds.min_coverage_at_5", self.thresholds.min_coverage_at_5),
            ("thresholds.min_hit_at_1", self.thresholds.min_hit_at_1),
        ] {
            if let Some(value) = value {
                check_ratio(name, value)?;
            }
        }
        if self.reconcile.fuzzy_weight < 0.0 || self.reconcile.level_bonus < 0.0 {
            bail!("reconcile weights must not be negative");
        }
        Ok(())
    }
}

/// Resolves thresholds with precedence CLI flag, config file, environment
/// variable, then the built-in default.
pub fn resolve_thresholds(
    cli_coverage: Option<f64>,
    cli_hit: Option<f64>,
    overrides: &ThresholdOverrides,
) -> Result<Thresholds> {
    let defaults = Thresholds::default();

    let min_coverage_at_5 = match cli_coverage.or(overrides.min_coverage_at_5) {
        Some(value) => value,
        None => env_ratio(FAIL_COVERAGE_ENV)?.unwrap_or(defaults.min_coverage_at_5),
    };
    let min_hit_at_1 = match cli_hit.or(overrides.min_hit_at_1) {
        Some(value) => value,
        None => env_ratio(FAIL_HIT_ENV)?.unwrap_or(defaults.min_hit_at_1),
    };

    check_ratio("min coverage@5", min_coverage_at_5)?;
    check_ratio("min hit@1", min_hit_at_1)?;

    Ok(Thresholds {
        min_coverage_at_5,
        min_hit_at_1,
    })
}

fn env_ratio(name: &str) -> Result<Option<f64>> {
    let Some(value) = std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    else {
        return Ok(None);
    };

    let parsed = value
        .parse::<f64>()
        .with_context(|| format!("{name} is not a number: {value}"))?;
    Ok(Some(parsed))
}

fn check_ratio(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        bail!("{name} must be within [0, 1], got {value}");
    }
    Ok(())
}
