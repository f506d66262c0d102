//! Run configuration.
//!
//! Deserialized from JSON and validated before any iteration runs.
//! Configuration mistakes are operator errors; they fail fast at startup
//! rather than surfacing mid-run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use ogr_graph::MergePolicy;

use crate::error::ConfigError;
use crate::stop::StopPolicy;

fn default_base_prefix() -> String {
    "atm".to_string()
}

fn default_base_iri() -> String {
    "http://lod.csd.auth.gr/atm/atm.ttl#".to_string()
}

fn default_stop_policy() -> String {
    "default".to_string()
}

fn default_max_iterations() -> u64 {
    3
}

fn default_cq_threshold() -> f64 {
    0.8
}

fn default_hop_limit() -> usize {
    2
}

fn default_triple_budget() -> usize {
    40
}

fn default_batch_size() -> usize {
    5
}

fn default_output_root() -> PathBuf {
    PathBuf::from("runs/repair")
}

/// Full configuration of one repair run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairConfig {
    /// Base namespace prefix, e.g. "atm"
    #[serde(default = "default_base_prefix")]
    pub base_prefix: String,
    /// Base namespace IRI
    #[serde(default = "default_base_iri")]
    pub base_iri: String,
    /// Stop policy name; must be one of the closed set
    #[serde(default = "default_stop_policy")]
    pub stop_policy: String,
    /// Iteration cap; must be positive
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u64,
    /// Competency pass-rate threshold in [0, 1]
    #[serde(default = "default_cq_threshold")]
    pub cq_threshold: f64,
    /// Floor of patch-bearing iterations before a non-cap stop may fire
    #[serde(default)]
    pub min_patch_iterations: u64,
    /// Promote soft violations to patches when no hard ones exist
    #[serde(default)]
    pub promote_soft: bool,
    /// Context extraction hop limit
    #[serde(default = "default_hop_limit")]
    pub hop_limit: usize,
    /// Context extraction triple budget
    #[serde(default = "default_triple_budget")]
    pub triple_budget: usize,
    /// Merge policy for repair batches
    #[serde(default)]
    pub merge_policy: MergePolicy,
    /// Requirements per drafting batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Whether to run the built-in reasoner
    #[serde(default)]
    pub reasoning: bool,
    /// Directory receiving the per-iteration artifacts
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    /// Requirement corpus (JSON lines)
    pub requirements_path: PathBuf,
    /// Constraint ruleset (JSON)
    pub rules_path: PathBuf,
    /// Competency query file; omit to skip competency checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competency_path: Option<PathBuf>,
}

impl RepairConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate invariants and resolve the stop policy. Fails fast.
    pub fn validate(&self) -> Result<StopPolicy, ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::NonPositiveCap(self.max_iterations));
        }
        if !(0.0..=1.0).contains(&self.cq_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.cq_threshold));
        }
        self.stop_policy.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> serde_json::Value {
        serde_json::json!({
            "requirements_path": "data/requirements.jsonl",
            "rules_path": "data/rules.json"
        })
    }

    #[test]
    fn defaults_fill_in() {
        let config: RepairConfig = serde_json::from_value(minimal_json()).unwrap();
        assert_eq!(config.stop_policy, "default");
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.cq_threshold, 0.8);
        assert_eq!(config.min_patch_iterations, 0);
        assert!(!config.promote_soft);
        assert_eq!(config.validate().unwrap(), StopPolicy::Default);
    }

    #[test]
    fn zero_cap_fails_fast() {
        let mut value = minimal_json();
        value["max_iterations"] = serde_json::json!(0);
        let config: RepairConfig = serde_json::from_value(value).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveCap(0))
        ));
    }

    #[test]
    fn threshold_must_be_a_rate() {
        let mut value = minimal_json();
        value["cq_threshold"] = serde_json::json!(1.5);
        let config: RepairConfig = serde_json::from_value(value).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ThresholdOutOfRange(_))
        ));
    }

    #[test]
    fn unknown_policy_fails_fast() {
        let mut value = minimal_json();
        value["stop_policy"] = serde_json::json!("pellet");
        let config: RepairConfig = serde_json::from_value(value).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownPolicy(name)) if name == "pellet"
        ));
    }
}
