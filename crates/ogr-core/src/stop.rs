//! Stop-policy engine.
//!
//! Evaluated once per iteration against the hard-violation count, the
//! competency pass rate, the current and previous patch plans, and the
//! iteration index. Reason strings are part of the observable contract;
//! they appear in the iteration log and drive the audit trail.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::patch::{plans_equal, Patch};

/// The four selectable stop policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// Stop when the hard-violation count reaches zero
    Default,
    /// Stop when hard count is zero and pass rate meets the threshold
    HardAndCq,
    /// Never stop solely on zero hard violations
    IgnoreNoHard,
    /// Ignore quality signals; stop only at the iteration cap
    MaxOnly,
}

impl FromStr for StopPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "hard_and_cq" => Ok(Self::HardAndCq),
            "ignore_no_hard" => Ok(Self::IgnoreNoHard),
            "max_only" => Ok(Self::MaxOnly),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Why an iteration's evaluation decided what it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Keep iterating
    #[serde(rename = "continue")]
    Continue,
    /// No hard violations remain
    #[serde(rename = "no_hard_violations")]
    NoHardViolations,
    /// No hard violations and the pass rate met the threshold
    #[serde(rename = "no_hard_violations_and_cq_threshold_met")]
    NoHardViolationsAndCqThresholdMet,
    /// The patch plan is empty; nothing actionable
    #[serde(rename = "no_patches_available")]
    NoPatchesAvailable,
    /// The plan is structurally identical to the previous iteration's
    #[serde(rename = "patches_unchanged")]
    PatchesUnchanged,
    /// The competency pass rate met the threshold
    #[serde(rename = "cq_threshold_met")]
    CqThresholdMet,
    /// The iteration cap was reached
    #[serde(rename = "max_iterations_reached")]
    MaxIterationsReached,
}

impl StopReason {
    /// The wire string, as written to the iteration log.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::NoHardViolations => "no_hard_violations",
            Self::NoHardViolationsAndCqThresholdMet => "no_hard_violations_and_cq_threshold_met",
            Self::NoPatchesAvailable => "no_patches_available",
            Self::PatchesUnchanged => "patches_unchanged",
            Self::CqThresholdMet => "cq_threshold_met",
            Self::MaxIterationsReached => "max_iterations_reached",
        }
    }
}

/// Terminal output of one iteration's policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopDecision {
    /// Whether the loop terminates here
    pub stop: bool,
    /// Why
    pub reason: StopReason,
}

impl StopDecision {
    fn stop(reason: StopReason) -> Self {
        Self { stop: true, reason }
    }

    fn proceed() -> Self {
        Self {
            stop: false,
            reason: StopReason::Continue,
        }
    }
}

/// The signals one evaluation consumes.
#[derive(Debug, Clone, Copy)]
pub struct IterationSignals<'a> {
    /// Zero-based iteration index
    pub iteration: u64,
    /// Hard-violation count from the latest validation
    pub hard: usize,
    /// Competency pass rate in [0, 1]
    pub pass_rate: f64,
    /// This iteration's patch plan
    pub patches: &'a [Patch],
    /// The previous iteration's plan, if any
    pub previous_patches: Option<&'a [Patch]>,
    /// Patch-bearing iterations elapsed so far, for the floor rule
    pub patch_iterations: u64,
}

/// Policy evaluator with fixed configuration.
#[derive(Debug, Clone, Copy)]
pub struct StopEngine {
    policy: StopPolicy,
    max_iterations: u64,
    cq_threshold: f64,
    min_patch_iterations: u64,
}

impl StopEngine {
    /// Engine under `policy` with the run's configured limits.
    #[inline]
    #[must_use]
    pub fn new(
        policy: StopPolicy,
        max_iterations: u64,
        cq_threshold: f64,
        min_patch_iterations: u64,
    ) -> Self {
        Self {
            policy,
            max_iterations,
            cq_threshold,
            min_patch_iterations,
        }
    }

    /// Evaluate one iteration's signals.
    ///
    /// The cap always wins: a cap stop cannot be overridden by the
    /// `min_patch_iterations` floor, under any policy including `max_only`.
    #[must_use]
    pub fn evaluate(&self, signals: IterationSignals<'_>) -> StopDecision {
        // the cap binds every policy
        let at_cap = signals.iteration >= self.max_iterations;

        if self.policy == StopPolicy::MaxOnly {
            return if at_cap {
                StopDecision::stop(StopReason::MaxIterationsReached)
            } else {
                StopDecision::proceed()
            };
        }

        let decision = self.quality_decision(&signals, at_cap);

        // floor rule: patches exist but too few patch-bearing iterations
        // have elapsed; overrides every stop except the cap
        if decision.stop
            && decision.reason != StopReason::MaxIterationsReached
            && !signals.patches.is_empty()
            && signals.patch_iterations < self.min_patch_iterations
        {
            tracing::debug!(
                reason = decision.reason.as_str(),
                patch_iterations = signals.patch_iterations,
                floor = self.min_patch_iterations,
                "floor rule overrides early stop"
            );
            return StopDecision::proceed();
        }
        decision
    }

    fn quality_decision(&self, signals: &IterationSignals<'_>, at_cap: bool) -> StopDecision {
        let threshold_met = signals.pass_rate >= self.cq_threshold;

        match self.policy {
            StopPolicy::Default if signals.hard == 0 => {
                return StopDecision::stop(StopReason::NoHardViolations);
            }
            StopPolicy::HardAndCq if signals.hard == 0 && threshold_met => {
                return StopDecision::stop(StopReason::NoHardViolationsAndCqThresholdMet);
            }
            _ => {}
        }

        if signals.patches.is_empty() {
            return StopDecision::stop(StopReason::NoPatchesAvailable);
        }
        if let Some(previous) = signals.previous_patches {
            if plans_equal(previous, signals.patches) {
                return StopDecision::stop(StopReason::PatchesUnchanged);
            }
        }
        if threshold_met {
            return StopDecision::stop(StopReason::CqThresholdMet);
        }
        if at_cap {
            return StopDecision::stop(StopReason::MaxIterationsReached);
        }
        StopDecision::proceed()
    }
}
