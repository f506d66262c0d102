//! Per-iteration artifact persistence.
//!
//! Every iteration leaves a deterministic trail under `iterN/`: the
//! canonical violation report, the serialized patch plan, the graph
//! snapshot, and the reasoner report. The run-level iteration log is
//! append-only; records are written once and never mutated, so the trail
//! is sufficient to reconstruct why a run stopped, even on abort.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use ogr_graph::{turtle, DraftGraph};

use crate::error::RepairError;
use crate::patch::Patch;
use crate::reasoner::ReasonerReport;
use crate::stop::StopDecision;

/// One iteration's log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Zero-based iteration index
    pub iteration: u64,
    /// Violation counts
    pub total: usize,
    /// Hard violations
    pub hard: usize,
    /// Soft violations
    pub soft: usize,
    /// Competency pass rate
    pub pass_rate: f64,
    /// Patch plan size
    pub patches: usize,
    /// The iteration's stop decision
    pub decision: StopDecision,
}

/// Append-only, thread-safe iteration log.
#[derive(Debug, Default)]
pub struct RunLog {
    records: Mutex<Vec<IterationRecord>>,
}

impl RunLog {
    /// Empty log.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record. Records are never removed or rewritten.
    pub fn append(&self, record: IterationRecord) {
        self.records.lock().push(record);
    }

    /// Snapshot of all records so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<IterationRecord> {
        self.records.lock().clone()
    }

    /// Number of recorded iterations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

/// Writes the artifact tree for one run.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    root: PathBuf,
}

impl ArtifactWriter {
    /// Writer rooted at `root`; the directory is created if missing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, RepairError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The run's root directory.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn iter_dir(&self, iteration: u64) -> Result<PathBuf, RepairError> {
        let dir = self.root.join(format!("iter{iteration}"));
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Persist the canonical violation report.
    pub fn write_violations(&self, iteration: u64, report: &str) -> Result<(), RepairError> {
        fs::write(self.iter_dir(iteration)?.join("violations.txt"), report)?;
        Ok(())
    }

    /// Persist the serialized patch plan.
    pub fn write_patches(&self, iteration: u64, patches: &[Patch]) -> Result<(), RepairError> {
        let body = serde_json::to_string_pretty(patches)?;
        fs::write(self.iter_dir(iteration)?.join("patches.json"), body)?;
        Ok(())
    }

    /// Persist the graph snapshot in Turtle.
    pub fn write_graph(&self, iteration: u64, graph: &DraftGraph) -> Result<(), RepairError> {
        let body = turtle::serialize(graph.prefixes(), graph.iter());
        fs::write(self.iter_dir(iteration)?.join("pred.ttl"), body)?;
        Ok(())
    }

    /// Persist the reasoner report.
    pub fn write_reasoner_report(
        &self,
        iteration: u64,
        report: &ReasonerReport,
    ) -> Result<(), RepairError> {
        let body = serde_json::to_string_pretty(report)?;
        fs::write(self.iter_dir(iteration)?.join("reasoner_report.json"), body)?;
        Ok(())
    }

    /// Persist the run-level iteration log.
    pub fn write_run_log(&self, log: &RunLog) -> Result<(), RepairError> {
        let body = serde_json::to_string_pretty(&log.snapshot())?;
        fs::write(self.root.join("iterations.json"), body)?;
        Ok(())
    }

    /// Record an aborted run: the raw generator output and why it could
    /// not be recovered. Written before the abort error is returned.
    pub fn write_abort(
        &self,
        iteration: u64,
        raw: &str,
        reason: &str,
    ) -> Result<(), RepairError> {
        let body = serde_json::to_string_pretty(&serde_json::json!({
            "iteration": iteration,
            "reason": reason,
            "raw": raw,
        }))?;
        fs::write(self.iter_dir(iteration)?.join("abort.json"), body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stop::{StopReason, StopDecision};
    use ogr_graph::{Term, Triple};

    fn record(iteration: u64) -> IterationRecord {
        IterationRecord {
            iteration,
            total: 2,
            hard: 1,
            soft: 1,
            pass_rate: 0.5,
            patches: 1,
            decision: StopDecision {
                stop: false,
                reason: StopReason::Continue,
            },
        }
    }

    #[test]
    fn run_log_appends_in_order() {
        let log = RunLog::new();
        log.append(record(0));
        log.append(record(1));
        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].iteration, 1);
    }

    #[test]
    fn artifacts_land_in_iteration_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path().join("run")).unwrap();

        writer.write_violations(0, "conforms\n").unwrap();
        writer.write_patches(0, &[]).unwrap();
        let mut graph = DraftGraph::with_base("atm", "http://example.com/atm#");
        graph.insert(Triple::new("atm:Card1", "rdf:type", Term::named("atm:CashCard")));
        writer.write_graph(0, &graph).unwrap();

        let iter0 = dir.path().join("run/iter0");
        assert!(iter0.join("violations.txt").exists());
        assert!(iter0.join("patches.json").exists());
        let ttl = std::fs::read_to_string(iter0.join("pred.ttl")).unwrap();
        assert!(ttl.contains("atm:Card1"));
    }

    #[test]
    fn abort_record_keeps_raw_text() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path()).unwrap();
        writer.write_abort(2, "garbage %% output", "syntax error").unwrap();
        let body = std::fs::read_to_string(dir.path().join("iter2/abort.json")).unwrap();
        assert!(body.contains("garbage %% output"));
        assert!(body.contains("syntax error"));
    }

    #[test]
    fn iteration_log_serializes_reason_strings() {
        let log = RunLog::new();
        let mut rec = record(0);
        rec.decision = StopDecision {
            stop: true,
            reason: StopReason::NoHardViolations,
        };
        log.append(rec);
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path()).unwrap();
        writer.write_run_log(&log).unwrap();
        let body = std::fs::read_to_string(dir.path().join("iterations.json")).unwrap();
        assert!(body.contains("no_hard_violations"));
    }
}
