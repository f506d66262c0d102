use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use ogr_core::config::RepairConfig;
use ogr_core::error::RepairError;
use ogr_core::reasoner::{RdfsReasoner, ReasonerAdapter};
use ogr_core::repair::RepairLoop;
use ogr_core::stop::StopReason;
use ogr_core::validator::RuleValidator;
use ogr_generate::HeuristicGenerator;
use ogr_graph::MergePolicy;
use ogr_test_utils::{
    card_graph, hard_violation, sample_requirements, ScriptedGenerator, ScriptedValidator,
};

fn test_config(root: &Path) -> RepairConfig {
    RepairConfig {
        base_prefix: "atm".to_string(),
        base_iri: "http://example.com/atm#".to_string(),
        stop_policy: "default".to_string(),
        max_iterations: 3,
        cq_threshold: 0.8,
        min_patch_iterations: 0,
        promote_soft: false,
        hop_limit: 2,
        triple_budget: 40,
        merge_policy: MergePolicy::default(),
        batch_size: 5,
        reasoning: false,
        output_root: root.join("run"),
        requirements_path: root.join("requirements.jsonl"),
        rules_path: root.join("rules.json"),
        competency_path: None,
    }
}

fn heuristic() -> HeuristicGenerator {
    HeuristicGenerator::new("atm", "http://example.com/atm#")
}

#[tokio::test]
async fn conforming_draft_stops_on_first_iteration() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let validator = RuleValidator::new(Vec::new());
    let disjoint = validator.disjoint_pairs();

    let mut repair = RepairLoop::new(
        config,
        heuristic(),
        validator,
        ReasonerAdapter::<RdfsReasoner>::disabled(),
        None,
        disjoint,
    )
    .unwrap();
    let summary = repair.run(&sample_requirements()).await.unwrap();

    assert_eq!(summary.iterations, 1);
    assert!(summary.decision.stop);
    assert_eq!(summary.decision.reason, StopReason::NoHardViolations);
    assert!(summary.conforms);

    let iter0 = dir.path().join("run").join("iter0");
    assert_eq!(
        fs::read_to_string(iter0.join("violations.txt")).unwrap(),
        "conforms\n"
    );
    let patches: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(iter0.join("patches.json")).unwrap()).unwrap();
    assert_eq!(patches.as_array().unwrap().len(), 0);
    assert!(iter0.join("reasoner_report.json").exists());

    // the graph snapshot re-parses and holds the drafted axioms
    let snapshot = fs::read_to_string(iter0.join("pred.ttl")).unwrap();
    let document = ogr_graph::turtle::parse(&snapshot).unwrap();
    assert!(!document.triples.is_empty());

    let log: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("run").join("iterations.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(log.as_array().unwrap().len(), 1);
    assert_eq!(log[0]["decision"]["reason"], "no_hard_violations");
}

#[tokio::test]
async fn repair_iteration_clears_hard_violations() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let validator = RuleValidator::from_json(
        r#"[{"rule": "required_property", "target_class": "owl:Class", "property": "rdfs:comment"}]"#,
    )
    .unwrap();
    let disjoint = validator.disjoint_pairs();

    let mut repair = RepairLoop::new(
        config,
        heuristic(),
        validator,
        ReasonerAdapter::<RdfsReasoner>::disabled(),
        None,
        disjoint,
    )
    .unwrap();
    let summary = repair.run(&sample_requirements()).await.unwrap();

    // first iteration plans patches, the second finds them applied
    assert_eq!(summary.iterations, 2);
    assert_eq!(summary.decision.reason, StopReason::NoHardViolations);
    assert!(summary.conforms);

    let iter0 = dir.path().join("run").join("iter0");
    let patches: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(iter0.join("patches.json")).unwrap()).unwrap();
    assert!(!patches.as_array().unwrap().is_empty());
    assert_eq!(patches[0]["action"], "addProperty");
    assert_eq!(patches[0]["predicate"], "rdfs:comment");

    let iter1 = dir.path().join("run").join("iter1");
    assert_eq!(
        fs::read_to_string(iter1.join("violations.txt")).unwrap(),
        "conforms\n"
    );

    // the repaired graph carries the placeholder comments
    let snapshot = fs::read_to_string(iter1.join("pred.ttl")).unwrap();
    assert!(snapshot.contains("rdfs:comment"));
}

#[tokio::test]
async fn max_only_ignores_quality_and_runs_to_cap() {
    let dir = tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.stop_policy = "max_only".to_string();
    config.max_iterations = 1;
    let validator = RuleValidator::new(Vec::new());
    let disjoint = validator.disjoint_pairs();

    let mut repair = RepairLoop::new(
        config,
        heuristic(),
        validator,
        ReasonerAdapter::<RdfsReasoner>::disabled(),
        None,
        disjoint,
    )
    .unwrap();
    let summary = repair.run(&sample_requirements()).await.unwrap();

    // a conforming iteration zero does not stop the run under max_only
    assert_eq!(summary.iterations, 2);
    assert_eq!(summary.decision.reason, StopReason::MaxIterationsReached);

    let log: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("run").join("iterations.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(log.as_array().unwrap().len(), 2);
    assert_eq!(log[0]["decision"]["reason"], "continue");
    assert_eq!(log[1]["decision"]["reason"], "max_iterations_reached");
}

#[tokio::test]
async fn unchanged_plan_across_iterations_stops_the_loop() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());

    // the same violation every pass; the generator's output never fixes it
    let validator = ScriptedValidator::new(vec![
        ogr_core::validator::ValidationOutcome::from_violations(vec![hard_violation(
            "atm:Card1",
            "atm:hasOwner",
        )]),
        ogr_core::validator::ValidationOutcome::from_violations(vec![hard_violation(
            "atm:Card1",
            "atm:hasOwner",
        )]),
    ]);
    let generator = ScriptedGenerator::new(vec![
        "atm:Card1 a atm:CashCard .",
        "atm:Card1 a atm:CashCard .",
    ]);

    let mut repair = RepairLoop::new(
        config,
        generator,
        validator,
        ReasonerAdapter::<RdfsReasoner>::disabled(),
        None,
        Vec::new(),
    )
    .unwrap();
    let summary = repair.run(&sample_requirements()).await.unwrap();

    assert_eq!(summary.iterations, 2);
    assert_eq!(summary.decision.reason, StopReason::PatchesUnchanged);
    assert!(!summary.conforms);
}

#[tokio::test]
async fn rule_validator_flags_missing_owner_on_fixture_graph() {
    use ogr_core::validator::ConstraintValidator;

    let validator = RuleValidator::from_json(
        r#"[{"rule": "required_property", "target_class": "atm:CashCard", "property": "atm:hasOwner"}]"#,
    )
    .unwrap();
    let outcome = validator.validate(&card_graph()).await;

    assert!(!outcome.conforms);
    assert_eq!(outcome.summary.hard, 1);
    assert_eq!(outcome.violations[0].focus.as_deref(), Some("atm:Card1"));
}

#[tokio::test]
async fn unrecoverable_draft_output_aborts_and_persists() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path());
    let validator = RuleValidator::new(Vec::new());
    let disjoint = validator.disjoint_pairs();

    // undeclared non-standard prefix stays unparseable after sanitation
    let generator = ScriptedGenerator::new(vec!["foaf:Person foaf:knows foaf:Agent ."]);
    let mut repair = RepairLoop::new(
        config,
        generator,
        validator,
        ReasonerAdapter::<RdfsReasoner>::disabled(),
        None,
        disjoint,
    )
    .unwrap();
    let err = repair.run(&sample_requirements()).await.unwrap_err();

    match err {
        RepairError::UnrecoverableParse { iteration, raw, .. } => {
            assert_eq!(iteration, 0);
            assert!(raw.contains("foaf:Person"));
        }
        other => panic!("expected unrecoverable parse, got {other:?}"),
    }

    let abort = dir.path().join("run").join("iter0").join("abort.json");
    let record: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(abort).unwrap()).unwrap();
    assert_eq!(record["iteration"], 0);
    assert!(record["raw"].as_str().unwrap().contains("foaf:knows"));
}
