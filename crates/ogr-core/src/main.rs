use std::io::Read;
use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, Command};

use ogr_core::competency::CompetencyRunner;
use ogr_core::config::RepairConfig;
use ogr_core::reasoner::{RdfsReasoner, ReasonerAdapter};
use ogr_core::repair::{RepairLoop, RunSummary};
use ogr_core::validator::{ConstraintValidator, RuleValidator};
use ogr_core::violation::{canonicalize, render_report, CanonicalViolation};
use ogr_generate::{
    from_jsonl, CachedGenerator, HeuristicGenerator, OpenAiConfig, OpenAiGenerator,
};
use ogr_graph::{DraftGraph, Sanitizer};

const CACHE_CAPACITY: u64 = 1024;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Command::new("ogr")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Ontology generation and iterative repair")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("run")
                .about("Run the draft-and-repair loop from a config file")
                .arg(
                    Arg::new("config")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Path to the run configuration (JSON)"),
                )
                .arg(
                    Arg::new("offline")
                        .long("offline")
                        .action(ArgAction::SetTrue)
                        .help("Use the deterministic heuristic generator instead of the API"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate a Turtle graph against a ruleset")
                .arg(
                    Arg::new("graph")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Turtle file to validate"),
                )
                .arg(
                    Arg::new("rules")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Constraint ruleset (JSON)"),
                ),
        )
        .subcommand(
            Command::new("sanitize")
                .about("Repair malformed Turtle from stdin and print the result")
                .arg(
                    Arg::new("prefix")
                        .long("prefix")
                        .default_value("atm")
                        .help("Base namespace prefix"),
                )
                .arg(
                    Arg::new("iri")
                        .long("iri")
                        .default_value("http://lod.csd.auth.gr/atm/atm.ttl#")
                        .help("Base namespace IRI"),
                ),
        );

    let matches = cli.get_matches();

    match matches.subcommand() {
        Some(("run", args)) => {
            let config = args.get_one::<PathBuf>("config").unwrap();
            let offline = args.get_flag("offline");
            match run_repair(config, offline).await {
                Ok(summary) => {
                    println!("Iterations: {}", summary.iterations);
                    println!("Stop reason: {}", summary.decision.reason.as_str());
                    println!("Conforms: {}", summary.conforms);
                    println!("Pass rate: {:.2}", summary.pass_rate);
                    std::process::exit(if summary.conforms { 0 } else { 1 });
                }
                Err(err) => {
                    eprintln!("error: {err:#}");
                    std::process::exit(2);
                }
            }
        }
        Some(("validate", args)) => {
            let graph = args.get_one::<PathBuf>("graph").unwrap();
            let rules = args.get_one::<PathBuf>("rules").unwrap();
            match validate_file(graph, rules).await {
                Ok((report, hard)) => {
                    print!("{report}");
                    std::process::exit(if hard == 0 { 0 } else { 1 });
                }
                Err(err) => {
                    eprintln!("error: {err:#}");
                    std::process::exit(2);
                }
            }
        }
        Some(("sanitize", args)) => {
            let prefix = args.get_one::<String>("prefix").unwrap();
            let iri = args.get_one::<String>("iri").unwrap();
            let mut raw = String::new();
            if let Err(err) = std::io::stdin().read_to_string(&mut raw) {
                eprintln!("error: {err}");
                std::process::exit(2);
            }
            print!("{}", Sanitizer::new(prefix.as_str(), iri.as_str()).repair(&raw));
        }
        _ => {}
    }
}

async fn run_repair(config_path: &PathBuf, offline: bool) -> anyhow::Result<RunSummary> {
    let config = RepairConfig::from_file(config_path)?;
    let output_root = config.output_root.clone();

    let requirements = from_jsonl(&std::fs::read_to_string(&config.requirements_path)?)?;
    let validator = RuleValidator::from_json(&std::fs::read_to_string(&config.rules_path)?)?;
    let disjoint = validator.disjoint_pairs();

    let runner = match &config.competency_path {
        Some(path) => Some(CompetencyRunner::from_source(&std::fs::read_to_string(
            path,
        )?)),
        None => None,
    };
    let reasoner = if config.reasoning {
        ReasonerAdapter::new(RdfsReasoner::new().with_disjoint(disjoint.clone()))
    } else {
        ReasonerAdapter::disabled()
    };

    tracing::info!(
        requirements = requirements.len(),
        offline,
        root = %output_root.display(),
        "starting repair run"
    );

    let summary = if offline {
        let generator = CachedGenerator::new(
            HeuristicGenerator::new(config.base_prefix.as_str(), config.base_iri.as_str()),
            CACHE_CAPACITY,
        );
        RepairLoop::new(config, generator, validator, reasoner, runner, disjoint)?
            .run(&requirements)
            .await?
    } else {
        let generator = CachedGenerator::new(
            OpenAiGenerator::new(OpenAiConfig::default())?,
            CACHE_CAPACITY,
        );
        RepairLoop::new(config, generator, validator, reasoner, runner, disjoint)?
            .run(&requirements)
            .await?
    };
    Ok(summary)
}

async fn validate_file(
    graph_path: &PathBuf,
    rules_path: &PathBuf,
) -> anyhow::Result<(String, usize)> {
    let document = ogr_graph::turtle::parse(&std::fs::read_to_string(graph_path)?)?;
    let mut graph = DraftGraph::new();
    for (prefix, iri) in &document.prefixes {
        graph.declare_prefix(prefix.as_str(), iri.as_str());
    }
    for triple in document.triples {
        graph.insert(triple);
    }

    let validator = RuleValidator::from_json(&std::fs::read_to_string(rules_path)?)?;
    let outcome = validator.validate(&graph).await;
    let canonical: Vec<CanonicalViolation> =
        outcome.violations.iter().map(canonicalize).collect();
    Ok((render_report(&canonical), outcome.summary.hard))
}
