//! The iterative repair loop.
//!
//! Single orchestrator owning the draft graph, the term registry, and the
//! latest reasoner report. Each iteration fully completes consistency
//! checking, validation, competency evaluation, patch synthesis, and the
//! stop decision before any generator call for the next iteration is
//! issued. Repair requests within one iteration go out concurrently, one
//! per patch group, but their results are merged back in request order by
//! this single task, so the graph never sees concurrent mutation.

use futures::future::join_all;
use indexmap::IndexMap;

use ogr_generate::{
    chunk, GenerateRequest, Generator, PromptBuilder, PromptContext, Requirement,
};
use ogr_graph::{
    ContextExtractor, DraftGraph, MergePolicy, Merger, SanitizeError, Sanitizer, TermRegistry,
    Triple,
};

use crate::artifacts::{ArtifactWriter, IterationRecord, RunLog};
use crate::competency::{pass_rate, CompetencyRunner};
use crate::config::RepairConfig;
use crate::error::RepairError;
use crate::patch::{synthesize, Patch};
use crate::reasoner::{Reasoner, ReasonerAdapter};
use crate::stop::{IterationSignals, StopDecision, StopEngine};
use crate::validator::ConstraintValidator;
use crate::violation::{canonicalize, render_report, CanonicalViolation};

/// Outcome of a completed (non-aborted) run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Iterations executed, including the one that stopped
    pub iterations: u64,
    /// The terminal stop decision
    pub decision: StopDecision,
    /// Whether the final validation pass conformed
    pub conforms: bool,
    /// Final competency pass rate
    pub pass_rate: f64,
}

/// Orchestrates draft, validate, and repair until a stop decision.
pub struct RepairLoop<G, V, R> {
    config: RepairConfig,
    engine: StopEngine,
    generator: G,
    validator: V,
    reasoner: ReasonerAdapter<R>,
    runner: Option<CompetencyRunner>,
    prompts: PromptBuilder,
    sanitizer: Sanitizer,
    merger: Merger,
    extractor: ContextExtractor,
    writer: ArtifactWriter,
    log: RunLog,
}

impl<G, V, R> RepairLoop<G, V, R>
where
    G: Generator,
    V: ConstraintValidator,
    R: Reasoner,
{
    /// Build a loop from validated configuration and its collaborators.
    /// `disjoint` feeds the merger's exclusive-type rule.
    pub fn new(
        config: RepairConfig,
        generator: G,
        validator: V,
        reasoner: ReasonerAdapter<R>,
        runner: Option<CompetencyRunner>,
        disjoint: Vec<(String, String)>,
    ) -> Result<Self, RepairError> {
        let policy = config.validate()?;
        let engine = StopEngine::new(
            policy,
            config.max_iterations,
            config.cq_threshold,
            config.min_patch_iterations,
        );
        let prompts = PromptBuilder::new(&config.base_prefix, &config.base_iri);
        let sanitizer = Sanitizer::new(&config.base_prefix, &config.base_iri);
        let mut merger = Merger::new(config.merge_policy);
        for (left, right) in disjoint {
            merger = merger.with_disjoint(left, right);
        }
        let extractor = ContextExtractor::new(config.hop_limit, config.triple_budget);
        let writer = ArtifactWriter::new(&config.output_root)?;
        Ok(Self {
            config,
            engine,
            generator,
            validator,
            reasoner,
            runner,
            prompts,
            sanitizer,
            merger,
            extractor,
            writer,
            log: RunLog::new(),
        })
    }

    /// Run to completion. On an unrecoverable parse failure the raw text
    /// and reason are persisted, the log is flushed, and the error is
    /// returned; the graph is never silently replaced by an empty one.
    pub async fn run(&mut self, requirements: &[Requirement]) -> Result<RunSummary, RepairError> {
        let mut graph = DraftGraph::with_base(&self.config.base_prefix, &self.config.base_iri);
        let mut registry = TermRegistry::default();

        self.draft(&mut graph, &mut registry, requirements).await?;
        tracing::info!(triples = graph.len(), "initial draft assembled");

        let mut previous_patches: Option<Vec<Patch>> = None;
        let mut patch_iterations: u64 = 0;
        let mut iteration: u64 = 0;

        loop {
            let consistency = self.reasoner.check(&graph).await;
            self.writer
                .write_reasoner_report(iteration, &consistency.report)?;

            let validation = self.validator.validate(&consistency.expanded).await;
            let outcomes = self
                .runner
                .as_ref()
                .map(|r| r.run(&consistency.expanded))
                .unwrap_or_default();
            let rate = pass_rate(&outcomes);

            let canonical: Vec<CanonicalViolation> =
                validation.violations.iter().map(canonicalize).collect();
            self.writer
                .write_violations(iteration, &render_report(&canonical))?;

            let patches = synthesize(&canonical, &outcomes, &registry, self.config.promote_soft);
            self.writer.write_patches(iteration, &patches)?;
            self.writer.write_graph(iteration, &graph)?;

            if !patches.is_empty() {
                patch_iterations += 1;
            }

            let decision = self.engine.evaluate(IterationSignals {
                iteration,
                hard: validation.summary.hard,
                pass_rate: rate,
                patches: &patches,
                previous_patches: previous_patches.as_deref(),
                patch_iterations,
            });
            self.log.append(IterationRecord {
                iteration,
                total: validation.summary.total,
                hard: validation.summary.hard,
                soft: validation.summary.soft,
                pass_rate: rate,
                patches: patches.len(),
                decision,
            });
            self.writer.write_run_log(&self.log)?;
            tracing::info!(
                iteration,
                hard = validation.summary.hard,
                patches = patches.len(),
                pass_rate = rate,
                stop = decision.stop,
                reason = decision.reason.as_str(),
                "iteration evaluated"
            );

            if decision.stop {
                return Ok(RunSummary {
                    iterations: iteration + 1,
                    decision,
                    conforms: validation.conforms,
                    pass_rate: rate,
                });
            }

            let requests = self.repair_requests(&graph, &registry, &canonical, &patches, &consistency.report.unsatisfiable)?;
            let results = join_all(
                requests
                    .into_iter()
                    .map(|request| self.generator.generate(request)),
            )
            .await;

            // merged back in request order, serialized by this task
            for result in results {
                let raw = result?;
                let triples = self.parse_or_abort(iteration, &raw)?;
                let outcome = self.merger.merge(&mut graph, &registry, triples);
                tracing::debug!(
                    added = outcome.added,
                    discarded = outcome.discarded.len(),
                    retracted = outcome.retracted.len(),
                    "repair batch merged"
                );
                registry = TermRegistry::from_graph(&graph);
            }

            previous_patches = Some(patches);
            iteration += 1;
        }
    }

    /// Draft phase: one generator call per requirement batch, merged
    /// unconstrained since no vocabulary exists yet.
    async fn draft(
        &self,
        graph: &mut DraftGraph,
        registry: &mut TermRegistry,
        requirements: &[Requirement],
    ) -> Result<(), RepairError> {
        let draft_merger = Merger::new(MergePolicy::Unconstrained);
        for batch in chunk(requirements, self.config.batch_size) {
            let request = self.prompts.draft(&batch);
            let raw = self.generator.generate(request).await?;
            let triples = self.parse_or_abort(0, &raw)?;
            draft_merger.merge(graph, registry, triples);
            *registry = TermRegistry::from_graph(graph);
        }
        Ok(())
    }

    /// One repair request per patch group, grouped by focus entity, in
    /// plan order.
    fn repair_requests(
        &self,
        graph: &DraftGraph,
        registry: &TermRegistry,
        canonical: &[CanonicalViolation],
        patches: &[Patch],
        inconsistencies: &[String],
    ) -> Result<Vec<GenerateRequest>, RepairError> {
        let mut groups: IndexMap<&str, Vec<&Patch>> = IndexMap::new();
        for patch in patches {
            groups.entry(patch.subject.as_str()).or_default().push(patch);
        }

        let mut requests = Vec::with_capacity(groups.len());
        for (focus, group) in groups {
            let snippet = self.extractor.extract(graph, focus, None);
            let context = PromptContext {
                violations: canonical
                    .iter()
                    .filter(|v| v.focus == focus)
                    .map(CanonicalViolation::render)
                    .collect(),
                snippet: snippet.to_turtle(graph),
                candidate_terms: registry.vocabulary().map(str::to_string).collect(),
                domain_hints: registry
                    .domain_hints()
                    .map(|(p, c)| format!("{p} -> {c}"))
                    .collect(),
                range_hints: registry
                    .range_hints()
                    .map(|(p, c)| format!("{p} -> {c}"))
                    .collect(),
                synonym_hints: registry
                    .synonym_hints()
                    .map(|(alias, canon)| format!("{alias} -> {canon}"))
                    .collect(),
                inconsistencies: inconsistencies.to_vec(),
            };
            let plan = serde_json::to_value(&group)?;
            requests.push(self.prompts.repair(&plan, context));
        }
        Ok(requests)
    }

    /// Sanitize and parse raw generator output, persisting the abort
    /// record when it stays unparseable.
    fn parse_or_abort(&self, iteration: u64, raw: &str) -> Result<Vec<Triple>, RepairError> {
        match self.sanitizer.repair_and_parse(raw) {
            Ok(triples) => Ok(triples),
            Err(SanitizeError::Unrecoverable { raw, reason }) => {
                self.writer
                    .write_abort(iteration, &raw, &reason.to_string())?;
                self.writer.write_run_log(&self.log)?;
                Err(RepairError::UnrecoverableParse {
                    iteration,
                    reason,
                    raw,
                })
            }
        }
    }

    /// The run's artifact root.
    #[must_use]
    pub fn artifact_root(&self) -> &std::path::Path {
        self.writer.root()
    }
}
