//! Bounded validate-and-repair loop over one problem or a batch.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use fixloop_sandbox::{ExecutionReport, PythonProcessRunner, SandboxExecutor, UnitRunner};
use fixloop_state::{
    AttemptRecord, ContentDigest, FixtureRepository, FixtureSet, FsStepLogger, GenerationMetric,
    JsonFixtureRepository, ResultStore, StepKind, StepLogger, StepRecord, TestCase, TestResult,
};

use super::diagnostics;
use super::state::{transition, AttemptBudget, RepairEvent, RepairState};
use crate::analyze::{AnalysisReport, StaticAnalyzer};
use crate::config::{FixloopConfig, RepairConfig};
use crate::error::Result;
use crate::extract::extract;
use crate::generator::{GenerationContext, Generator};
use crate::metrics::METRICS;
use crate::obs;

/// How a single attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttemptOutcome {
    CodeNotFound,
    StaticInvalid,
    EntryPointNotFound,
    /// Fixtures ran and at least one raised.
    RuntimeFailed {
        passed: usize,
        total: usize,
        error_classes: Vec<String>,
    },
    /// Fixtures ran without raising.
    Completed { passed: usize, total: usize },
}

/// One attempt of the loop, as recorded for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairAttempt {
    /// 1-based attempt ordinal.
    pub ordinal: u32,
    /// Diagnostic produced by this attempt; `None` when it completed.
    pub diagnostic: Option<String>,
    pub outcome: AttemptOutcome,
    /// Digest of the extracted source, when any was found.
    pub source_digest: Option<ContentDigest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemOutcome {
    Passed,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemReport {
    pub problem_id: String,
    pub outcome: ProblemOutcome,
    pub attempts: Vec<RepairAttempt>,
}

impl ProblemReport {
    pub fn passed(&self) -> bool {
        self.outcome == ProblemOutcome::Passed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub problems: Vec<ProblemReport>,
}

impl BatchReport {
    pub fn passed_count(&self) -> usize {
        self.problems.iter().filter(|p| p.passed()).count()
    }
}

/// Sequential step writer with an explicit sequence counter.
struct StepTrail<'a> {
    logger: &'a dyn StepLogger,
    problem_id: &'a str,
    next_seq: u32,
}

impl StepTrail<'_> {
    async fn write(&mut self, kind: StepKind, attempt: u32, content: &str) -> Result<()> {
        let step = StepRecord {
            seq: self.next_seq,
            kind,
            attempt,
            content: content.to_string(),
        };
        self.logger.write_step(self.problem_id, &step).await?;
        self.next_seq += 1;
        Ok(())
    }
}

/// Result of evaluating one response, before the continue decision.
struct Evaluation {
    state: RepairState,
    attempt: RepairAttempt,
}

/// Drives extraction, analysis and execution against a generator until the
/// candidate passes or the reprompt budget is spent.
pub struct RepairOrchestrator<R: UnitRunner = PythonProcessRunner> {
    store: Arc<dyn ResultStore>,
    fixtures: Arc<dyn FixtureRepository>,
    steps: Arc<dyn StepLogger>,
    executor: SandboxExecutor<R>,
    analyzer: StaticAnalyzer,
    config: RepairConfig,
}

impl RepairOrchestrator<PythonProcessRunner> {
    /// File-backed fixtures and step logs plus a Python executor, all taken
    /// from `config`.
    pub fn from_config(config: &FixloopConfig, store: Arc<dyn ResultStore>) -> Result<Self> {
        config.validate()?;
        let fixtures = JsonFixtureRepository::new(&config.paths.fixtures_root)
            .with_yes_no_problems(config.paths.yes_no_problems.iter().cloned());
        let steps = FsStepLogger::new(&config.paths.step_log_root);
        Ok(Self::new(
            store,
            Arc::new(fixtures),
            Arc::new(steps),
            SandboxExecutor::python(config.sandbox.clone()),
            config.repair.clone(),
        ))
    }
}

impl<R: UnitRunner> RepairOrchestrator<R> {
    pub fn new(
        store: Arc<dyn ResultStore>,
        fixtures: Arc<dyn FixtureRepository>,
        steps: Arc<dyn StepLogger>,
        executor: SandboxExecutor<R>,
        config: RepairConfig,
    ) -> Self {
        Self {
            store,
            fixtures,
            steps,
            executor,
            analyzer: StaticAnalyzer::python(),
            config,
        }
    }

    pub fn config(&self) -> &RepairConfig {
        &self.config
    }

    /// Run every problem in order. The first orchestration error aborts the
    /// batch and is returned.
    pub async fn run_batch<G>(
        &self,
        generator: &mut G,
        problems: &[GenerationContext],
    ) -> Result<BatchReport>
    where
        G: Generator + ?Sized,
    {
        let batch_id = Uuid::new_v4();
        let mut reports = Vec::with_capacity(problems.len());
        for context in problems {
            match self.run_problem(generator, context).await {
                Ok(report) => reports.push(report),
                Err(err) => {
                    obs::emit_batch_aborted(&batch_id.to_string(), &context.problem_id, &err);
                    METRICS.flush();
                    return Err(err);
                }
            }
        }
        METRICS.flush();
        Ok(BatchReport {
            batch_id,
            problems: reports,
        })
    }

    /// Run the repair loop for one problem.
    pub async fn run_problem<G>(
        &self,
        generator: &mut G,
        context: &GenerationContext,
    ) -> Result<ProblemReport>
    where
        G: Generator + ?Sized,
    {
        let span = obs::ProblemSpan::new(
            &self.config.model_name,
            &self.config.run_name,
            &context.problem_id,
        );
        self.repair_loop(generator, context)
            .instrument(span.span())
            .await
    }

    async fn repair_loop<G>(
        &self,
        generator: &mut G,
        context: &GenerationContext,
    ) -> Result<ProblemReport>
    where
        G: Generator + ?Sized,
    {
        let problem_id = context.problem_id.as_str();
        let started = Instant::now();
        METRICS.inc_problems_started();

        let official = self.fixtures.load(problem_id, FixtureSet::Official).await?;
        let generated = self.fixtures.load(problem_id, FixtureSet::Generated).await?;
        obs::emit_problem_started(problem_id, official.len(), generated.len());
        if official.is_empty() && generated.is_empty() {
            warn!(problem_id, "no fixtures loaded");
        }

        let mut trail = StepTrail {
            logger: self.steps.as_ref(),
            problem_id,
            next_seq: 0,
        };
        let mut attempts = Vec::new();
        let mut state = RepairState::AwaitingResponse;
        let generation_started = Instant::now();
        let mut response = generator.generate(context).await?;
        self.record_latency(problem_id, generation_started.elapsed().as_millis() as u64)
            .await?;
        let mut ordinal = 0;

        while !state.is_terminal() {
            ordinal += 1;
            let budget = AttemptBudget::new(ordinal, self.config.max_reprompts);
            METRICS.inc_attempts();
            obs::emit_attempt_started(problem_id, ordinal);

            state = transition(state, RepairEvent::ResponseReceived, budget)?;
            let evaluation = self
                .evaluate(&mut trail, state, budget, &response, &official, &generated)
                .await?;
            state = evaluation.state;
            let attempt = evaluation.attempt;

            if let Some(diagnostic) = attempt.diagnostic.clone() {
                state = transition(state, RepairEvent::Continue, budget)?;
                let kind = reprompt_kind(&attempt.outcome, state);
                if let Some(kind) = kind {
                    trail.write(kind, ordinal, &diagnostic).await?;
                }
                if state == RepairState::Reprompting {
                    METRICS.inc_reprompts();
                    obs::emit_reprompt_sent(problem_id, ordinal, kind.map_or("", |k| k.as_str()));
                    attempts.push(attempt);
                    response = generator.continue_generation(&diagnostic).await?;
                    continue;
                }
            }
            attempts.push(attempt);
        }

        let outcome = if state == RepairState::Passed {
            METRICS.inc_problems_passed();
            ProblemOutcome::Passed
        } else {
            METRICS.inc_problems_exhausted();
            ProblemOutcome::Exhausted
        };
        obs::emit_problem_finished(
            problem_id,
            ordinal,
            outcome == ProblemOutcome::Passed,
            started.elapsed().as_millis() as u64,
        );
        Ok(ProblemReport {
            problem_id: problem_id.to_string(),
            outcome,
            attempts,
        })
    }

    /// Extract, analyze and (when clean) execute one response. Every failure
    /// is persisted before the state moves.
    async fn evaluate(
        &self,
        trail: &mut StepTrail<'_>,
        state: RepairState,
        budget: AttemptBudget,
        response: &str,
        official: &[TestCase],
        generated: &[TestCase],
    ) -> Result<Evaluation> {
        let problem_id = trail.problem_id;
        let ordinal = budget.attempt;
        let tag = attempt_tag(ordinal);

        trail.write(StepKind::Response, ordinal, response).await?;
        let candidate = extract(response);
        trail.write(StepKind::Code, ordinal, candidate.as_str()).await?;

        let Some(code) = candidate.code() else {
            obs::emit_static_failure(problem_id, ordinal, "code not found");
            self.persist_static(problem_id, &tag, diagnostics::CODE_NOT_FOUND, official, generated)
                .await?;
            return Ok(Evaluation {
                state: transition(state, RepairEvent::CodeMissing, budget)?,
                attempt: RepairAttempt {
                    ordinal,
                    diagnostic: Some(diagnostics::CODE_NOT_FOUND.to_string()),
                    outcome: AttemptOutcome::CodeNotFound,
                    source_digest: None,
                },
            });
        };
        let source_digest = Some(ContentDigest::from_bytes(code.as_bytes()));

        let analyzed = self.analyzer.analyze(code)?;
        trail
            .write(
                StepKind::Analysis,
                ordinal,
                &AnalysisReport::from_outcome(&analyzed).to_pretty_json(),
            )
            .await?;

        let static_diagnostic = match &analyzed {
            Err(failure) => Some(diagnostics::syntax_diagnostic(failure)),
            Ok(analysis) => diagnostics::issues_diagnostic(&analysis.call_graph),
        };
        if let Some(diagnostic) = static_diagnostic {
            obs::emit_static_failure(problem_id, ordinal, "static issues");
            self.persist_static(problem_id, &tag, &diagnostic, official, generated)
                .await?;
            return Ok(Evaluation {
                state: transition(state, RepairEvent::StaticIssues, budget)?,
                attempt: RepairAttempt {
                    ordinal,
                    diagnostic: Some(diagnostic),
                    outcome: AttemptOutcome::StaticInvalid,
                    source_digest,
                },
            });
        }
        let state = transition(state, RepairEvent::StaticClean, budget)?;

        let entry_point = analyzed
            .ok()
            .and_then(|a| a.entry_point().map(str::to_string));
        let Some(entry_point) = entry_point else {
            obs::emit_static_failure(problem_id, ordinal, "entry point not found");
            self.persist_static(
                problem_id,
                &tag,
                diagnostics::ENTRY_POINT_NOT_FOUND,
                official,
                generated,
            )
            .await?;
            return Ok(Evaluation {
                state: transition(state, RepairEvent::EntryPointMissing, budget)?,
                attempt: RepairAttempt {
                    ordinal,
                    diagnostic: Some(diagnostics::ENTRY_POINT_NOT_FOUND.to_string()),
                    outcome: AttemptOutcome::EntryPointNotFound,
                    source_digest,
                },
            });
        };
        let state = transition(state, RepairEvent::EntryPointFound, budget)?;
        debug!(problem_id, entry_point = %entry_point, "running fixtures");

        let mut classes = BTreeSet::new();
        let mut passed = 0;
        let mut total = 0;
        for (set, cases) in [
            (FixtureSet::Official, official),
            (FixtureSet::Generated, generated),
        ] {
            let report = self.executor.run(code, &entry_point, cases).await;
            METRICS.add_units_executed(report.results.len() as u64);
            obs::emit_tests_evaluated(
                problem_id,
                ordinal,
                set.as_str(),
                report.passed_count(),
                report.results.len(),
            );
            passed += report.passed_count();
            total += report.results.len();
            let ExecutionReport {
                results,
                error_classes,
            } = report;
            classes.extend(error_classes);
            self.persist(problem_id, &tag, set, results).await?;
        }

        if classes.is_empty() {
            return Ok(Evaluation {
                state: transition(state, RepairEvent::TestsPassed, budget)?,
                attempt: RepairAttempt {
                    ordinal,
                    diagnostic: None,
                    outcome: AttemptOutcome::Completed { passed, total },
                    source_digest,
                },
            });
        }

        let diagnostic = diagnostics::runtime_diagnostic(&classes);
        Ok(Evaluation {
            state: transition(state, RepairEvent::TestsFailed, budget)?,
            attempt: RepairAttempt {
                ordinal,
                diagnostic: Some(diagnostic),
                outcome: AttemptOutcome::RuntimeFailed {
                    passed,
                    total,
                    error_classes: classes.into_iter().collect(),
                },
                source_digest,
            },
        })
    }

    /// Persist how long the first generation took. Follow-up generations
    /// are not timed.
    async fn record_latency(&self, problem_id: &str, response_time_ms: u64) -> Result<()> {
        obs::emit_generation_timed(problem_id, response_time_ms);
        let metric = GenerationMetric {
            model_name: self.config.model_name.clone(),
            run_name: self.config.run_name.clone(),
            problem_id: problem_id.to_string(),
            response_time_ms,
            recorded_at: Utc::now(),
        };
        self.store.record_metric(&metric).await?;
        Ok(())
    }

    async fn persist(
        &self,
        problem_id: &str,
        tag: &str,
        fixture_set: FixtureSet,
        results: Vec<TestResult>,
    ) -> Result<()> {
        let record = AttemptRecord {
            model_name: self.config.model_name.clone(),
            run_name: self.config.run_name.clone(),
            problem_id: problem_id.to_string(),
            attempt_tag: tag.to_string(),
            fixture_set,
            results,
            recorded_at: Utc::now(),
        };
        self.store.record(&record).await?;
        Ok(())
    }

    /// Synthetic failed results for both fixture sets.
    async fn persist_static(
        &self,
        problem_id: &str,
        tag: &str,
        diagnostic: &str,
        official: &[TestCase],
        generated: &[TestCase],
    ) -> Result<()> {
        let error = diagnostics::static_error(diagnostic);
        for (set, cases) in [
            (FixtureSet::Official, official),
            (FixtureSet::Generated, generated),
        ] {
            let results = cases
                .iter()
                .map(|case| TestResult::failed(case, error.clone()))
                .collect();
            self.persist(problem_id, tag, set, results).await?;
        }
        Ok(())
    }
}

/// Attempt tag persisted on every record, e.g. `reprompt_2`.
pub fn attempt_tag(ordinal: u32) -> String {
    format!("reprompt_{ordinal}")
}

/// Step kind recording the diagnostic after `Continue`. Budget exhaustion
/// only leaves an artifact for static issues.
fn reprompt_kind(outcome: &AttemptOutcome, state: RepairState) -> Option<StepKind> {
    let reprompting = state == RepairState::Reprompting;
    match outcome {
        AttemptOutcome::StaticInvalid if reprompting => Some(StepKind::Reprompt),
        AttemptOutcome::StaticInvalid => Some(StepKind::RepromptFinal),
        AttemptOutcome::RuntimeFailed { .. } if reprompting => Some(StepKind::RepromptRuntime),
        AttemptOutcome::EntryPointNotFound if reprompting => Some(StepKind::RepromptEntryNotFound),
        AttemptOutcome::CodeNotFound if reprompting => Some(StepKind::RepromptCodeNotFound),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_tag_format() {
        assert_eq!(attempt_tag(3), "reprompt_3");
    }

    #[test]
    fn final_static_failure_gets_final_artifact() {
        assert_eq!(
            reprompt_kind(&AttemptOutcome::StaticInvalid, RepairState::Exhausted),
            Some(StepKind::RepromptFinal)
        );
        assert_eq!(
            reprompt_kind(&AttemptOutcome::StaticInvalid, RepairState::Reprompting),
            Some(StepKind::Reprompt)
        );
    }

    #[test]
    fn exhaustion_on_other_failures_writes_nothing() {
        let runtime = AttemptOutcome::RuntimeFailed {
            passed: 0,
            total: 1,
            error_classes: vec!["boom".to_string()],
        };
        assert_eq!(reprompt_kind(&runtime, RepairState::Exhausted), None);
        assert_eq!(
            reprompt_kind(&AttemptOutcome::CodeNotFound, RepairState::Exhausted),
            None
        );
        assert_eq!(
            reprompt_kind(&AttemptOutcome::EntryPointNotFound, RepairState::Reprompting),
            Some(StepKind::RepromptEntryNotFound)
        );
    }
}
