//! Structured observability hooks for the repair loop.
//!
//! - Problem-scoped tracing spans via [`ProblemSpan`]
//! - Emission functions for lifecycle events: problem start/finish, attempt
//!   start, static failure, test evaluation, reprompt, batch abort
//!
//! Events are emitted at `info!` level (filter via `FIXLOOP_LOG`).

use tracing::{info, warn};

/// Span tagged with model, run and problem id.
///
/// The orchestrator is async, so it attaches the span with
/// `Instrument::instrument(problem_span.span())`; [`ProblemSpan::enter`] is for
/// synchronous callers.
pub struct ProblemSpan {
    span: tracing::Span,
}

impl ProblemSpan {
    pub fn new(model_name: &str, run_name: &str, problem_id: &str) -> Self {
        let span = tracing::info_span!(
            "fixloop.problem",
            model = %model_name,
            run = %run_name,
            problem_id = %problem_id,
        );
        Self { span }
    }

    /// Enter the span until the returned guard drops.
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    pub fn span(&self) -> tracing::Span {
        self.span.clone()
    }
}

pub fn emit_problem_started(problem_id: &str, fixtures_official: usize, fixtures_generated: usize) {
    info!(
        event = "problem.started",
        problem_id = %problem_id,
        fixtures_official = fixtures_official,
        fixtures_generated = fixtures_generated,
    );
}

pub fn emit_generation_timed(problem_id: &str, response_time_ms: u64) {
    info!(
        event = "generation.timed",
        problem_id = %problem_id,
        response_time_ms = response_time_ms,
    );
}

pub fn emit_attempt_started(problem_id: &str, attempt: u32) {
    info!(event = "attempt.started", problem_id = %problem_id, attempt = attempt);
}

/// Emit event: attempt stopped before execution (syntax, static issues,
/// code not found, entry point not found).
pub fn emit_static_failure(problem_id: &str, attempt: u32, reason: &str) {
    info!(
        event = "attempt.static_failure",
        problem_id = %problem_id,
        attempt = attempt,
        reason = %reason,
    );
}

/// Emit event: fixtures executed for an attempt.
pub fn emit_tests_evaluated(
    problem_id: &str,
    attempt: u32,
    fixture_set: &str,
    passed: usize,
    total: usize,
) {
    info!(
        event = "tests.evaluated",
        problem_id = %problem_id,
        attempt = attempt,
        fixture_set = %fixture_set,
        passed = passed,
        total = total,
    );
}

pub fn emit_reprompt_sent(problem_id: &str, attempt: u32, kind: &str) {
    info!(event = "reprompt.sent", problem_id = %problem_id, attempt = attempt, kind = %kind);
}

pub fn emit_problem_finished(problem_id: &str, attempts: u32, passed: bool, duration_ms: u64) {
    info!(
        event = "problem.finished",
        problem_id = %problem_id,
        attempts = attempts,
        passed = passed,
        duration_ms = duration_ms,
    );
}

/// Emit event: batch stopped on an orchestration error (warning level).
pub fn emit_batch_aborted(batch_id: &str, problem_id: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "batch.aborted",
        batch_id = %batch_id,
        problem_id = %problem_id,
        error = %error,
    );
}
