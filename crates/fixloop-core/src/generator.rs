//! Generative collaborator boundary.
//!
//! A [`Generator`] owns its conversation: `generate` starts a fresh one for a
//! problem, `continue_generation` appends a diagnostic to it and returns the
//! next response.

use std::collections::VecDeque;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What the generator needs to start a problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationContext {
    pub problem_id: String,
    pub prompt: String,
}

impl GenerationContext {
    pub fn new(problem_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            problem_id: problem_id.into(),
            prompt: prompt.into(),
        }
    }
}

#[async_trait]
pub trait Generator: Send {
    /// Start a new conversation and return the first response.
    async fn generate(&mut self, context: &GenerationContext) -> anyhow::Result<String>;

    /// Send a diagnostic in the current conversation and return the reply.
    async fn continue_generation(&mut self, diagnostic: &str) -> anyhow::Result<String>;
}

/// Replays canned responses in order and records every diagnostic it
/// receives. Running out of responses is an error.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    responses: VecDeque<String>,
    /// Repeated forever once the queue is empty.
    fallback: Option<String>,
    contexts: Vec<GenerationContext>,
    diagnostics: Vec<String>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// A generator that always answers with `response`.
    pub fn repeating(response: impl Into<String>) -> Self {
        Self {
            fallback: Some(response.into()),
            ..Default::default()
        }
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    pub fn contexts(&self) -> &[GenerationContext] {
        &self.contexts
    }

    fn next_response(&mut self) -> anyhow::Result<String> {
        match self.responses.pop_front() {
            Some(response) => Ok(response),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| anyhow::anyhow!("scripted generator exhausted")),
        }
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&mut self, context: &GenerationContext) -> anyhow::Result<String> {
        self.contexts.push(context.clone());
        self.next_response()
    }

    async fn continue_generation(&mut self, diagnostic: &str) -> anyhow::Result<String> {
        self.diagnostics.push(diagnostic.to_string());
        self.next_response()
    }
}
