//! Static analysis of a candidate program.
//!
//! The source is dedented and parsed through a [`SyntaxProvider`]. Each
//! top-level function becomes a [`FunctionRecord`] carrying its callee set and
//! issue tags; functions no other function calls are entry-point candidates.

mod outline;
mod python;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use outline::{FunctionOutline, ModuleOutline, ReturnExpr, SyntaxFailure, SyntaxProvider};
pub use python::TreeSitterPython;

use crate::error::Result;
use crate::extract::dedent;

/// Structural defect of a single function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueTag {
    /// Reads interactive input instead of taking parameters.
    InputArgument,
    /// No explicit `return` statement at all.
    MissingReturn,
    /// Returns a string concatenation or an f-string.
    ReturnWithString,
}

impl IssueTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputArgument => "input-argument",
            Self::MissingReturn => "missing-return",
            Self::ReturnWithString => "return-with-string",
        }
    }
}

impl fmt::Display for IssueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRecord {
    pub name: String,
    /// Callee names, self-calls excluded.
    pub callees: BTreeSet<String>,
    pub issues: BTreeSet<IssueTag>,
}

impl FunctionRecord {
    fn from_outline(outline: &FunctionOutline) -> Self {
        let mut issues = BTreeSet::new();
        if outline.calls.iter().any(|c| c == "input") {
            issues.insert(IssueTag::InputArgument);
        }
        if outline.returns.is_empty() {
            issues.insert(IssueTag::MissingReturn);
        }
        if outline
            .returns
            .iter()
            .flatten()
            .any(ReturnExpr::builds_string)
        {
            issues.insert(IssueTag::ReturnWithString);
        }
        Self {
            name: outline.name.clone(),
            callees: outline
                .calls
                .iter()
                .filter(|c| **c != outline.name)
                .cloned()
                .collect(),
            issues,
        }
    }

    fn merge(&mut self, other: FunctionRecord) {
        self.callees.extend(other.callees);
        self.issues.extend(other.issues);
    }
}

/// Function records in first-definition order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallGraph {
    functions: Vec<FunctionRecord>,
}

impl CallGraph {
    /// Build from an outline; repeated definitions of a name merge into the
    /// first.
    pub fn from_outline(outline: &ModuleOutline) -> Self {
        let mut graph = Self::default();
        for function in &outline.functions {
            let record = FunctionRecord::from_outline(function);
            match graph.functions.iter_mut().find(|f| f.name == record.name) {
                Some(existing) => existing.merge(record),
                None => graph.functions.push(record),
            }
        }
        graph
    }

    pub fn get(&self, name: &str) -> Option<&FunctionRecord> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionRecord> {
        self.functions.iter()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Defined names that no other defined function calls, in source order.
    pub fn entry_points(&self) -> Vec<String> {
        let called: BTreeSet<&str> = self
            .functions
            .iter()
            .flat_map(|f| f.callees.iter().map(String::as_str))
            .collect();
        self.functions
            .iter()
            .filter(|f| !called.contains(f.name.as_str()))
            .map(|f| f.name.clone())
            .collect()
    }

    /// Functions with at least one issue, in source order.
    pub fn with_issues(&self) -> impl Iterator<Item = &FunctionRecord> {
        self.functions.iter().filter(|f| !f.issues.is_empty())
    }

    pub fn has_issues(&self) -> bool {
        self.with_issues().next().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub call_graph: CallGraph,
    pub entry_points: Vec<String>,
}

impl Analysis {
    /// The entry point the orchestrator runs: first in source order.
    pub fn entry_point(&self) -> Option<&str> {
        self.entry_points.first().map(String::as_str)
    }
}

/// Analyzer over a pluggable syntax provider.
#[derive(Debug, Clone, Default)]
pub struct StaticAnalyzer<P = TreeSitterPython> {
    provider: P,
}

impl StaticAnalyzer {
    pub fn python() -> Self {
        Self::default()
    }
}

impl<P: SyntaxProvider> StaticAnalyzer<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Analyze `source`. Pure and deterministic for identical input.
    pub fn analyze(&self, source: &str) -> Result<std::result::Result<Analysis, SyntaxFailure>> {
        let lines: Vec<&str> = source.lines().collect();
        let dedented = dedent(&lines).join("\n");

        let outline = match self.provider.outline(&dedented)? {
            Ok(outline) => outline,
            Err(failure) => return Ok(Err(failure)),
        };
        let call_graph = CallGraph::from_outline(&outline);
        let entry_points = call_graph.entry_points();
        Ok(Ok(Analysis {
            call_graph,
            entry_points,
        }))
    }
}

/// Analyze with the tree-sitter Python provider.
pub fn analyze(source: &str) -> Result<std::result::Result<Analysis, SyntaxFailure>> {
    StaticAnalyzer::python().analyze(source)
}

/// Issues reported for one function in an [`AnalysisReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionIssues {
    pub function: String,
    pub issues: Vec<IssueTag>,
}

/// Serializable analysis summary written as the `analysis` step artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub syntax_errors: Vec<String>,
    pub function_issues: Vec<FunctionIssues>,
    pub entry_point: Vec<String>,
}

impl AnalysisReport {
    pub fn from_outcome(outcome: &std::result::Result<Analysis, SyntaxFailure>) -> Self {
        match outcome {
            Err(failure) => Self {
                syntax_errors: vec![failure.message.clone()],
                ..Default::default()
            },
            Ok(analysis) => Self {
                syntax_errors: Vec::new(),
                function_issues: analysis
                    .call_graph
                    .iter()
                    .map(|f| FunctionIssues {
                        function: f.name.clone(),
                        issues: f.issues.iter().copied().collect(),
                    })
                    .collect(),
                entry_point: analysis.entry_points.clone(),
            },
        }
    }

    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
