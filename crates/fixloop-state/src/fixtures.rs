//! File-backed fixture repository
//!
//! Layout: `<root>/<problem_id>/<set>.jsonl`, where `<set>` is `official`
//! or `generated`. Each file holds a JSON array whose first element is an
//! object with parallel `input` and `output` lists. Either list may be a
//! JSON array or a string containing a Python literal.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};

use crate::error::StorageError;
use crate::literal::{parse_literal, PyLiteral};
use crate::storage_traits::{FixtureRepository, FixtureSet, StorageResult, TestCase, TestInput};

/// Problems whose expected outputs are remapped to `"Yes"`/`"No"` by default.
pub const DEFAULT_YES_NO_PROBLEMS: &[&str] = &["p126"];

/// [`FixtureRepository`] reading fixture files from a directory tree.
#[derive(Debug, Clone)]
pub struct JsonFixtureRepository {
    root: PathBuf,
    yes_no_problems: BTreeSet<String>,
}

impl JsonFixtureRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            yes_no_problems: DEFAULT_YES_NO_PROBLEMS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }

    /// Replace the set of problems whose outputs are remapped to Yes/No.
    pub fn with_yes_no_problems<I, S>(mut self, problems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.yes_no_problems = problems.into_iter().map(Into::into).collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a fixture file.
    pub fn fixture_path(&self, problem_id: &str, set: FixtureSet) -> PathBuf {
        self.root
            .join(problem_id)
            .join(format!("{}.jsonl", set.as_str()))
    }

    async fn read(&self, problem_id: &str, set: FixtureSet) -> StorageResult<Vec<TestCase>> {
        let path = self.fixture_path(problem_id, set);
        let text = tokio::fs::read_to_string(&path).await?;
        let remap = self.yes_no_problems.contains(problem_id);
        parse_fixture_file(&text, &path.display().to_string(), remap)
    }
}

#[async_trait]
impl FixtureRepository for JsonFixtureRepository {
    /// Unreadable or malformed fixtures are logged and yield an empty set.
    async fn load(&self, problem_id: &str, set: FixtureSet) -> StorageResult<Vec<TestCase>> {
        match self.read(problem_id, set).await {
            Ok(cases) => {
                debug!(problem_id, set = %set, count = cases.len(), "fixtures loaded");
                Ok(cases)
            }
            Err(e) => {
                error!(problem_id, set = %set, error = %e, "failed to load fixtures");
                Ok(Vec::new())
            }
        }
    }
}

/// Parse the contents of one fixture file.
pub fn parse_fixture_file(
    text: &str,
    path: &str,
    yes_no: bool,
) -> StorageResult<Vec<TestCase>> {
    let malformed = |reason: String| StorageError::MalformedFixture {
        path: path.to_string(),
        reason,
    };

    let doc: Value = serde_json::from_str(text)?;
    let first = doc
        .as_array()
        .and_then(|a| a.first())
        .ok_or_else(|| malformed("expected a non-empty JSON array".to_string()))?;
    let raw_inputs = first
        .get("input")
        .ok_or_else(|| malformed("missing `input`".to_string()))?;
    let raw_outputs = first
        .get("output")
        .ok_or_else(|| malformed("missing `output`".to_string()))?;

    let inputs = decode_inputs(raw_inputs).map_err(&malformed)?;
    let mut outputs = decode_outputs(raw_outputs).map_err(&malformed)?;

    if yes_no {
        outputs = outputs.into_iter().map(yes_no_of).collect();
    }

    Ok(inputs
        .into_iter()
        .zip(outputs)
        .map(|(input, expected)| TestCase::new(input, expected))
        .collect())
}

fn literal_items(src: &str) -> Result<Vec<PyLiteral>, String> {
    match parse_literal(src).map_err(|e| e.to_string())? {
        PyLiteral::List(items) | PyLiteral::Tuple(items) | PyLiteral::Set(items) => Ok(items),
        _ => Err("literal is not a sequence".to_string()),
    }
}

fn decode_inputs(raw: &Value) -> Result<Vec<TestInput>, String> {
    match raw {
        Value::String(src) => Ok(literal_items(src)?
            .into_iter()
            .map(|item| match item {
                PyLiteral::Tuple(args) => {
                    TestInput::Args(args.into_iter().map(PyLiteral::into_json).collect())
                }
                other => TestInput::Single(other.into_json()),
            })
            .collect()),
        Value::Array(items) => Ok(items.iter().cloned().map(TestInput::Single).collect()),
        _ => Err("`input` must be a list or a literal string".to_string()),
    }
}

fn decode_outputs(raw: &Value) -> Result<Vec<Value>, String> {
    match raw {
        Value::String(src) => Ok(literal_items(src)?
            .into_iter()
            .map(PyLiteral::into_json)
            .collect()),
        Value::Array(items) => Ok(items.clone()),
        _ => Err("`output` must be a list or a literal string".to_string()),
    }
}

/// Python truthiness mapped onto `"Yes"`/`"No"`.
fn yes_no_of(v: Value) -> Value {
    let truthy = match &v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    };
    Value::String(if truthy { "Yes" } else { "No" }.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn literal_tuples_become_args() {
        let text = r#"[{"input": "[(1, 2), (3, 4), [5]]", "output": "[3, 7, 5]"}]"#;
        let cases = parse_fixture_file(text, "t", false).unwrap();
        assert_eq!(cases.len(), 3);
        assert_eq!(cases[0].input, TestInput::Args(vec![json!(1), json!(2)]));
        assert_eq!(cases[2].input, TestInput::Single(json!([5])));
        assert_eq!(cases[1].expected, json!(7));
    }

    #[test]
    fn json_lists_are_single_inputs() {
        let text = r#"[{"input": [[1, 2], 3], "output": [3, 3]}]"#;
        let cases = parse_fixture_file(text, "t", false).unwrap();
        assert_eq!(cases[0].input, TestInput::Single(json!([1, 2])));
    }

    #[test]
    fn yes_no_remap_uses_truthiness() {
        let text = r#"[{"input": [1, 2, 3], "output": [true, false, 0]}]"#;
        let cases = parse_fixture_file(text, "t", true).unwrap();
        let expected: Vec<_> = cases.iter().map(|c| c.expected.clone()).collect();
        assert_eq!(expected, vec![json!("Yes"), json!("No"), json!("No")]);
    }

    #[test]
    fn mismatched_lengths_truncate() {
        let text = r#"[{"input": [1, 2, 3], "output": [1]}]"#;
        assert_eq!(parse_fixture_file(text, "t", false).unwrap().len(), 1);
    }

    #[test]
    fn missing_output_is_malformed() {
        let err = parse_fixture_file(r#"[{"input": []}]"#, "p/official.jsonl", false).unwrap_err();
        assert!(matches!(err, StorageError::MalformedFixture { ref reason, .. } if reason.contains("output")));
    }
}
