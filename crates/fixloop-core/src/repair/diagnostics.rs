//! Reprompt texts sent back to the generator.

use std::collections::BTreeSet;

use crate::analyze::{CallGraph, IssueTag, SyntaxFailure};

pub const ISSUES_HEADER: &str = "Solve this issues in the provided code:\n";
pub const SYNTAX_ERROR: &str = "Fix the syntax error present in the provided code: ";
pub const INPUT_ARGUMENT: &str =
    "Code must accept input through function parameters, not input(). Correct the code";
pub const MISSING_RETURN: &str =
    "Code must return result using a return statement. Correct the code";
pub const RETURN_WITH_STRING: &str =
    "Code must return only the result without additional string or information. Correct the code";
pub const ENTRY_POINT_NOT_FOUND: &str =
    "The entry point of the function has not be found. Implement the logic using functions";
/// Sent when no code could be extracted; same wording as the entry-point case.
pub const CODE_NOT_FOUND: &str = ENTRY_POINT_NOT_FOUND;

fn issue_text(tag: IssueTag) -> &'static str {
    match tag {
        IssueTag::InputArgument => INPUT_ARGUMENT,
        IssueTag::MissingReturn => MISSING_RETURN,
        IssueTag::ReturnWithString => RETURN_WITH_STRING,
    }
}

/// Diagnostic for a source that does not parse. Only the first message is
/// reported.
pub fn syntax_diagnostic(failure: &SyntaxFailure) -> String {
    format!("{ISSUES_HEADER}{SYNTAX_ERROR}{}\n", failure.message)
}

/// One line per issue per offending function, in source then tag order.
/// `None` when no function has issues.
pub fn issues_diagnostic(graph: &CallGraph) -> Option<String> {
    let mut body = String::new();
    for function in graph.with_issues() {
        for tag in &function.issues {
            body.push_str(&format!("Function '{}': {}\n", function.name, issue_text(*tag)));
        }
    }
    (!body.is_empty()).then(|| format!("{ISSUES_HEADER}{body}"))
}

/// Diagnostic enumerating every runtime error class.
pub fn runtime_diagnostic(classes: &BTreeSet<String>) -> String {
    let errors = classes
        .iter()
        .map(|c| format!("  - {c}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Fix the runtime errors and rewrite the complete corrected code: {errors}")
}

/// Error message persisted on synthetic records for failures caught before
/// execution.
pub fn static_error(diagnostic: &str) -> String {
    format!("Static error: {diagnostic}")
}
