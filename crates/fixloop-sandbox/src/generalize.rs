//! Error generalization: reduce raw runtime messages to stable classes.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use fixloop_state::TestResult;

/// Canonical error class for a unit that did not finish in time.
pub const EXECUTION_TIMEOUT: &str =
    "Execution timeout. Check if there are infinite loops and correct the code";

/// Canonical class for scoping errors caused by name shadowing.
pub const NAMING_CONFLICT: &str = "cannot access local variable (naming conflict)";

fn patterns() -> &'static [(Regex, &'static str)] {
    static RE: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RE.get_or_init(|| {
        [
            (r#":\s*['"].*?['"]"#, ":"),
            (r":\s*\d+", ":"),
            (r"\(.*?\)", "()"),
        ]
        .into_iter()
        .filter_map(|(p, rep)| Regex::new(p).ok().map(|re| (re, rep)))
        .collect()
    })
}

fn generalize_once(message: &str) -> String {
    let mut out = message.to_string();
    for (re, rep) in patterns() {
        out = re.replace_all(&out, *rep).into_owned();
    }
    out.trim().trim_end_matches(':').trim().to_string()
}

/// Map a raw error message to its error class.
///
/// Idempotent: generalizing an already generalized message returns it
/// unchanged.
pub fn generalize_error(message: &str) -> String {
    if message.contains("cannot access local variable") {
        return NAMING_CONFLICT.to_string();
    }
    if message.contains("Execution timeout") || message.contains("Timed out") {
        return EXECUTION_TIMEOUT.to_string();
    }

    let mut current = message.to_string();
    loop {
        let next = generalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Error classes of every failed result carrying a message.
pub fn error_classes<'a>(results: impl IntoIterator<Item = &'a TestResult>) -> BTreeSet<String> {
    results
        .into_iter()
        .filter_map(|r| r.error.as_deref())
        .filter(|e| !e.is_empty() && *e != "None")
        .map(generalize_error)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixloop_state::TestCase;
    use serde_json::json;

    #[test]
    fn strips_quoted_details() {
        assert_eq!(
            generalize_error("name 'foo' is not defined: 'foo'"),
            "name 'foo' is not defined"
        );
        assert_eq!(
            generalize_error("invalid literal for int() with base 10: 'abc'"),
            "invalid literal for int() with base 10"
        );
    }

    #[test]
    fn strips_numbers_and_call_args() {
        assert_eq!(generalize_error("list index out of range: 7"), "list index out of range");
        assert_eq!(
            generalize_error("f(1, 2) takes 1 positional argument"),
            "f() takes 1 positional argument"
        );
    }

    #[test]
    fn special_cases() {
        assert_eq!(
            generalize_error("cannot access local variable 'x' where it is not associated with a value"),
            NAMING_CONFLICT
        );
        assert_eq!(generalize_error("Timed out after 400ms"), EXECUTION_TIMEOUT);
        assert_eq!(generalize_error(EXECUTION_TIMEOUT), EXECUTION_TIMEOUT);
    }

    #[test]
    fn fixpoint_collapses_trailing_colons() {
        assert_eq!(generalize_error("bad value: : "), "bad value");
    }

    #[test]
    fn idempotent_on_samples() {
        for raw in [
            "unsupported operand type(s) for +: 'int' and 'str'",
            "division by zero",
            "'NoneType' object is not subscriptable",
            "maximum recursion depth exceeded: 1000",
            "x: (a: 'b')",
            "",
        ] {
            let once = generalize_error(raw);
            assert_eq!(generalize_error(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn error_classes_skip_empty_and_none() {
        let case = TestCase::single(json!(1), json!(2));
        let results = vec![
            TestResult::failed(&case, "division by zero"),
            TestResult::failed(&case, "None"),
            TestResult::failed(&case, ""),
            TestResult::failed(&case, "division by zero"),
        ];
        let classes = error_classes(&results);
        assert_eq!(classes.len(), 1);
        assert!(classes.contains("division by zero"));
    }
}
