//! End-to-end units against a real interpreter.
//!
//! Every test returns early when `python3` is not on PATH.

use fixloop_sandbox::{SandboxConfig, SandboxExecutor, EXECUTION_TIMEOUT};
use fixloop_state::{parse_literal, TestCase};
use serde_json::json;

fn python_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

macro_rules! require_python {
    () => {
        if !python_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
    };
}

fn executor() -> SandboxExecutor {
    SandboxExecutor::python(SandboxConfig {
        per_test_timeout_ms: 2_000,
        ..Default::default()
    })
}

#[tokio::test]
async fn add_one_passes_all_fixtures() {
    require_python!();
    let src = "def add_one(x):\n    return x + 1\n";
    let cases = vec![
        TestCase::single(json!(1), json!(2)),
        TestCase::single(json!(2), json!(3)),
    ];

    let report = executor().run(src, "add_one", &cases).await;

    assert!(report.all_passed(), "{:?}", report.results);
    assert!(report.error_classes.is_empty());
    assert_eq!(report.results[1].actual, Some(json!(3)));
}

fn literal(src: &str) -> serde_json::Value {
    parse_literal(src).unwrap().into_json()
}

#[tokio::test]
async fn returned_sets_match_set_literals() {
    require_python!();
    let src = "def evens(xs):\n    return {x for x in xs if x % 2 == 0}\n\ndef groups(n):\n    return [frozenset({'b', 'a'}), {n, 10}]\n";

    let evens = executor()
        .run(
            src,
            "evens",
            &[TestCase::single(json!([4, 1, 2, 10]), literal("{10, 4, 2}"))],
        )
        .await;
    assert!(evens.all_passed(), "{:?}", evens.results);
    assert_eq!(evens.results[0].actual, Some(json!([10, 2, 4])));

    let groups = executor()
        .run(
            src,
            "groups",
            &[TestCase::single(json!(9), literal("[{'a', 'b'}, {9, 10}]"))],
        )
        .await;
    assert!(groups.all_passed(), "{:?}", groups.results);
}

#[tokio::test]
async fn integers_beyond_64_bits_compare_exactly() {
    require_python!();
    let src = "def big(n):\n    return 10 ** n + 1\n";
    let expected = literal("100000000000000000001");

    let report = executor()
        .run(
            src,
            "big",
            &[
                TestCase::single(json!(20), expected.clone()),
                TestCase::single(json!(21), expected.clone()),
            ],
        )
        .await;

    assert!(report.results[0].passed, "{:?}", report.results);
    assert_eq!(report.results[0].actual, Some(expected));
    assert!(!report.results[1].passed);
    assert_eq!(
        report.results[1].actual.as_ref().map(|v| v.to_string()).as_deref(),
        Some("1000000000000000000001")
    );
}

#[tokio::test]
async fn tuple_input_is_unpacked() {
    require_python!();
    let src = "def add(a, b):\n    return a + b\n";
    let cases = vec![TestCase::args(vec![json!(2), json!(5)], json!(7))];

    let report = executor().run(src, "add", &cases).await;

    assert!(report.all_passed(), "{:?}", report.results);
}

#[tokio::test]
async fn booleans_become_yes_no_and_tuples_equal_lists() {
    require_python!();
    let src = "def check(x):\n    return x > 0\n\ndef pair(x):\n    return (x, x)\n";

    let yes_no = executor()
        .run(
            src,
            "check",
            &[
                TestCase::single(json!(1), json!("Yes")),
                TestCase::single(json!(-1), json!("No")),
            ],
        )
        .await;
    assert!(yes_no.all_passed(), "{:?}", yes_no.results);

    let pair = executor()
        .run(src, "pair", &[TestCase::single(json!(4), json!([4, 4]))])
        .await;
    assert!(pair.all_passed(), "{:?}", pair.results);
}

#[tokio::test]
async fn candidate_prints_do_not_corrupt_the_result() {
    require_python!();
    let src = "def f(x):\n    print('debug', x)\n    return x * 2\n";

    let report = executor()
        .run(src, "f", &[TestCase::single(json!(3), json!(6))])
        .await;

    assert!(report.all_passed(), "{:?}", report.results);
}

#[tokio::test]
async fn raised_errors_are_captured_and_generalized() {
    require_python!();
    let src = "def f(x):\n    raise ValueError('bad value: 3')\n\ndef g(x):\n    raise KeyError()\n";

    let report = executor()
        .run(src, "f", &[TestCase::single(json!(1), json!(1))])
        .await;
    assert_eq!(report.results[0].error.as_deref(), Some("bad value: 3"));
    assert!(report.error_classes.contains("bad value"));

    let empty_msg = executor()
        .run(src, "g", &[TestCase::single(json!(1), json!(1))])
        .await;
    assert_eq!(empty_msg.results[0].error.as_deref(), Some("KeyError"));
}

#[tokio::test]
async fn missing_entry_point_is_a_name_error() {
    require_python!();
    let report = executor()
        .run("def f(x):\n    return x\n", "nope", &[TestCase::single(json!(1), json!(1))])
        .await;
    assert_eq!(
        report.results[0].error.as_deref(),
        Some("name 'nope' is not defined")
    );
}

#[tokio::test]
async fn infinite_loop_hits_per_test_timeout() {
    require_python!();
    let src = "def spin(x):\n    while True:\n        pass\n";
    let exec = SandboxExecutor::python(SandboxConfig {
        per_test_timeout_ms: 400,
        ..Default::default()
    });

    let report = exec
        .run(src, "spin", &[TestCase::single(json!(1), json!(1))])
        .await;

    assert!(!report.results[0].passed);
    assert_eq!(report.results[0].error.as_deref(), Some(EXECUTION_TIMEOUT));
}

#[tokio::test]
async fn hard_exit_is_invalid_json_output() {
    require_python!();
    let src = "import os\n\ndef f(x):\n    os._exit(0)\n";

    let report = executor()
        .run(src, "f", &[TestCase::single(json!(1), json!(1))])
        .await;

    let err = report.results[0].error.as_deref().unwrap();
    assert!(err.starts_with("Invalid JSON output:"), "{err}");
}
