//! Python harness rendering.
//!
//! A unit is a standalone script: the candidate source and the fixture are
//! embedded as JSON string literals (valid Python string literals), the
//! candidate is bound with `exec` into a fresh namespace, and exactly one
//! JSON line is written to the real stdout.
//!
//! Results are normalized through JSON before comparison. Sets become lists
//! ordered by their compact JSON text, the same order
//! `fixloop_state::PyLiteral::into_json` gives fixture sets.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use fixloop_state::{TestCase, TestInput};

use crate::error::SandboxResult;

/// The single line a unit writes on success or handled failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessLine {
    pub actual: Option<Value>,
    pub passed: bool,
    pub error: Option<String>,
}

const TEMPLATE: &str = r#"import io
import json
import sys

_SRC = __SRC__
_ENTRY = __ENTRY__
_PAYLOAD = json.loads(__PAYLOAD__)


def _sort_key(value):
    return json.dumps(value, sort_keys=True, separators=(",", ":"), ensure_ascii=False)


def _canonical(value):
    if isinstance(value, (set, frozenset)):
        return sorted((_canonical(v) for v in value), key=_sort_key)
    if isinstance(value, (list, tuple)):
        return [_canonical(v) for v in value]
    if isinstance(value, dict):
        return {k: _canonical(v) for k, v in value.items()}
    return value


def _normalize(value):
    try:
        return json.loads(json.dumps(_canonical(value), allow_nan=False))
    except Exception:
        return repr(value)


_real_stdout = sys.stdout
sys.stdout = io.StringIO()
try:
    _ns = {"__name__": "__candidate__"}
    exec(compile(_SRC, "<candidate>", "exec"), _ns)
    _fn = _ns.get(_ENTRY)
    if _fn is None:
        raise NameError("name '%s' is not defined" % _ENTRY)
    if _PAYLOAD["args"] is not None:
        _result = _fn(*_PAYLOAD["args"])
    else:
        _result = _fn(_PAYLOAD["value"])
    if isinstance(_result, bool):
        _result = "Yes" if _result else "No"
    _actual = _normalize(_result)
    _line = {"actual": _actual, "passed": _actual == _PAYLOAD["expected"], "error": None}
except BaseException as _e:
    _line = {"actual": None, "passed": False, "error": str(_e) or type(_e).__name__}
finally:
    sys.stdout = _real_stdout

sys.stdout.write(json.dumps(_line) + "\n")
sys.stdout.flush()
"#;

/// Render the unit script for one fixture.
pub fn render_script(source: &str, entry_point: &str, case: &TestCase) -> SandboxResult<String> {
    let (args, value) = match &case.input {
        TestInput::Args(args) => (Value::Array(args.clone()), Value::Null),
        TestInput::Single(v) => (Value::Null, v.clone()),
    };
    let payload = json!({
        "args": args,
        "value": value,
        "expected": case.expected,
    });
    let payload_text = serde_json::to_string(&payload)?;

    // Placeholders are filled last-to-first so embedded text can never be
    // mistaken for a later placeholder.
    Ok(TEMPLATE
        .replacen("__PAYLOAD__", &serde_json::to_string(&payload_text)?, 1)
        .replacen("__ENTRY__", &serde_json::to_string(entry_point)?, 1)
        .replacen("__SRC__", &serde_json::to_string(source)?, 1))
}

/// Parse the last non-empty stdout line as a [`HarnessLine`].
pub fn parse_output(stdout: &str) -> Option<HarnessLine> {
    let line = stdout.lines().rev().find(|l| !l.trim().is_empty())?;
    serde_json::from_str(line.trim()).ok()
}
