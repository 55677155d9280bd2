//! Candidate program extraction from free-form generator text.
//!
//! Search order: fences tagged `python`/`python3`/`py`, then untagged fences
//! that look like Python, then a scan of raw prose for the longest run of
//! definition lines. Every kept block is cleaned (docstrings, comments, blank
//! lines, `__main__` guard and console prints removed) and dedented.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Textual sentinel for [`CandidateSource::NotFound`] in logs and step files.
pub const CODE_NOT_FOUND: &str = "code-not-found";

/// Cleaned program text, or the not-found sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSource {
    Found(String),
    NotFound,
}

impl CandidateSource {
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Found(code) => Some(code),
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn as_str(&self) -> &str {
        self.code().unwrap_or(CODE_NOT_FOUND)
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn tagged_fence() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"(?is)```(?:python3|python|py)\b[ \t]*\r?\n?(.*?)```")
}

fn any_fence() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"(?s)```(.*?)```")
}

fn fence_tag() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"^[A-Za-z0-9_+.#-]+$")
}

fn triple_quoted() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r#"(?s)""".*?"""|'''.*?'''"#)
}

fn block_start() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, r"^(def|class|import|from)\s+\w+")
}

fn python_indicators() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"\bdef\s+\w+\s*\(",
            r"\bclass\s+\w+",
            r"\bimport\s+\w+",
            r"\bfrom\s+\w+\s+import",
            r"\breturn\s+",
            r"\bif\s+.*:",
            r"\bfor\s+\w+\s+in\s+",
            r"\bwhile\s+.*:",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Extract the candidate program from a response.
pub fn extract(text: &str) -> CandidateSource {
    let tagged = fence_bodies(tagged_fence(), text);
    if let Some(code) = join_cleaned(tagged) {
        return CandidateSource::Found(code);
    }

    let untagged: Vec<&str> = fence_bodies(any_fence(), text)
        .into_iter()
        .filter_map(untagged_body)
        .filter(|body| looks_like_python(body))
        .collect();
    if let Some(code) = join_cleaned(untagged) {
        return CandidateSource::Found(code);
    }

    match largest_code_block(text).map(|block| clean_code(&block)) {
        Some(code) if !code.is_empty() => CandidateSource::Found(code),
        _ => CandidateSource::NotFound,
    }
}

fn fence_bodies<'t>(re: Option<&Regex>, text: &'t str) -> Vec<&'t str> {
    re.map(|re| {
        re.captures_iter(text)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect()
    })
    .unwrap_or_default()
}

fn join_cleaned(blocks: Vec<&str>) -> Option<String> {
    let cleaned: Vec<String> = blocks
        .into_iter()
        .map(clean_code)
        .filter(|c| !c.is_empty())
        .collect();
    (!cleaned.is_empty()).then(|| cleaned.join("\n\n"))
}

/// Body of a fence with no language tag. A single word alone on the opening
/// line is a tag; tagged fences are not considered here.
fn untagged_body(fence: &str) -> Option<&str> {
    match fence.split_once('\n') {
        Some((first, rest)) => {
            let first = first.trim();
            if first.is_empty() {
                Some(rest)
            } else if fence_tag().is_some_and(|re| re.is_match(first)) {
                None
            } else {
                Some(fence)
            }
        }
        None => Some(fence),
    }
}

pub fn looks_like_python(text: &str) -> bool {
    python_indicators().iter().any(|re| re.is_match(text))
}

/// Longest run of code lines in raw prose; the first wins ties.
fn largest_code_block(text: &str) -> Option<String> {
    let mut blocks: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_block = false;

    for line in text.lines() {
        let stripped = line.trim();
        let indented = line.starts_with(char::is_whitespace);

        if block_start().is_some_and(|re| re.is_match(stripped)) {
            in_block = true;
            current.push(line);
        } else if in_block {
            if line.is_empty() {
                continue;
            }
            if indented || stripped.is_empty() || stripped.starts_with('#') {
                current.push(line);
            } else {
                blocks.push(std::mem::take(&mut current));
                in_block = false;
            }
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    let mut best: Option<String> = None;
    for block in blocks {
        let joined = block.join("\n");
        if best.as_ref().map_or(true, |b| joined.len() > b.len()) {
            best = Some(joined);
        }
    }
    best
}

/// Clean one extracted block. Idempotent on already-clean input.
pub fn clean_code(code: &str) -> String {
    let without_docstrings = match triple_quoted() {
        Some(re) => re.replace_all(code, ""),
        None => code.into(),
    };

    let mut lines: Vec<String> = without_docstrings
        .lines()
        .map(strip_comment)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.trim_end().to_string())
        .collect();

    lines = drop_main_guard(dedent(&lines));
    replace_prints(lines).join("\n").trim_end().to_string()
}

/// Cut a line at the first `#` outside a string literal.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, ch) in line.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                '#' => return &line[..idx],
                _ => {}
            },
        }
    }
    line
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn is_main_guard(line: &str) -> bool {
    let stripped = line.trim();
    indent_of(line) == 0 && stripped.starts_with("if __name__") && stripped.contains("__main__")
}

/// Remove an unindented `if __name__ == "__main__":` guard and its body.
fn drop_main_guard(lines: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut inside = false;
    for line in lines {
        if is_main_guard(&line) {
            inside = true;
            continue;
        }
        if inside {
            if indent_of(&line) > 0 {
                continue;
            }
            inside = false;
        }
        out.push(line);
    }
    out
}

fn is_print(stripped: &str) -> bool {
    stripped.starts_with("print(") || stripped.starts_with("print ")
}

/// Net bracket depth change of a line, ignoring brackets inside strings.
fn bracket_delta(line: &str) -> i32 {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in line.chars() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                _ => {}
            },
        }
    }
    depth
}

/// Replace print statements with `pass` at the same indentation, swallowing
/// the continuation lines of a multi-line call.
fn replace_prints(lines: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut open = 0;
    for line in lines {
        if open > 0 {
            open += bracket_delta(&line);
            continue;
        }
        if is_print(line.trim()) {
            out.push(format!("{}pass", &line[..indent_of(&line)]));
            open = bracket_delta(&line).max(0);
            continue;
        }
        out.push(line);
    }
    out
}

/// Remove the whitespace prefix common to every line.
pub fn dedent<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let common = lines
        .iter()
        .map(|l| l.as_ref())
        .filter(|l| !l.trim().is_empty())
        .map(indent_of)
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| {
            let l = l.as_ref();
            if l.len() >= common && l.is_char_boundary(common) {
                l[common..].to_string()
            } else {
                l.trim_start().to_string()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_fence_is_preferred() {
        let text = "Here:\n```\ndef other():\n    return 0\n```\n\n```python\ndef f(x):\n    return x + 1\n```\n";
        assert_eq!(
            extract(text),
            CandidateSource::Found("def f(x):\n    return x + 1".to_string())
        );
    }

    #[test]
    fn tagged_fences_are_joined_and_case_insensitive() {
        let text = "```Python\nimport math\n```\ntext\n```py\ndef f(x):\n    return math.sqrt(x)\n```";
        assert_eq!(
            extract(text).code(),
            Some("import math\n\ndef f(x):\n    return math.sqrt(x)")
        );
    }

    #[test]
    fn untagged_fence_with_python_indicators() {
        let text = "```\nfor i in range(3):\n    total = i\n```";
        assert_eq!(
            extract(text).code(),
            Some("for i in range(3):\n    total = i")
        );
    }

    #[test]
    fn other_language_fences_are_ignored() {
        let text = "```javascript\nfunction f() { return 1; }\n```";
        assert_eq!(extract(text), CandidateSource::NotFound);
    }

    #[test]
    fn untagged_prose_fence_is_ignored() {
        assert_eq!(extract("```\njust words here\n```"), CandidateSource::NotFound);
    }

    #[test]
    fn prose_scan_keeps_longest_block() {
        let text = "Try this:\nimport os\nThen the real answer:\ndef solve(n):\n    if n < 0:\n        return 0\n\n    return n * 2\nThat is all.";
        assert_eq!(
            extract(text).code(),
            Some("def solve(n):\n    if n < 0:\n        return 0\n    return n * 2")
        );
    }

    #[test]
    fn prose_scan_first_block_wins_ties() {
        let text = "def a():\n    return 1\nword\ndef b():\n    return 2\n";
        assert_eq!(extract(text).code(), Some("def a():\n    return 1"));
    }

    #[test]
    fn nothing_found_is_sentinel() {
        let found = extract("I cannot help with that.");
        assert_eq!(found, CandidateSource::NotFound);
        assert_eq!(found.to_string(), CODE_NOT_FOUND);
    }

    #[test]
    fn block_that_cleans_to_nothing_falls_through() {
        let text = "```python\n# only a comment\n```\n```\ndef f(x):\n    return x\n```";
        assert_eq!(extract(text).code(), Some("def f(x):\n    return x"));
    }

    #[test]
    fn cleaning_removes_docstrings_comments_and_main_guard() {
        let code = "def f(x):\n    \"\"\"Doc.\n    More.\n    \"\"\"\n    y = '#not a comment'  # a comment\n\n    return y\n\nif __name__ == \"__main__\":\n    f(1)\n    f(2)\nz = 3\n";
        assert_eq!(
            clean_code(code),
            "def f(x):\n    y = '#not a comment'\n    return y\nz = 3"
        );
    }

    #[test]
    fn indented_main_check_is_kept() {
        let code = "def f():\n    if __name__ == '__main__':\n        return 1\n    return 2";
        assert_eq!(clean_code(code), code);
    }

    #[test]
    fn prints_become_pass_and_continuations_are_swallowed() {
        let code = "def f(x):\n    print(\"value:\",\n          x)\n    if x:\n        print 'old style'\n    return x";
        assert_eq!(
            clean_code(code),
            "def f(x):\n    pass\n    if x:\n        pass\n    return x"
        );
    }

    #[test]
    fn print_with_paren_in_string_does_not_swallow() {
        let code = "def f(x):\n    print(\"(\")\n    return x";
        assert_eq!(clean_code(code), "def f(x):\n    pass\n    return x");
    }

    #[test]
    fn cleaning_dedents() {
        let code = "    def f(x):\n        return x";
        assert_eq!(clean_code(code), "def f(x):\n    return x");
    }

    #[test]
    fn uniformly_indented_main_guard_is_removed() {
        let code = "    def f(x):\n        return x + 1\n\n    if __name__ == \"__main__\":\n        f(1)";
        assert_eq!(clean_code(code), "def f(x):\n    return x + 1");
    }

    #[test]
    fn cleaning_is_idempotent() {
        let code = "def f(x):  # c\n    print(x)\n    return x\n\nif __name__ == '__main__':\n    f(1)";
        let once = clean_code(code);
        assert_eq!(clean_code(&once), once);
    }

    #[test]
    fn extraction_is_deterministic() {
        let text = "Sure!\n```python\ndef f(x):\n    return x * 2\n```";
        assert_eq!(extract(text), extract(text));
    }
}
