//! Parser-independent module outline consumed by the analyzer.

use crate::error::Result;

/// Minimal return-expression tree. Only the shapes the string-return rule
/// needs are distinguished; everything else is `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnExpr {
    StringLiteral,
    /// f-string, or a concatenated string with an f-string part.
    Interpolation,
    Add(Box<ReturnExpr>, Box<ReturnExpr>),
    Other,
}

impl ReturnExpr {
    pub fn add(left: ReturnExpr, right: ReturnExpr) -> Self {
        Self::Add(Box::new(left), Box::new(right))
    }

    /// True if this expression is, or decomposes through nested additions
    /// into, a concatenation with a string-literal operand or an f-string.
    pub fn builds_string(&self) -> bool {
        match self {
            Self::Interpolation => true,
            Self::Add(left, right) => {
                left.is_string_literal()
                    || right.is_string_literal()
                    || left.builds_string()
                    || right.builds_string()
            }
            Self::StringLiteral | Self::Other => false,
        }
    }

    fn is_string_literal(&self) -> bool {
        matches!(self, Self::StringLiteral)
    }
}

/// One top-level function definition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionOutline {
    pub name: String,
    /// Resolved callee names in source order, self-calls included.
    pub calls: Vec<String>,
    /// One entry per return statement owned by this function; `None` for a
    /// bare `return`.
    pub returns: Vec<Option<ReturnExpr>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleOutline {
    /// Analyzable units in source order; duplicates are not merged here.
    pub functions: Vec<FunctionOutline>,
}

/// First parse diagnostic of a source that does not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxFailure {
    pub message: String,
}

impl std::fmt::Display for SyntaxFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Parses source text into a [`ModuleOutline`].
///
/// The outer `Result` is for provider failures (no parser available); the
/// inner one separates valid sources from syntax failures.
pub trait SyntaxProvider {
    fn outline(&self, source: &str) -> Result<std::result::Result<ModuleOutline, SyntaxFailure>>;
}
