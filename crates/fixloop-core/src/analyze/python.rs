//! tree-sitter backed [`SyntaxProvider`] for Python sources.

use std::cell::RefCell;

use tree_sitter::{Node, Parser};

use super::outline::{FunctionOutline, ModuleOutline, ReturnExpr, SyntaxFailure, SyntaxProvider};
use crate::error::{FixloopError, Result};

thread_local! {
    static PYTHON_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        // A failed language load surfaces as a missing tree at parse time.
        let _ = p.set_language(&tree_sitter_python::LANGUAGE.into());
        p
    });
}

/// Python provider using a thread-local tree-sitter parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeSitterPython;

impl SyntaxProvider for TreeSitterPython {
    fn outline(&self, source: &str) -> Result<std::result::Result<ModuleOutline, SyntaxFailure>> {
        let tree = PYTHON_PARSER
            .with(|p| p.borrow_mut().parse(source, None))
            .ok_or_else(|| FixloopError::Parser("tree-sitter produced no tree".to_string()))?;
        let root = tree.root_node();

        if root.has_error() {
            return Ok(Err(first_syntax_error(&root)));
        }

        let functions = named_children(&root)
            .into_iter()
            .filter_map(analyzable_unit)
            .map(|(unit, def)| function_outline(&unit, &def, source))
            .collect();
        Ok(Ok(ModuleOutline { functions }))
    }
}

fn named_children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn node_text<'s>(node: &Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// Pre-order search for the first ERROR or MISSING node.
fn first_syntax_error(root: &Node<'_>) -> SyntaxFailure {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        let line = node.start_position().row + 1;
        if node.is_missing() {
            return SyntaxFailure {
                message: format!("Syntax error: expected '{}' (line {line})", node.kind()),
            };
        }
        if node.is_error() {
            return SyntaxFailure {
                message: format!("Syntax error: invalid syntax (line {line})"),
            };
        }

        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return SyntaxFailure {
                    message: format!(
                        "Syntax error: invalid syntax (line {})",
                        root.start_position().row + 1
                    ),
                };
            }
        }
    }
}

fn is_async(node: &Node<'_>) -> bool {
    node.child(0).is_some_and(|c| c.kind() == "async")
}

/// Top-level, optionally decorated, non-async function definitions, paired
/// with the statement that holds them (the decorated wrapper when present).
fn analyzable_unit(node: Node<'_>) -> Option<(Node<'_>, Node<'_>)> {
    let def = match node.kind() {
        "function_definition" => node,
        "decorated_definition" => node.child_by_field_name("definition")?,
        _ => return None,
    };
    (def.kind() == "function_definition" && !is_async(&def)).then_some((node, def))
}

fn function_outline(unit: &Node<'_>, def: &Node<'_>, source: &str) -> FunctionOutline {
    let mut outline = FunctionOutline {
        name: def
            .child_by_field_name("name")
            .map(|n| node_text(&n, source).to_string())
            .unwrap_or_default(),
        ..Default::default()
    };
    // Calls in decorators belong to the decorated unit.
    for decorator in named_children(unit)
        .into_iter()
        .filter(|c| c.kind() == "decorator")
    {
        collect(&decorator, source, false, &mut outline);
    }
    for field in ["parameters", "return_type", "body"] {
        if let Some(child) = def.child_by_field_name(field) {
            collect(&child, source, false, &mut outline);
        }
    }
    outline
}

/// Gather call sites and owned return statements. Returns inside a nested
/// `def` belong to that scope; its call sites still count for the unit.
fn collect(node: &Node<'_>, source: &str, nested: bool, out: &mut FunctionOutline) {
    match node.kind() {
        "call" => {
            if let Some(name) = node
                .child_by_field_name("function")
                .and_then(|f| callee_name(&f, source))
            {
                out.calls.push(name);
            }
        }
        "return_statement" if !nested => out.returns.push(returned_expr(node, source)),
        _ => {}
    }

    let nested = nested || node.kind() == "function_definition";
    for child in named_children(node) {
        collect(&child, source, nested, out);
    }
}

fn callee_name(func: &Node<'_>, source: &str) -> Option<String> {
    match func.kind() {
        "identifier" => Some(node_text(func, source).to_string()),
        "attribute" => func
            .child_by_field_name("attribute")
            .map(|a| node_text(&a, source).to_string()),
        _ => None,
    }
}

fn first_expression<'t>(node: &Node<'t>) -> Option<Node<'t>> {
    named_children(node)
        .into_iter()
        .find(|c| c.kind() != "comment")
}

fn returned_expr(node: &Node<'_>, source: &str) -> Option<ReturnExpr> {
    first_expression(node).map(|expr| return_expr(&expr, source))
}

fn return_expr(node: &Node<'_>, source: &str) -> ReturnExpr {
    match node.kind() {
        "parenthesized_expression" => first_expression(node)
            .map(|inner| return_expr(&inner, source))
            .unwrap_or(ReturnExpr::Other),
        "string" => string_expr(node, source),
        "concatenated_string" => {
            let parts: Vec<ReturnExpr> = named_children(node)
                .iter()
                .filter(|c| c.kind() == "string")
                .map(|c| string_expr(c, source))
                .collect();
            if parts.contains(&ReturnExpr::Interpolation) {
                ReturnExpr::Interpolation
            } else if parts.iter().all(|p| *p == ReturnExpr::StringLiteral) {
                ReturnExpr::StringLiteral
            } else {
                ReturnExpr::Other
            }
        }
        "binary_operator" => {
            let is_add = node
                .child_by_field_name("operator")
                .is_some_and(|op| op.kind() == "+");
            match (
                is_add,
                node.child_by_field_name("left"),
                node.child_by_field_name("right"),
            ) {
                (true, Some(left), Some(right)) => {
                    ReturnExpr::add(return_expr(&left, source), return_expr(&right, source))
                }
                _ => ReturnExpr::Other,
            }
        }
        _ => ReturnExpr::Other,
    }
}

/// Classify a `string` node by its prefix: f-strings interpolate, bytes are
/// not text.
fn string_expr(node: &Node<'_>, source: &str) -> ReturnExpr {
    let mut cursor = node.walk();
    let mut prefix = String::new();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "interpolation" => return ReturnExpr::Interpolation,
            "string_start" => {
                prefix = node_text(&child, source)
                    .chars()
                    .take_while(|c| c.is_ascii_alphabetic())
                    .collect::<String>()
                    .to_ascii_lowercase();
            }
            _ => {}
        }
    }
    if prefix.contains('f') {
        ReturnExpr::Interpolation
    } else if prefix.contains('b') {
        ReturnExpr::Other
    } else {
        ReturnExpr::StringLiteral
    }
}
