//! AST-based symbol extraction via tree-sitter.
//!
//! Walks only the top level of a Python module: a function definition at
//! top level becomes a top-level function; a class definition at top
//! level contributes its name and the functions directly inside its body
//! (one nesting level, not recursive). Functions nested inside other
//! functions or deeper blocks are not collected.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::warn;
use tree_sitter::{Language, Node, Parser};

use crate::error::{IndexError, Result};

/// Hierarchical symbol map for a single source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolMap {
    /// Class name → ascending-sorted method names.
    pub classes: BTreeMap<String, Vec<String>>,
    /// Ascending-sorted functions not nested in any class.
    pub top_level_functions: Vec<String>,
}

impl SymbolMap {
    /// Whether no symbols were found.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.top_level_functions.is_empty()
    }
}

/// Python source symbol extractor.
///
/// The extractor applies to Python files only; other file types pass
/// through with an empty symbol map unless the caller supplies symbols
/// itself.
pub struct SymbolExtractor {
    parser: Parser,
}

impl SymbolExtractor {
    /// Create an extractor with the Python grammar loaded.
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language: Language = tree_sitter_python::LANGUAGE.into();
        parser
            .set_language(&language)
            .map_err(|e| IndexError::Language(format!("Failed to set Python language: {}", e)))?;
        Ok(Self { parser })
    }

    /// Extract symbols from a file on disk.
    ///
    /// Non-Python extensions, unreadable files, and syntax errors all
    /// yield an empty map; extraction never aborts the surrounding index
    /// operation.
    pub fn extract_file(&mut self, path: &Path) -> SymbolMap {
        if path.extension().and_then(|e| e.to_str()) != Some("py") {
            return SymbolMap::default();
        }

        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                warn!("Could not read {:?} for symbol extraction: {}", path, e);
                return SymbolMap::default();
            }
        };

        self.extract_source(&source)
    }

    /// Extract symbols from Python source text.
    pub fn extract_source(&mut self, source: &str) -> SymbolMap {
        let Some(tree) = self.parser.parse(source, None) else {
            warn!("Parser returned no tree; skipping symbol extraction");
            return SymbolMap::default();
        };

        let root = tree.root_node();
        if root.has_error() {
            warn!("Syntax errors in source; skipping symbol extraction");
            return SymbolMap::default();
        }

        let mut symbols = SymbolMap::default();

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match resolve_definition(child) {
                Some(node) if node.kind() == "function_definition" => {
                    if let Some(name) = node_name(node, source) {
                        symbols.top_level_functions.push(name);
                    }
                }
                Some(node) if node.kind() == "class_definition" => {
                    if let Some(name) = node_name(node, source) {
                        let methods = class_methods(node, source);
                        symbols.classes.insert(name, methods);
                    }
                }
                _ => {}
            }
        }

        symbols.top_level_functions.sort();
        symbols
    }
}

/// Look through a `decorated_definition` wrapper to the definition inside.
fn resolve_definition(node: Node) -> Option<Node> {
    match node.kind() {
        "decorated_definition" => node.child_by_field_name("definition"),
        "function_definition" | "class_definition" => Some(node),
        _ => None,
    }
}

/// The identifier of a function or class definition.
fn node_name(node: Node, source: &str) -> Option<String> {
    let name = node.child_by_field_name("name")?;
    name.utf8_text(source.as_bytes())
        .ok()
        .map(|s| s.to_string())
}

/// Function definitions directly inside a class body, sorted ascending.
fn class_methods(class_node: Node, source: &str) -> Vec<String> {
    let Some(body) = class_node.child_by_field_name("body") else {
        return Vec::new();
    };

    let mut methods = Vec::new();
    let mut cursor = body.walk();
    for stmt in body.named_children(&mut cursor) {
        if let Some(node) = resolve_definition(stmt)
            && node.kind() == "function_definition"
            && let Some(name) = node_name(node, source)
        {
            methods.push(name);
        }
    }

    methods.sort();
    methods
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
