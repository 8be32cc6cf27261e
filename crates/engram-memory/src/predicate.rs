//! Filter predicate construction for collection reads and deletes.
//!
//! All filters the store issues against the backing engine are simple
//! conjunctions of `field = literal` and `field LIKE '%substring%'`
//! comparisons. Literal escaping happens here and nowhere else: every
//! embedded single quote is doubled before the literal is rendered into
//! the SQL text.

use std::fmt::Write as _;

// ─────────────────────────────────────────────────────────────────────────────
// Escaping
// ─────────────────────────────────────────────────────────────────────────────

/// Escape a string for embedding in a single-quoted SQL literal.
///
/// Doubles every `'`. This is the only escaping rule the backing engine
/// requires.
pub fn escape_literal(raw: &str) -> String {
    raw.replace('\'', "''")
}

// ─────────────────────────────────────────────────────────────────────────────
// Literals
// ─────────────────────────────────────────────────────────────────────────────

/// A typed literal value on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Text literal, rendered single-quoted with escaping.
    Text(String),
    /// Floating-point literal, rendered in round-trip form.
    Real(f64),
    /// Integer literal.
    Int(i64),
}

impl Literal {
    fn render(&self, out: &mut String) {
        match self {
            Literal::Text(s) => {
                let _ = write!(out, "'{}'", escape_literal(s));
            }
            // {:?} formats f64 in shortest round-trip form and always
            // keeps a decimal point, so the engine parses it as REAL.
            Literal::Real(v) => {
                let _ = write!(out, "{:?}", v);
            }
            Literal::Int(v) => {
                let _ = write!(out, "{}", v);
            }
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Text(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Real(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Predicate
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Clause {
    Eq { field: &'static str, value: Literal },
    Contains { field: &'static str, needle: String },
}

/// A conjunction of field comparisons, rendered as a SQL `WHERE` body.
///
/// # Example
///
/// ```
/// use engram_memory::predicate::Predicate;
///
/// let p = Predicate::eq("content", "O'Brien's note").and_eq("timestamp", 12.5);
/// assert_eq!(p.to_sql(), "content = 'O''Brien''s note' AND timestamp = 12.5");
/// ```
#[derive(Debug, Clone)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    /// Exact equality on a field.
    pub fn eq(field: &'static str, value: impl Into<Literal>) -> Self {
        Self {
            clauses: vec![Clause::Eq {
                field,
                value: value.into(),
            }],
        }
    }

    /// Case-sensitive substring match on a field (`LIKE '%needle%'`).
    pub fn contains(field: &'static str, needle: impl Into<String>) -> Self {
        Self {
            clauses: vec![Clause::Contains {
                field,
                needle: needle.into(),
            }],
        }
    }

    /// Add an equality clause to the conjunction.
    pub fn and_eq(mut self, field: &'static str, value: impl Into<Literal>) -> Self {
        self.clauses.push(Clause::Eq {
            field,
            value: value.into(),
        });
        self
    }

    /// Render the predicate as SQL text with all literals escaped.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                out.push_str(" AND ");
            }
            match clause {
                Clause::Eq { field, value } => {
                    let _ = write!(out, "{} = ", field);
                    value.render(&mut out);
                }
                Clause::Contains { field, needle } => {
                    let _ = write!(out, "{} LIKE '%{}%'", field, escape_literal(needle));
                }
            }
        }
        out
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
