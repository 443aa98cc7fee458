//! Parser for dollar-delimited mathematical expressions.
//!
//! Turns the contents of a math segment into a first-order [`Term`] or
//! [`Formula`]:
//!
//! - chained relations `a < b < c` desugar to a left-associated
//!   conjunction `(less(a,b) & less(b,c))`;
//! - arrow, set, and other binary operators become function applications
//!   with canonical names (`to`, `setminus`, `cup`, `cap`, `times`, ...);
//! - subscripts become `subscript(base, sub)`;
//! - tuples become `pair(a,b)` (arity 2) or `tuple(...)`;
//! - set enumerations become `empty_set` / `singleton(a)` / `set_enum(...)`;
//! - set-builder notation emits the sentinel function `set_comp(...)`,
//!   post-processed by the sentence translator.
//!
//! Single-letter identifiers are variables; longer identifiers, numbers,
//! and bare LaTeX commands are constants. The parser is a hand-rolled
//! recursive descent over a total lexer, so arbitrary prose inside a
//! set-builder condition never derails tokenization.

mod lexer;
mod parser;

use std::error::Error;
use std::fmt;

use naproche_logic::{Formula, Term};

/// Result of parsing one math segment.
#[derive(Debug, Clone, PartialEq)]
pub enum MathExpr {
    /// The segment denotes an entity, e.g. `$\powerset{M}$`.
    Term(Term),
    /// The segment denotes a statement, e.g. `$x \in M$`.
    Formula(Formula),
}

impl MathExpr {
    /// The term, if the segment denotes one.
    pub fn into_term(self) -> Option<Term> {
        match self {
            MathExpr::Term(t) => Some(t),
            MathExpr::Formula(_) => None,
        }
    }

    /// The formula, if the segment denotes one.
    pub fn into_formula(self) -> Option<Formula> {
        match self {
            MathExpr::Formula(f) => Some(f),
            MathExpr::Term(_) => None,
        }
    }
}

/// Error produced when a math segment does not parse.
///
/// The sentence translator treats this as "the atom has no structured
/// form" and falls back to its word-level patterns.
#[derive(Debug, Clone, PartialEq)]
pub struct MathParseError {
    pub message: String,
    pub position: usize,
}

impl MathParseError {
    pub(crate) fn new(message: impl Into<String>, position: usize) -> Self {
        MathParseError {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for MathParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "math parse error at {}: {}", self.position, self.message)
    }
}

impl Error for MathParseError {}

/// Strip math delimiters (`$...$`, `$$...$$`, `\[...\]`) and a trailing
/// period from a raw math atom.
pub fn strip_delimiters(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(inner) = text.strip_prefix("$$").and_then(|t| t.strip_suffix("$$")) {
        text = inner;
    } else if let Some(inner) = text.strip_prefix('$').and_then(|t| t.strip_suffix('$')) {
        text = inner;
    } else if let Some(inner) = text.strip_prefix("\\[").and_then(|t| t.strip_suffix("\\]")) {
        text = inner;
    }
    text = text.trim();
    text.strip_suffix('.').map(str::trim_end).unwrap_or(text)
}

/// Parse one math segment (delimiters allowed) into a term or formula.
pub fn parse_math(raw: &str) -> Result<MathExpr, MathParseError> {
    let text = strip_delimiters(raw);
    parser::Parser::new(text).parse_expression_complete()
}

/// Parse a comma-separated list of terms, e.g. the `$X, Y$` of
/// "Let $X, Y$ be sets".
pub fn parse_math_terms(raw: &str) -> Result<Vec<Term>, MathParseError> {
    let text = strip_delimiters(raw);
    parser::Parser::new(text).parse_term_list_complete()
}
