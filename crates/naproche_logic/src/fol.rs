//! Owned first-order logic trees.
//!
//! Terms and formulas are plain owned enums (`String` names, `Vec`/`Box`
//! children) so that snapshots can be captured by value and shipped to
//! worker tasks without lifetimes. The `Display` impls produce the
//! canonical string form:
//!
//! - variables print upper-cased, constants lower-cased;
//! - `name(a1,...,an)` for applications and predicates;
//! - `L = R`, `~(F)`, `(L & R)`, `(L | R)`, `(L => R)`, `(L <=> R)`;
//! - `(! [X,Y] : (body))` and `(? [X] : (body))` for quantifiers.
//!
//! Symbols that do not match the TPTP lower-word rule are single-quoted
//! by the renderer; variable names are sanitized to upper words.

use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// TERMS
// =============================================================================

/// A first-order term: variable, constant, or function application.
///
/// Variable names carry upper-case semantics and constant names lower-case
/// semantics; the renderer enforces the case, so builders may pass names in
/// whatever case the source text used.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// A variable (e.g. `X`), rendered upper-cased.
    Variable(String),
    /// A constant (e.g. `empty_set`, `12`), rendered lower-cased.
    Constant(String),
    /// A function application `name(t1, ..., tn)`.
    Function(String, Vec<Term>),
}

impl Term {
    pub fn var(name: impl Into<String>) -> Term {
        Term::Variable(name.into())
    }

    pub fn constant(name: impl Into<String>) -> Term {
        Term::Constant(name.into())
    }

    pub fn func(name: impl Into<String>, args: Vec<Term>) -> Term {
        Term::Function(name.into(), args)
    }

    /// Collect the names of all variables occurring in this term.
    pub fn variables(&self, out: &mut BTreeSet<String>) {
        match self {
            Term::Variable(name) => {
                out.insert(name.clone());
            }
            Term::Constant(_) => {}
            Term::Function(_, args) => {
                for arg in args {
                    arg.variables(out);
                }
            }
        }
    }

    /// Replace every occurrence of the variable `var` by `replacement`.
    pub fn substitute(&self, var: &str, replacement: &Term) -> Term {
        match self {
            Term::Variable(name) if name == var => replacement.clone(),
            Term::Variable(_) | Term::Constant(_) => self.clone(),
            Term::Function(name, args) => Term::Function(
                name.clone(),
                args.iter().map(|a| a.substitute(var, replacement)).collect(),
            ),
        }
    }
}

// =============================================================================
// FORMULAS
// =============================================================================

/// Quantifier kind for [`Formula::Quantified`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantifierKind {
    /// Universal quantification, rendered `!`.
    Universal,
    /// Existential quantification, rendered `?`.
    Existential,
}

/// A first-order formula.
///
/// Connectives box their children; quantifiers carry an ordered bound
/// variable list. Structural equality doubles as formula identity for
/// caching purposes (two formulas with the same canonical string compare
/// equal).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    /// Atomic predicate `name(t1, ..., tn)`; nullary predicates print bare.
    Predicate(String, Vec<Term>),
    /// Equality `l = r`.
    Equal(Term, Term),
    /// Negation `~(f)`.
    Not(Box<Formula>),
    /// Conjunction `(l & r)`.
    And(Box<Formula>, Box<Formula>),
    /// Disjunction `(l | r)`.
    Or(Box<Formula>, Box<Formula>),
    /// Implication `(l => r)`.
    Implies(Box<Formula>, Box<Formula>),
    /// Biconditional `(l <=> r)`.
    Iff(Box<Formula>, Box<Formula>),
    /// Quantified formula over an ordered list of bound variable names.
    Quantified {
        kind: QuantifierKind,
        vars: Vec<String>,
        body: Box<Formula>,
    },
}

impl Formula {
    pub fn pred(name: impl Into<String>, args: Vec<Term>) -> Formula {
        Formula::Predicate(name.into(), args)
    }

    pub fn equal(left: Term, right: Term) -> Formula {
        Formula::Equal(left, right)
    }

    pub fn not(inner: Formula) -> Formula {
        Formula::Not(Box::new(inner))
    }

    pub fn and(left: Formula, right: Formula) -> Formula {
        Formula::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Formula, right: Formula) -> Formula {
        Formula::Or(Box::new(left), Box::new(right))
    }

    pub fn implies(left: Formula, right: Formula) -> Formula {
        Formula::Implies(Box::new(left), Box::new(right))
    }

    pub fn iff(left: Formula, right: Formula) -> Formula {
        Formula::Iff(Box::new(left), Box::new(right))
    }

    pub fn forall(vars: Vec<String>, body: Formula) -> Formula {
        Formula::Quantified {
            kind: QuantifierKind::Universal,
            vars,
            body: Box::new(body),
        }
    }

    pub fn exists(vars: Vec<String>, body: Formula) -> Formula {
        Formula::Quantified {
            kind: QuantifierKind::Existential,
            vars,
            body: Box::new(body),
        }
    }

    /// Fold a non-empty list of formulas into a left-associated conjunction.
    pub fn conjoin(mut formulas: Vec<Formula>) -> Option<Formula> {
        if formulas.is_empty() {
            return None;
        }
        let mut acc = formulas.remove(0);
        for f in formulas {
            acc = Formula::and(acc, f);
        }
        Some(acc)
    }

    /// The set of variable names occurring free in this formula.
    pub fn free_vars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_free(&mut out);
        out
    }

    fn collect_free(&self, out: &mut BTreeSet<String>) {
        match self {
            Formula::Predicate(_, args) => {
                for arg in args {
                    arg.variables(out);
                }
            }
            Formula::Equal(l, r) => {
                l.variables(out);
                r.variables(out);
            }
            Formula::Not(inner) => inner.collect_free(out),
            Formula::And(l, r)
            | Formula::Or(l, r)
            | Formula::Implies(l, r)
            | Formula::Iff(l, r) => {
                l.collect_free(out);
                r.collect_free(out);
            }
            Formula::Quantified { vars, body, .. } => {
                let mut inner = body.free_vars();
                for v in vars {
                    inner.remove(v);
                }
                out.extend(inner);
            }
        }
    }

    /// Capture-avoiding substitution of `var` by `replacement`.
    ///
    /// Does not descend under a quantifier that binds `var`: the occurrences
    /// below it are bound, not the variable being substituted.
    pub fn substitute(&self, var: &str, replacement: &Term) -> Formula {
        match self {
            Formula::Predicate(name, args) => Formula::Predicate(
                name.clone(),
                args.iter().map(|a| a.substitute(var, replacement)).collect(),
            ),
            Formula::Equal(l, r) => {
                Formula::Equal(l.substitute(var, replacement), r.substitute(var, replacement))
            }
            Formula::Not(inner) => Formula::not(inner.substitute(var, replacement)),
            Formula::And(l, r) => Formula::and(
                l.substitute(var, replacement),
                r.substitute(var, replacement),
            ),
            Formula::Or(l, r) => Formula::or(
                l.substitute(var, replacement),
                r.substitute(var, replacement),
            ),
            Formula::Implies(l, r) => Formula::implies(
                l.substitute(var, replacement),
                r.substitute(var, replacement),
            ),
            Formula::Iff(l, r) => Formula::iff(
                l.substitute(var, replacement),
                r.substitute(var, replacement),
            ),
            Formula::Quantified { kind, vars, body } => {
                if vars.iter().any(|v| v == var) {
                    self.clone()
                } else {
                    Formula::Quantified {
                        kind: *kind,
                        vars: vars.clone(),
                        body: Box::new(body.substitute(var, replacement)),
                    }
                }
            }
        }
    }

    /// Universal closure: bind all free variables, sorted by name, with a
    /// single outermost universal quantifier. Closed formulas are returned
    /// unchanged, which makes closure idempotent.
    pub fn closure(&self) -> Formula {
        let free = self.free_vars();
        if free.is_empty() {
            return self.clone();
        }
        Formula::forall(free.into_iter().collect(), self.clone())
    }

    /// True for the zero-argument predicate `name`, used for the structural
    /// sentinels `contrary()` and `false()`.
    pub fn is_sentinel(&self, name: &str) -> bool {
        matches!(self, Formula::Predicate(n, args) if n == name && args.is_empty())
    }
}

// =============================================================================
// CANONICAL RENDERING
// =============================================================================

/// True iff `name` matches the TPTP lower-word rule `[a-z][a-zA-Z0-9_]*`.
fn is_lower_word(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Render a function/predicate/constant symbol, single-quoting names that
/// the TPTP identifier rule would reject.
fn write_symbol(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    let lowered = name.to_lowercase();
    if is_lower_word(&lowered) {
        f.write_str(&lowered)
    } else {
        write!(f, "'")?;
        for c in lowered.chars() {
            if c == '\'' || c == '\\' {
                write!(f, "\\")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, "'")
    }
}

/// Render a variable as a TPTP upper word. Non-alphanumeric characters are
/// mapped to `_` since TPTP has no quoted variable syntax.
fn write_variable(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    for (i, c) in name.to_uppercase().chars().enumerate() {
        if i == 0 && !c.is_ascii_uppercase() {
            write!(f, "V")?;
        }
        if c.is_ascii_alphanumeric() || c == '_' {
            write!(f, "{}", c)?;
        } else {
            write!(f, "_")?;
        }
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(name) => write_variable(f, name),
            Term::Constant(name) => write_symbol(f, name),
            Term::Function(name, args) => {
                write_symbol(f, name)?;
                write!(f, "(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Predicate(name, args) => {
                write_symbol(f, name)?;
                if args.is_empty() {
                    return Ok(());
                }
                write!(f, "(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Formula::Equal(l, r) => write!(f, "{} = {}", l, r),
            Formula::Not(inner) => write!(f, "~({})", inner),
            Formula::And(l, r) => write!(f, "({} & {})", l, r),
            Formula::Or(l, r) => write!(f, "({} | {})", l, r),
            Formula::Implies(l, r) => write!(f, "({} => {})", l, r),
            Formula::Iff(l, r) => write!(f, "({} <=> {})", l, r),
            Formula::Quantified { kind, vars, body } => {
                let q = match kind {
                    QuantifierKind::Universal => "!",
                    QuantifierKind::Existential => "?",
                };
                write!(f, "({} [", q)?;
                for (i, v) in vars.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write_variable(f, v)?;
                }
                write!(f, "] : ({}))", body)
            }
        }
    }
}
