//! Pattern-directed translation of controlled-language sentences into
//! first-order logic.
//!
//! The translator is a cascade of pattern rules tried in priority order;
//! the first rule whose structural preconditions match wins (see
//! [`rules`]). This module owns the surrounding machinery:
//!
//! - **Macro table**: `Let <phrase> stand for <math>` registers a phrase
//!   rewritten greedily (longest match, left to right) into a synthetic
//!   term atom on every later sentence.
//! - **Synonym table**: maps plural/variant noun forms to their base form
//!   when a noun becomes a predicate name.
//! - **Colon-map expansion**: `colon(F, to(A,B))` predicates are rewritten
//!   into `dom(F) = A & ![X]: (in(X,A) => in(apply(F,X),B))` on every
//!   returned formula.
//! - **Variable demotion**: inside proofs (`as_axiom = false`), free
//!   variables denote locally introduced objects and are demoted to
//!   constants; bound variables are untouched.
//! - **Block translation**: definition/axiom/lemma blocks become closed
//!   axioms `closure(assumptions => conclusions)`; theorems additionally
//!   expose an unclosed working goal for the engine to decompose.

mod rules;

use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use naproche_logic::{Formula, Term};

use crate::ast::{Atom, Block, Sentence, Statement};

/// Result of translating one sentence.
#[derive(Debug, Clone, PartialEq)]
pub enum SentenceOutcome {
    /// The sentence denotes a formula.
    Formula(Formula),
    /// The sentence is structural (macro capture, `End`, `qed`) and
    /// contributes no formula.
    Structural,
}

/// A non-structural sentence that no pattern rule matched.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateError {
    pub text: String,
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not translate sentence '{}'", self.text)
    }
}

impl Error for TranslateError {}

/// Translation of a theorem block: closed context formulas from the
/// assumptions and earlier conclusions, plus the unclosed working goal.
#[derive(Debug, Clone, PartialEq)]
pub struct TheoremTranslation {
    pub context: Vec<Formula>,
    pub goal: Option<Formula>,
}

#[derive(Debug, Clone)]
struct MacroDef {
    phrase: Vec<String>,
    replacement: Term,
}

/// The sentence/statement translator with its macro and synonym state.
///
/// One translator instance is shared across a whole run, including
/// included files, so macros and synonyms registered anywhere apply
/// everywhere downstream.
#[derive(Debug, Default)]
pub struct Translator {
    macros: Vec<MacroDef>,
    synonyms: HashMap<String, String>,
}

impl Translator {
    pub fn new() -> Translator {
        Translator::default()
    }

    /// Register a noun synonym: `variant` will be read as `base`.
    pub fn add_synonym(&mut self, base: &str, variant: &str) {
        self.synonyms
            .insert(variant.to_lowercase(), base.to_lowercase());
    }

    /// Map a noun to its base form through the synonym table.
    pub(crate) fn noun_base(&self, word: &str) -> String {
        let lower = word.to_lowercase();
        self.synonyms.get(&lower).cloned().unwrap_or(lower)
    }

    /// Translate one sentence. `as_axiom` selects axiom-side semantics:
    /// math identifiers stay variables and the caller closes the result;
    /// inside proofs free variables are demoted to constants.
    pub fn translate_sentence(
        &mut self,
        sentence: &Sentence,
        as_axiom: bool,
    ) -> Result<SentenceOutcome, TranslateError> {
        if self.try_capture_macro(&sentence.atoms) {
            return Ok(SentenceOutcome::Structural);
        }
        let expanded = self.expand_macros(&sentence.atoms);
        let outcome = self
            .translate_atoms(&expanded, as_axiom)
            .ok_or_else(|| TranslateError {
                text: sentence.text.clone(),
            })?;
        Ok(match outcome {
            SentenceOutcome::Formula(f) => {
                let f = expand_colon_maps(&f);
                let f = if as_axiom { f } else { demote_free_variables(&f) };
                SentenceOutcome::Formula(f)
            }
            SentenceOutcome::Structural => SentenceOutcome::Structural,
        })
    }

    /// Translate a top-level statement into closed axiom formulas.
    /// Directives and proof blocks contribute nothing here.
    pub fn translate_statement(&mut self, stmt: &Statement) -> Vec<Formula> {
        match stmt {
            Statement::Sentence(s) => match self.translate_sentence(s, true) {
                Ok(SentenceOutcome::Formula(f)) => vec![f.closure()],
                Ok(SentenceOutcome::Structural) => vec![],
                Err(e) => {
                    log::warn!("{}", e);
                    vec![]
                }
            },
            Statement::Directive(_) => vec![],
            Statement::Block(b) => match b.kind {
                crate::ast::BlockKind::Proof => vec![],
                _ => self.translate_block(b),
            },
        }
    }

    /// Translate a definition/axiom/lemma/theorem block into its axiomatic
    /// form: `closure(A1 & ... & Am => C1 & ... & Cn)`, or just the closed
    /// conclusions (assumptions) when the other side is empty.
    pub fn translate_block(&mut self, block: &Block) -> Vec<Formula> {
        let (assumptions, conclusions) = self.split_block(block);
        let conclusion = Formula::conjoin(conclusions);
        match (Formula::conjoin(assumptions), conclusion) {
            (Some(a), Some(c)) => vec![Formula::implies(a, c).closure()],
            (None, Some(c)) => vec![c.closure()],
            (Some(a), None) => vec![a.closure()],
            (None, None) => vec![],
        }
    }

    /// Translate a theorem block for checking: assumptions and all but the
    /// last conclusion become closed context formulas; the last conclusion
    /// is exposed unclosed as the working goal.
    pub fn translate_theorem(&mut self, block: &Block) -> TheoremTranslation {
        let (assumptions, mut conclusions) = self.split_block(block);
        let goal = conclusions.pop();
        let mut context: Vec<Formula> = assumptions.into_iter().map(|f| f.closure()).collect();
        context.extend(conclusions.into_iter().map(|f| f.closure()));
        TheoremTranslation { context, goal }
    }

    /// Split a block's sentences into assumption and conclusion formulas.
    /// A sentence is an assumption when its text begins with `Let` or
    /// `Assume`. Untranslatable sentences are logged and skipped.
    fn split_block(&mut self, block: &Block) -> (Vec<Formula>, Vec<Formula>) {
        let mut assumptions = Vec::new();
        let mut conclusions = Vec::new();
        for stmt in &block.content {
            let Statement::Sentence(s) = stmt else {
                continue;
            };
            let text = s.text.trim();
            let is_assumption = text.starts_with("Let") || text.starts_with("Assume");
            match self.translate_sentence(s, true) {
                Ok(SentenceOutcome::Formula(f)) => {
                    if is_assumption {
                        assumptions.push(f);
                    } else {
                        conclusions.push(f);
                    }
                }
                Ok(SentenceOutcome::Structural) => {}
                Err(e) => log::warn!("{}", e),
            }
        }
        (assumptions, conclusions)
    }

    // -------------------------------------------------------------------------
    // Macros
    // -------------------------------------------------------------------------

    /// `Let <phrase> stand for <math>`: extend the macro table.
    fn try_capture_macro(&mut self, atoms: &[Atom]) -> bool {
        if !atoms.first().map(|a| a.is_word("Let")).unwrap_or(false) {
            return false;
        }
        let stand = atoms.iter().position(|a| a.is_word("stand"));
        let Some(stand) = stand else { return false };
        if !atoms.get(stand + 1).map(|a| a.is_word("for")).unwrap_or(false) {
            return false;
        }
        let Some(replacement) = atoms.get(stand + 2).and_then(|a| self.atom_term(a)) else {
            return false;
        };
        let phrase: Vec<String> = atoms[1..stand]
            .iter()
            .filter_map(|a| a.word().map(|w| w.to_lowercase()))
            .collect();
        if phrase.is_empty() || phrase.len() != stand - 1 {
            return false;
        }
        self.macros.push(MacroDef {
            phrase,
            replacement,
        });
        true
    }

    /// Greedy longest-match replacement of stored phrases by synthetic
    /// term atoms, scanning left to right.
    fn expand_macros(&self, atoms: &[Atom]) -> Vec<Atom> {
        if self.macros.is_empty() {
            return atoms.to_vec();
        }
        let mut out = Vec::with_capacity(atoms.len());
        let mut i = 0;
        'scan: while i < atoms.len() {
            let mut candidates: Vec<&MacroDef> = self.macros.iter().collect();
            candidates.sort_by_key(|m| std::cmp::Reverse(m.phrase.len()));
            for def in candidates {
                let len = def.phrase.len();
                if i + len > atoms.len() {
                    continue;
                }
                let matches = atoms[i..i + len]
                    .iter()
                    .zip(&def.phrase)
                    .all(|(a, p)| a.word().map(|w| w.to_lowercase()).as_deref() == Some(p.as_str()));
                if matches {
                    out.push(Atom::Term(def.replacement.clone()));
                    i += len;
                    continue 'scan;
                }
            }
            out.push(atoms[i].clone());
            i += 1;
        }
        out
    }

    /// Parse an atom into a term, if it has one.
    pub(crate) fn atom_term(&self, atom: &Atom) -> Option<Term> {
        match atom {
            Atom::Term(t) => Some(t.clone()),
            Atom::Math(raw) => crate::math::parse_math(raw).ok()?.into_term(),
            Atom::Word(_) => None,
        }
    }

    /// Parse an atom into a formula, if it has one.
    pub(crate) fn atom_formula(&self, atom: &Atom) -> Option<Formula> {
        match atom {
            Atom::Math(raw) => crate::math::parse_math(raw).ok()?.into_formula(),
            _ => None,
        }
    }
}

// =============================================================================
// POST-PROCESSING PASSES
// =============================================================================

/// Expand every `colon(F, to(A,B))` predicate into
/// `dom(F) = A & ![X] : (in(X,A) => in(apply(F,X),B))`.
pub(crate) fn expand_colon_maps(formula: &Formula) -> Formula {
    match formula {
        Formula::Predicate(name, args) if name == "colon" && args.len() == 2 => {
            if let Term::Function(fname, fargs) = &args[1] {
                if fname == "to" && fargs.len() == 2 {
                    let func = args[0].clone();
                    let dom = fargs[0].clone();
                    let cod = fargs[1].clone();
                    let x = fresh_var_name(&[&func, &dom, &cod]);
                    let maps_into = Formula::forall(
                        vec![x.clone()],
                        Formula::implies(
                            Formula::pred("in", vec![Term::var(x.clone()), dom.clone()]),
                            Formula::pred(
                                "in",
                                vec![
                                    Term::func("apply", vec![func.clone(), Term::var(x)]),
                                    cod,
                                ],
                            ),
                        ),
                    );
                    return Formula::and(
                        Formula::equal(Term::func("dom", vec![func]), dom),
                        maps_into,
                    );
                }
            }
            formula.clone()
        }
        Formula::Predicate(..) | Formula::Equal(..) => formula.clone(),
        Formula::Not(inner) => Formula::not(expand_colon_maps(inner)),
        Formula::And(l, r) => Formula::and(expand_colon_maps(l), expand_colon_maps(r)),
        Formula::Or(l, r) => Formula::or(expand_colon_maps(l), expand_colon_maps(r)),
        Formula::Implies(l, r) => Formula::implies(expand_colon_maps(l), expand_colon_maps(r)),
        Formula::Iff(l, r) => Formula::iff(expand_colon_maps(l), expand_colon_maps(r)),
        Formula::Quantified { kind, vars, body } => Formula::Quantified {
            kind: *kind,
            vars: vars.clone(),
            body: Box::new(expand_colon_maps(body)),
        },
    }
}

/// A variable name not occurring in any of the given terms.
fn fresh_var_name(terms: &[&Term]) -> String {
    let mut used = std::collections::BTreeSet::new();
    for t in terms {
        t.variables(&mut used);
    }
    if !used.contains("X") {
        return "X".to_string();
    }
    let mut n = 0usize;
    loop {
        let candidate = format!("X{}", n);
        if !used.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Demote free variables to constants (lower-cased names). Used inside
/// proofs, where bare math identifiers denote locally introduced objects
/// rather than universally quantified variables.
pub(crate) fn demote_free_variables(formula: &Formula) -> Formula {
    fn demote_term(term: &Term, bound: &std::collections::BTreeSet<String>) -> Term {
        match term {
            Term::Variable(name) if !bound.contains(name) => Term::Constant(name.to_lowercase()),
            Term::Variable(_) | Term::Constant(_) => term.clone(),
            Term::Function(name, args) => Term::Function(
                name.clone(),
                args.iter().map(|a| demote_term(a, bound)).collect(),
            ),
        }
    }

    fn walk(formula: &Formula, bound: &std::collections::BTreeSet<String>) -> Formula {
        match formula {
            Formula::Predicate(name, args) => Formula::Predicate(
                name.clone(),
                args.iter().map(|a| demote_term(a, bound)).collect(),
            ),
            Formula::Equal(l, r) => Formula::Equal(demote_term(l, bound), demote_term(r, bound)),
            Formula::Not(inner) => Formula::not(walk(inner, bound)),
            Formula::And(l, r) => Formula::and(walk(l, bound), walk(r, bound)),
            Formula::Or(l, r) => Formula::or(walk(l, bound), walk(r, bound)),
            Formula::Implies(l, r) => Formula::implies(walk(l, bound), walk(r, bound)),
            Formula::Iff(l, r) => Formula::iff(walk(l, bound), walk(r, bound)),
            Formula::Quantified { kind, vars, body } => {
                let mut inner = bound.clone();
                inner.extend(vars.iter().cloned());
                Formula::Quantified {
                    kind: *kind,
                    vars: vars.clone(),
                    body: Box::new(walk(body, &inner)),
                }
            }
        }
    }

    walk(formula, &std::collections::BTreeSet::new())
}
