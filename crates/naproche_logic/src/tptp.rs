//! TPTP FOF problem serialization.
//!
//! One `fof(<name>, <role>, <formula>).` line per formula, axioms first,
//! conjecture last. The output is deterministic: the same axiom order and
//! formulas always produce the same file, so the serialization feeds the
//! prover adapters and the cache hasher equivalently.

use std::fmt::Write;

use crate::fol::Formula;

/// Render a single annotated formula as a `fof` line.
pub fn fof_line(name: &str, role: &str, formula: &Formula) -> String {
    format!("fof({}, {}, {}).", name, role, formula)
}

/// Render an ordered axiom list plus an optional conjecture as one problem
/// file, newline-separated.
pub fn problem_file(axioms: &[(String, Formula)], conjecture: Option<(&str, &Formula)>) -> String {
    let mut out = String::new();
    for (name, formula) in axioms {
        let _ = writeln!(out, "{}", fof_line(name, "axiom", formula));
    }
    if let Some((name, formula)) = conjecture {
        let _ = writeln!(out, "{}", fof_line(name, "conjecture", formula));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fol::Term;

    #[test]
    fn axioms_then_conjecture() {
        let ax = Formula::pred("set", vec![Term::constant("m")]);
        let goal = Formula::equal(Term::constant("1"), Term::constant("1"));
        let file = problem_file(&[("ax_0".into(), ax)], Some(("goal", &goal)));
        assert_eq!(
            file,
            "fof(ax_0, axiom, set(m)).\nfof(goal, conjecture, '1' = '1').\n"
        );
    }

    #[test]
    fn identifiers_are_lower_words_or_quoted() {
        let f = Formula::pred(
            "Has-Covering",
            vec![Term::func("apply", vec![Term::constant("f"), Term::var("x")])],
        );
        let line = fof_line("ax_1", "axiom", &f);
        assert_eq!(line, "fof(ax_1, axiom, 'has-covering'(apply(f,X))).");
    }

    #[test]
    fn empty_problem_is_empty() {
        assert_eq!(problem_file(&[], None), "");
    }
}
