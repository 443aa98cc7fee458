//! The sentence pattern cascade.
//!
//! Rules are tried in priority order on the (macro-expanded, cleaned)
//! atom sequence; the first rule whose structural preconditions match
//! wins. Sentence-level connectives (`iff`, `and`, `If ... then`) split
//! and recurse before noun/verb templates run, and the quantifier rules
//! re-quantify the variables they extract before free variables are
//! demoted to constants in proof context.

use naproche_logic::{Formula, Term};

use crate::ast::Atom;

use super::{SentenceOutcome, Translator};

/// Words dropped when a noun phrase is joined into a predicate name.
const CONNECTORS: &[&str] = &["a", "an", "the", "and", ","];

/// Leading words stripped before the predicate templates are tried.
const STRIPPED_PREFIXES: &[&str] = &[
    "Assume",
    "Then",
    "Thus",
    "Therefore",
    "Hence",
    "Indeed",
    "Case",
];

fn is_connector(word: &str) -> bool {
    CONNECTORS.contains(&word)
}

fn word_at(atoms: &[Atom], i: usize) -> Option<&str> {
    atoms.get(i).and_then(|a| a.word())
}

/// Drop cosmetic tail atoms: sentence punctuation and parenthetical
/// citations such as `(by Cantor)`.
fn cleanup(atoms: &[Atom]) -> Vec<Atom> {
    let mut out: Vec<Atom> = atoms.to_vec();
    loop {
        match out.last() {
            Some(Atom::Word(w)) if w == "." || w == "," || w == ";" => {
                out.pop();
            }
            Some(Atom::Word(w)) if w.ends_with(')') => {
                match out
                    .iter()
                    .rposition(|a| matches!(a, Atom::Word(x) if x.starts_with('(')))
                {
                    Some(start) => out.truncate(start),
                    None => break,
                }
            }
            _ => break,
        }
    }
    out
}

impl Translator {
    /// Run the cascade on an atom slice. `None` means no rule matched
    /// (an untranslatable sentence).
    pub(super) fn translate_atoms(
        &mut self,
        atoms: &[Atom],
        as_axiom: bool,
    ) -> Option<SentenceOutcome> {
        let atoms = cleanup(atoms);
        if atoms.is_empty() {
            return Some(SentenceOutcome::Structural);
        }

        if let Some(outcome) = self.rule_terminators(&atoms) {
            return Some(outcome);
        }
        if let Some(f) = self.rule_let_us_show(&atoms, as_axiom) {
            return Some(SentenceOutcome::Formula(f));
        }
        if let Some(f) = self.rule_assume_contrary(&atoms) {
            return Some(SentenceOutcome::Formula(f));
        }
        if let Some(f) = self.rule_iff_split(&atoms, as_axiom) {
            return Some(SentenceOutcome::Formula(f));
        }
        if let Some(f) = self.rule_and_split(&atoms, as_axiom) {
            return Some(SentenceOutcome::Formula(f));
        }
        if let Some(f) = self.rule_if_then(&atoms, as_axiom) {
            return Some(SentenceOutcome::Formula(f));
        }
        if let Some(f) = self.rule_every(&atoms) {
            return Some(SentenceOutcome::Formula(f));
        }
        if let Some(f) = self.rule_no(&atoms) {
            return Some(SentenceOutcome::Formula(f));
        }
        if let Some(f) = self.rule_indefinite_definition(&atoms, as_axiom) {
            return Some(SentenceOutcome::Formula(f));
        }
        if let Some(f) = self.rule_trailing_quantifier(&atoms, as_axiom) {
            return Some(SentenceOutcome::Formula(f));
        }
        if let Some(first) = word_at(&atoms, 0) {
            if STRIPPED_PREFIXES.contains(&first) {
                return self.translate_atoms(&atoms[1..], as_axiom);
            }
        }
        if let Some(f) = self.rule_let_be(&atoms) {
            return Some(SentenceOutcome::Formula(f));
        }
        if let Some(f) = self.rule_for_all_leading(&atoms, as_axiom) {
            return Some(SentenceOutcome::Formula(f));
        }
        if let Some(f) = self.rule_there_exists(&atoms, as_axiom) {
            return Some(SentenceOutcome::Formula(f));
        }
        if let Some(f) = self.rule_take_consider(&atoms, as_axiom) {
            return Some(SentenceOutcome::Formula(f));
        }
        if let Some(f) = self.rule_define(&atoms, as_axiom) {
            return Some(SentenceOutcome::Formula(f));
        }
        if let Some(f) = self.rule_we_have(&atoms, as_axiom) {
            return Some(SentenceOutcome::Formula(f));
        }
        if let Some(f) = self.rule_is_clause(&atoms) {
            return Some(SentenceOutcome::Formula(f));
        }
        if let Some(f) = self.rule_verb_phrase(&atoms) {
            return Some(SentenceOutcome::Formula(f));
        }
        if let Some(f) = self.rule_bare_math(&atoms) {
            return Some(SentenceOutcome::Formula(f));
        }
        None
    }

    /// Recurse expecting a formula; structural results do not count.
    fn recurse(&mut self, atoms: &[Atom], as_axiom: bool) -> Option<Formula> {
        match self.translate_atoms(atoms, as_axiom)? {
            SentenceOutcome::Formula(f) => Some(f),
            SentenceOutcome::Structural => None,
        }
    }

    // -------------------------------------------------------------------------
    // Structural rules
    // -------------------------------------------------------------------------

    /// `End` / `qed` yield nothing; `Contradiction` yields the `false()`
    /// sentinel.
    fn rule_terminators(&self, atoms: &[Atom]) -> Option<SentenceOutcome> {
        if atoms.len() == 1 {
            if let Some(w) = word_at(atoms, 0) {
                if w.eq_ignore_ascii_case("end") || w.eq_ignore_ascii_case("qed") {
                    return Some(SentenceOutcome::Structural);
                }
            }
        }
        if word_at(atoms, 0)
            .map(|w| w.eq_ignore_ascii_case("contradiction"))
            .unwrap_or(false)
        {
            return Some(SentenceOutcome::Formula(Formula::pred("false", vec![])));
        }
        None
    }

    /// `Let us show that <S>` recurses on the remainder.
    fn rule_let_us_show(&mut self, atoms: &[Atom], as_axiom: bool) -> Option<Formula> {
        if word_at(atoms, 0) == Some("Let")
            && word_at(atoms, 1) == Some("us")
            && word_at(atoms, 2) == Some("show")
            && word_at(atoms, 3) == Some("that")
        {
            return self.recurse(&atoms[4..], as_axiom);
        }
        None
    }

    /// `Assume the contrary` emits the `contrary()` sentinel.
    fn rule_assume_contrary(&self, atoms: &[Atom]) -> Option<Formula> {
        if atoms.len() == 3
            && word_at(atoms, 0) == Some("Assume")
            && word_at(atoms, 1) == Some("the")
            && word_at(atoms, 2) == Some("contrary")
        {
            return Some(Formula::pred("contrary", vec![]));
        }
        None
    }

    // -------------------------------------------------------------------------
    // Sentence-level connectives
    // -------------------------------------------------------------------------

    /// Split at a sentence-level `iff`.
    fn rule_iff_split(&mut self, atoms: &[Atom], as_axiom: bool) -> Option<Formula> {
        for i in 1..atoms.len().saturating_sub(1) {
            if word_at(atoms, i) == Some("iff") {
                let left = self.recurse(&atoms[..i], as_axiom)?;
                let right = self.recurse(&atoms[i + 1..], as_axiom)?;
                return Some(Formula::iff(left, right));
            }
        }
        None
    }

    /// Split at the first sentence-level `and` whose two halves both
    /// translate; noun-phrase `A and B` survives because such halves fail.
    fn rule_and_split(&mut self, atoms: &[Atom], as_axiom: bool) -> Option<Formula> {
        for i in 1..atoms.len().saturating_sub(1) {
            if word_at(atoms, i) != Some("and") {
                continue;
            }
            let Some(left) = self.recurse(&atoms[..i], as_axiom) else {
                continue;
            };
            let Some(right) = self.recurse(&atoms[i + 1..], as_axiom) else {
                continue;
            };
            return Some(Formula::and(left, right));
        }
        None
    }

    /// `If <P> then <Q>`.
    fn rule_if_then(&mut self, atoms: &[Atom], as_axiom: bool) -> Option<Formula> {
        let first = word_at(atoms, 0)?;
        if first != "If" && first != "if" {
            return None;
        }
        let then = atoms.iter().position(|a| a.is_word("then"))?;
        let p = self.recurse(&atoms[1..then], as_axiom)?;
        let q = self.recurse(&atoms[then + 1..], as_axiom)?;
        Some(Formula::implies(p, q))
    }

    // -------------------------------------------------------------------------
    // Quantifying noun-phrase rules
    // -------------------------------------------------------------------------

    /// `Every <NP> is <pred>` emits `![X] : (NP(X) => pred(X))`.
    fn rule_every(&mut self, atoms: &[Atom]) -> Option<Formula> {
        let first = word_at(atoms, 0)?;
        if first != "Every" && first != "every" {
            return None;
        }
        let is = atoms.iter().position(|a| a.is_word("is"))?;
        let var = self.fresh_subject_var(atoms);
        let subject = Term::var(var.clone());
        let lhs = self.np_formula(&subject, &atoms[1..is])?;
        let rhs = self.is_clause(&subject, &atoms[is + 1..])?;
        Some(Formula::forall(vec![var], Formula::implies(lhs, rhs)))
    }

    /// `No <NP> <VP>` emits `~(?[X] : (NP(X) & VP(X)))`.
    fn rule_no(&mut self, atoms: &[Atom]) -> Option<Formula> {
        if word_at(atoms, 0) != Some("No") {
            return None;
        }
        let var = self.fresh_subject_var(atoms);
        let subject = Term::var(var.clone());
        for split in 2..atoms.len() {
            let Some(np) = self.np_formula(&subject, &atoms[1..split]) else {
                continue;
            };
            let Some(vp) = self.verb_phrase(&subject, &atoms[split..]) else {
                continue;
            };
            return Some(Formula::not(Formula::exists(
                vec![var],
                Formula::and(np, vp),
            )));
        }
        None
    }

    /// `A/An <NP> is <body with an explicit math variable>` defines the
    /// new predicate by a biconditional.
    fn rule_indefinite_definition(&mut self, atoms: &[Atom], as_axiom: bool) -> Option<Formula> {
        let first = word_at(atoms, 0)?;
        if first != "A" && first != "An" {
            return None;
        }
        let is = atoms.iter().position(|a| a.is_word("is"))?;
        let body = &atoms[is + 1..];

        let (var_idx, var_name) = body.iter().enumerate().find_map(|(i, a)| {
            match self.atom_term(a) {
                Some(Term::Variable(name)) => Some((i, name)),
                _ => None,
            }
        })?;
        let subject = Term::var(var_name.clone());

        let lhs = self.np_formula(&subject, &atoms[1..is])?;

        let mut rhs_parts = Vec::new();
        if var_idx > 0 {
            rhs_parts.push(self.np_formula(&subject, &body[..var_idx])?);
        }
        let after = &body[var_idx + 1..];
        if word_at(after, 0) == Some("such") && word_at(after, 1) == Some("that") {
            rhs_parts.push(self.recurse(&after[2..], as_axiom)?);
        } else if !after.is_empty() {
            return None;
        }
        let rhs = Formula::conjoin(rhs_parts)?;
        Some(Formula::iff(lhs, rhs))
    }

    /// `<S> for all <vars> [in <D>]` and `<S> for some <NP> <vars>` wrap
    /// the translated head in a quantifier with the indicated restriction.
    fn rule_trailing_quantifier(&mut self, atoms: &[Atom], as_axiom: bool) -> Option<Formula> {
        let mut candidate = None;
        for i in (1..atoms.len()).rev() {
            if word_at(atoms, i) == Some("for") {
                if let Some(next) = word_at(atoms, i + 1) {
                    if next == "all" || next == "every" || next == "some" {
                        candidate = Some((i, next == "some"));
                        break;
                    }
                }
            }
        }
        let (i, existential) = candidate?;
        let head = self.recurse(&atoms[..i], as_axiom)?;
        let tail = &atoms[i + 2..];

        if existential {
            let math_idx = tail.iter().position(|a| a.is_mathish())?;
            let vars = self.atom_var_names(&tail[math_idx])?;
            if tail.len() != math_idx + 1 {
                return None;
            }
            let np_words = &tail[..math_idx];
            let mut parts = Vec::new();
            for v in &vars {
                if !np_words.is_empty() {
                    parts.push(self.np_formula(&Term::var(v.clone()), np_words)?);
                }
            }
            let body = match Formula::conjoin(parts) {
                Some(restriction) => Formula::and(restriction, head),
                None => head,
            };
            return Some(Formula::exists(vars, body));
        }

        let (vars, domain) = self.var_list_with_domain(tail)?;
        let body = match domain {
            Some(d) => {
                let restriction = Formula::conjoin(
                    vars.iter()
                        .map(|v| Formula::pred("in", vec![Term::var(v.clone()), d.clone()]))
                        .collect(),
                )?;
                Formula::implies(restriction, head)
            }
            None => head,
        };
        Some(Formula::forall(vars, body))
    }

    // -------------------------------------------------------------------------
    // Predicate templates
    // -------------------------------------------------------------------------

    /// `Let <vars> be a/an <NP>` introduces typing predicates; also
    /// accepts `Let <math formula>` directly.
    fn rule_let_be(&mut self, atoms: &[Atom]) -> Option<Formula> {
        if word_at(atoms, 0) != Some("Let") {
            return None;
        }
        if atoms.len() == 2 {
            if let Some(f) = self.atom_formula(&atoms[1]) {
                return Some(f);
            }
        }
        if !atoms.get(1).map(|a| a.is_mathish()).unwrap_or(false) {
            return None;
        }
        let be = atoms.iter().position(|a| a.is_word("be"))?;
        if be != 2 {
            return None;
        }
        let vars = self.atom_terms(&atoms[1])?;
        let np = &atoms[3..];
        let parts: Vec<Formula> = vars
            .iter()
            .map(|v| self.np_formula(v, np))
            .collect::<Option<Vec<_>>>()?;
        Formula::conjoin(parts)
    }

    /// Leading `For all <v1> in <D1>, <v2> in <D2>, ... <body>`.
    fn rule_for_all_leading(&mut self, atoms: &[Atom], as_axiom: bool) -> Option<Formula> {
        let first = word_at(atoms, 0)?;
        if first != "For" && first != "for" {
            return None;
        }
        let second = word_at(atoms, 1)?;
        if second != "all" && second != "every" {
            return None;
        }
        let mut pairs: Vec<(Vec<String>, Option<Term>)> = Vec::new();
        let mut i = 2;
        while i < atoms.len() {
            match &atoms[i] {
                Atom::Word(w) if w == "," || w == "and" => i += 1,
                a if a.is_mathish() => {
                    if let Some(Formula::Predicate(name, args)) =
                        self.atom_formula(a).filter(|f| {
                            matches!(f, Formula::Predicate(n, args) if n == "in" && args.len() == 2)
                        })
                    {
                        debug_assert_eq!(name, "in");
                        let mut args = args;
                        let dom = args.pop()?;
                        match args.pop()? {
                            Term::Variable(v) => pairs.push((vec![v], Some(dom))),
                            _ => return None,
                        }
                        i += 1;
                        continue;
                    }
                    let vars = self.atom_var_names(a)?;
                    i += 1;
                    let domain = if word_at(atoms, i) == Some("in") {
                        let d = self.atom_term(atoms.get(i + 1)?)?;
                        i += 2;
                        Some(d)
                    } else {
                        None
                    };
                    pairs.push((vars, domain));
                }
                _ => break,
            }
        }
        if pairs.is_empty() || i >= atoms.len() {
            return None;
        }
        let mut body = self.recurse(&atoms[i..], as_axiom)?;
        for (vars, domain) in pairs.into_iter().rev() {
            body = match domain {
                Some(d) => {
                    let restriction = Formula::conjoin(
                        vars.iter()
                            .map(|v| Formula::pred("in", vec![Term::var(v.clone()), d.clone()]))
                            .collect(),
                    )?;
                    Formula::forall(vars, Formula::implies(restriction, body))
                }
                None => Formula::forall(vars, body),
            };
        }
        Some(body)
    }

    /// `There is/exists [a/an] <restriction> [such that <S>]`.
    fn rule_there_exists(&mut self, atoms: &[Atom], as_axiom: bool) -> Option<Formula> {
        let first = word_at(atoms, 0)?;
        if first != "There" && first != "there" {
            return None;
        }
        let second = word_at(atoms, 1)?;
        if second != "is" && second != "exists" && second != "are" {
            return None;
        }
        let mut rest = &atoms[2..];
        if word_at(rest, 0).map(is_connector).unwrap_or(false) {
            rest = &rest[1..];
        }
        let such = rest
            .iter()
            .position(|a| a.is_word("such"))
            .filter(|i| word_at(rest, i + 1) == Some("that"));
        let (head, cond) = match such {
            Some(i) => (&rest[..i], Some(&rest[i + 2..])),
            None => (rest, None),
        };

        let (vars, restriction) = self.existential_head(head)?;
        let mut parts = Vec::new();
        if let Some(r) = restriction {
            parts.push(r);
        }
        if let Some(cond) = cond {
            parts.push(self.recurse(cond, as_axiom)?);
        }
        let body = Formula::conjoin(parts)?;
        Some(Formula::exists(vars, body))
    }

    /// The restriction of an existential head: either a math relation like
    /// `$x \in dom(F)$` or `<NP words> <vars>`.
    fn existential_head(&mut self, head: &[Atom]) -> Option<(Vec<String>, Option<Formula>)> {
        if head.len() == 1 {
            if let Some(f) = self.atom_formula(&head[0]) {
                let mut vars: Vec<String> = f
                    .free_vars()
                    .into_iter()
                    .collect();
                if let Formula::Predicate(name, args) = &f {
                    if name == "in" && args.len() == 2 {
                        if let Term::Variable(v) = &args[0] {
                            vars = vec![v.clone()];
                        }
                    }
                }
                if vars.is_empty() {
                    return None;
                }
                return Some((vars, Some(f)));
            }
        }
        let math_idx = head.iter().position(|a| a.is_mathish())?;
        if math_idx + 1 != head.len() {
            return None;
        }
        let vars = self.atom_var_names(&head[math_idx])?;
        let np_words = &head[..math_idx];
        if np_words.is_empty() {
            return Some((vars, None));
        }
        let parts: Vec<Formula> = vars
            .iter()
            .map(|v| self.np_formula(&Term::var(v.clone()), np_words))
            .collect::<Option<Vec<_>>>()?;
        Some((vars, Formula::conjoin(parts)))
    }

    /// `Take/Consider [a/an] <NP> <witness> [from/to/... <objects>]
    /// [such that <S>]` introduces witnesses with their typing predicates.
    fn rule_take_consider(&mut self, atoms: &[Atom], as_axiom: bool) -> Option<Formula> {
        let first = word_at(atoms, 0)?;
        if first != "Take" && first != "Consider" {
            return None;
        }
        let rest = &atoms[1..];
        let such = rest
            .iter()
            .position(|a| a.is_word("such"))
            .filter(|i| word_at(rest, i + 1) == Some("that"));
        let (head, cond) = match such {
            Some(i) => (&rest[..i], Some(&rest[i + 2..])),
            None => (rest, None),
        };

        let mut parts: Vec<Formula> = Vec::new();

        if head.len() == 1 {
            if let Some(f) = self.atom_formula(&head[0]) {
                parts.push(f);
            }
        }
        if parts.is_empty() {
            let wit_idx = head.iter().position(|a| a.is_mathish())?;
            let witnesses = self.atom_terms(&head[wit_idx])?;
            let mut name_words: Vec<String> = head[..wit_idx]
                .iter()
                .filter_map(|a| a.word())
                .filter(|w| !is_connector(w))
                .map(|w| self.noun_base(w))
                .collect();
            let mut extra_args: Vec<Term> = Vec::new();
            let mut k = wit_idx + 1;
            while k < head.len() {
                if let Some(obj) = self.parse_object(&head[k..]) {
                    extra_args.push(obj);
                    break;
                }
                match &head[k] {
                    Atom::Word(w) if is_connector(w) => {}
                    Atom::Word(w) => name_words.push(w.to_lowercase()),
                    mathish => extra_args.push(self.atom_term(mathish)?),
                }
                k += 1;
            }
            if name_words.is_empty() {
                return None;
            }
            let name = name_words.join("_");
            for w in &witnesses {
                let mut args = vec![w.clone()];
                args.extend(extra_args.iter().cloned());
                parts.push(Formula::pred(name.clone(), args));
            }
        }

        if let Some(cond) = cond {
            parts.push(self.recurse(cond, as_axiom)?);
        }
        Formula::conjoin(parts)
    }

    /// `Define <math>`: an equation, a set-comprehension definition, or a
    /// `for <v> in <D>` guarded equation.
    fn rule_define(&mut self, atoms: &[Atom], as_axiom: bool) -> Option<Formula> {
        if word_at(atoms, 0) != Some("Define") {
            return None;
        }
        let formula = self.atom_formula(atoms.get(1)?)?;

        if let Formula::Equal(lhs, Term::Function(fname, fargs)) = &formula {
            if fname == "set_comp" {
                return self.expand_set_comp(lhs, fargs, as_axiom);
            }
        }

        let tail = &atoms[2..];
        if word_at(tail, 0) == Some("for") && tail.len() >= 4 {
            let var = match self.atom_term(tail.get(1)?)? {
                Term::Variable(v) => v,
                _ => return None,
            };
            if word_at(tail, 2) != Some("in") {
                return None;
            }
            let dom = self.atom_term(tail.get(3)?)?;
            return Some(Formula::forall(
                vec![var.clone()],
                Formula::implies(
                    Formula::pred("in", vec![Term::var(var), dom]),
                    formula,
                ),
            ));
        }
        if !tail.is_empty() {
            return None;
        }
        Some(formula)
    }

    /// `P = set_comp(...)` becomes `![V] : (in(V,P) <=> (domain & cond))`,
    /// re-tokenizing and recursively translating the condition text.
    fn expand_set_comp(
        &mut self,
        defined: &Term,
        args: &[Term],
        as_axiom: bool,
    ) -> Option<Formula> {
        let (bound, domain, text) = match args {
            [Term::Variable(v), Term::Constant(text)] => (v.clone(), None, text.clone()),
            [Term::Variable(v), dom, Term::Constant(text)] => {
                (v.clone(), Some(dom.clone()), text.clone())
            }
            _ => return None,
        };
        let cond = self.translate_comp_condition(&text, as_axiom)?;
        let membership = Formula::pred("in", vec![Term::var(bound.clone()), defined.clone()]);
        let rhs = match domain {
            Some(d) => Formula::and(
                Formula::pred("in", vec![Term::var(bound.clone()), d]),
                cond,
            ),
            None => cond,
        };
        Some(Formula::forall(vec![bound], Formula::iff(membership, rhs)))
    }

    /// A set-builder condition is either raw math (`z \notin f(z)`) or a
    /// prose sentence; try math first, then re-tokenize as a sentence.
    fn translate_comp_condition(&mut self, text: &str, as_axiom: bool) -> Option<Formula> {
        if let Ok(expr) = crate::math::parse_math(&format!("${}$", text)) {
            if let Some(f) = expr.into_formula() {
                return Some(f);
            }
        }
        let stmts = crate::block::parse_block(text).ok()?;
        match stmts.first() {
            Some(crate::ast::Statement::Sentence(s)) => {
                let expanded = self.expand_macros(&s.atoms);
                self.recurse(&expanded, as_axiom)
            }
            _ => None,
        }
    }

    /// `We have <S>` recurses on the remainder.
    fn rule_we_have(&mut self, atoms: &[Atom], as_axiom: bool) -> Option<Formula> {
        let first = word_at(atoms, 0)?;
        if (first == "We" || first == "we") && word_at(atoms, 1) == Some("have") {
            return self.recurse(&atoms[2..], as_axiom);
        }
        None
    }

    /// `<T> is [not] a/an <N> [of/to/with/from <D>]`, plus `belongs to`.
    fn rule_is_clause(&mut self, atoms: &[Atom]) -> Option<Formula> {
        if !atoms.first().map(|a| a.is_mathish()).unwrap_or(false) {
            return None;
        }
        let subject = self.atom_term(&atoms[0])?;
        if word_at(atoms, 1) == Some("belongs") && word_at(atoms, 2) == Some("to") {
            let obj = self.parse_object(&atoms[3..])?;
            return Some(Formula::pred("in", vec![subject, obj]));
        }
        if word_at(atoms, 1) != Some("is") {
            return None;
        }
        self.is_clause(&subject, &atoms[2..])
    }

    /// `<T> <verb words> [<object>]` emits a predicate named after the
    /// verb words.
    fn rule_verb_phrase(&mut self, atoms: &[Atom]) -> Option<Formula> {
        if !atoms.first().map(|a| a.is_mathish()).unwrap_or(false) {
            return None;
        }
        let subject = self.atom_term(&atoms[0])?;
        self.verb_phrase(&subject, &atoms[1..])
    }

    /// A sentence that is a single math formula.
    fn rule_bare_math(&mut self, atoms: &[Atom]) -> Option<Formula> {
        if atoms.len() != 1 {
            return None;
        }
        self.atom_formula(&atoms[0])
    }

    // -------------------------------------------------------------------------
    // Shared template helpers
    // -------------------------------------------------------------------------

    /// Body of an `is` clause applied to a subject term: negation,
    /// definite-description equality, or a noun-phrase predicate with
    /// `element of` canonicalized to membership.
    fn is_clause(&mut self, subject: &Term, rest: &[Atom]) -> Option<Formula> {
        let mut rest = rest;
        let mut negated = false;
        if word_at(rest, 0) == Some("not") {
            negated = true;
            rest = &rest[1..];
        }
        let inner = if let Some(obj) = self.parse_object(rest) {
            Formula::equal(subject.clone(), obj)
        } else {
            self.np_formula(subject, rest)?
        };
        Some(if negated { Formula::not(inner) } else { inner })
    }

    /// Noun phrase as a predicate over the subject. Math atoms and
    /// definite-description tails become extra arguments;
    /// `element/subset/subclass of D` canonicalize.
    fn np_formula(&self, subject: &Term, np: &[Atom]) -> Option<Formula> {
        for k in 1..np.len() {
            if np[..k].iter().any(|a| a.word().is_none()) {
                break;
            }
            let Some(obj) = self.parse_object(&np[k..]) else {
                continue;
            };
            let words = self.np_words(&np[..k]);
            return self.np_predicate(subject, words, vec![obj]);
        }

        let mut words: Vec<String> = Vec::new();
        let mut args: Vec<Term> = Vec::new();
        for a in np {
            match a {
                Atom::Word(w) if is_connector(w) => {}
                Atom::Word(w) => words.push(self.noun_base(w)),
                mathish => args.push(self.atom_term(mathish)?),
            }
        }
        self.np_predicate(subject, words, args)
    }

    fn np_words(&self, atoms: &[Atom]) -> Vec<String> {
        atoms
            .iter()
            .filter_map(|a| a.word())
            .filter(|w| !is_connector(w))
            .map(|w| self.noun_base(w))
            .collect()
    }

    fn np_predicate(
        &self,
        subject: &Term,
        words: Vec<String>,
        mut args: Vec<Term>,
    ) -> Option<Formula> {
        if words.len() == 2 && words[1] == "of" && args.len() == 1 {
            let canonical = match words[0].as_str() {
                "element" => Some("in"),
                "subset" => Some("subset"),
                "subclass" => Some("subclass"),
                _ => None,
            };
            if let Some(pred) = canonical {
                if let Some(arg) = args.pop() {
                    return Some(Formula::pred(pred, vec![subject.clone(), arg]));
                }
            }
        }
        if words.is_empty() {
            return None;
        }
        let name = words.join("_");
        let mut all_args = vec![subject.clone()];
        all_args.extend(args);
        Some(Formula::pred(name, all_args))
    }

    /// Verb phrase as a predicate over the subject, with an optional
    /// object noun phrase consuming the tail of the slice.
    fn verb_phrase(&mut self, subject: &Term, rest: &[Atom]) -> Option<Formula> {
        let mut words: Vec<String> = Vec::new();
        let mut i = 0;
        while i < rest.len() {
            if !words.is_empty() {
                if let Some(obj) = self.parse_object(&rest[i..]) {
                    let name = words.join("_");
                    return Some(Formula::pred(name, vec![subject.clone(), obj]));
                }
            }
            match &rest[i] {
                Atom::Word(w) if is_connector(w) => {}
                Atom::Word(w) => words.push(w.to_lowercase()),
                _ => return None,
            }
            i += 1;
        }
        if words.is_empty() {
            return None;
        }
        Some(Formula::pred(words.join("_"), vec![subject.clone()]))
    }

    /// An object noun phrase denoting a term: a math atom, or a definite
    /// description `the <f> of <object>` becoming `f(object)`. The whole
    /// slice must be consumed.
    fn parse_object(&self, atoms: &[Atom]) -> Option<Term> {
        match atoms {
            [single] if single.is_mathish() => self.atom_term(single),
            [Atom::Word(the), Atom::Word(f), Atom::Word(of), rest @ ..] => {
                if the != "the" || of != "of" || rest.is_empty() {
                    return None;
                }
                let inner = self.parse_object(rest)?;
                Some(Term::func(self.noun_base(f), vec![inner]))
            }
            _ => None,
        }
    }

    /// Variable names from a math atom holding one variable or a
    /// comma-separated variable list.
    fn atom_var_names(&self, atom: &Atom) -> Option<Vec<String>> {
        let terms = self.atom_terms(atom)?;
        terms
            .into_iter()
            .map(|t| match t {
                Term::Variable(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    /// Terms from a math atom holding one term or a comma-separated list.
    fn atom_terms(&self, atom: &Atom) -> Option<Vec<Term>> {
        match atom {
            Atom::Term(t) => Some(vec![t.clone()]),
            Atom::Math(raw) => crate::math::parse_math_terms(raw).ok(),
            Atom::Word(_) => None,
        }
    }

    /// `<vars> [in <D>]` tail of a trailing universal quantifier.
    fn var_list_with_domain(&self, tail: &[Atom]) -> Option<(Vec<String>, Option<Term>)> {
        let math_idx = tail.iter().position(|a| a.is_mathish())?;
        if math_idx != 0 {
            return None;
        }
        if tail.len() == 1 {
            if let Some(Formula::Predicate(name, args)) = self.atom_formula(&tail[0]) {
                if name == "in" && args.len() == 2 {
                    if let Term::Variable(v) = &args[0] {
                        return Some((vec![v.clone()], Some(args[1].clone())));
                    }
                }
            }
            return Some((self.atom_var_names(&tail[0])?, None));
        }
        let vars = self.atom_var_names(&tail[0])?;
        if word_at(tail, 1) == Some("in") && tail.len() == 3 {
            let dom = self.atom_term(&tail[2])?;
            return Some((vars, Some(dom)));
        }
        None
    }

    /// A subject variable name not clashing with any variable mentioned
    /// in the sentence's math atoms.
    fn fresh_subject_var(&self, atoms: &[Atom]) -> String {
        let mut used = std::collections::BTreeSet::new();
        for a in atoms {
            if let Some(t) = self.atom_term(a) {
                t.variables(&mut used);
            } else if let Some(f) = self.atom_formula(a) {
                used.extend(f.free_vars());
            }
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Sentence;
    use crate::block::parse_block;
    use crate::translate::{SentenceOutcome, Translator};
    use naproche_logic::Formula;

    fn sentence(text: &str) -> Sentence {
        let stmts = parse_block(text).expect("block parse");
        match stmts.into_iter().next() {
            Some(crate::ast::Statement::Sentence(s)) => s,
            other => panic!("expected sentence, got {:?}", other),
        }
    }

    fn axiom(tr: &mut Translator, text: &str) -> Formula {
        match tr.translate_sentence(&sentence(text), true).expect("translate") {
            SentenceOutcome::Formula(f) => f,
            SentenceOutcome::Structural => panic!("unexpected structural outcome for '{}'", text),
        }
    }

    fn step(tr: &mut Translator, text: &str) -> Formula {
        match tr.translate_sentence(&sentence(text), false).expect("translate") {
            SentenceOutcome::Formula(f) => f,
            SentenceOutcome::Structural => panic!("unexpected structural outcome for '{}'", text),
        }
    }

    #[test]
    fn let_be_introduces_typing_predicate() {
        let mut tr = Translator::new();
        let f = axiom(&mut tr, "Let $X$ be a set.");
        assert_eq!(f.to_string(), "set(X)");
    }

    #[test]
    fn let_be_supports_variable_lists() {
        let mut tr = Translator::new();
        let f = axiom(&mut tr, "Let $X, Y$ be sets.");
        assert_eq!(f.to_string(), "(sets(X) & sets(Y))");
    }

    #[test]
    fn synonyms_map_plural_nouns() {
        let mut tr = Translator::new();
        tr.add_synonym("set", "sets");
        let f = axiom(&mut tr, "Let $X, Y$ be sets.");
        assert_eq!(f.to_string(), "(set(X) & set(Y))");
    }

    #[test]
    fn let_element_of_canonicalizes_to_membership() {
        let mut tr = Translator::new();
        let f = axiom(&mut tr, "Let $x$ be an element of $M$.");
        assert_eq!(f.to_string(), "in(X,M)");
    }

    #[test]
    fn every_quantifies_subject() {
        let mut tr = Translator::new();
        let f = axiom(&mut tr, "Every set is a class.");
        assert_eq!(f.to_string(), "(! [X] : ((set(X) => class(X))))");
    }

    #[test]
    fn every_avoids_captured_variables() {
        let mut tr = Translator::new();
        let f = axiom(&mut tr, "Every element of $X$ is a set.");
        assert_eq!(f.to_string(), "(! [X0] : ((in(X0,X) => set(X0))))");
    }

    #[test]
    fn is_clause_negation() {
        let mut tr = Translator::new();
        let f = axiom(&mut tr, "$x$ is not an element of $M$.");
        assert_eq!(f.to_string(), "~(in(X,M))");
    }

    #[test]
    fn definite_description_object_is_equality() {
        let mut tr = Translator::new();
        let f = axiom(&mut tr, "$S$ is the powerset of $M$.");
        assert_eq!(f.to_string(), "S = powerset(M)");
    }

    #[test]
    fn if_then_becomes_implication() {
        let mut tr = Translator::new();
        let f = axiom(&mut tr, "If $x \\in A$ then $x \\in B$.");
        assert_eq!(f.to_string(), "(in(X,A) => in(X,B))");
    }

    #[test]
    fn sentence_level_iff() {
        let mut tr = Translator::new();
        let f = axiom(&mut tr, "$x \\in N$ iff $x \\notin M$.");
        assert_eq!(f.to_string(), "(in(X,N) <=> ~(in(X,M)))");
    }

    #[test]
    fn and_split_prefers_working_halves() {
        let mut tr = Translator::new();
        let f = axiom(&mut tr, "$x$ is a set and $y$ is a class.");
        assert_eq!(f.to_string(), "(set(X) & class(Y))");
    }

    #[test]
    fn conditional_with_inner_conjunction() {
        let mut tr = Translator::new();
        let f = axiom(&mut tr, "If $x \\in A$ and $x \\in B$ then $x \\in C$.");
        assert_eq!(
            f.to_string(),
            "((in(X,A) & in(X,B)) => in(X,C))"
        );
    }

    #[test]
    fn trailing_universal_quantifier_with_domain() {
        let mut tr = Translator::new();
        let f = axiom(&mut tr, "We have $f(x) = x$ for all $x$ in $M$.");
        assert_eq!(f.to_string(), "(! [X] : ((in(X,M) => f(X) = X)))");
    }

    #[test]
    fn leading_universal_quantifier() {
        let mut tr = Translator::new();
        let f = axiom(&mut tr, "For all $x \\in M$ we have $x \\in N$.");
        assert_eq!(f.to_string(), "(! [X] : ((in(X,M) => in(X,N))))");
    }

    #[test]
    fn there_exists_with_side_condition() {
        let mut tr = Translator::new();
        let f = axiom(
            &mut tr,
            "There is $x \\in dom(F)$ such that $apply(F, x) = z$.",
        );
        assert_eq!(
            f.to_string(),
            "(? [X] : ((in(X,dom(F)) & apply(F,X) = Z)))"
        );
    }

    #[test]
    fn no_rule_emits_negated_existential() {
        let mut tr = Translator::new();
        let f = axiom(
            &mut tr,
            "No function of $M$ surjects onto the powerset of $M$.",
        );
        assert_eq!(
            f.to_string(),
            "~((? [X] : ((function_of(X,M) & surjects_onto(X,powerset(M))))))"
        );
    }

    #[test]
    fn assume_contrary_is_a_sentinel() {
        let mut tr = Translator::new();
        let f = step(&mut tr, "Assume the contrary.");
        assert!(f.is_sentinel("contrary"));
    }

    #[test]
    fn contradiction_is_the_false_sentinel() {
        let mut tr = Translator::new();
        let f = step(&mut tr, "Contradiction.");
        assert!(f.is_sentinel("false"));
    }

    #[test]
    fn end_and_qed_are_structural() {
        let mut tr = Translator::new();
        for text in ["End.", "qed."] {
            let outcome = tr.translate_sentence(&sentence(text), false).expect("translate");
            assert_eq!(outcome, SentenceOutcome::Structural, "for {}", text);
        }
    }

    #[test]
    fn proof_steps_demote_free_variables() {
        let mut tr = Translator::new();
        let f = step(&mut tr, "Then $z \\in N$.");
        assert_eq!(f.to_string(), "in(z,n)");
    }

    #[test]
    fn bound_variables_survive_demotion() {
        let mut tr = Translator::new();
        let f = step(&mut tr, "We have $f(x) = x$ for all $x$ in $M$.");
        assert_eq!(f.to_string(), "(! [X] : ((in(X,m) => f(X) = X)))");
    }

    #[test]
    fn macro_capture_then_expansion() {
        let mut tr = Translator::new();
        let outcome = tr
            .translate_sentence(&sentence("Let the board stand for $B$."), true)
            .expect("translate");
        assert_eq!(outcome, SentenceOutcome::Structural);
        let f = axiom(&mut tr, "The board has no covering.");
        let direct = axiom(&mut tr, "$B$ has no covering.");
        assert_eq!(f, direct);
    }

    #[test]
    fn prefix_words_are_stripped() {
        let mut tr = Translator::new();
        for text in ["Then $1 = 1$.", "Thus $1 = 1$.", "Hence $1 = 1$."] {
            let f = step(&mut tr, text);
            assert_eq!(f.to_string(), "'1' = '1'", "for {}", text);
        }
    }

    #[test]
    fn colon_map_expands_function_typing() {
        let mut tr = Translator::new();
        let f = axiom(&mut tr, "Let $f : M \\to N$.");
        assert_eq!(
            f.to_string(),
            "(dom(F) = M & (! [X] : ((in(X,M) => in(apply(F,X),N)))))"
        );
    }

    #[test]
    fn take_introduces_typed_witness() {
        let mut tr = Translator::new();
        let f = step(
            &mut tr,
            "Take a surjective function $f$ from $M$ to the powerset of $M$.",
        );
        assert_eq!(
            f.to_string(),
            "surjective_function_from_to(f,m,powerset(m))"
        );
    }

    #[test]
    fn define_set_comprehension_expands() {
        let mut tr = Translator::new();
        let f = step(&mut tr, "Define $N = \\class{z \\in M | z \\notin f(z)}$.");
        assert_eq!(
            f.to_string(),
            "(! [Z] : ((in(Z,n) <=> (in(Z,m) & ~(in(Z,f(Z)))))))"
        );
    }

    #[test]
    fn define_guarded_equation() {
        let mut tr = Translator::new();
        let f = axiom(&mut tr, "Define $g(x) = x$ for $x$ in $M$.");
        assert_eq!(f.to_string(), "(! [X] : ((in(X,M) => g(X) = X)))");
    }

    #[test]
    fn untranslatable_sentences_error() {
        let mut tr = Translator::new();
        let err = tr
            .translate_sentence(&sentence("Colorless green ideas sleep furiously."), true)
            .unwrap_err();
        assert!(err.to_string().contains("Colorless"));
    }
}
