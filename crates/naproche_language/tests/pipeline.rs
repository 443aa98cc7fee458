//! Full front-end pipeline: document -> forthel blocks -> statements ->
//! closed formulas, over the shipped Cantor corpus.

use naproche_language::{
    extract_forthel_blocks, parse_block, BlockKind, SentenceOutcome, Statement, Translator,
};

const PRELIMINARIES: &str = include_str!("../../../demos/preliminaries.ftl.tex");
const CANTOR: &str = include_str!("../../../demos/cantor.ftl.tex");

fn statements_of(document: &str) -> Vec<Statement> {
    let blocks = extract_forthel_blocks(document);
    assert!(!blocks.is_empty(), "document should carry forthel blocks");
    blocks
        .iter()
        .flat_map(|b| parse_block(b).expect("block parse"))
        .collect()
}

#[test]
fn preliminaries_translate_to_closed_axioms() {
    let mut translator = Translator::new();
    let mut axioms = Vec::new();
    for stmt in statements_of(PRELIMINARIES) {
        match &stmt {
            Statement::Directive(d) if d.name == "synonym" => {
                for arg in &d.args {
                    let mut parts = arg.split('/');
                    let base = parts.next().expect("synonym base");
                    for variant in parts {
                        translator.add_synonym(base, variant);
                    }
                }
            }
            _ => axioms.extend(translator.translate_statement(&stmt)),
        }
    }
    assert_eq!(axioms.len(), 3, "two definitions and one axiom: {:?}", axioms);
    for formula in &axioms {
        assert!(
            formula.free_vars().is_empty(),
            "axiom formulas must be closed: {}",
            formula
        );
        assert_eq!(formula.closure(), *formula, "closure must be idempotent");
    }

    let surjects = axioms
        .iter()
        .find(|f| f.to_string().contains("surjects_onto"))
        .expect("surjects_onto definition");
    assert!(surjects.to_string().contains("dom"));
}

#[test]
fn cantor_theorem_exposes_goal_and_context() {
    let mut translator = Translator::new();
    let stmts = statements_of(CANTOR);

    let theorem = stmts
        .iter()
        .find_map(|s| match s {
            Statement::Block(b) if b.kind == BlockKind::Theorem => Some(b),
            _ => None,
        })
        .expect("theorem block");
    assert_eq!(theorem.label.as_deref(), Some("Cantor"));

    let translation = translator.translate_theorem(theorem);
    assert_eq!(translation.context.len(), 1, "the Let-assumption");
    assert!(translation.context[0].free_vars().is_empty());

    let goal = translation.goal.expect("goal");
    assert!(goal.to_string().contains("surjects_onto"));
    assert!(
        goal.free_vars().contains("M"),
        "the goal is exposed unclosed for decomposition: {}",
        goal
    );
}

#[test]
fn cantor_proof_steps_translate() {
    let mut translator = Translator::new();
    let stmts = statements_of(CANTOR);

    let proof = stmts
        .iter()
        .find_map(|s| match s {
            Statement::Block(b) if b.kind == BlockKind::Proof => Some(b),
            _ => None,
        })
        .expect("proof block");

    let mut formulas = Vec::new();
    let mut structural = 0;
    for stmt in &proof.content {
        let Statement::Sentence(s) = stmt else {
            continue;
        };
        match translator.translate_sentence(s, false).expect("step translates") {
            SentenceOutcome::Formula(f) => formulas.push(f),
            SentenceOutcome::Structural => structural += 1,
        }
    }
    assert_eq!(structural, 1, "the qed marker");
    assert_eq!(formulas.len(), 6, "contrary, take, define, consider, iff, false");
    assert!(formulas[0].is_sentinel("contrary"));
    assert!(formulas.last().expect("last").is_sentinel("false"));
    for f in &formulas[1..5] {
        assert!(
            f.free_vars().is_empty(),
            "proof-side formulas demote to constants: {}",
            f
        );
    }
}
