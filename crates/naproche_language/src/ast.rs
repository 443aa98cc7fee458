//! Statement AST produced by the block parser.
//!
//! A parsed source is an ordered list of [`Statement`]s. Sentences keep
//! their atom tokens: plain words and intact math segments (delimiters
//! included), so the translator can pattern-match on word shapes while
//! deferring math parsing until a rule needs it. Macro expansion splices in
//! [`Atom::Term`] atoms carrying pre-built replacement terms.

use std::fmt;

use naproche_logic::Term;

/// One lexical unit inside a sentence.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    /// A plain word (punctuation attached to words is split off by the
    /// block parser, so `set.` arrives as `set` with the period ending the
    /// sentence).
    Word(String),
    /// An intact math segment, delimiters preserved (`$...$`, `$$...$$`,
    /// `\[...\]`).
    Math(String),
    /// A synthetic atom carrying an already-built term, produced by macro
    /// expansion.
    Term(Term),
}

impl Atom {
    /// The word content, if this atom is a plain word.
    pub fn word(&self) -> Option<&str> {
        match self {
            Atom::Word(w) => Some(w.as_str()),
            _ => None,
        }
    }

    /// True if this atom is the given word.
    pub fn is_word(&self, w: &str) -> bool {
        self.word() == Some(w)
    }

    /// True for math and synthetic term atoms.
    pub fn is_mathish(&self) -> bool {
        matches!(self, Atom::Math(_) | Atom::Term(_))
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Word(w) => f.write_str(w),
            Atom::Math(m) => f.write_str(m),
            Atom::Term(t) => write!(f, "${}$", t),
        }
    }
}

/// A sentence: its reconstructed text plus the ordered atom tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    pub text: String,
    pub atoms: Vec<Atom>,
}

impl Sentence {
    /// Build a sentence from atoms, reconstructing the text field.
    pub fn from_atoms(atoms: Vec<Atom>) -> Sentence {
        let text = atoms
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        Sentence { text, atoms }
    }
}

/// A bracket directive such as `[read examples/preliminaries.ftl.tex]` or
/// `[prover vampire]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub args: Vec<String>,
}

/// The kind of a block environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Axiom,
    Definition,
    Lemma,
    Theorem,
    Proof,
    Other,
}

impl BlockKind {
    /// Map an environment name (`theorem`, `theorem*`, ...) to a kind.
    pub fn from_env_name(name: &str) -> BlockKind {
        match name.trim_end_matches('*') {
            "axiom" => BlockKind::Axiom,
            "definition" => BlockKind::Definition,
            "lemma" => BlockKind::Lemma,
            "theorem" => BlockKind::Theorem,
            "proof" => BlockKind::Proof,
            _ => BlockKind::Other,
        }
    }
}

/// A block environment with its ordered child statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    /// Optional label from the environment's bracket argument (typically a
    /// theorem name or attribution).
    pub label: Option<String>,
    pub content: Vec<Statement>,
}

/// A node of the statement AST.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Sentence(Sentence),
    Directive(Directive),
    Block(Block),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentence_text_joins_atoms() {
        let s = Sentence::from_atoms(vec![
            Atom::Word("Let".into()),
            Atom::Math("$X$".into()),
            Atom::Word("be".into()),
            Atom::Word("a".into()),
            Atom::Word("set".into()),
        ]);
        assert_eq!(s.text, "Let $X$ be a set");
    }

    #[test]
    fn starred_environments_share_kinds() {
        assert_eq!(BlockKind::from_env_name("theorem*"), BlockKind::Theorem);
        assert_eq!(BlockKind::from_env_name("definition"), BlockKind::Definition);
        assert_eq!(BlockKind::from_env_name("remark"), BlockKind::Other);
    }
}
