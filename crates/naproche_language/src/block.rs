//! Parser for the contents of a `forthel` block.
//!
//! Produces the statement AST: bracket directives, block environments, and
//! sentences tokenized into atoms. Math segments (`$...$`, `$$...$$`,
//! `\[...\]`) are kept intact, delimiters included; everything else is
//! split into word atoms. A sentence ends at a period outside math.
//!
//! Environments nest via an explicit stack, so a proof embedded in another
//! proof parses into a nested [`Block`].

use std::error::Error;
use std::fmt;

use crate::ast::{Atom, Block, BlockKind, Directive, Sentence, Statement};

/// Error raised for malformed block structure.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockParseError {
    /// `\end{name}` without a matching `\begin{name}`.
    UnmatchedEnd { env: String },
    /// The block ended while environments were still open.
    UnclosedEnvironment { env: String },
    /// A math segment or group was never terminated.
    UnterminatedSegment { what: &'static str },
}

impl fmt::Display for BlockParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockParseError::UnmatchedEnd { env } => {
                write!(f, "\\end{{{}}} without matching \\begin", env)
            }
            BlockParseError::UnclosedEnvironment { env } => {
                write!(f, "environment '{}' is never closed", env)
            }
            BlockParseError::UnterminatedSegment { what } => {
                write!(f, "unterminated {}", what)
            }
        }
    }
}

impl Error for BlockParseError {}

/// Parse one forthel block's contents into statements.
pub fn parse_block(content: &str) -> Result<Vec<Statement>, BlockParseError> {
    Parser::new(content).run()
}

struct OpenEnv {
    kind: BlockKind,
    label: Option<String>,
    content: Vec<Statement>,
    name: String,
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    root: Vec<Statement>,
    stack: Vec<OpenEnv>,
    atoms: Vec<Atom>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Parser {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            root: Vec::new(),
            stack: Vec::new(),
            atoms: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Statement>, BlockParseError> {
        while self.pos < self.bytes.len() {
            self.skip_whitespace();
            if self.pos >= self.bytes.len() {
                break;
            }
            match self.bytes[self.pos] {
                b'[' => {
                    self.flush_sentence();
                    let directive = self.read_directive()?;
                    self.push_statement(Statement::Directive(directive));
                }
                b'$' => {
                    let math = self.read_dollar_math()?;
                    self.atoms.push(Atom::Math(math));
                    self.maybe_end_sentence();
                }
                b'\\' if self.peek_is("\\[") => {
                    let math = self.read_display_math()?;
                    self.atoms.push(Atom::Math(math));
                    self.maybe_end_sentence();
                }
                b'\\' if self.peek_is("\\begin{") => {
                    self.flush_sentence();
                    self.read_begin();
                }
                b'\\' if self.peek_is("\\end{") => {
                    self.flush_sentence();
                    self.read_end()?;
                }
                _ => self.read_word(),
            }
        }
        self.flush_sentence();
        if let Some(open) = self.stack.pop() {
            return Err(BlockParseError::UnclosedEnvironment { env: open.name });
        }
        Ok(self.root)
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek_is(&self, s: &str) -> bool {
        self.src[self.pos..].starts_with(s)
    }

    fn push_statement(&mut self, stmt: Statement) {
        match self.stack.last_mut() {
            Some(open) => open.content.push(stmt),
            None => self.root.push(stmt),
        }
    }

    fn flush_sentence(&mut self) {
        if self.atoms.is_empty() {
            return;
        }
        let atoms = std::mem::take(&mut self.atoms);
        self.push_statement(Statement::Sentence(Sentence::from_atoms(atoms)));
    }

    /// A period immediately after a math segment ends the sentence.
    fn maybe_end_sentence(&mut self) {
        if self.pos < self.bytes.len() && self.bytes[self.pos] == b'.' {
            self.pos += 1;
            self.flush_sentence();
        }
    }

    /// `[name arg arg ...]`; `\path{...}` arguments are unwrapped.
    fn read_directive(&mut self) -> Result<Directive, BlockParseError> {
        debug_assert_eq!(self.bytes[self.pos], b'[');
        self.pos += 1;
        let start = self.pos;
        let close = self.src[start..]
            .find(']')
            .ok_or(BlockParseError::UnterminatedSegment { what: "directive" })?;
        let inner = &self.src[start..start + close];
        self.pos = start + close + 1;

        let mut parts = inner.split_whitespace();
        let name = parts.next().unwrap_or_default().to_string();
        let args = parts
            .map(|raw| {
                let raw = raw
                    .strip_prefix("\\path{")
                    .and_then(|r| r.strip_suffix('}'))
                    .unwrap_or(raw);
                raw.to_string()
            })
            .collect();
        Ok(Directive { name, args })
    }

    fn read_dollar_math(&mut self) -> Result<String, BlockParseError> {
        let start = self.pos;
        let display = self.peek_is("$$");
        let delim = if display { "$$" } else { "$" };
        self.pos += delim.len();
        match self.src[self.pos..].find(delim) {
            Some(end) => {
                self.pos += end + delim.len();
                Ok(self.src[start..self.pos].to_string())
            }
            None => Err(BlockParseError::UnterminatedSegment { what: "math segment" }),
        }
    }

    fn read_display_math(&mut self) -> Result<String, BlockParseError> {
        let start = self.pos;
        self.pos += 2;
        match self.src[self.pos..].find("\\]") {
            Some(end) => {
                self.pos += end + 2;
                Ok(self.src[start..self.pos].to_string())
            }
            None => Err(BlockParseError::UnterminatedSegment { what: "display math" }),
        }
    }

    /// `\begin{env}` with an optional `[label]` argument.
    fn read_begin(&mut self) {
        self.pos += "\\begin{".len();
        let name = self.read_until(b'}');
        let mut label = None;
        if self.pos < self.bytes.len() && self.bytes[self.pos] == b'[' {
            self.pos += 1;
            let arg = self.read_until(b']');
            if !arg.is_empty() {
                label = Some(arg);
            }
        }
        self.stack.push(OpenEnv {
            kind: BlockKind::from_env_name(&name),
            label,
            content: Vec::new(),
            name,
        });
    }

    fn read_end(&mut self) -> Result<(), BlockParseError> {
        self.pos += "\\end{".len();
        let name = self.read_until(b'}');
        let open = self
            .stack
            .pop()
            .ok_or_else(|| BlockParseError::UnmatchedEnd { env: name.clone() })?;
        let block = Block {
            kind: open.kind,
            label: open.label,
            content: open.content,
        };
        self.push_statement(Statement::Block(block));
        Ok(())
    }

    fn read_until(&mut self, delim: u8) -> String {
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != delim {
            self.pos += 1;
        }
        let out = self.src[start..self.pos].to_string();
        if self.pos < self.bytes.len() {
            self.pos += 1;
        }
        out
    }

    /// One prose word. A trailing period ends the sentence; trailing commas
    /// and semicolons become their own atoms. A leading backslash (prose
    /// commands like `\qed`) is dropped.
    fn read_word(&mut self) {
        let start = self.pos;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if b.is_ascii_whitespace() || b == b'$' || b == b'[' {
                break;
            }
            if b == b'\\' && self.pos > start {
                break;
            }
            self.pos += 1;
        }
        let mut word = &self.src[start..self.pos];
        word = word.strip_prefix('\\').unwrap_or(word);

        let ends_sentence = word.ends_with('.');
        word = word.trim_end_matches('.');

        let mut punct = None;
        for p in [",", ";"] {
            if let Some(stripped) = word.strip_suffix(p) {
                word = stripped;
                punct = Some(p);
                break;
            }
        }

        if !word.is_empty() {
            self.atoms.push(Atom::Word(word.to_string()));
        }
        if let Some(p) = punct {
            self.atoms.push(Atom::Word(p.to_string()));
        }
        if ends_sentence {
            self.flush_sentence();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(sentence: &Sentence) -> Vec<String> {
        sentence.atoms.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn sentence_atoms_keep_math_intact() {
        let stmts = parse_block("Let $X$ be a set.").expect("parse");
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Statement::Sentence(s) => {
                assert_eq!(words(s), vec!["Let", "$X$", "be", "a", "set"]);
                assert_eq!(s.text, "Let $X$ be a set");
            }
            other => panic!("expected sentence, got {:?}", other),
        }
    }

    #[test]
    fn period_after_math_ends_sentence() {
        let stmts = parse_block("$1 = 1$. Then $2 = 2$.").expect("parse");
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn directives_parse_name_and_args() {
        let stmts = parse_block("[read \\path{examples/preliminaries.ftl.tex}]").expect("parse");
        match &stmts[0] {
            Statement::Directive(d) => {
                assert_eq!(d.name, "read");
                assert_eq!(d.args, vec!["examples/preliminaries.ftl.tex"]);
            }
            other => panic!("expected directive, got {:?}", other),
        }
    }

    #[test]
    fn environments_nest_and_carry_labels() {
        let text = "\
\\begin{theorem}[Cantor]
No function of $M$ surjects onto $\\powerset{M}$.
\\end{theorem}
\\begin{proof}
Assume the contrary.
Contradiction.
\\end{proof}";
        let stmts = parse_block(text).expect("parse");
        assert_eq!(stmts.len(), 2);
        match &stmts[0] {
            Statement::Block(b) => {
                assert_eq!(b.kind, BlockKind::Theorem);
                assert_eq!(b.label.as_deref(), Some("Cantor"));
                assert_eq!(b.content.len(), 1);
            }
            other => panic!("expected theorem block, got {:?}", other),
        }
        match &stmts[1] {
            Statement::Block(b) => {
                assert_eq!(b.kind, BlockKind::Proof);
                assert_eq!(b.content.len(), 2);
            }
            other => panic!("expected proof block, got {:?}", other),
        }
    }

    #[test]
    fn unmatched_end_is_an_error() {
        assert!(matches!(
            parse_block("\\end{proof}"),
            Err(BlockParseError::UnmatchedEnd { .. })
        ));
    }

    #[test]
    fn unclosed_environment_is_an_error() {
        assert!(matches!(
            parse_block("\\begin{proof} Trivial."),
            Err(BlockParseError::UnclosedEnvironment { .. })
        ));
    }

    #[test]
    fn directive_inside_proof_block() {
        let stmts = parse_block("\\begin{proof}\n[timelimit 10]\nTrivial.\n\\end{proof}").expect("parse");
        match &stmts[0] {
            Statement::Block(b) => {
                assert!(matches!(&b.content[0], Statement::Directive(d) if d.name == "timelimit"));
            }
            other => panic!("expected block, got {:?}", other),
        }
    }
}
