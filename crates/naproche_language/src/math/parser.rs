//! Recursive descent over the math token stream.
//!
//! Precedence, loosest to tightest: implication/iff, relations, arrows,
//! set operators, other binary operators, subscripts, primaries. All
//! binary operator levels associate left.

use naproche_logic::{Formula, Term};

use super::lexer::{lex, Tok, TokKind};
use super::{MathExpr, MathParseError};

pub(crate) struct Parser<'a> {
    src: &'a str,
    toks: Vec<Tok>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(src: &'a str) -> Parser<'a> {
        Parser {
            src,
            toks: lex(src),
            pos: 0,
        }
    }

    pub(crate) fn parse_expression_complete(mut self) -> Result<MathExpr, MathParseError> {
        let expr = self.parse_expression()?;
        self.expect_eof()?;
        Ok(expr)
    }

    pub(crate) fn parse_term_list_complete(mut self) -> Result<Vec<Term>, MathParseError> {
        let mut terms = vec![self.parse_term()?];
        while self.eat(&TokKind::Comma) {
            terms.push(self.parse_term()?);
        }
        self.expect_eof()?;
        Ok(terms)
    }

    // -------------------------------------------------------------------------
    // Expression levels
    // -------------------------------------------------------------------------

    fn parse_expression(&mut self) -> Result<MathExpr, MathParseError> {
        let left = self.parse_relation()?;
        let connective = match self.peek() {
            Some(TokKind::Command(name)) if name == "implies" || name == "Longrightarrow" => {
                Some(false)
            }
            Some(TokKind::Command(name)) if name == "iff" || name == "Longleftrightarrow" => {
                Some(true)
            }
            _ => None,
        };
        let Some(is_iff) = connective else {
            return Ok(left);
        };
        let at = self.here();
        self.pos += 1;
        let right = self.parse_expression()?;
        let lf = left
            .into_formula()
            .ok_or_else(|| MathParseError::new("left side of connective is not a formula", at))?;
        let rf = right
            .into_formula()
            .ok_or_else(|| MathParseError::new("right side of connective is not a formula", at))?;
        Ok(MathExpr::Formula(if is_iff {
            Formula::iff(lf, rf)
        } else {
            Formula::implies(lf, rf)
        }))
    }

    fn parse_relation(&mut self) -> Result<MathExpr, MathParseError> {
        let first = self.parse_term()?;
        let mut chain = Vec::new();
        let mut left = first.clone();
        while let Some(op) = self.peek_rel_op() {
            self.pos += 1;
            let right = self.parse_term()?;
            chain.push(Self::make_relation(op, left, right.clone()));
            left = right;
        }
        if chain.is_empty() {
            return Ok(MathExpr::Term(first));
        }
        let mut acc = chain.remove(0);
        for f in chain {
            acc = Formula::and(acc, f);
        }
        Ok(MathExpr::Formula(acc))
    }

    fn peek_rel_op(&self) -> Option<RelOp> {
        match self.peek()? {
            TokKind::Eq => Some(RelOp::Equal),
            TokKind::Lt => Some(RelOp::Named("less")),
            TokKind::Gt => Some(RelOp::Named(">")),
            TokKind::Colon => Some(RelOp::Named("colon")),
            TokKind::Command(name) => match name.as_str() {
                "leq" | "le" => Some(RelOp::Named("leq")),
                "geq" | "ge" => Some(RelOp::Named("geq")),
                "neq" => Some(RelOp::Named("neq")),
                "in" => Some(RelOp::Named("in")),
                "notin" => Some(RelOp::Negated("in")),
                "subseteq" => Some(RelOp::Named("subset")),
                _ => None,
            },
            _ => None,
        }
    }

    fn make_relation(op: RelOp, left: Term, right: Term) -> Formula {
        match op {
            RelOp::Equal => Formula::equal(left, right),
            RelOp::Named(name) => Formula::pred(name, vec![left, right]),
            RelOp::Negated(name) => Formula::not(Formula::pred(name, vec![left, right])),
        }
    }

    // -------------------------------------------------------------------------
    // Term levels
    // -------------------------------------------------------------------------

    fn parse_term(&mut self) -> Result<Term, MathParseError> {
        let mut t = self.parse_set_term()?;
        while let Some(TokKind::Command(name)) = self.peek() {
            let op = match name.as_str() {
                "to" | "rightarrow" => "to",
                "leftrightarrow" => "leftrightarrow",
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_set_term()?;
            t = Term::func(op, vec![t, rhs]);
        }
        Ok(t)
    }

    fn parse_set_term(&mut self) -> Result<Term, MathParseError> {
        let mut t = self.parse_bin_op()?;
        while let Some(TokKind::Command(name)) = self.peek() {
            let op = match name.as_str() {
                "setminus" | "cup" | "cap" => name.clone(),
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_bin_op()?;
            t = Term::func(op, vec![t, rhs]);
        }
        Ok(t)
    }

    fn parse_bin_op(&mut self) -> Result<Term, MathParseError> {
        let mut t = self.parse_postfix()?;
        loop {
            let op = match self.peek() {
                Some(TokKind::Plus) => "+".to_string(),
                Some(TokKind::Minus) => "-".to_string(),
                Some(TokKind::Command(name))
                    if matches!(name.as_str(), "times" | "cdot" | "circ") =>
                {
                    name.clone()
                }
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_postfix()?;
            t = Term::func(op, vec![t, rhs]);
        }
        Ok(t)
    }

    fn parse_postfix(&mut self) -> Result<Term, MathParseError> {
        let mut t = self.parse_primary()?;
        while self.eat(&TokKind::Underscore) {
            let sub = if self.eat(&TokKind::LBrace) {
                let inner = self.parse_term()?;
                self.expect(&TokKind::RBrace, "closing '}' of subscript")?;
                inner
            } else {
                self.parse_primary()?
            };
            t = Term::func("subscript", vec![t, sub]);
        }
        Ok(t)
    }

    fn parse_primary(&mut self) -> Result<Term, MathParseError> {
        let at = self.here();
        let kind = match self.advance() {
            Some(k) => k,
            None => return Err(MathParseError::new("unexpected end of math segment", at)),
        };
        match kind {
            TokKind::Command(name) if name == "class" && self.peek() == Some(&TokKind::LBrace) => {
                self.pos += 1;
                self.parse_set_comp(&TokKind::RBrace)
            }
            TokKind::Command(name) => {
                if self.peek() == Some(&TokKind::LBrace) {
                    let mut args = Vec::new();
                    while self.eat(&TokKind::LBrace) {
                        args.push(self.parse_term()?);
                        self.expect(&TokKind::RBrace, "closing '}' of argument")?;
                    }
                    Ok(Term::func(name, args))
                } else if self.peek() == Some(&TokKind::LParen) {
                    Ok(Term::func(name, self.parse_paren_args()?))
                } else {
                    Ok(Term::constant(name))
                }
            }
            TokKind::Ident(name) => {
                if self.peek() == Some(&TokKind::LParen) {
                    Ok(Term::func(name, self.parse_paren_args()?))
                } else if name.chars().count() == 1 {
                    Ok(Term::var(name))
                } else {
                    Ok(Term::constant(name))
                }
            }
            TokKind::Number(digits) => Ok(Term::constant(digits)),
            TokKind::LParen => {
                let mut terms = vec![self.parse_term()?];
                while self.eat(&TokKind::Comma) {
                    terms.push(self.parse_term()?);
                }
                self.expect(&TokKind::RParen, "closing ')'")?;
                if terms.len() >= 2 {
                    let name = if terms.len() == 2 { "pair" } else { "tuple" };
                    return Ok(Term::func(name, terms));
                }
                terms
                    .pop()
                    .ok_or_else(|| MathParseError::new("empty parentheses", at))
            }
            TokKind::LBrace => self.parse_brace_group(&TokKind::RBrace),
            TokKind::EscLBrace => self.parse_brace_group(&TokKind::EscRBrace),
            other => Err(MathParseError::new(
                format!("unexpected token {:?}", other),
                at,
            )),
        }
    }

    fn parse_paren_args(&mut self) -> Result<Vec<Term>, MathParseError> {
        self.expect(&TokKind::LParen, "'('")?;
        let mut args = vec![self.parse_term()?];
        while self.eat(&TokKind::Comma) {
            args.push(self.parse_term()?);
        }
        self.expect(&TokKind::RParen, "closing ')'")?;
        Ok(args)
    }

    /// Either a set enumeration `{a, b}` or a set comprehension
    /// `{expr | condition}`, decided by scanning for a `|` before the
    /// matching close.
    fn parse_brace_group(&mut self, close: &TokKind) -> Result<Term, MathParseError> {
        if self.has_top_level_pipe(close) {
            return self.parse_set_comp(close);
        }
        if self.eat(close) {
            return Ok(Term::constant("empty_set"));
        }
        let mut terms = vec![self.parse_term()?];
        while self.eat(&TokKind::Comma) {
            terms.push(self.parse_term()?);
        }
        self.expect(close, "closing brace of set")?;
        Ok(if terms.len() == 1 {
            Term::func("singleton", terms)
        } else {
            Term::func("set_enum", terms)
        })
    }

    /// `expr | condition-text` up to the matching close token. The head is
    /// either a bare variable/term (no domain) or an `\in` relation (bound
    /// variable plus domain). The condition is sliced verbatim from the
    /// source, to be re-tokenized by the sentence translator.
    fn parse_set_comp(&mut self, close: &TokKind) -> Result<Term, MathParseError> {
        let at = self.here();
        let head = self.parse_relation()?;
        self.expect(&TokKind::Pipe, "'|' of set comprehension")?;
        let text_start = self.here();
        let close_idx = self
            .find_matching(close)
            .ok_or_else(|| MathParseError::new("unterminated set comprehension", at))?;
        let text_end = self.toks[close_idx].start;
        let text = self.src[text_start..text_end].trim().to_string();
        self.pos = close_idx + 1;

        match head {
            MathExpr::Term(t) => Ok(Term::func("set_comp", vec![t, Term::constant(text)])),
            MathExpr::Formula(Formula::Predicate(name, args)) if name == "in" && args.len() == 2 => {
                let mut args = args;
                args.push(Term::constant(text));
                Ok(Term::func("set_comp", args))
            }
            MathExpr::Formula(_) => Err(MathParseError::new(
                "unsupported set-builder head",
                at,
            )),
        }
    }

    // -------------------------------------------------------------------------
    // Token plumbing
    // -------------------------------------------------------------------------

    fn peek(&self) -> Option<&TokKind> {
        self.toks.get(self.pos).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<TokKind> {
        let tok = self.toks.get(self.pos)?.kind.clone();
        self.pos += 1;
        Some(tok)
    }

    fn eat(&mut self, kind: &TokKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokKind, what: &str) -> Result<(), MathParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(MathParseError::new(format!("expected {}", what), self.here()))
        }
    }

    fn expect_eof(&self) -> Result<(), MathParseError> {
        if self.pos < self.toks.len() {
            return Err(MathParseError::new(
                "unexpected trailing input",
                self.toks[self.pos].start,
            ));
        }
        Ok(())
    }

    /// Byte offset of the current token, or end of input.
    fn here(&self) -> usize {
        self.toks
            .get(self.pos)
            .map(|t| t.start)
            .unwrap_or(self.src.len())
    }

    /// Index of the token closing the current group, counting nested
    /// brackets from the current position.
    fn find_matching(&self, close: &TokKind) -> Option<usize> {
        let mut depth = 0usize;
        for (i, tok) in self.toks.iter().enumerate().skip(self.pos) {
            match &tok.kind {
                k if k == close && depth == 0 => return Some(i),
                TokKind::LBrace | TokKind::EscLBrace | TokKind::LParen => depth += 1,
                TokKind::RBrace | TokKind::EscRBrace | TokKind::RParen => {
                    depth = depth.saturating_sub(1)
                }
                _ => {}
            }
        }
        None
    }

    /// True if a top-level `|` occurs before the matching close token.
    fn has_top_level_pipe(&self, close: &TokKind) -> bool {
        let mut depth = 0usize;
        for tok in self.toks.iter().skip(self.pos) {
            match &tok.kind {
                k if k == close && depth == 0 => return false,
                TokKind::Pipe if depth == 0 => return true,
                TokKind::LBrace | TokKind::EscLBrace | TokKind::LParen => depth += 1,
                TokKind::RBrace | TokKind::EscRBrace | TokKind::RParen => {
                    depth = depth.saturating_sub(1)
                }
                _ => {}
            }
        }
        false
    }
}

enum RelOp {
    Equal,
    Named(&'static str),
    Negated(&'static str),
}
