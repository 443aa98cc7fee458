//! Total lexer for math segments.
//!
//! Every input lexes: characters outside the grammar become [`TokKind::Other`]
//! tokens that the parser rejects only where they actually appear. This
//! matters for set-builder notation, where the condition after `|` is free
//! prose that must survive tokenization so the parser can slice it back out
//! of the source via token spans.

/// One token with its byte span in the segment source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tok {
    pub kind: TokKind,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokKind {
    /// `[a-zA-Z][a-zA-Z0-9]*`
    Ident(String),
    /// `[0-9]+`
    Number(String),
    /// `\word`, stored without the backslash; `\mid` lexes as [`TokKind::Pipe`].
    Command(String),
    LParen,
    RParen,
    LBrace,
    RBrace,
    /// `\{` and `\}`
    EscLBrace,
    EscRBrace,
    Comma,
    Underscore,
    Pipe,
    Plus,
    Minus,
    Lt,
    Gt,
    Eq,
    Colon,
    Other(char),
}

pub(crate) fn lex(src: &str) -> Vec<Tok> {
    let bytes = src.as_bytes();
    let mut toks = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let b = bytes[pos];
        if b.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        let start = pos;
        let kind = match b {
            b'(' => {
                pos += 1;
                TokKind::LParen
            }
            b')' => {
                pos += 1;
                TokKind::RParen
            }
            b'{' => {
                pos += 1;
                TokKind::LBrace
            }
            b'}' => {
                pos += 1;
                TokKind::RBrace
            }
            b',' => {
                pos += 1;
                TokKind::Comma
            }
            b'_' => {
                pos += 1;
                TokKind::Underscore
            }
            b'|' => {
                pos += 1;
                TokKind::Pipe
            }
            b'+' => {
                pos += 1;
                TokKind::Plus
            }
            b'-' => {
                pos += 1;
                TokKind::Minus
            }
            b'<' => {
                pos += 1;
                TokKind::Lt
            }
            b'>' => {
                pos += 1;
                TokKind::Gt
            }
            b'=' => {
                pos += 1;
                TokKind::Eq
            }
            b':' => {
                pos += 1;
                TokKind::Colon
            }
            b'\\' => {
                pos += 1;
                if pos < bytes.len() && bytes[pos] == b'{' {
                    pos += 1;
                    TokKind::EscLBrace
                } else if pos < bytes.len() && bytes[pos] == b'}' {
                    pos += 1;
                    TokKind::EscRBrace
                } else {
                    let word_start = pos;
                    while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
                        pos += 1;
                    }
                    let name = &src[word_start..pos];
                    if name == "mid" {
                        TokKind::Pipe
                    } else {
                        TokKind::Command(name.to_string())
                    }
                }
            }
            c if c.is_ascii_alphabetic() => {
                while pos < bytes.len() && bytes[pos].is_ascii_alphanumeric() {
                    pos += 1;
                }
                TokKind::Ident(src[start..pos].to_string())
            }
            c if c.is_ascii_digit() => {
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
                TokKind::Number(src[start..pos].to_string())
            }
            _ => {
                let c = src[pos..].chars().next().unwrap_or('?');
                pos += c.len_utf8();
                TokKind::Other(c)
            }
        };
        toks.push(Tok {
            kind,
            start,
            end: pos,
        });
    }
    toks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokKind> {
        lex(src).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn commands_drop_backslash() {
        assert_eq!(
            kinds("\\powerset{M}"),
            vec![
                TokKind::Command("powerset".into()),
                TokKind::LBrace,
                TokKind::Ident("M".into()),
                TokKind::RBrace,
            ]
        );
    }

    #[test]
    fn mid_lexes_as_pipe() {
        assert_eq!(kinds("\\mid"), vec![TokKind::Pipe]);
    }

    #[test]
    fn prose_lexes_totally() {
        let toks = lex("z isn't red");
        assert!(toks.iter().any(|t| matches!(t.kind, TokKind::Other('\''))));
    }

    #[test]
    fn spans_index_source() {
        let toks = lex("a \\in B");
        assert_eq!(&"a \\in B"[toks[1].start..toks[1].end], "\\in");
    }
}
