//! Controlled natural language front end for the Naproche proof checker.
//!
//! The pipeline runs in four stages:
//!
//! 1. **[`source`]**: extract `forthel` environment contents from a marked-up
//!    document.
//! 2. **[`block`]**: parse block contents into the statement AST — bracket
//!    directives, `\begin{...}`/`\end{...}` environments, and sentences split
//!    into atom tokens (words and intact math segments).
//! 3. **[`math`]**: parse dollar-delimited mathematical expressions into
//!    first-order terms and formulas.
//! 4. **[`translate`]**: pattern-directed translation of sentences and blocks
//!    into closed first-order formulas, with user-extensible macros and noun
//!    synonyms.
//!
//! The statement AST lives in [`ast`]. Everything downstream of this crate
//! (obligation dispatch, provers, caching) lives in `naproche-check`.

pub mod ast;
pub mod block;
pub mod math;
pub mod source;
pub mod translate;

pub use ast::{Atom, Block, BlockKind, Directive, Sentence, Statement};
pub use block::parse_block;
pub use math::{parse_math, MathExpr, MathParseError};
pub use source::extract_forthel_blocks;
pub use translate::{SentenceOutcome, TheoremTranslation, TranslateError, Translator};
