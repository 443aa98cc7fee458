//! First-order logic core for the Naproche proof checker.
//!
//! This crate defines the owned term/formula tree shared by the
//! translation pipeline and the checking engine:
//!
//! - **[`Term`]**: variables, constants, and function applications
//! - **[`Formula`]**: predicates, equality, connectives, and quantifiers
//! - **[`tptp`]**: rendering of named formulas into a TPTP FOF problem
//!
//! Formulas are immutable values with structural equality. Their
//! [`Display`](std::fmt::Display) form is the *canonical string*: a
//! deterministic, TPTP-compatible rendering used both as prover input and
//! as the basis for cache digests. Builders never quote names; the
//! renderer single-quotes any symbol that would collide with the TPTP
//! identifier rule.

pub mod fol;
pub mod tptp;

pub use fol::{Formula, QuantifierKind, Term};
pub use tptp::{fof_line, problem_file};
