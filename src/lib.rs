// SPDX-FileCopyrightText: 2025 stfnw
// SPDX-License-Identifier: MIT

//! Evaluator for programs in the untyped lambda calculus that talk to the
//! outside world one bit at a time.
//!
//! A program is a closed term. It is reduced to weak head normal form under
//! call by name; the free atoms `read`, `w0` and `w1` (the second to fourth
//! binders of the program) read a bit from the input or append a bit to the
//! output whenever they reach the head of the term.

pub mod buffer;
pub mod error;
pub mod eval;
pub mod format;
pub mod subst;
pub mod term;

pub use error::{Diagnostic, Error, ParseError, Result};
pub use eval::{eval, Machine, MachineConfig, Outcome, Stats};
pub use term::Term;
