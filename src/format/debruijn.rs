// SPDX-FileCopyrightText: 2025 stfnw
// SPDX-License-Identifier: MIT

//! This module renders terms in a nameless debug notation: bound variables as
//! `#k` (0-based De-Bruijn indices), atoms as `!id`, fused binders as `lam` or
//! `lam[n]` and application by juxtaposition.

use crate::term::{Node, Term};

use std::fmt::Write;

/// The term sits in function position: abstractions need parentheses.
const FUNC: u8 = 1;
/// The term sits in argument position: applications need parentheses.
const ARG: u8 = 2;

/// Render a term for trace output. (Pre-order tree-traversal, explicitly
/// iterative to prevent stack overflow for large terms).
pub fn encode(term: &Term) -> String {
    enum Instr<'a> {
        T(&'a Term, u8),
        N(&'a Node, u8),
        Print(&'static str),
    }

    let mut stack: Vec<Instr> = Vec::new();
    let mut result = String::new();

    stack.push(Instr::T(term, 0));

    while let Some(instr) = stack.pop() {
        match instr {
            Instr::Print(s) => result.push_str(s),
            Instr::T(term, parens) if term.binders > 0 => {
                if parens & FUNC != 0 {
                    result.push('(');
                    stack.push(Instr::Print(")"));
                }
                if term.binders == 1 {
                    result.push_str("lam ");
                } else {
                    let _ = write!(result, "lam[{}] ", term.binders);
                }
                stack.push(Instr::N(&term.node, 0));
            }
            Instr::T(term, parens) => stack.push(Instr::N(&term.node, parens)),
            Instr::N(Node::BoundVar(index), _) => {
                let _ = write!(result, "#{}", index);
            }
            Instr::N(Node::Atom(id), _) => {
                let _ = write!(result, "!{}", id);
            }
            Instr::N(Node::App(app), parens) => {
                let arg_parens = if parens & ARG != 0 {
                    result.push('(');
                    stack.push(Instr::Print(")"));
                    ARG
                } else {
                    parens | ARG
                };
                stack.push(Instr::T(app.arg(), arg_parens));
                stack.push(Instr::Print(" "));
                stack.push(Instr::T(app.func(), FUNC));
            }
        }
    }

    result
}
