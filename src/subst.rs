// SPDX-FileCopyrightText: 2025 stfnw
// SPDX-License-Identifier: MIT

//! Simultaneous substitution of the innermost bound variables of a term.
//!
//! `instantiate(body, values)` replaces the `values.len()` innermost bound
//! variables of `body` by `values` (index `k` by `values[k]`) and shifts the
//! remaining free indices down past the consumed binders. Subtrees whose
//! cached free bound depth shows that they reference none of the affected
//! variables are returned untouched, so the cost is proportional to the part
//! of the term that actually changes and untouched subtrees stay shared.

use crate::term::{make_unique, App, Node, Term};

use std::rc::Rc;

/// Substitute `values` for the innermost bound variables of `body`.
///
/// Every value has to be closed (`free_depth() == 0`); values are retained
/// once per occurrence, never copied.
pub fn instantiate(body: Term, values: &[Term]) -> Term {
    substitute(body, values, true)
}

/// Substitution with the free-bound-depth short circuit optionally turned
/// off. Both settings produce the same term; without pruning every shared
/// node on the way is duplicated.
pub(crate) fn substitute(body: Term, values: &[Term], prune: bool) -> Term {
    // The walk is explicitly iterative (post-order through two stacks) in
    // order to not run into stack limits on long application spines.
    enum Instr {
        /// Substitute into a term found below `depth` binders.
        Visit(Term, u32),
        /// Both children of this (uniquely owned) node are on `done`.
        Rebuild(u32, Rc<App>),
    }

    let count = values.len() as u32;
    let mut stack: Vec<Instr> = vec![Instr::Visit(body, 0)];
    let mut done: Vec<Term> = Vec::new();

    while let Some(instr) = stack.pop() {
        match instr {
            Instr::Visit(Term { binders, node }, depth) => {
                let depth = depth + binders;
                match node {
                    Node::BoundVar(index) if index < depth => done.push(Term {
                        binders,
                        node: Node::BoundVar(index),
                    }),
                    Node::BoundVar(index) if index - depth < count => {
                        done.push(values[(index - depth) as usize].clone().wrap(binders))
                    }
                    Node::BoundVar(index) => done.push(Term {
                        binders,
                        node: Node::BoundVar(index - count),
                    }),
                    Node::Atom(id) => done.push(Term {
                        binders,
                        node: Node::Atom(id),
                    }),
                    Node::App(app) if prune && app.free_depth() <= depth => done.push(Term {
                        binders,
                        node: Node::App(app),
                    }),
                    Node::App(mut app) => {
                        let (func, arg) = make_unique(&mut app).take_children();
                        stack.push(Instr::Rebuild(binders, app));
                        stack.push(Instr::Visit(arg, depth));
                        stack.push(Instr::Visit(func, depth));
                    }
                }
            }
            Instr::Rebuild(binders, mut app) => {
                let (Some(arg), Some(func)) = (done.pop(), done.pop()) else {
                    unreachable!("both children of a rebuilt node are substituted first");
                };
                make_unique(&mut app).set_children(func, arg);
                done.push(Term {
                    binders,
                    node: Node::App(app),
                });
            }
        }
    }

    match done.pop() {
        Some(term) if done.is_empty() => term,
        _ => unreachable!("substitution leaves exactly one term behind"),
    }
}
