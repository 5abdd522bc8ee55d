// SPDX-FileCopyrightText: 2025 stfnw
// SPDX-License-Identifier: MIT

//! Term representation shared by the parser, the substitution engine and the
//! reduction machine.
//!
//! A term is a payload (bound variable, atom or application) together with a
//! number of lambda binders fused on top of it: `Term { binders: n, node }`
//! denotes `λ…λ (n times). node`. Only applications allocate; they are
//! reference counted with `Rc`, so cloning a `Term` retains the node and
//! dropping it releases the node.

use crate::format::debruijn;

use std::rc::Rc;

/// Atom id the machine synthesizes once fresh ids are exhausted, and the
/// value of an empty argument spine.
pub const NIL_ATOM: u32 = 0;

/// The three atoms the reduction machine interprets as bitwise I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Read one bit from standard input and pass it on as a Church boolean.
    ReadBit,
    /// Append a 0 bit to standard output.
    WriteZero,
    /// Append a 1 bit to standard output.
    WriteOne,
}

impl Primitive {
    pub fn from_atom(id: u32) -> Option<Primitive> {
        match id {
            1 => Some(Primitive::ReadBit),
            2 => Some(Primitive::WriteZero),
            3 => Some(Primitive::WriteOne),
            _ => None,
        }
    }

    pub fn atom(self) -> u32 {
        match self {
            Primitive::ReadBit => 1,
            Primitive::WriteZero => 2,
            Primitive::WriteOne => 3,
        }
    }
}

/// A lambda term with its fused binder count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    /// Number of lambda abstractions enclosing `node`.
    pub binders: u32,
    pub node: Node,
}

/// Payload of a term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// De Bruijn index, 0 refers to the innermost enclosing binder.
    BoundVar(u32),
    /// Opaque marker; ids 1 to 3 are primitives, every other id is inert.
    Atom(u32),
    /// Shared application node.
    App(Rc<App>),
}

/// Application node. Holds both children and caches the free bound depth of
/// the application (one past the largest de Bruijn index reachable from it,
/// relative to the node itself).
#[derive(Debug, PartialEq, Eq)]
pub struct App {
    func: Term,
    arg: Term,
    free_depth: u32,
}

impl Term {
    pub const fn var(index: u32) -> Term {
        Term {
            binders: 0,
            node: Node::BoundVar(index),
        }
    }

    pub const fn atom(id: u32) -> Term {
        Term {
            binders: 0,
            node: Node::Atom(id),
        }
    }

    /// Build an application, taking ownership of both children.
    pub fn app(func: Term, arg: Term) -> Term {
        Term {
            binders: 0,
            node: Node::App(Rc::new(App::new(func, arg))),
        }
    }

    /// Add `n` binders on top of the term.
    pub fn wrap(mut self, n: u32) -> Term {
        self.binders += n;
        self
    }

    /// The same payload without its binders.
    pub fn body(self) -> Term {
        Term {
            binders: 0,
            node: self.node,
        }
    }

    /// One past the largest de Bruijn index that escapes this term, 0 if the
    /// term is closed.
    pub fn free_depth(&self) -> u32 {
        let inner = match &self.node {
            Node::BoundVar(index) => index.saturating_add(1),
            Node::Atom(_) => 0,
            Node::App(app) => app.free_depth,
        };
        inner.saturating_sub(self.binders)
    }

    pub fn is_closed(&self) -> bool {
        self.free_depth() == 0
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", debruijn::encode(self))
    }
}

impl App {
    fn new(func: Term, arg: Term) -> App {
        #[cfg(test)]
        live_nodes::inc();
        let free_depth = func.free_depth().max(arg.free_depth());
        App {
            func,
            arg,
            free_depth,
        }
    }

    pub fn func(&self) -> &Term {
        &self.func
    }

    pub fn arg(&self) -> &Term {
        &self.arg
    }

    pub fn free_depth(&self) -> u32 {
        self.free_depth
    }

    /// Move both children out, leaving inert atoms behind. The cached depth
    /// is stale until `set_children` is called.
    pub(crate) fn take_children(&mut self) -> (Term, Term) {
        (
            std::mem::replace(&mut self.func, Term::atom(NIL_ATOM)),
            std::mem::replace(&mut self.arg, Term::atom(NIL_ATOM)),
        )
    }

    /// Install new children and recompute the cached free bound depth.
    pub(crate) fn set_children(&mut self, func: Term, arg: Term) {
        self.free_depth = func.free_depth().max(arg.free_depth());
        self.func = func;
        self.arg = arg;
    }
}

/// Copy-on-write access to a shared application node.
///
/// If `app` is the only owner of its node it is returned as is. Otherwise the
/// node is duplicated (children retained, cached depth copied), `app` is
/// pointed at the fresh copy and the other owners keep seeing the original.
pub fn make_unique(app: &mut Rc<App>) -> &mut App {
    Rc::make_mut(app)
}

impl Clone for App {
    fn clone(&self) -> App {
        #[cfg(test)]
        live_nodes::inc();
        App {
            func: self.func.clone(),
            arg: self.arg.clone(),
            free_depth: self.free_depth,
        }
    }
}

/// Dropping the last owner of a long application spine would otherwise
/// recurse once per node. Children are detached and released from an
/// explicit work list instead, the same way the list chapters of
/// https://rust-unofficial.github.io/too-many-lists/first-drop.html do it.
impl Drop for App {
    fn drop(&mut self) {
        #[cfg(test)]
        live_nodes::dec();

        let mut stack: Vec<Rc<App>> = Vec::new();
        let (func, arg) = self.take_children();
        for child in [func, arg] {
            if let Node::App(app) = child.node {
                stack.push(app);
            }
        }

        while let Some(app) = stack.pop() {
            // Nodes still shared elsewhere just lose one owner here.
            if let Ok(mut app) = Rc::try_unwrap(app) {
                let (func, arg) = app.take_children();
                for child in [func, arg] {
                    if let Node::App(app) = child.node {
                        stack.push(app);
                    }
                }
            }
        }
    }
}
