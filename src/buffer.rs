// SPDX-FileCopyrightText: 2025 stfnw
// SPDX-License-Identifier: MIT

//! Double-ended buffer of pending arguments, the unwound application spine of
//! the reduction machine.
//!
//! The live elements occupy `slots[off..end]`; slots outside that range hold
//! inert atoms. The tail (`end - 1`) is the argument closest to the term being
//! reduced. The buffer owns every live term: removing one without handing it
//! on releases it.

use crate::term::{Term, NIL_ATOM};

const MIN_CAPACITY: usize = 16;

#[derive(Debug, Default)]
pub struct ArgBuffer {
    slots: Vec<Term>,
    off: usize,
    end: usize,
}

impl ArgBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.end - self.off
    }

    pub fn is_empty(&self) -> bool {
        self.off == self.end
    }

    /// Number of slots in the backing storage.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The live elements, front first.
    pub fn as_slice(&self) -> &[Term] {
        &self.slots[self.off..self.end]
    }

    /// Append an argument at the tail. When the backing storage is full the
    /// live range is first moved to the start if there is room in front of
    /// it, otherwise the capacity doubles.
    pub fn push_back(&mut self, term: Term) {
        if self.end == self.slots.len() {
            if self.off > 0 {
                self.slots[..self.end].rotate_left(self.off);
                self.end -= self.off;
                self.off = 0;
            } else {
                let capacity = (self.slots.len() * 2).max(MIN_CAPACITY);
                self.grow(capacity);
            }
        }
        self.slots[self.end] = term;
        self.end += 1;
    }

    /// Reserve `n` leading slots in front of the live range and return them
    /// for the caller to fill; they count as live from now on.
    pub fn extend_front(&mut self, n: usize) -> &mut [Term] {
        if self.off >= n {
            self.off -= n;
        } else {
            let missing = n - self.off;
            if self.end + missing > self.slots.len() {
                let mut capacity = self.slots.len().max(MIN_CAPACITY);
                while self.end + missing > capacity {
                    capacity *= 2;
                }
                self.grow(capacity);
            }
            // Moves `off..end` to `n..end + missing`; the free slots in
            // front come around to the start.
            self.slots[..self.end + missing].rotate_right(missing);
            self.off = 0;
            self.end += missing;
        }
        &mut self.slots[self.off..self.off + n]
    }

    /// The `n` elements at the tail, front first.
    pub fn back(&self, n: usize) -> &[Term] {
        &self.slots[self.end - n..self.end]
    }

    /// Release the `n` elements at the tail.
    pub fn release_back(&mut self, n: usize) {
        for slot in &mut self.slots[self.end - n..self.end] {
            *slot = Term::atom(NIL_ATOM);
        }
        self.end -= n;
    }

    pub fn pop_back(&mut self) -> Option<Term> {
        if self.is_empty() {
            return None;
        }
        self.end -= 1;
        Some(std::mem::replace(
            &mut self.slots[self.end],
            Term::atom(NIL_ATOM),
        ))
    }

    pub fn pop_front(&mut self) -> Option<Term> {
        if self.is_empty() {
            return None;
        }
        let term = std::mem::replace(&mut self.slots[self.off], Term::atom(NIL_ATOM));
        self.off += 1;
        Some(term)
    }

    /// Release every live element; the backing storage is kept.
    pub fn clear(&mut self) {
        for slot in &mut self.slots[self.off..self.end] {
            *slot = Term::atom(NIL_ATOM);
        }
        self.off = 0;
        self.end = 0;
    }

    fn grow(&mut self, capacity: usize) {
        self.slots.resize(capacity, Term::atom(NIL_ATOM));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::live_nodes;

    fn atoms(buf: &ArgBuffer) -> Vec<u32> {
        buf.as_slice()
            .iter()
            .map(|term| match term.node {
                crate::term::Node::Atom(id) => id,
                _ => panic!("expected an atom, got {}", term),
            })
            .collect()
    }

    #[test]
    fn test_push_and_pop() {
        let mut buf = ArgBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(None, buf.pop_back());
        assert_eq!(None, buf.pop_front());

        for i in 0..40 {
            buf.push_back(Term::atom(i));
        }
        assert_eq!(40, buf.len());
        assert_eq!(64, buf.capacity());
        assert_eq!((0..40).collect::<Vec<_>>(), atoms(&buf));

        assert_eq!(Some(Term::atom(39)), buf.pop_back());
        assert_eq!(Some(Term::atom(0)), buf.pop_front());
        assert_eq!(Some(Term::atom(1)), buf.pop_front());
        assert_eq!((2..39).collect::<Vec<_>>(), atoms(&buf));
        assert_eq!(&[Term::atom(37), Term::atom(38)], buf.back(2));
    }

    /// Pushing into a full buffer with free slots in front compacts instead
    /// of growing.
    #[test]
    fn test_push_compacts_before_growing() {
        let mut buf = ArgBuffer::new();
        for i in 0..16 {
            buf.push_back(Term::atom(i));
        }
        assert_eq!(16, buf.capacity());
        for _ in 0..4 {
            buf.pop_front();
        }
        buf.push_back(Term::atom(16));
        assert_eq!(16, buf.capacity());
        assert_eq!((4..17).collect::<Vec<_>>(), atoms(&buf));

        for i in 17..20 {
            buf.push_back(Term::atom(i));
        }
        assert_eq!(16, buf.capacity());
        buf.push_back(Term::atom(20));
        assert_eq!(32, buf.capacity());
        assert_eq!((4..21).collect::<Vec<_>>(), atoms(&buf));
    }

    #[test]
    fn test_extend_front_uses_slack() {
        let mut buf = ArgBuffer::new();
        for i in 0..8 {
            buf.push_back(Term::atom(i));
        }
        buf.pop_front();
        buf.pop_front();
        buf.pop_front();

        let front = buf.extend_front(2);
        assert_eq!(2, front.len());
        front[0] = Term::atom(101);
        front[1] = Term::atom(102);
        assert_eq!(vec![101, 102, 3, 4, 5, 6, 7], atoms(&buf));
        assert_eq!(16, buf.capacity());
    }

    #[test]
    fn test_extend_front_shifts_and_grows() {
        let mut buf = ArgBuffer::new();
        let front = buf.extend_front(3);
        for (i, slot) in front.iter_mut().enumerate() {
            *slot = Term::atom(i as u32);
        }
        assert_eq!(vec![0, 1, 2], atoms(&buf));
        assert_eq!(16, buf.capacity());

        buf.push_back(Term::atom(3));
        buf.pop_front();
        let front = buf.extend_front(40);
        assert_eq!(40, front.len());
        for (i, slot) in front.iter_mut().enumerate() {
            *slot = Term::atom(100 + i as u32);
        }
        assert_eq!(43, buf.len());
        assert_eq!(64, buf.capacity());
        let expected: Vec<u32> = (100..140).chain(1..4).collect();
        assert_eq!(expected, atoms(&buf));
    }

    #[test]
    fn test_release_back_and_clear() {
        let before = live_nodes::count();
        let mut buf = ArgBuffer::new();
        for i in 0..20 {
            buf.push_back(Term::app(Term::atom(i), Term::atom(i + 1)));
        }
        assert_eq!(before + 20, live_nodes::count());

        buf.release_back(5);
        assert_eq!(15, buf.len());
        assert_eq!(before + 15, live_nodes::count());

        let kept = buf.pop_front();
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(before + 1, live_nodes::count());
        drop(kept);

        buf.push_back(Term::app(Term::atom(1), Term::atom(2)));
        drop(buf);
        assert_eq!(before, live_nodes::count());
    }
}
