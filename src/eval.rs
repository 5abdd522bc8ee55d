// SPDX-FileCopyrightText: 2025 stfnw
// SPDX-License-Identifier: MIT

//! This module implements the reduction machine: call by name evaluation of
//! a closed term to weak head normal form, where three atoms reaching the
//! head of the spine perform bitwise I/O.
//!
//! The machine state is the current term, the unwound application spine
//! (an [`ArgBuffer`] whose tail holds the argument closest to the head), a
//! supply of fresh placeholder atoms and the two bit cursors. Each iteration
//! of the main loop applies exactly one of the following rules, chosen by the
//! shape of the current term:
//!
//! 1. Binders: beta reduce against the innermost buffered arguments, padding
//!    missing ones with placeholder atoms.
//! 2. Application: push the argument onto the spine, continue with the
//!    function.
//! 3. Atom: discard all pending arguments but the innermost, which becomes
//!    the current term, and run the primitive; any atom that is not a
//!    primitive stops the machine.

use crate::buffer::ArgBuffer;
use crate::error::Result;
use crate::format::debruijn;
use crate::subst::instantiate;
use crate::term::{App, Node, Primitive, Term, NIL_ATOM};

use std::io::{self, Read, Write};
use std::rc::Rc;

use tracing::{debug, trace};

/// Knobs of a machine run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineConfig {
    /// Write a line `operation {op} with {term}` to the output stream for
    /// every atom that reaches the head.
    pub trace: bool,
    /// Give up after this many steps. `None` runs until the program halts.
    pub max_steps: Option<u64>,
}

/// Counters of a machine run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub beta_steps: u64,
    pub unwind_steps: u64,
    /// Primitive operations performed.
    pub primitives: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

impl Stats {
    /// Steps taken; this is what `MachineConfig::max_steps` limits.
    pub fn steps(&self) -> u64 {
        self.beta_steps + self.unwind_steps + self.primitives
    }
}

/// How a machine run ended.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// An atom other than a primitive reached the head. `whnf` is the
    /// innermost argument it was applied to, or the nil atom if there was
    /// none.
    Halted { atom: u32, whnf: Term, stats: Stats },
    /// The head is a variable bound outside the program, which only happens
    /// for open terms.
    Stuck { whnf: Term, stats: Stats },
    StepLimitExceeded { stats: Stats },
}

impl Outcome {
    pub fn stats(&self) -> &Stats {
        match self {
            Outcome::Halted { stats, .. }
            | Outcome::Stuck { stats, .. }
            | Outcome::StepLimitExceeded { stats } => stats,
        }
    }
}

/// Source of ids for the placeholder atoms that stand in for missing
/// arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AtomSupply {
    /// No primitive has run yet; the next placeholder gets this id.
    Fresh(u32),
    /// A primitive has run; every placeholder is the nil atom.
    Exhausted,
}

/// Input bits, most significant bit of each byte first.
struct BitReader<R> {
    inner: R,
    byte: u8,
    /// Bit of `byte` to hand out next; 0 when a new byte is needed.
    mask: u8,
    bytes: u64,
}

impl<R: Read> BitReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            byte: 0,
            mask: 0,
            bytes: 0,
        }
    }

    fn needs_byte(&self) -> bool {
        self.mask == 0
    }

    fn read_bit(&mut self) -> io::Result<bool> {
        if self.needs_byte() {
            self.byte = self.fetch()?;
            self.mask = 0x80;
        }
        let bit = self.byte & self.mask != 0;
        self.mask >>= 1;
        Ok(bit)
    }

    /// Next input byte; past the end of input every byte is 0.
    fn fetch(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(0),
                Ok(_) => {
                    self.bytes += 1;
                    return Ok(buf[0]);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

/// Output bits, most significant bit of each byte first. A byte is written as
/// soon as it is complete; an incomplete last byte is never written.
struct BitWriter<W> {
    inner: W,
    byte: u8,
    /// Bit of `byte` the next write sets.
    mask: u8,
    bytes: u64,
}

impl<W: Write> BitWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            byte: 0,
            mask: 0x80,
            bytes: 0,
        }
    }

    fn write_bit(&mut self, bit: bool) -> io::Result<()> {
        if bit {
            self.byte |= self.mask;
        }
        self.mask >>= 1;
        if self.mask == 0 {
            self.inner.write_all(&[self.byte])?;
            self.bytes += 1;
            self.byte = 0;
            self.mask = 0x80;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Church boolean for an input bit: `λλ#1` for 1, `λλ#0` for 0.
fn church_bool(bit: bool) -> Term {
    Term::var(if bit { 1 } else { 0 }).wrap(2)
}

/// The reduction machine. One machine runs one program.
pub struct Machine<R, W> {
    config: MachineConfig,
    args: ArgBuffer,
    supply: AtomSupply,
    input: BitReader<R>,
    output: BitWriter<W>,
    stats: Stats,
}

impl<R: Read, W: Write> Machine<R, W> {
    pub fn new(input: R, output: W, config: MachineConfig) -> Self {
        Self {
            config,
            args: ArgBuffer::new(),
            supply: AtomSupply::Fresh(NIL_ATOM),
            input: BitReader::new(input),
            output: BitWriter::new(output),
            stats: Stats::default(),
        }
    }

    /// Reduce `term` until it halts, gets stuck or runs out of steps.
    pub fn run(mut self, term: Term) -> Result<Outcome> {
        debug!(binders = term.binders, "start reduction");
        let mut term = term;

        loop {
            if let Some(max_steps) = self.config.max_steps {
                if self.stats.steps() >= max_steps {
                    self.output.flush()?;
                    let stats = self.final_stats();
                    debug!(?stats, "step limit exceeded");
                    return Ok(Outcome::StepLimitExceeded { stats });
                }
            }

            term = match term {
                Term { binders, node } if binders > 0 => self.beta(binders, node),
                Term {
                    node: Node::App(app),
                    ..
                } => self.unwind(app),
                Term {
                    node: Node::Atom(op),
                    ..
                } => {
                    let candidate = self.take_candidate();
                    if self.config.trace {
                        writeln!(
                            self.output.inner,
                            "operation {} with {}",
                            op,
                            debruijn::encode(&candidate)
                        )?;
                    }
                    match Primitive::from_atom(op) {
                        Some(prim) => {
                            trace!(?prim, "primitive");
                            self.perform(prim)?;
                            candidate
                        }
                        None => {
                            self.output.flush()?;
                            let stats = self.final_stats();
                            debug!(atom = op, ?stats, "halted");
                            return Ok(Outcome::Halted {
                                atom: op,
                                whnf: candidate,
                                stats,
                            });
                        }
                    }
                }
                Term {
                    node: Node::BoundVar(index),
                    ..
                } => {
                    self.output.flush()?;
                    let stats = self.final_stats();
                    debug!(index, ?stats, "stuck on a free variable");
                    return Ok(Outcome::Stuck {
                        whnf: Term::var(index),
                        stats,
                    });
                }
            };
        }
    }

    /// Substitute the innermost `binders` arguments into the body.
    fn beta(&mut self, binders: u32, node: Node) -> Term {
        self.stats.beta_steps += 1;
        let n = binders as usize;

        if self.args.len() < n {
            let missing = n - self.args.len();
            let slots = self.args.extend_front(missing);
            match self.supply {
                AtomSupply::Fresh(next) => {
                    // The outermost missing binder gets the lowest id. Ids
                    // wrap around once the counter is used up.
                    for (i, slot) in slots.iter_mut().enumerate() {
                        *slot = Term::atom(next.wrapping_add((missing - i - 1) as u32));
                    }
                    self.supply = AtomSupply::Fresh(next.wrapping_add(missing as u32));
                }
                AtomSupply::Exhausted => {
                    for slot in slots {
                        *slot = Term::atom(NIL_ATOM);
                    }
                }
            }
        }

        let body = Term { binders: 0, node };
        let result = instantiate(body, self.args.back(n));
        self.args.release_back(n);
        result
    }

    fn unwind(&mut self, app: Rc<App>) -> Term {
        self.stats.unwind_steps += 1;
        let (func, arg) = match Rc::try_unwrap(app) {
            Ok(mut app) => app.take_children(),
            Err(app) => (app.func().clone(), app.arg().clone()),
        };
        self.args.push_back(arg);
        func
    }

    /// Drop every pending argument and return the innermost one.
    fn take_candidate(&mut self) -> Term {
        while self.args.len() > 1 {
            self.args.pop_front();
        }
        let candidate = self.args.pop_back().unwrap_or(Term::atom(NIL_ATOM));
        self.args.clear();
        candidate
    }

    fn perform(&mut self, prim: Primitive) -> io::Result<()> {
        match prim {
            Primitive::ReadBit => {
                // Interactive programs need to see their output before they
                // block on input.
                if self.input.needs_byte() {
                    self.output.flush()?;
                }
                let bit = self.input.read_bit()?;
                self.args.push_back(church_bool(bit));
            }
            Primitive::WriteZero => self.output.write_bit(false)?,
            Primitive::WriteOne => self.output.write_bit(true)?,
        }
        self.stats.primitives += 1;
        self.supply = AtomSupply::Exhausted;
        Ok(())
    }

    fn final_stats(&self) -> Stats {
        Stats {
            bytes_read: self.input.bytes,
            bytes_written: self.output.bytes,
            ..self.stats
        }
    }
}

/// Run `term` on a fresh machine.
pub fn eval<R: Read, W: Write>(
    term: Term,
    input: R,
    output: W,
    config: MachineConfig,
) -> Result<Outcome> {
    Machine::new(input, output, config).run(term)
}
