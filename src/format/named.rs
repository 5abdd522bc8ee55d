// SPDX-FileCopyrightText: 2025 stfnw
// SPDX-License-Identifier: MIT

//! This module implements decoding of programs written in the usual text
//! notation with named variables into nameless terms.
//!
//! The EBNF grammar is roughly (ignoring whitespace):
//!
//! <term>        := <operand>* (<operand> | <abstraction>)
//! <abstraction> := <lambda> <ident>+ <sep> <term>
//! <operand>     := <ident> | "(" <term> ")"
//! <lambda>      := "\" | "λ"
//! <sep>         := "." | ","
//!
//! Application associates to the left and an abstraction extends as far to
//! the right as possible. Identifiers are runs of printable characters other
//! than the punctuation above. Every identifier has to be bound by an
//! enclosing abstraction; nested binders are fused into one binder count.

use crate::error::{Diagnostic, ParseError};
use crate::term::{Term, NIL_ATOM};

/// Diagnostics beyond this are counted but not kept.
const MAX_DIAGNOSTICS: usize = 100;

/// Parse a program. `file` is only used to label diagnostics.
pub fn decode(file: &str, source: &str) -> Result<Term, ParseError> {
    let mut diagnostics = Diagnostics::new(file);
    let tokens = Lexer::new(source).lex(&mut diagnostics);
    let mut parser = Parser::new(tokens, diagnostics);
    let term = parser.parse();
    parser.diagnostics.finish(term)
}

struct Diagnostics {
    file: String,
    list: Vec<Diagnostic>,
    dropped: usize,
}

impl Diagnostics {
    fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            list: Vec::new(),
            dropped: 0,
        }
    }

    fn report(&mut self, line: u32, column: u32, message: impl Into<String>) {
        if self.list.len() < MAX_DIAGNOSTICS {
            self.list.push(Diagnostic {
                file: self.file.clone(),
                line,
                column,
                message: message.into(),
            });
        } else {
            self.dropped += 1;
        }
    }

    fn finish(self, term: Option<Term>) -> Result<Term, ParseError> {
        match term {
            Some(term) if self.list.is_empty() => Ok(term),
            _ => Err(ParseError {
                diagnostics: self.list,
                dropped: self.dropped,
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token<'a> {
    Ident(&'a str),
    /// `\` or `λ`, as written.
    Lambda(char),
    LParen,
    RParen,
    Sep(char),
    Eof,
}

impl Token<'_> {
    fn text(&self) -> String {
        match self {
            Token::Ident(name) => name.to_string(),
            Token::Lambda(c) => c.to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Sep(c) => c.to_string(),
            Token::Eof => "end of file".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
struct Spanned<'a> {
    token: Token<'a>,
    line: u32,
    column: u32,
}

fn is_ident_char(c: char) -> bool {
    c as u32 >= 0x21 && !matches!(c, '\\' | 'λ' | '(' | ')' | '.' | ',')
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: u32,
    line_start: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            line_start: 0,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self, c: char) {
        self.pos += c.len_utf8();
    }

    fn column(&self) -> u32 {
        (self.pos - self.line_start + 1) as u32
    }

    /// Tokenize the whole input; the result always ends with `Token::Eof`.
    fn lex(mut self, diagnostics: &mut Diagnostics) -> Vec<Spanned<'a>> {
        let mut tokens = Vec::new();

        while let Some(c) = self.current_char() {
            let (line, column) = (self.line, self.column());
            let token = match c {
                ' ' | '\t' | '\r' => None,
                '\n' => {
                    self.line += 1;
                    self.line_start = self.pos + 1;
                    None
                }
                '\\' | 'λ' => Some(Token::Lambda(c)),
                '(' => Some(Token::LParen),
                ')' => Some(Token::RParen),
                '.' | ',' => Some(Token::Sep(c)),
                c if is_ident_char(c) => {
                    let (input, start) = (self.input, self.pos);
                    while let Some(c) = self.current_char().filter(|c| is_ident_char(*c)) {
                        self.advance(c);
                    }
                    tokens.push(Spanned {
                        token: Token::Ident(&input[start..self.pos]),
                        line,
                        column,
                    });
                    continue;
                }
                _ => {
                    diagnostics.report(line, column, "Invalid character");
                    None
                }
            };
            self.advance(c);
            if let Some(token) = token {
                tokens.push(Spanned {
                    token,
                    line,
                    column,
                });
            }
        }

        tokens.push(Spanned {
            token: Token::Eof,
            line: self.line,
            column: self.column(),
        });
        tokens
    }
}

/// A construct whose closing token has not been reached yet.
enum Frame {
    /// `(`, closed by the matching `)`.
    Group { acc: Option<Term> },
    /// Body of an abstraction with `binders` names in scope. It extends to
    /// the right, so it closes together with the enclosing group.
    Abstraction { acc: Option<Term>, binders: u32 },
}

impl Frame {
    fn acc_mut(&mut self) -> &mut Option<Term> {
        match self {
            Frame::Group { acc } | Frame::Abstraction { acc, .. } => acc,
        }
    }
}

/// Apply the application accumulated so far to `arg`.
fn apply(acc: &mut Option<Term>, arg: Term) {
    *acc = Some(match acc.take() {
        Some(func) => Term::app(func, arg),
        None => arg,
    });
}

struct Parser<'a> {
    tokens: Vec<Spanned<'a>>,
    pos: usize,
    /// Names bound by the enclosing abstractions, innermost last.
    scope: Vec<&'a str>,
    diagnostics: Diagnostics,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Spanned<'a>>, diagnostics: Diagnostics) -> Self {
        Self {
            tokens,
            pos: 0,
            scope: Vec::new(),
            diagnostics,
        }
    }

    fn current(&self) -> Spanned<'a> {
        // The lexer guarantees a trailing Eof, which is never advanced past.
        self.tokens[self.pos].clone()
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn error_at(&mut self, at: &Spanned<'a>, message: impl Into<String>) {
        self.diagnostics.report(at.line, at.column, message);
    }

    /// Report an empty application ended by `at` (a `)` or the end of input).
    fn expected_expression(&mut self, at: &Spanned<'a>) {
        match at.token {
            Token::RParen => self.error_at(at, "Unexpected ')', expected expression"),
            _ => self.error_at(at, "Unexpected end of file, expected expression"),
        }
    }

    /// Parse the whole program. Open groups and abstraction bodies live on
    /// an explicit stack of frames, so nesting depth is bounded by memory
    /// only.
    fn parse(&mut self) -> Option<Term> {
        let mut program: Option<Term> = None;
        let mut frames: Vec<Frame> = Vec::new();
        let mut unclosed_reported = false;

        loop {
            let current = self.current();
            match current.token {
                Token::Ident(name) => {
                    self.advance();
                    let var = self.resolve(name, &current);
                    apply(innermost(&mut program, &mut frames), var);
                }
                Token::LParen => {
                    self.advance();
                    frames.push(Frame::Group { acc: None });
                }
                Token::Lambda(_) => {
                    self.advance();
                    let binders = self.parse_binders();
                    frames.push(Frame::Abstraction { acc: None, binders });
                }
                Token::Sep(c) => {
                    self.error_at(&current, format!("Unexpected token '{}'", c));
                    self.advance();
                }
                Token::RParen | Token::Eof => match frames.pop() {
                    Some(Frame::Abstraction { acc, binders }) => {
                        self.scope.truncate(self.scope.len() - binders as usize);
                        match acc {
                            Some(body) => {
                                apply(innermost(&mut program, &mut frames), body.wrap(binders))
                            }
                            None => self.expected_expression(&current),
                        }
                    }
                    Some(Frame::Group { acc }) => {
                        match acc {
                            Some(inner) => apply(innermost(&mut program, &mut frames), inner),
                            None => self.expected_expression(&current),
                        }
                        if current.token == Token::RParen {
                            self.advance();
                        } else if !unclosed_reported {
                            unclosed_reported = true;
                            self.error_at(&current, "Unclosed parenthesis");
                        }
                    }
                    None => {
                        if program.is_none() {
                            self.expected_expression(&current);
                        }
                        if current.token != Token::RParen {
                            return program;
                        }
                        self.error_at(&current, "Unexpected ')', there is no corresponding '('");
                        self.advance();
                    }
                },
            }
        }
    }

    /// Parse the binder names of an abstraction whose lambda has already
    /// been consumed, up to and including the separator. The names are
    /// pushed onto the scope; returns how many there are.
    fn parse_binders(&mut self) -> u32 {
        let mut names: u32 = 0;
        loop {
            let current = self.current();
            match current.token {
                Token::Ident(name) => {
                    self.scope.push(name);
                    names += 1;
                    self.advance();
                }
                Token::Sep(_) => {
                    self.advance();
                    return names;
                }
                Token::Eof => {
                    self.error_at(&current, "Unexpected end of file, expected identifier or '.'");
                    return names;
                }
                _ => {
                    let message = format!(
                        "Unexpected token '{}', expected identifier or '.'",
                        current.token.text()
                    );
                    self.error_at(&current, message);
                    self.advance();
                    return names;
                }
            }
        }
    }

    /// Resolve a name to the De-Bruijn index of its innermost binder.
    fn resolve(&mut self, name: &str, at: &Spanned<'a>) -> Term {
        match self.scope.iter().rev().position(|bound| *bound == name) {
            Some(index) => Term::var(index as u32),
            None => {
                self.error_at(at, format!("Unknown identifier '{}'", name));
                Term::atom(NIL_ATOM)
            }
        }
    }
}

/// The application being accumulated by the innermost open construct.
fn innermost<'f>(
    program: &'f mut Option<Term>,
    frames: &'f mut [Frame],
) -> &'f mut Option<Term> {
    match frames.last_mut() {
        Some(frame) => frame.acc_mut(),
        None => program,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::debruijn;

    struct DecodeTestCase {
        comment: &'static str,
        program: &'static str,
        bruijn: &'static str,
    }

    #[test]
    fn test_decode() {
        let cases = [
            DecodeTestCase {
                comment: "I",
                program: r"\x. x",
                bruijn: "lam #0",
            },
            DecodeTestCase {
                comment: "binder lists fuse",
                program: r"\x y. x",
                bruijn: "lam[2] #1",
            },
            DecodeTestCase {
                comment: "nested abstractions fuse",
                program: r"\x. \y. y x",
                bruijn: "lam[2] #0 #1",
            },
            DecodeTestCase {
                comment: "parenthesized abstractions fuse",
                program: r"\x. (\y. y x)",
                bruijn: "lam[2] #0 #1",
            },
            DecodeTestCase {
                comment: "two",
                program: r"\f x. f (f x)",
                bruijn: "lam[2] #1 (#1 #0)",
            },
            DecodeTestCase {
                comment: "application is left associative",
                program: r"\a b c. a b c",
                bruijn: "lam[3] #2 #1 #0",
            },
            DecodeTestCase {
                comment: "redex",
                program: r"(\x. x) (\y. y)",
                bruijn: "(lam #0) lam #0",
            },
            DecodeTestCase {
                comment: "abstraction extends to the right",
                program: r"\x. x \y. x y",
                bruijn: "lam #0 lam #1 #0",
            },
            DecodeTestCase {
                comment: "comma separator and unicode lambda",
                program: "λa, λb. a b",
                bruijn: "lam[2] #1 #0",
            },
            DecodeTestCase {
                comment: "shadowing",
                program: r"\x. (\x. x) x",
                bruijn: "lam (lam #0) #0",
            },
            DecodeTestCase {
                comment: "shadowing within one binder list",
                program: r"\x x. x",
                bruijn: "lam[2] #0",
            },
            DecodeTestCase {
                comment: "symbolic identifiers",
                program: r"\+ ->. -> +",
                bruijn: "lam[2] #0 #1",
            },
            DecodeTestCase {
                comment: "whitespace and newlines",
                program: "\\nil read w0 w1.\r\n\tread\n  (\\b. b w1 w0 nil)\n",
                bruijn: "lam[4] #2 lam #0 #1 #2 #4",
            },
        ];

        for case in cases {
            println!("comment {}", case.comment);
            let term = decode("test.lam", case.program).unwrap();
            assert_eq!(case.bruijn, debruijn::encode(&term));
            assert!(term.is_closed());
        }
    }

    struct ErrorTestCase {
        program: &'static str,
        first: &'static str,
    }

    #[test]
    fn test_decode_errors() {
        let cases = [
            ErrorTestCase {
                program: r"\x. y",
                first: "test.lam:1:5: error: Unknown identifier 'y'",
            },
            ErrorTestCase {
                program: r"(\x. x",
                first: "test.lam:1:7: error: Unclosed parenthesis",
            },
            ErrorTestCase {
                program: r"\x. x)",
                first: "test.lam:1:6: error: Unexpected ')', there is no corresponding '('",
            },
            ErrorTestCase {
                program: "",
                first: "test.lam:1:1: error: Unexpected end of file, expected expression",
            },
            ErrorTestCase {
                program: r"\x. ()",
                first: "test.lam:1:6: error: Unexpected ')', expected expression",
            },
            ErrorTestCase {
                program: r"\x y",
                first: "test.lam:1:5: error: Unexpected end of file, expected identifier or '.'",
            },
            ErrorTestCase {
                program: r"\x ( . x",
                first: "test.lam:1:4: error: Unexpected token '(', expected identifier or '.'",
            },
            ErrorTestCase {
                program: "\\x λ. x",
                first: "test.lam:1:4: error: Unexpected token 'λ', expected identifier or '.'",
            },
            ErrorTestCase {
                program: r". \x. x",
                first: "test.lam:1:1: error: Unexpected token '.'",
            },
            ErrorTestCase {
                program: "\\x.\n  x\n  y",
                first: "test.lam:3:3: error: Unknown identifier 'y'",
            },
            ErrorTestCase {
                program: "\\x. x \u{1}",
                first: "test.lam:1:7: error: Invalid character",
            },
        ];

        for case in cases {
            println!("program {:?}", case.program);
            let err = decode("test.lam", case.program).unwrap_err();
            assert_eq!(case.first, err.diagnostics[0].to_string());
        }
    }

    #[test]
    fn test_decode_collects_all_errors() {
        let err = decode("prog", r"\x. a x b").unwrap_err();
        assert_eq!(
            "prog:1:5: error: Unknown identifier 'a'\nprog:1:9: error: Unknown identifier 'b'",
            err.to_string()
        );
        assert_eq!(0, err.dropped);
    }

    #[test]
    fn test_decode_limits_diagnostics() {
        let program = format!(r"\x. x {}", "y ".repeat(150));
        let err = decode("prog", &program).unwrap_err();
        assert_eq!(MAX_DIAGNOSTICS, err.diagnostics.len());
        assert_eq!(50, err.dropped);
        assert!(err.to_string().ends_with("50 more errors not shown"));
    }

    #[test]
    fn test_decode_long_application() {
        let program = format!(r"\f x. {} x", "f ".repeat(100_000));
        let term = decode("prog", &program).unwrap();
        assert_eq!(2, term.binders);
        assert!(term.is_closed());
    }

    /// Deeply nested groups and abstractions are parsed without recursion.
    #[test]
    fn test_decode_deep_nesting() {
        let depth = 100_000;

        let program = format!(
            r"\nil read w0 w1. {}nil{}",
            "w1 (".repeat(depth),
            ")".repeat(depth)
        );
        let term = decode("prog", &program).unwrap();
        assert_eq!(4, term.binders);
        assert!(term.is_closed());

        let program = format!(r"\z. {}z{}", r"(\x. ".repeat(depth), ")".repeat(depth));
        let term = decode("prog", &program).unwrap();
        assert_eq!(depth as u32 + 1, term.binders);
        assert_eq!(Term::var(depth as u32), term.body());

        let program = format!(r"\z. {}z", r"z \x. ".repeat(depth));
        let term = decode("prog", &program).unwrap();
        assert!(term.is_closed());

        let program = format!(r"\z. {}z", "(".repeat(depth));
        let err = decode("prog", &program).unwrap_err();
        assert_eq!(
            vec!["prog:1:100006: error: Unclosed parenthesis"],
            err.diagnostics
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
        );
    }
}
