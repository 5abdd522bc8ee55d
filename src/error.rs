// SPDX-FileCopyrightText: 2025 stfnw
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// One problem found while reading a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{file}:{line}:{column}: error: {message}")]
pub struct Diagnostic {
    pub file: String,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column, counted in bytes from the start of the line.
    pub column: u32,
    pub message: String,
}

/// A program that could not be parsed, with everything found wrong in it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.diagnostics, .dropped))]
pub struct ParseError {
    pub diagnostics: Vec<Diagnostic>,
    /// Diagnostics found beyond the reporting limit.
    pub dropped: usize,
}

fn render(diagnostics: &[Diagnostic], dropped: &usize) -> String {
    let mut lines: Vec<String> = diagnostics.iter().map(Diagnostic::to_string).collect();
    if *dropped > 0 {
        lines.push(format!("{} more errors not shown", dropped));
    }
    lines.join("\n")
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
