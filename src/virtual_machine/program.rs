//! Program images and their text encoding.
//!
//! A program is written as comma-separated signed decimal integers, one or
//! more per line; lines are concatenated in order into the initial memory.

use crate::virtual_machine::errors::VMError;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Initial memory contents of an interpreter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    code: Vec<i64>,
}

impl Program {
    /// Parses program text.
    ///
    /// Whitespace around tokens is ignored, blank lines are skipped and a
    /// line may end with a single trailing comma. Any other empty or
    /// non-numeric token is rejected with its 1-based line number.
    pub fn parse(source: &str) -> Result<Self, VMError> {
        let mut code = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let body = line.strip_suffix(',').unwrap_or(line);
            for token in body.split(',') {
                code.push(parse_i64(token.trim(), index + 1)?);
            }
        }
        Ok(Self { code })
    }

    /// Reads and parses a program file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, VMError> {
        let path_ref = path.as_ref();
        let source = fs::read_to_string(path_ref).map_err(|e| VMError::IoError {
            path: path_ref.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&source)
    }

    /// Overwrites one cell of the image, growing it with zeros if needed.
    pub fn patch(&mut self, position: usize, value: i64) {
        if position >= self.code.len() {
            self.code.resize(position + 1, 0);
        }
        self.code[position] = value;
    }

    /// Returns the image as a slice.
    pub fn as_slice(&self) -> &[i64] {
        &self.code
    }

    /// Number of cells in the image.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

impl FromStr for Program {
    type Err = VMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Vec<i64>> for Program {
    fn from(code: Vec<i64>) -> Self {
        Self { code }
    }
}

impl From<&[i64]> for Program {
    fn from(code: &[i64]) -> Self {
        Self {
            code: code.to_vec(),
        }
    }
}

/// Parses one signed decimal token.
fn parse_i64(token: &str, line: usize) -> Result<i64, VMError> {
    token.parse::<i64>().map_err(|_| VMError::ParseError {
        line,
        token: token.to_string(),
    })
}
