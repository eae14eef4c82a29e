//! Input and output streams consumed and produced by the interpreter.
//!
//! The interpreter reads exactly one integer per `IN` instruction and writes
//! exactly one per `OUT` instruction. Text streams carry one decimal integer
//! per line.

use crate::virtual_machine::errors::VMError;
use std::collections::VecDeque;
use std::io::{BufRead, Write};

/// Source of values for the `IN` instruction.
pub trait Input {
    /// Returns the next value, blocking if the source needs to wait for one.
    fn read(&mut self) -> Result<i64, VMError>;
}

/// Sink for values emitted by the `OUT` instruction.
pub trait Output {
    /// Emits one value.
    fn write(&mut self, value: i64) -> Result<(), VMError>;
}

impl Input for VecDeque<i64> {
    fn read(&mut self) -> Result<i64, VMError> {
        self.pop_front().ok_or(VMError::InputExhausted)
    }
}

impl Output for Vec<i64> {
    fn write(&mut self, value: i64) -> Result<(), VMError> {
        self.push(value);
        Ok(())
    }
}

impl Output for VecDeque<i64> {
    fn write(&mut self, value: i64) -> Result<(), VMError> {
        self.push_back(value);
        Ok(())
    }
}

/// Reads newline-terminated decimal integers from a buffered reader.
pub struct LineReader<R> {
    reader: R,
    line: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
        }
    }
}

impl<R: BufRead> Input for LineReader<R> {
    /// Reads one line. End of stream is [`VMError::InputExhausted`]; a line
    /// that is not a decimal integer, including one that is not valid UTF-8,
    /// is [`VMError::InvalidInput`].
    fn read(&mut self) -> Result<i64, VMError> {
        self.line.clear();
        let n = self
            .reader
            .read_until(b'\n', &mut self.line)
            .map_err(|e| VMError::InputFailed(e.to_string()))?;
        if n == 0 {
            return Err(VMError::InputExhausted);
        }
        let invalid = || VMError::InvalidInput {
            line: String::from_utf8_lossy(&self.line).trim().to_string(),
        };
        let text = std::str::from_utf8(&self.line).map_err(|_| invalid())?;
        text.trim().parse::<i64>().map_err(|_| invalid())
    }
}

/// Writes each value as its decimal text followed by a newline.
pub struct LineWriter<W> {
    writer: W,
}

impl<W: Write> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Output for LineWriter<W> {
    fn write(&mut self, value: i64) -> Result<(), VMError> {
        writeln!(self.writer, "{value}")
            .and_then(|_| self.writer.flush())
            .map_err(|e| VMError::OutputFailed(e.to_string()))
    }
}
