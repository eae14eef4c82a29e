/// Errors that can occur while loading or executing an Intcode program.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VMError {
    /// Cell at the program counter does not hold a known opcode.
    #[error("invalid instruction {opcode} at position {position}")]
    InvalidInstruction { opcode: i64, position: usize },
    /// Parameter mode digit outside `0` (position), `1` (immediate), `2` (relative).
    #[error("invalid parameter mode {mode} in instruction at position {position}")]
    InvalidMode { mode: i64, position: usize },
    /// A resolved address or jump target is negative.
    #[error("negative address {address} in instruction at position {position}")]
    NegativeAddress { address: i64, position: usize },
    /// Write target parameter in immediate mode.
    #[error("write through immediate mode in instruction at position {position}")]
    ImmediateWrite { position: usize },
    /// Input stream ended while the program expected a value.
    #[error("input stream exhausted")]
    InputExhausted,
    /// Input stream yielded something that is not a decimal integer.
    #[error("invalid input line {line:?}")]
    InvalidInput { line: String },
    /// Upstream producer went away before sending a value.
    #[error("input channel closed")]
    InputClosed,
    /// Input source failed with an I/O error.
    #[error("input failed: {0}")]
    InputFailed(String),
    /// Output sink rejected a value.
    #[error("output failed: {0}")]
    OutputFailed(String),
    /// Memory access beyond the configured cell limit.
    #[error("address {address} exceeds memory limit of {limit} cells")]
    MemoryLimitExceeded { address: usize, limit: usize },
    /// Host could not allocate memory up to the address.
    #[error("cannot grow memory to address {address}")]
    OutOfMemory { address: usize },
    /// Configured instruction budget exhausted.
    #[error("step limit of {limit} instructions exceeded")]
    StepLimitExceeded { limit: u64 },
    /// Step requested on an interpreter that already faulted.
    #[error("interpreter already faulted")]
    Faulted,
    /// Program text contains a token that is not a signed decimal integer.
    #[error("line {line}: invalid integer {token:?}")]
    ParseError { line: usize, token: String },
    /// File I/O error while loading a program.
    #[error("io error reading {path}: {reason}")]
    IoError { path: String, reason: String },
}

impl VMError {
    /// Returns true for faults caused by a neighbour closing its channel end.
    ///
    /// Inside an amplifier network these are consequences of another
    /// amplifier's failure, not a root cause.
    pub fn is_secondary(&self) -> bool {
        matches!(self, VMError::InputClosed)
    }
}
