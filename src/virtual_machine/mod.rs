//! Intcode virtual machine.
//!
//! Executes programs encoded as a flat sequence of integers.
//!
//! # Architecture
//!
//! - **Memory**: index-addressed signed 64-bit cells that grow with zeros on demand
//! - **Registers**: a program counter and a relative base
//! - **Instruction format**: header cell `modes * 100 + opcode` followed by one cell per parameter
//! - **Addressing modes**: position, immediate and relative
//! - **Streams**: one input and one output stream, one integer per `IN`/`OUT`
//!
//! # Modules
//!
//! - [`errors`]: Load and execution error types
//! - [`io`]: Input/output stream traits and text stream implementations
//! - [`isa`]: Instruction set definition and decoded instructions
//! - [`operand`]: Parameter modes and operand decoding helpers
//! - [`program`]: Program images and their text encoding
//! - [`vm`]: Core interpreter implementation

pub mod errors;
pub mod io;
pub mod isa;
pub mod operand;
pub mod program;
pub mod vm;
