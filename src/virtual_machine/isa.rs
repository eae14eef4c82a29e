//! Instruction Set Architecture (ISA) definitions.
//!
//! Defines the interpreter's instruction set. The [`for_each_instruction!`](crate::for_each_instruction)
//! macro holds the canonical instruction definitions and invokes a callback macro for code
//! generation. The decoder takes parameter counts from it, and the interpreter's
//! dispatch asserts in debug builds that its operand kinds match [`Opcode::kinds`].
//!
//! This module generates:
//! - The [`Opcode`] enum with its numeric codes
//! - `TryFrom<i64>` for decoding opcodes
//! - [`Opcode::arity`] and [`Opcode::kinds`] describing the parameter slots
//! - [`Opcode::mnemonic`], used when an [`Instruction`] is displayed
//!
//! # Instruction Format
//!
//! An instruction occupies `1 + arity` consecutive memory cells:
//! - Header cell: `modes * 100 + opcode`, where the two lowest decimal digits are the
//!   opcode and each further digit (right to left) is the mode of one parameter
//! - Parameter cells: one raw value per parameter, resolved through its mode
//!
//! Missing mode digits default to position mode.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::operand::{Mode, Parameter};

/// How an instruction uses one of its parameter slots.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ParamKind {
    /// Resolved to a value.
    Read,
    /// Resolved to the address that receives the result.
    Write,
    /// Resolved to a jump target, only when the jump is taken.
    Jump,
}

/// Invokes a callback macro with the complete instruction definition list.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            /// ADD a, b, t ; mem[t] = a + b
            Add = 1, "ADD" => [a: Read, b: Read, t: Write],
            /// MUL a, b, t ; mem[t] = a * b
            Mul = 2, "MUL" => [a: Read, b: Read, t: Write],
            /// IN t ; mem[t] = next value from the input stream
            In = 3, "IN" => [t: Write],
            /// OUT a ; emit a on the output stream
            Out = 4, "OUT" => [a: Read],
            /// JT a, b ; if a != 0 then PC = b
            JumpIfTrue = 5, "JT" => [a: Read, b: Jump],
            /// JF a, b ; if a == 0 then PC = b
            JumpIfFalse = 6, "JF" => [a: Read, b: Jump],
            /// LT a, b, t ; mem[t] = (a < b)
            LessThan = 7, "LT" => [a: Read, b: Read, t: Write],
            /// EQ a, b, t ; mem[t] = (a == b)
            Equals = 8, "EQ" => [a: Read, b: Read, t: Write],
            /// ARB a ; relative_base += a
            AdjustBase = 9, "ARB" => [a: Read],
            /// HALT ; stop execution
            Halt = 99, "HALT" => [],
        }
    };
}

#[macro_export]
macro_rules! define_instructions {
    // ---------- parameter counting ----------
    (@count) => { 0usize };
    (@count $head:ident $( $tail:ident )*) => {
        1usize + $crate::define_instructions!(@count $( $tail )*)
    };

    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:literal, $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        /// Operation selected by the two lowest decimal digits of an instruction.
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        impl TryFrom<i64> for Opcode {
            type Error = VMError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                match value {
                    $( $opcode => Ok(Opcode::$name), )*
                    _ => Err(VMError::InvalidInstruction {
                        opcode: value,
                        position: 0,
                    }),
                }
            }
        }

        impl Opcode {
            /// Returns the mnemonic for this opcode.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Returns the number of parameter cells following the header cell.
            pub const fn arity(&self) -> usize {
                match self {
                    $( Opcode::$name => $crate::define_instructions!(@count $( $field )*), )*
                }
            }

            /// Returns how each parameter slot is used, in slot order.
            pub const fn kinds(&self) -> &'static [ParamKind] {
                match self {
                    $( Opcode::$name => &[ $( ParamKind::$kind, )* ], )*
                }
            }
        }
    };
}

for_each_instruction!(define_instructions);

/// A decoded instruction, built fresh for every execution step.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Instruction {
    /// Operation to execute.
    pub opcode: Opcode,
    /// Address of the header cell.
    pub position: usize,
    /// Decoded parameters, one per slot of [`Opcode::kinds`].
    pub params: Vec<Parameter>,
}

impl Instruction {
    /// Number of cells occupied by this instruction.
    pub fn width(&self) -> usize {
        1 + self.params.len()
    }

    /// Address of the cell following this instruction.
    pub fn fall_through(&self) -> usize {
        self.position + self.width()
    }
}

impl std::fmt::Display for Instruction {
    /// Formats as `MNEMONIC p, ...`: immediate values bare, position
    /// operands as `[v]` and relative operands as `[rb+v]`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.opcode.mnemonic())?;
        for (slot, param) in self.params.iter().enumerate() {
            f.write_str(if slot == 0 { " " } else { ", " })?;
            match param.mode {
                Mode::Immediate => write!(f, "{}", param.value)?,
                Mode::Position => write!(f, "[{}]", param.value)?,
                Mode::Relative if param.value < 0 => write!(f, "[rb{}]", param.value)?,
                Mode::Relative => write!(f, "[rb+{}]", param.value)?,
            }
        }
        Ok(())
    }
}
