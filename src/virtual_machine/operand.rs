//! Parameter modes and decoded operands.

use crate::virtual_machine::errors::VMError;

/// How a parameter's raw value maps to an effective value or address.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Mode {
    /// Raw value is an absolute address.
    #[default]
    Position = 0,
    /// Raw value is used literally.
    Immediate = 1,
    /// Raw value is an offset from the relative base.
    Relative = 2,
}

impl TryFrom<i64> for Mode {
    type Error = VMError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Position),
            1 => Ok(Self::Immediate),
            2 => Ok(Self::Relative),
            _ => Err(VMError::InvalidMode {
                mode: value,
                position: 0,
            }),
        }
    }
}

/// One decoded operand.
///
/// Keeps the cell it was read from next to its raw value so that a write
/// target can always be resolved to an address.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Parameter {
    /// Raw cell content.
    pub value: i64,
    /// Address of the cell holding `value`.
    pub address: usize,
    /// Mode selected by the instruction header.
    pub mode: Mode,
}

/// Splits the mode digits of an instruction header.
///
/// Digits are taken right to left starting at the hundreds place, one per
/// parameter; slots beyond the written digits are [`Mode::Position`].
/// `position` is the header address and only used for error reporting.
pub fn decode_modes(header: i64, count: usize, position: usize) -> Result<Vec<Mode>, VMError> {
    let mut digits = header / 100;
    let mut modes = Vec::with_capacity(count);
    for _ in 0..count {
        let mode = Mode::try_from(digits % 10).map_err(|_| VMError::InvalidMode {
            mode: digits % 10,
            position,
        })?;
        modes.push(mode);
        digits /= 10;
    }
    Ok(modes)
}

/// Converts a resolved address to a memory index.
pub fn to_address(address: i64, position: usize) -> Result<usize, VMError> {
    usize::try_from(address).map_err(|_| VMError::NegativeAddress { address, position })
}

#[cfg(test)]
mod tests {
    use super::*;
    use Mode::{Immediate as I, Position as P, Relative as R};

    #[test]
    fn decode_modes_defaults_to_position() {
        assert_eq!(decode_modes(1, 3, 0).unwrap(), vec![P, P, P]);
        assert!(decode_modes(99, 0, 0).unwrap().is_empty());
    }

    #[test]
    fn decode_modes_reads_right_to_left() {
        assert_eq!(decode_modes(1002, 3, 0).unwrap(), vec![P, I, P]);
        assert_eq!(decode_modes(11101, 3, 0).unwrap(), vec![I, I, I]);
        assert_eq!(decode_modes(105, 2, 0).unwrap(), vec![I, P]);
        assert_eq!(decode_modes(1006, 2, 0).unwrap(), vec![P, I]);
        assert_eq!(decode_modes(21201, 3, 0).unwrap(), vec![R, I, R]);
        assert_eq!(decode_modes(204, 1, 0).unwrap(), vec![R]);
    }

    #[test]
    fn decode_modes_ignores_digits_beyond_arity() {
        assert_eq!(decode_modes(1104, 1, 0).unwrap(), vec![I]);
    }

    #[test]
    fn decode_modes_rejects_unknown_digit() {
        assert_eq!(
            decode_modes(301, 3, 7),
            Err(VMError::InvalidMode {
                mode: 3,
                position: 7
            })
        );
    }

    #[test]
    fn to_address_rejects_negative() {
        assert_eq!(to_address(12, 0), Ok(12));
        assert_eq!(
            to_address(-1, 4),
            Err(VMError::NegativeAddress {
                address: -1,
                position: 4
            })
        );
    }
}
