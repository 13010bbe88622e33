//! Error type shared across the crate.
//!
//! Every variant here is a construction-time defect: an invalid unit is
//! rejected at the call that built it and never reaches the bus.
//! Protocol-level faults observed at runtime are not represented here;
//! they travel as error-response transactions (see [`crate::memory`]).

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UmiError {
    /// A header field value does not fit its declared bit width.
    FieldOverflow {
        field: &'static str,
        value: u32,
        width: u32,
    },
    /// A transaction's payload length disagrees with its header.
    PayloadLengthMismatch { expected: usize, actual: usize },
    /// A transaction's payload is wider than the bus it was appended to.
    PayloadExceedsBus { len: usize, bus_width: usize },
    /// The requested bus width cannot carry any word size.
    UnsupportedBusWidth(usize),
    /// A transport-level unit with no payload cannot be lowered.
    EmptyTransfer,
    /// A fragment arrived out of sequence during reassembly.
    FragmentSequence { expected_addr: u64, actual_addr: u64 },
    /// An observer rejected a delivered transaction.
    Observer(String),
}

impl fmt::Display for UmiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UmiError::FieldOverflow { field, value, width } => {
                write!(f, "value 0x{value:X} does not fit {width}-bit field `{field}`")
            }
            UmiError::PayloadLengthMismatch { expected, actual } => {
                write!(
                    f,
                    "payload length {actual} does not match header-declared {expected} bytes"
                )
            }
            UmiError::PayloadExceedsBus { len, bus_width } => {
                write!(f, "payload of {len} bytes exceeds {bus_width}-byte bus width")
            }
            UmiError::UnsupportedBusWidth(w) => {
                write!(f, "unsupported bus width of {w} bytes")
            }
            UmiError::EmptyTransfer => write!(f, "transport-level unit has no payload"),
            UmiError::FragmentSequence { expected_addr, actual_addr } => {
                write!(
                    f,
                    "fragment at 0x{actual_addr:X} breaks sequence (expected 0x{expected_addr:X})"
                )
            }
            UmiError::Observer(msg) => write!(f, "observer fault: {msg}"),
        }
    }
}

impl std::error::Error for UmiError {}
