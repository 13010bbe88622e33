//! Atomic read-modify-write operations.
//!
//! The ATYPE value rides in the LEN field of a `ReqAtomic` header. Each
//! operation combines the old memory word with the request's operand
//! word; both are little-endian byte slices of the width implied by the
//! header's SIZE field (1..=128 bytes), so the arithmetic here works on
//! byte slices rather than a fixed-width integer type.

/// Atomic transaction types (ATYPE[7:0]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AtomicOp {
    Add = 0x00,
    And = 0x01,
    Or = 0x02,
    Xor = 0x03,
    /// Signed maximum.
    Max = 0x04,
    /// Signed minimum.
    Min = 0x05,
    /// Unsigned maximum.
    MaxU = 0x06,
    /// Unsigned minimum.
    MinU = 0x07,
    Swap = 0x08,
}

impl AtomicOp {
    pub fn from_raw(atype: u8) -> Option<AtomicOp> {
        match atype {
            0x00 => Some(AtomicOp::Add),
            0x01 => Some(AtomicOp::And),
            0x02 => Some(AtomicOp::Or),
            0x03 => Some(AtomicOp::Xor),
            0x04 => Some(AtomicOp::Max),
            0x05 => Some(AtomicOp::Min),
            0x06 => Some(AtomicOp::MaxU),
            0x07 => Some(AtomicOp::MinU),
            0x08 => Some(AtomicOp::Swap),
            _ => None,
        }
    }

    /// Compute `op(old, operand)` over equal-width little-endian words.
    pub fn apply(self, old: &[u8], operand: &[u8]) -> Vec<u8> {
        debug_assert_eq!(old.len(), operand.len());
        match self {
            AtomicOp::Add => add_le(old, operand),
            AtomicOp::And => old.iter().zip(operand).map(|(a, b)| a & b).collect(),
            AtomicOp::Or => old.iter().zip(operand).map(|(a, b)| a | b).collect(),
            AtomicOp::Xor => old.iter().zip(operand).map(|(a, b)| a ^ b).collect(),
            AtomicOp::Max => pick(old, operand, cmp_signed(old, operand).is_ge()),
            AtomicOp::Min => pick(old, operand, cmp_signed(old, operand).is_le()),
            AtomicOp::MaxU => pick(old, operand, cmp_unsigned(old, operand).is_ge()),
            AtomicOp::MinU => pick(old, operand, cmp_unsigned(old, operand).is_le()),
            AtomicOp::Swap => operand.to_vec(),
        }
    }
}

/// Wrapping addition of two little-endian words of equal width.
fn add_le(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(a.len());
    let mut carry = 0u16;
    for (x, y) in a.iter().zip(b) {
        let sum = *x as u16 + *y as u16 + carry;
        out.push(sum as u8);
        carry = sum >> 8;
    }
    out
}

/// Unsigned comparison, most significant byte first.
fn cmp_unsigned(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    for (x, y) in a.iter().rev().zip(b.iter().rev()) {
        let ord = x.cmp(y);
        if ord != std::cmp::Ordering::Equal {
            return ord;
        }
    }
    std::cmp::Ordering::Equal
}

/// Two's-complement comparison. Differing sign bits decide immediately;
/// same-sign values compare like unsigned words.
fn cmp_signed(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    let a_neg = a.last().is_some_and(|m| m & 0x80 != 0);
    let b_neg = b.last().is_some_and(|m| m & 0x80 != 0);
    match (a_neg, b_neg) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => cmp_unsigned(a, b),
    }
}

fn pick(a: &[u8], b: &[u8], take_a: bool) -> Vec<u8> {
    if take_a { a.to_vec() } else { b.to_vec() }
}
