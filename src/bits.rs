//! Helper type for bit-field extraction and packing.
//!
//! A [`BitField`] names a contiguous run of bits inside a 32-bit word.
//! Packing a header is a series of `insert` calls into a zeroed word;
//! unpacking is the matching series of `extract` calls. The field table
//! for the SUMI command header lives in [`crate::sumi`].

/// A contiguous run of `width` bits starting at `offset` inside a u32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub offset: u32,
    pub width: u32,
}

impl BitField {
    pub const fn new(offset: u32, width: u32) -> Self {
        Self { offset, width }
    }

    /// Mask of the field's value range, before shifting (e.g. width 3 -> 0b111).
    pub const fn value_mask(&self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        }
    }

    /// Mask of the field's bits in place inside the word.
    pub const fn word_mask(&self) -> u32 {
        self.value_mask() << self.offset
    }

    /// True if `value` is representable in this field's width.
    pub const fn fits(&self, value: u32) -> bool {
        value <= self.value_mask()
    }

    /// Read the field's value out of `word`.
    #[inline(always)]
    pub const fn extract(&self, word: u32) -> u32 {
        (word >> self.offset) & self.value_mask()
    }

    /// Return `word` with this field set to `value`.
    ///
    /// Bits of `value` beyond the field width are discarded; callers that
    /// need rejection instead of truncation check [`BitField::fits`] first.
    #[inline(always)]
    pub const fn insert(&self, word: u32, value: u32) -> u32 {
        (word & !self.word_mask()) | ((value & self.value_mask()) << self.offset)
    }
}
