//! Bit layout of one double-array unit.
//!
//! ```text
//!  31      30 ........ 10   9        8          7 ..... 0
//! +-------+--------------+--------+----------+-----------+
//! | leaf  | offset       | offset | has_leaf | label     |
//! | value |              | << 8   |          |           |
//! +-------+--------------+--------+----------+-----------+
//! ```
//!
//! A unit with bit 31 set is a value unit: its low 31 bits are the value.
//! Otherwise the low byte is the edge label that leads to the unit, bit 8
//! says a terminal child sits at `offset ^ 0`, and bits 10.. hold the
//! offset to the children. Offsets of 2^21 and above are stored shifted by
//! 2 instead of 10 with bit 9 set; such offsets always have a zero low byte,
//! so no information is lost.
//!
//! All shifts are logical (`u32`).

use crate::error::{Error, Result};

const VALUE_BIT: u32 = 1 << 31;
const HAS_LEAF_BIT: u32 = 1 << 8;
const EXTENDED_OFFSET_BIT: u32 = 1 << 9;
const LABEL_MASK: u32 = 0xFF;

/// Offsets below this are stored shifted by 10.
pub const EXTENDED_OFFSET_THRESHOLD: u32 = 1 << 21;
/// Largest encodable offset, exclusive.
pub const MAX_OFFSET: u32 = 1 << 29;

/// One packed 32-bit double-array unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Unit(u32);

impl Unit {
    /// Wraps a raw unit word.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Unit(raw)
    }

    /// The raw unit word.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// True if a terminal child exists at `offset ^ 0`.
    #[inline]
    pub const fn has_leaf(self) -> bool {
        (self.0 >> 8) & 1 == 1
    }

    /// The 31-bit value of a value unit.
    #[inline]
    pub const fn value(self) -> i32 {
        (self.0 & !VALUE_BIT) as i32
    }

    /// The label, with bit 31 kept so that a value unit never equals a byte.
    #[inline]
    pub const fn label(self) -> u32 {
        self.0 & (VALUE_BIT | LABEL_MASK)
    }

    /// The offset from this unit's position to its children's base.
    #[inline]
    pub const fn offset(self) -> u32 {
        (self.0 >> 10) << ((self.0 & EXTENDED_OFFSET_BIT) >> 6)
    }

    pub(crate) fn set_has_leaf(&mut self, has_leaf: bool) {
        if has_leaf {
            self.0 |= HAS_LEAF_BIT;
        } else {
            self.0 &= !HAS_LEAF_BIT;
        }
    }

    pub(crate) fn set_value(&mut self, value: u32) {
        self.0 = value | VALUE_BIT;
    }

    pub(crate) fn set_label(&mut self, label: u8) {
        self.0 = (self.0 & !LABEL_MASK) | u32::from(label);
    }

    pub(crate) fn set_offset(&mut self, offset: u32) -> Result<()> {
        if offset >= MAX_OFFSET {
            return Err(Error::OffsetOverflow(offset));
        }
        let kept = self.0 & (VALUE_BIT | HAS_LEAF_BIT | LABEL_MASK);
        self.0 = if offset < EXTENDED_OFFSET_THRESHOLD {
            kept | (offset << 10)
        } else {
            debug_assert_eq!(offset & LABEL_MASK, 0, "extended offset {offset:#x} has a low byte");
            kept | (offset << 2) | EXTENDED_OFFSET_BIT
        };
        Ok(())
    }
}

impl From<u32> for Unit {
    fn from(raw: u32) -> Self {
        Unit(raw)
    }
}

impl From<Unit> for u32 {
    fn from(unit: Unit) -> Self {
        unit.0
    }
}
