//! Append-only bit vector with a one-shot rank index.
//!
//! Bits are stored in 32-bit words. After [`BitVector::build`] each word
//! carries the number of ones in all words before it, so [`BitVector::rank`]
//! is one table lookup plus one population count.

const UNIT_SIZE: usize = 32;

/// An append-only bit vector supporting O(1) rank after [`build`](BitVector::build).
#[derive(Clone, Debug, Default)]
pub struct BitVector {
    units: Vec<u32>,
    ranks: Vec<u32>,
    num_ones: usize,
    len: usize,
}

impl BitVector {
    /// Creates an empty bit vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bit at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id >= self.len()`.
    #[inline]
    pub fn get(&self, id: usize) -> bool {
        assert!(id < self.len, "bit index {id} out of range {}", self.len);
        (self.units[id / UNIT_SIZE] >> (id % UNIT_SIZE)) & 1 == 1
    }

    /// Returns the number of set bits at or before `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id >= self.len()` or if [`build`](BitVector::build) has not
    /// been called since the last append.
    #[inline]
    pub fn rank(&self, id: usize) -> usize {
        assert!(id < self.len, "bit index {id} out of range {}", self.len);
        let unit_id = id / UNIT_SIZE;
        let mask = u32::MAX >> (UNIT_SIZE - (id % UNIT_SIZE) - 1);
        self.ranks[unit_id] as usize + (self.units[unit_id] & mask).count_ones() as usize
    }

    /// Sets the bit at `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id >= self.len()`.
    pub fn set(&mut self, id: usize, bit: bool) {
        assert!(id < self.len, "bit index {id} out of range {}", self.len);
        let mask = 1u32 << (id % UNIT_SIZE);
        if bit {
            self.units[id / UNIT_SIZE] |= mask;
        } else {
            self.units[id / UNIT_SIZE] &= !mask;
        }
    }

    /// Grows the vector by one zero bit.
    pub fn append(&mut self) {
        if self.len % UNIT_SIZE == 0 {
            self.units.push(0);
        }
        self.len += 1;
    }

    /// Computes the rank table and the total number of ones.
    pub fn build(&mut self) {
        self.ranks.clear();
        self.ranks.reserve_exact(self.units.len());
        let mut num_ones = 0u32;
        for &unit in &self.units {
            self.ranks.push(num_ones);
            num_ones += unit.count_ones();
        }
        self.num_ones = num_ones as usize;
    }

    /// Discards all bits and the rank table.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Number of set bits, as computed by the last [`build`](BitVector::build).
    pub fn num_ones(&self) -> usize {
        self.num_ones
    }

    /// Number of bits.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no bits have been appended.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn from_bits(bits: &[bool]) -> BitVector {
        let mut bv = BitVector::new();
        for (i, &bit) in bits.iter().enumerate() {
            bv.append();
            bv.set(i, bit);
        }
        bv.build();
        bv
    }

    #[test]
    fn empty() {
        let mut bv = BitVector::new();
        bv.build();
        assert!(bv.is_empty());
        assert_eq!(bv.num_ones(), 0);
    }

    #[test]
    fn appended_bits_are_zero() {
        let mut bv = BitVector::new();
        for _ in 0..70 {
            bv.append();
        }
        bv.build();
        assert_eq!(bv.len(), 70);
        assert!((0..70).all(|i| !bv.get(i)));
        assert_eq!(bv.rank(69), 0);
    }

    #[test]
    fn rank_counts_bits_at_or_before() {
        let bv = from_bits(&[true, false, true, true, false]);
        assert_eq!(bv.rank(0), 1);
        assert_eq!(bv.rank(1), 1);
        assert_eq!(bv.rank(2), 2);
        assert_eq!(bv.rank(3), 3);
        assert_eq!(bv.rank(4), 3);
        assert_eq!(bv.num_ones(), 3);
    }

    #[test]
    fn rank_across_word_boundaries() {
        let bits: Vec<bool> = (0..100).map(|i| i % 3 == 0).collect();
        let bv = from_bits(&bits);
        for i in 0..bits.len() {
            let expected = bits[..=i].iter().filter(|&&b| b).count();
            assert_eq!(bv.rank(i), expected, "rank({i})");
        }
        // bit 31 and bit 32 sit on either side of the first word boundary
        assert!(!bv.get(31));
        assert!(bv.get(33));
    }

    #[test]
    fn set_can_clear_a_bit() {
        let mut bv = BitVector::new();
        bv.append();
        bv.set(0, true);
        bv.set(0, false);
        bv.build();
        assert!(!bv.get(0));
        assert_eq!(bv.num_ones(), 0);
    }

    #[test]
    fn clear_resets_everything() {
        let mut bv = from_bits(&[true; 40]);
        bv.clear();
        assert!(bv.is_empty());
        assert_eq!(bv.num_ones(), 0);
    }

    #[test]
    #[should_panic]
    fn get_out_of_range_panics() {
        let bv = from_bits(&[true]);
        bv.get(1);
    }
}
