//! Borrowed view over the keys (and optional values) of one build.

use crate::error::{Error, Result};

/// An ordered list of byte-string keys with optional values.
///
/// When no values are given, each key's value is its position in the list.
#[derive(Clone, Copy, Debug)]
pub struct KeySet<'a, K> {
    keys: &'a [K],
    values: Option<&'a [i32]>,
}

impl<'a, K: AsRef<[u8]>> KeySet<'a, K> {
    /// Creates a key set.
    ///
    /// Key contents and order are checked while building, not here.
    ///
    /// # Errors
    ///
    /// Fails if `values` is given with a different length than `keys`, or if
    /// `values` is absent and there are more keys than 31-bit values can
    /// number.
    pub fn new(keys: &'a [K], values: Option<&'a [i32]>) -> Result<Self> {
        match values {
            Some(values) if values.len() != keys.len() => Err(Error::ValueCountMismatch {
                keys: keys.len(),
                values: values.len(),
            }),
            None if keys.len() > i32::MAX as usize => Err(Error::TooManyKeys(keys.len())),
            _ => Ok(KeySet { keys, values }),
        }
    }

    /// Number of keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if there are no keys.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The key at `key_id`.
    #[inline]
    pub fn key(&self, key_id: usize) -> &'a [u8] {
        self.keys[key_id].as_ref()
    }

    /// The byte of key `key_id` at `byte_id`, or 0 past the end of the key.
    #[inline]
    pub fn key_byte(&self, key_id: usize, byte_id: usize) -> u8 {
        self.key(key_id).get(byte_id).copied().unwrap_or(0)
    }

    /// True if explicit values were supplied.
    #[inline]
    pub fn has_values(&self) -> bool {
        self.values.is_some()
    }

    /// The value of key `id`: the supplied value, or `id` itself.
    #[inline]
    pub fn value(&self, id: usize) -> i32 {
        match self.values {
            Some(values) => values[id],
            None => id as i32,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn key_bytes_are_zero_padded() {
        let keys = ["ab"];
        let set = KeySet::new(&keys, None).unwrap();
        assert_eq!(set.key_byte(0, 0), b'a');
        assert_eq!(set.key_byte(0, 1), b'b');
        assert_eq!(set.key_byte(0, 2), 0);
        assert_eq!(set.key_byte(0, 100), 0);
    }

    #[test]
    fn values_default_to_ordinal() {
        let keys = [b"a".to_vec(), b"b".to_vec(), b"c".to_vec()];
        let set = KeySet::new(&keys, None).unwrap();
        assert!(!set.has_values());
        assert_eq!((0..3).map(|i| set.value(i)).collect::<Vec<_>>(), [0, 1, 2]);
    }

    #[test]
    fn explicit_values_are_used() {
        let keys = ["a", "b"];
        let values = [7, 9];
        let set = KeySet::new(&keys, Some(&values[..])).unwrap();
        assert!(set.has_values());
        assert_eq!(set.value(1), 9);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn value_count_must_match() {
        let keys = ["a", "b"];
        let values = [7];
        assert!(matches!(
            KeySet::new(&keys, Some(&values[..])),
            Err(Error::ValueCountMismatch { keys: 2, values: 1 })
        ));
    }
}
