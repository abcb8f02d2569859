//! Fixed-width integer packing into 64-bit words.
//!
//! Values are laid out LSB-first and never straddle a word boundary: a
//! value that would not fit in the bits remaining in the current word
//! starts the next word, leaving the remainder zeroed. This is the long
//! array layout of current Anvil block-state data.

/// Packs `values`, each representable in `bit_length` bits, into 64-bit
/// words.
///
/// # Panics
///
/// Panics if `bit_length` is not in `1..=64`; a single-entry palette still
/// packs with width 1.
pub fn pack(values: &[u64], bit_length: u32) -> Vec<i64> {
    assert!(
        (1..=64).contains(&bit_length),
        "bit length {} out of range 1..=64",
        bit_length
    );

    let values_per_word = (64 / bit_length) as usize;
    let mut words = Vec::with_capacity(values.len().div_ceil(values_per_word));

    for chunk in values.chunks(values_per_word) {
        let mut word = 0u64;

        for (index, value) in chunk.iter().enumerate() {
            debug_assert!(
                bit_length == 64 || value >> bit_length == 0,
                "value {} does not fit in {} bits",
                value,
                bit_length
            );

            word |= value << (index as u32 * bit_length);
        }

        words.push(word as i64);
    }

    words
}

/// Unpacks `length` values of `bit_length` bits from `words`; the exact
/// inverse of [`pack`].
///
/// # Panics
///
/// Panics if `bit_length` is not in `1..=64` or if `words` is too short
/// to hold `length` values.
pub fn unpack(words: &[i64], bit_length: u32, length: usize) -> Vec<u64> {
    assert!(
        (1..=64).contains(&bit_length),
        "bit length {} out of range 1..=64",
        bit_length
    );

    let values_per_word = (64 / bit_length) as usize;
    let mask = if bit_length == 64 {
        u64::MAX
    } else {
        (1u64 << bit_length) - 1
    };

    let mut values = Vec::with_capacity(length);

    for index in 0..length {
        let word = words[index / values_per_word] as u64;
        let shift = (index % values_per_word) as u32 * bit_length;
        values.push((word >> shift) & mask);
    }

    values
}

/// Smallest width able to distinguish `count` values, at least 1.
pub fn bit_length_for(count: usize) -> u32 {
    match count {
        0 | 1 => 1,
        count => usize::BITS - (count - 1).leading_zeros(),
    }
}

#[cfg(test)]
mod tests {
    use super::{bit_length_for, pack, unpack};

    // Deterministic generator for property-style coverage.
    fn xorshift(state: &mut u64) -> u64 {
        *state ^= *state << 13;
        *state ^= *state >> 7;
        *state ^= *state << 17;
        *state
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(pack(&[], 4), Vec::<i64>::new());
        assert_eq!(unpack(&[], 4, 0), Vec::<u64>::new());
    }

    #[test]
    fn test_values_do_not_straddle_words() {
        // Width 5 fits 12 values per word; the 13th starts a new word with
        // the top 4 bits of the first left zero.
        let values = vec![0b11111u64; 13];
        let words = pack(&values, 5);

        assert_eq!(words.len(), 2);
        assert_eq!(words[0] as u64, 0x0FFF_FFFF_FFFF_FFFF);
        assert_eq!(words[1] as u64, 0b11111);
    }

    #[test]
    fn test_round_trip_across_widths() {
        let mut state = 0x9E3779B97F4A7C15;

        for bit_length in 1..=64 {
            let mask = if bit_length == 64 {
                u64::MAX
            } else {
                (1u64 << bit_length) - 1
            };

            let values: Vec<u64> = (0..257).map(|_| xorshift(&mut state) & mask).collect();
            let words = pack(&values, bit_length);

            assert_eq!(unpack(&words, bit_length, values.len()), values);
        }
    }

    #[test]
    fn test_width_64_is_one_value_per_word() {
        let values = vec![u64::MAX, 0, 42];
        let words = pack(&values, 64);

        assert_eq!(words.len(), 3);
        assert_eq!(unpack(&words, 64, 3), values);
    }

    #[test]
    fn test_section_sized_input() {
        // 3-bit values fit 21 per word, so a full 4096-slot section needs
        // ceil(4096 / 21) = 196 words.
        let values: Vec<u64> = (0..4096).map(|index| (index % 5) as u64).collect();
        let words = pack(&values, 3);

        assert_eq!(words.len(), 196);
        assert_eq!(unpack(&words, 3, 4096), values);
    }

    #[test]
    fn test_high_bits_of_last_word_zero() {
        let words = pack(&[1u64, 1, 1], 3);

        assert_eq!(words.len(), 1);
        assert_eq!(words[0], 0b001_001_001);
    }

    #[test]
    fn test_bit_length_for() {
        assert_eq!(bit_length_for(0), 1);
        assert_eq!(bit_length_for(1), 1);
        assert_eq!(bit_length_for(2), 1);
        assert_eq!(bit_length_for(3), 2);
        assert_eq!(bit_length_for(4), 2);
        assert_eq!(bit_length_for(5), 3);
        assert_eq!(bit_length_for(16), 4);
        assert_eq!(bit_length_for(17), 5);
        assert_eq!(bit_length_for(256), 8);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_zero_bit_length_is_illegal() {
        pack(&[0], 0);
    }
}
