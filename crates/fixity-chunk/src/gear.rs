//! Gear table for the rolling fingerprint.
//!
//! The values are generated at compile time by SplitMix64 from a fixed seed.
//! They are part of the storage format: any change moves every chunk
//! boundary and defeats dedup against previously written data.

const SEED: u64 = 0x6669_7869_7479_2d31;

/// 256 pseudo-random 64-bit values, one per byte value.
pub const GEAR: [u64; 256] = build_table(SEED);

const fn build_table(seed: u64) -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut state = seed;
    let mut i = 0;
    while i < 256 {
        state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        table[i] = z ^ (z >> 31);
        i += 1;
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn entries_are_distinct() {
        let unique: HashSet<u64> = GEAR.iter().copied().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn table_is_stable() {
        assert_eq!(GEAR, build_table(SEED));
        assert_ne!(GEAR, build_table(SEED + 1));
    }

    #[test]
    fn bits_are_roughly_balanced() {
        let ones: u32 = GEAR.iter().map(|v| v.count_ones()).sum();
        let total = 256 * 64;
        assert!(ones > total * 45 / 100 && ones < total * 55 / 100, "ones = {ones}");
    }
}
