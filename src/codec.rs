/// Largest value the codec can produce (31 bits).
pub const MAX_LOCAL_ID: i64 = 0x7FFF_FFFF;

/// Stable 31-bit hash of a remote identifier:
/// `hash = ((hash << 5) - hash + unit) & 0x7FFFFFFF`, iterated over UTF-16 code units.
///
/// Never returns 0; an empty string maps to 1.
pub fn local_id(input: &str) -> i64 {
    let mut hash: i64 = 0;
    for unit in input.encode_utf16() {
        hash = ((hash << 5) - hash + i64::from(unit)) & MAX_LOCAL_ID;
    }
    if hash == 0 {
        1
    } else {
        hash
    }
}

/// Same as [`local_id`], but an empty input derives from `seed` instead of collapsing to 1.
pub fn local_id_or(input: &str, seed: i64) -> i64 {
    if !input.is_empty() {
        return local_id(input);
    }
    let v = seed & MAX_LOCAL_ID;
    if v == 0 {
        1
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    #[test]
    fn known_values_are_stable() {
        // Values match the JavaScript-style `(h << 5) - h + c` rolling hash.
        assert_eq!(local_id("a"), 97);
        assert_eq!(local_id("ab"), 97 * 31 + 98);
        assert_eq!(local_id("abc"), (97 * 31 + 98) * 31 + 99);
    }

    #[test]
    fn empty_input_is_never_zero() {
        assert_eq!(local_id(""), 1);
        assert_eq!(local_id_or("", 0), 1);
        assert_eq!(local_id_or("", 1_700_000_000_123), 1_700_000_000_123 & MAX_LOCAL_ID);
        assert_eq!(local_id_or("abc", 5), local_id("abc"));
    }

    #[test]
    fn long_ids_stay_within_31_bits() {
        let id = "f3a9c2e1-7b4d-4e8a-9c1f-2d3e4f5a6b7c".repeat(8);
        let v = local_id(&id);
        assert!(v > 0 && v <= MAX_LOCAL_ID);
    }

    #[test]
    fn non_ascii_hashes_by_utf16_units() {
        // U+1F600 is a surrogate pair: two units.
        let expected = ((0xD83Di64 * 31) + 0xDE00) & MAX_LOCAL_ID;
        assert_eq!(local_id("\u{1F600}"), expected);
    }

    #[test]
    fn collision_rate_is_low_for_alphanumeric_ids() {
        const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
        for seed in 0..5u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut ids = HashSet::new();
            while ids.len() < 10_000 {
                let s: String = (0..12)
                    .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
                    .collect();
                ids.insert(s);
            }
            let hashes: HashSet<i64> = ids.iter().map(|s| local_id(s)).collect();
            let collisions = ids.len() - hashes.len();
            // Birthday bound for 10k values in 2^31 is ~0.02 expected collisions.
            assert!(collisions <= 2, "seed {seed}: {collisions} collisions");
        }
    }

    proptest! {
        #[test]
        fn deterministic_and_non_zero(s in "\\PC*") {
            let a = local_id(&s);
            prop_assert_eq!(a, local_id(&s));
            prop_assert!(a >= 1 && a <= MAX_LOCAL_ID);
        }

        #[test]
        fn seeded_variant_never_zero(seed in any::<i64>()) {
            let v = local_id_or("", seed);
            prop_assert!(v >= 1 && v <= MAX_LOCAL_ID);
        }
    }
}
