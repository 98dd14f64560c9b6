use rand::SeedableRng;
use rand::rngs::StdRng;
use sha2::{Digest, Sha256};

/// Stable 64-bit seed from the concatenation of `parts`. Must not change
/// across toolchains, so no `DefaultHasher`.
pub fn stable_seed(parts: &[&str]) -> u64 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// `StdRng` streams may change between rand releases; Cargo.toml pins the
/// exact version so seeded draws stay reproducible.
pub fn seeded_rng(parts: &[&str]) -> StdRng {
    StdRng::seed_from_u64(stable_seed(parts))
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::{seeded_rng, stable_seed};

    #[test]
    fn seed_depends_on_concatenation_only() {
        assert_eq!(stable_seed(&["ab", "c"]), stable_seed(&["a", "bc"]));
        assert_ne!(stable_seed(&["abc"]), stable_seed(&["abd"]));
    }

    #[test]
    fn seed_is_the_leading_sha256_word() {
        // sha256("abc") = ba7816bf8f01cfea...
        assert_eq!(stable_seed(&["a", "bc"]), 0xba78_16bf_8f01_cfea);
    }

    #[test]
    fn same_parts_draw_same_values() {
        let mut a = seeded_rng(&["Arsenal", "Chelsea", "Premier League"]);
        let mut b = seeded_rng(&["Arsenal", "Chelsea", "Premier League"]);
        for _ in 0..8 {
            assert_eq!(a.gen_range(-8.0..=8.0_f64), b.gen_range(-8.0..=8.0_f64));
        }
    }
}
