use sha2::{Digest, Sha256};

/// Digest function used to seal blocks.
///
/// Implementations must be pure and deterministic: the same preimage always
/// yields the same lowercase hex string of `hex_len()` characters.
pub trait BlockHasher: Send + Sync {
    fn digest(&self, preimage: &str) -> String;

    /// Number of hex characters produced by `digest`.
    fn hex_len(&self) -> usize;
}

/// SHA-256 over the UTF-8 preimage, hex encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl BlockHasher for Sha256Hasher {
    fn digest(&self, preimage: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(preimage.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn hex_len(&self) -> usize {
        64
    }
}

/// True when `hash` starts with `difficulty` `'0'` characters.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let difficulty = difficulty as usize;
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

#[cfg(test)]
mod tests {
    use super::{BlockHasher, Sha256Hasher, meets_difficulty};

    #[test]
    fn sha256_matches_known_vector() {
        let h = Sha256Hasher.digest("abc");
        assert_eq!(
            h,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(h.len(), Sha256Hasher.hex_len());
    }

    #[test]
    fn zero_difficulty_accepts_anything() {
        assert!(meets_difficulty("ffff", 0));
        assert!(meets_difficulty("", 0));
    }

    #[test]
    fn prefix_must_be_all_zeros() {
        assert!(meets_difficulty("00ab", 2));
        assert!(!meets_difficulty("0a0b", 2));
        assert!(!meets_difficulty("00", 3));
    }
}
