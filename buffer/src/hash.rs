//! Content digests for integrity checks.

use blake3::Hasher;

/// Computes a 64-bit content digest (the first 8 bytes of a BLAKE3 hash).
#[must_use]
pub fn digest(bytes: &[u8]) -> u64 {
    let mut hasher = Hasher::new();
    write_u64(&mut hasher, bytes.len() as u64);
    hasher.update(bytes);
    let hash = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(prefix)
}

fn write_u64(hasher: &mut Hasher, value: u64) {
    hasher.update(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(digest(b"jelly_base"), digest(b"jelly_base"));
    }

    #[test]
    fn digest_detects_single_byte_change() {
        let a = digest(&[0, 1, 2, 3]);
        let b = digest(&[0, 1, 2, 4]);
        assert_ne!(a, b);
    }

    #[test]
    fn empty_and_zero_byte_differ() {
        assert_ne!(digest(&[]), digest(&[0]));
    }
}
