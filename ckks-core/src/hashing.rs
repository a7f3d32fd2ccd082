//! SHA-3 family helpers shared by parameter-id hashing and serialization.

use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::{Sha3_256, Shake256};
use sha3::Digest;

/// Provides a SHAKE-256 hash of the given data, truncated/extended to
/// `output_len` bytes.
pub fn shake256(data: &[u8], output_len: usize) -> Vec<u8> {
    let mut hasher = Shake256::default();
    Update::update(&mut hasher, data);
    let mut reader = hasher.finalize_xof();

    let mut output = vec![0u8; output_len];
    reader.read(&mut output);

    output
}

/// SHA3-256 of `data`, used to derive `ParmsId` from a parameter tuple.
pub fn sha3_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    Digest::update(&mut hasher, data);

    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shake256_same_input_same_output() {
        let data = b"test data";
        let hash1 = shake256(data, 32);
        let hash2 = shake256(data, 32);
        assert_eq!(hash1, hash2);

        let hash3 = shake256(data, 64);
        assert_eq!(hash3[..32], hash1[..]);
    }

    #[test]
    fn sha3_256_matches_known_vector() {
        let data = b"test data";
        let hash1 = sha3_256(data);
        let hash2 = sha3_256(data);
        assert_eq!(hash1, hash2);

        let expected = hex::decode("7d97362108ce4a7da11ec5a4dc6437bef83a9e6a36dddd78d85d8fbc55445e83").unwrap();
        assert_eq!(&hash1[..], &expected[..32]);
    }
}
