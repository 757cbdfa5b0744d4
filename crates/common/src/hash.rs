use blake2::{digest::typenum::U32, Blake2b, Digest};

/// BLAKE2b-256 digest of the provided bytes.
pub fn blake2(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hex-encoded [`blake2`] digest, used to identify archives in logs.
pub fn blake2_hex(data: &[u8]) -> String {
    hex::encode(blake2(data))
}
