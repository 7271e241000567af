use curve25519_dalek::Scalar;

pub fn from_u64(x: u64) -> Scalar {
    Scalar::from(x)
}

/// Reads a scalar back as an integer when it fits in 64 bits.
pub fn to_u64(x: &Scalar) -> Option<u64> {
    let bytes = x.to_bytes();
    if bytes[8..].iter().any(|b| *b != 0) {
        return None;
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&bytes[..8]);
    Some(u64::from_le_bytes(low))
}

/// Interprets big-endian bytes as an integer and reduces it into the field.
pub fn from_be_bytes(bytes: &[u8]) -> Scalar {
    let mut le = [0u8; 32];
    for (dst, src) in le.iter_mut().zip(bytes.iter().rev()) {
        *dst = *src;
    }
    Scalar::from_bytes_mod_order(le)
}
