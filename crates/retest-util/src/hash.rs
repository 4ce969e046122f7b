/// Compute the BLAKE3 hash of a byte slice, returning the hex-encoded digest.
///
/// Used to fingerprint module content between compilation passes; two passes
/// seeing the same bytes must produce the same digest.
#[must_use]
pub fn blake3_hex(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}
