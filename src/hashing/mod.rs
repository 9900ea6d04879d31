use blake3::Hasher;

#[inline]
pub fn hash_text(text: &str) -> [u8; 32] {
    *blake3::hash(text.as_bytes()).as_bytes()
}

/// Renders a 256-bit digest as a lowercase hex string.
#[inline]
pub fn hex_digest(digest: &[u8; 32]) -> String {
    blake3::Hash::from_bytes(*digest).to_hex().to_string()
}

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// # Truncation Rationale
///
/// This function takes the first 8 bytes (64 bits) of a BLAKE3 hash. This truncation
/// is acceptable for the following use cases:
///
/// - **Cache keys**: Fast lookups in hash maps and tiered caches
/// - **Identifiers**: Content fingerprints and deduplication markers
///
/// # Collision Probability
///
/// With 64 bits of entropy, the birthday paradox gives us the following collision probabilities:
///
/// | Number of Items | Collision Probability |
/// |-----------------|----------------------|
/// | 1 million       | ~0.00003% (negligible) |
/// | 10 million      | ~0.003% (very low) |
/// | 100 million     | ~0.3% (low) |
/// | 1 billion       | ~3% (noticeable) |
/// | ~4.3 billion    | ~50% (birthday bound) |
///
/// For practical cache sizes (millions of entries), the collision probability is negligible.
/// The formula is approximately: `P(collision) ≈ n² / (2 × 2^64)` for `n` items.
///
/// # Collision Tolerance
///
/// The cache layers are designed to tolerate rare collisions gracefully: a collision
/// results in a stale hit or a miss, not data corruption, and this hash is never used
/// for cryptographic verification or authentication.
///
/// # When to Use Full 256-bit Hashes
///
/// If stricter uniqueness guarantees are required, use [`hash_text`] or
/// [`hash_cache_key`] which return the full 32-byte BLAKE3 output. The full hash
/// provides ~128 bits of collision resistance, making collisions computationally
/// infeasible.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

/// Returns the parameters sorted by name.
///
/// Two calls that pass the same parameters in different orders must address the
/// same cache entry, so every key digest is computed over this canonical form.
pub fn canonical_params(params: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut sorted: Vec<(String, String)> = params
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    sorted
}

/// Computes the full 256-bit digest identifying one cache entry.
///
/// The digest covers the namespace, the caller key, and the canonically ordered
/// parameters. Fields are length-prefixed so boundary shifts between adjacent
/// fields cannot produce colliding digests.
pub fn hash_cache_key(namespace: &str, key: &str, params: &[(&str, &str)]) -> [u8; 32] {
    let mut hasher = Hasher::new();
    update_field(&mut hasher, namespace.as_bytes());
    update_field(&mut hasher, key.as_bytes());
    for (name, value) in canonical_params(params) {
        update_field(&mut hasher, name.as_bytes());
        update_field(&mut hasher, value.as_bytes());
    }
    *hasher.finalize().as_bytes()
}

#[inline]
fn update_field(hasher: &mut Hasher, field: &[u8]) {
    hasher.update(&(field.len() as u64).to_le_bytes());
    hasher.update(field);
}
