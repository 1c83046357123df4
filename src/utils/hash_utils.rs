use uuid::Uuid;

/// Hash file content into a short stable hex string, used to build
/// collision-resistant storage keys.
pub fn content_hash(bytes: &[u8]) -> String {
    let hash = fastmurmur3::murmur3_x64_128(bytes, 0);
    let guid = Uuid::from_bytes(hash.to_le_bytes());
    guid.simple().to_string()
}
