//! Byte-wise XOR obfuscation against a small repeating key.
//!
//! Applied to the patch-server address carried inside the patch-download
//! packet, independently of the per-connection stream cipher. The transform
//! is its own inverse.

/// Key length used for the patch-address obfuscation.
pub const XOR3_KEY_LEN: usize = 3;

/// Obfuscates `data` in place with a repeating 3-byte key.
pub fn xor3(data: &mut [u8], key: &[u8; XOR3_KEY_LEN]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= key[i % XOR3_KEY_LEN];
    }
}
