//! Pluggable per-generation packet ciphers.
//!
//! Each historical client build is bound to a pair of transforms, one per
//! traffic direction. The strategies are assembled statically at startup as
//! tagged variants; there is no runtime discovery. Some generations encrypt
//! only the client-to-server direction and send server traffic in the clear,
//! which is a contract of the binding, not an omission.

use std::sync::Arc;

/// Traffic direction a transform is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

/// Errors produced while applying a cipher transform.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CipherError {
    #[error("encrypted frame too short to carry a protected body: {actual} bytes")]
    FrameTooShort { actual: usize },
}

/// Number of leading header bytes (marker and length) the chained cipher
/// leaves in the clear so frames can be split before decryption.
const CLEAR_PREFIX_LEN: usize = 2;

/// The repeating key table used by classic clients for client-to-server
/// traffic.
pub const CLASSIC_XOR_KEY: [u8; 32] = [
    0xAB, 0x11, 0xCD, 0xFE, 0x18, 0x23, 0xC5, 0xA3, 0xCA, 0x33, 0xC1, 0xCC, 0x66, 0x67, 0x21,
    0xF3, 0x32, 0x12, 0x15, 0x35, 0x29, 0xFF, 0xFE, 0x1D, 0x44, 0xEF, 0xCD, 0x41, 0x26, 0x3C,
    0x4E, 0x4D,
];

/// A concrete cipher strategy.
#[derive(Clone, Debug)]
pub enum CipherAlgorithm {
    /// No transformation; bytes pass through unchanged.
    Identity,
    /// Byte-chained XOR against a repeating 32-byte key. Each body byte is
    /// XORed with the key and the previous ciphertext byte; the two header
    /// bytes stay in the clear.
    ChainedXor { key: Arc<[u8; 32]> },
}

impl CipherAlgorithm {
    #[must_use]
    pub fn chained_xor(key: [u8; 32]) -> Self {
        Self::ChainedXor { key: Arc::new(key) }
    }

    fn encrypt(&self, frame: &[u8]) -> Vec<u8> {
        match self {
            Self::Identity => frame.to_vec(),
            Self::ChainedXor { key } => {
                let mut out = frame.to_vec();
                for i in CLEAR_PREFIX_LEN..out.len() {
                    out[i] ^= key[i % key.len()] ^ out[i - 1];
                }
                out
            }
        }
    }

    fn decrypt(&self, frame: &[u8]) -> Result<Vec<u8>, CipherError> {
        match self {
            Self::Identity => Ok(frame.to_vec()),
            Self::ChainedXor { key } => {
                if frame.len() <= CLEAR_PREFIX_LEN {
                    return Err(CipherError::FrameTooShort {
                        actual: frame.len(),
                    });
                }
                let mut out = frame.to_vec();
                // Walk back to front so the previous byte is still
                // ciphertext when it is used as feedback.
                for i in (CLEAR_PREFIX_LEN..out.len()).rev() {
                    out[i] ^= key[i % key.len()] ^ out[i - 1];
                }
                Ok(out)
            }
        }
    }
}

/// Direction-bound encrypting transform.
#[derive(Clone, Debug)]
pub struct PacketEncryptor {
    algorithm: CipherAlgorithm,
}

impl PacketEncryptor {
    /// Encrypts one complete frame.
    #[must_use]
    pub fn encrypt(&self, frame: &[u8]) -> Vec<u8> {
        self.algorithm.encrypt(frame)
    }
}

/// Direction-bound decrypting transform.
#[derive(Clone, Debug)]
pub struct PacketDecryptor {
    algorithm: CipherAlgorithm,
}

impl PacketDecryptor {
    /// Decrypts one complete frame. A frame the transform cannot make
    /// progress on yields an error, which disconnects the owning
    /// connection.
    pub fn decrypt(&self, frame: &[u8]) -> Result<Vec<u8>, CipherError> {
        self.algorithm.decrypt(frame)
    }
}

/// The encrypt/decrypt transforms associated with one client version.
///
/// Directions may use different algorithms; the binding never changes for
/// the lifetime of a connection.
#[derive(Clone, Debug)]
pub struct CipherBinding {
    pub client_to_server: CipherAlgorithm,
    pub server_to_client: CipherAlgorithm,
}

impl CipherBinding {
    /// Classic generations: chained XOR upstream, clear downstream.
    #[must_use]
    pub fn classic() -> Self {
        Self {
            client_to_server: CipherAlgorithm::chained_xor(CLASSIC_XOR_KEY),
            server_to_client: CipherAlgorithm::Identity,
        }
    }

    /// Pre-cipher generations that speak entirely in the clear.
    #[must_use]
    pub fn plaintext() -> Self {
        Self {
            client_to_server: CipherAlgorithm::Identity,
            server_to_client: CipherAlgorithm::Identity,
        }
    }

    fn algorithm(&self, direction: Direction) -> &CipherAlgorithm {
        match direction {
            Direction::ClientToServer => &self.client_to_server,
            Direction::ServerToClient => &self.server_to_client,
        }
    }

    #[must_use]
    pub fn create_encryptor(&self, direction: Direction) -> PacketEncryptor {
        PacketEncryptor {
            algorithm: self.algorithm(direction).clone(),
        }
    }

    #[must_use]
    pub fn create_decryptor(&self, direction: Direction) -> PacketDecryptor {
        PacketDecryptor {
            algorithm: self.algorithm(direction).clone(),
        }
    }
}
