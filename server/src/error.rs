use protocol::{CipherError, ClientVersion, CodecError, PacketParseError};

#[derive(Debug, thiserror::Error)]
pub enum ConnectServerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Duplicate cipher registration for {0}")]
    DuplicateVersion(ClientVersion),

    #[error("No cipher registered for {0} and no usable default")]
    UnknownVersion(ClientVersion),

    #[error("Framing error: {0}")]
    Codec(#[from] CodecError),

    #[error("Cipher error: {0}")]
    Cipher(#[from] CipherError),

    #[error("Malformed packet: {0}")]
    Packet(#[from] PacketParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConnectServerError>;
