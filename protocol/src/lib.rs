//! Wire-format types shared by the connect-server gateway and its tests.
//!
//! This crate models the legacy binary dialect spoken by historical game
//! clients: C1/C2 framed packets, per-generation ciphers selected by client
//! version, and the handful of byte-exact request/response layouts the
//! gateway answers with.

pub mod cipher;
pub mod codec;
pub mod header;
pub mod packets;
pub mod version;
pub mod xor;

pub use cipher::{
    CLASSIC_XOR_KEY, CipherAlgorithm, CipherBinding, CipherError, Direction, PacketDecryptor,
    PacketEncryptor,
};
pub use codec::{CodecError, CodecLimits, FrameCodec, MIN_FRAME_LEN};
pub use header::{C1_MARKER, C2_MARKER, packet_code, packet_sub_code};
pub use packets::{
    CODE_DIRECTORY, CODE_FTP, CODE_HELLO, CODE_PATCH_OK, ConnectionInfoRequest, PacketParseError,
    PatchCheckRequest, SERVER_FULL_LOAD, SUB_CONNECT_INFO, SUB_SERVER_LIST,
    SUB_SERVER_LIST_LEGACY, ServerListItem, build_connection_info, build_hello, build_patch_ok,
    build_patch_required, build_server_list,
};
pub use version::{ClientLanguage, ClientVersion, PatchVersion, VersionCompareResult};
pub use xor::{XOR3_KEY_LEN, xor3};

/// Returns the protocol crate version string.
pub fn protocol_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
