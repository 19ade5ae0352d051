//! Byte-exact packets of the connect-server dialect.
//!
//! Builders produce complete framed packets ready for the outgoing cipher;
//! parsers interpret decrypted inbound frames. Layouts follow the legacy
//! wire format: C1 short frames for requests and single-server responses,
//! one C2 long frame for the server list.

use crate::header::{C1Header, C1SubHeader, C2SubHeader};
use crate::version::PatchVersion;
use crate::xor::{XOR3_KEY_LEN, xor3};

/// Top-level packet code of the hello acknowledgement.
pub const CODE_HELLO: u8 = 0x00;
/// Top-level packet code of the "patch up to date" acknowledgement.
pub const CODE_PATCH_OK: u8 = 0x02;
/// Top-level packet code of the patch check / patch download exchange.
pub const CODE_FTP: u8 = 0x05;
/// Top-level packet code of the server directory exchanges.
pub const CODE_DIRECTORY: u8 = 0xF4;

/// Directory sub-code requesting connection info for one server.
pub const SUB_CONNECT_INFO: u8 = 0x03;
/// Directory sub-code requesting the full server list.
pub const SUB_SERVER_LIST: u8 = 0x06;
/// Directory sub-code used by ancient clients for the server list.
pub const SUB_SERVER_LIST_LEGACY: u8 = 0x02;

/// Total length of the patch-download response.
pub const PATCH_REQUIRED_LEN: usize = 0x8A;
/// Offset of the patch version byte inside the patch-download response.
pub const PATCH_VERSION_OFFSET: usize = 4;
/// Offset of the obfuscated patch address inside the patch-download
/// response.
pub const PATCH_ADDRESS_OFFSET: usize = 6;

/// Length of the NUL-padded address field in the connection-info response.
pub const CONNECT_INFO_ADDRESS_LEN: usize = 16;

/// Load byte serialized for servers that refuse new players.
pub const SERVER_FULL_LOAD: u8 = 0xFF;

/// Separator byte terminating each server-list entry.
const SERVER_LIST_SEPARATOR: u8 = 0xCC;

/// Errors produced while interpreting decrypted inbound frames.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PacketParseError {
    #[error("frame truncated: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

fn require_len(frame: &[u8], expected: usize) -> Result<(), PacketParseError> {
    if frame.len() < expected {
        return Err(PacketParseError::Truncated {
            expected,
            actual: frame.len(),
        });
    }
    Ok(())
}

/// One entry of the serialized server list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerListItem {
    pub server_id: u16,
    pub load: u8,
}

/// Builds the hello acknowledgement sent on connect and after every
/// connection-info branch.
#[must_use]
pub fn build_hello() -> Vec<u8> {
    let mut out = Vec::with_capacity(4);
    C1Header::new(CODE_HELLO, 4).write_to(&mut out);
    out.push(0x01);
    out
}

/// Builds the fixed "client is up to date" acknowledgement.
#[must_use]
pub fn build_patch_ok() -> Vec<u8> {
    let mut out = Vec::with_capacity(4);
    C1Header::new(CODE_PATCH_OK, 4).write_to(&mut out);
    out.push(0x00);
    out
}

/// Builds the fixed-size patch-download response.
///
/// The patch-server address is ASCII, XOR-obfuscated with the repeating
/// 3-byte key, and NUL-padded to the end of the frame. Addresses longer
/// than the field are truncated.
#[must_use]
pub fn build_patch_required(
    patch_version: &PatchVersion,
    address: &str,
    key: &[u8; XOR3_KEY_LEN],
) -> Vec<u8> {
    let mut out = vec![0u8; PATCH_REQUIRED_LEN];
    out[0] = crate::header::C1_MARKER;
    out[1] = PATCH_REQUIRED_LEN as u8;
    out[2] = CODE_FTP;
    out[3] = 0x01;
    out[PATCH_VERSION_OFFSET] = patch_version.patch_byte();

    let field = &mut out[PATCH_ADDRESS_OFFSET..];
    let copy_len = address.len().min(field.len());
    field[..copy_len].copy_from_slice(&address.as_bytes()[..copy_len]);
    xor3(field, key);
    out
}

/// Builds the connection-info response pointing a client at one backend
/// server.
#[must_use]
pub fn build_connection_info(address: &str, port: u16) -> Vec<u8> {
    let total = 4 + CONNECT_INFO_ADDRESS_LEN + 2;
    let mut out = Vec::with_capacity(total);
    C1SubHeader::new(CODE_DIRECTORY, SUB_CONNECT_INFO, total as u8).write_to(&mut out);

    let mut field = [0u8; CONNECT_INFO_ADDRESS_LEN];
    let copy_len = address.len().min(CONNECT_INFO_ADDRESS_LEN);
    field[..copy_len].copy_from_slice(&address.as_bytes()[..copy_len]);
    out.extend_from_slice(&field);
    out.extend_from_slice(&port.to_le_bytes());
    out
}

/// Serializes the full server list as one C2 frame.
#[must_use]
pub fn build_server_list(items: &[ServerListItem]) -> Vec<u8> {
    let total = 5 + 2 + items.len() * 4;
    let mut out = Vec::with_capacity(total);
    C2SubHeader::new(CODE_DIRECTORY, SUB_SERVER_LIST, total as u16).write_to(&mut out);
    out.extend_from_slice(&(items.len() as u16).to_be_bytes());
    for item in items {
        out.extend_from_slice(&item.server_id.to_le_bytes());
        out.push(item.load);
        out.push(SERVER_LIST_SEPARATOR);
    }
    out
}

/// Patch check request: the client reports its three version bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchCheckRequest {
    pub client_version: PatchVersion,
}

impl PatchCheckRequest {
    pub fn parse(frame: &[u8]) -> Result<Self, PacketParseError> {
        require_len(frame, 6)?;
        Ok(Self {
            client_version: PatchVersion([frame[3], frame[4], frame[5]]),
        })
    }
}

/// Connection-info request: the client names the backend server it wants to
/// reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectionInfoRequest {
    pub server_id: u16,
}

impl ConnectionInfoRequest {
    pub fn parse(frame: &[u8]) -> Result<Self, PacketParseError> {
        require_len(frame, 6)?;
        Ok(Self {
            server_id: u16::from_le_bytes([frame[4], frame[5]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_matches_wire_layout() {
        assert_eq!(build_hello(), [0xC1, 0x04, 0x00, 0x01]);
    }

    #[test]
    fn patch_ok_matches_wire_layout() {
        assert_eq!(build_patch_ok(), [0xC1, 0x04, 0x02, 0x00]);
    }

    #[test]
    fn patch_required_layout() {
        let key = [0xFC, 0xCF, 0xAB];
        let packet = build_patch_required(&PatchVersion([1, 0, 5]), "patch.mu.local:21", &key);

        assert_eq!(packet.len(), PATCH_REQUIRED_LEN);
        assert_eq!(&packet[..4], &[0xC1, 0x8A, 0x05, 0x01]);
        assert_eq!(packet[PATCH_VERSION_OFFSET], 5);

        let mut address = packet[PATCH_ADDRESS_OFFSET..].to_vec();
        xor3(&mut address, &key);
        assert!(address.starts_with(b"patch.mu.local:21"));
        assert!(address[b"patch.mu.local:21".len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn connection_info_layout() {
        let packet = build_connection_info("10.0.0.7", 55901);

        assert_eq!(packet.len(), 22);
        assert_eq!(&packet[..4], &[0xC1, 22, 0xF4, 0x03]);
        assert_eq!(&packet[4..12], b"10.0.0.7");
        assert!(packet[12..20].iter().all(|&b| b == 0));
        assert_eq!(u16::from_le_bytes([packet[20], packet[21]]), 55901);
    }

    #[test]
    fn server_list_layout() {
        let packet = build_server_list(&[
            ServerListItem {
                server_id: 0,
                load: 20,
            },
            ServerListItem {
                server_id: 0x0102,
                load: SERVER_FULL_LOAD,
            },
        ]);

        assert_eq!(packet.len(), 15);
        assert_eq!(&packet[..5], &[0xC2, 0x00, 15, 0xF4, 0x06]);
        assert_eq!(&packet[5..7], &[0x00, 0x02]);
        assert_eq!(&packet[7..11], &[0x00, 0x00, 20, 0xCC]);
        assert_eq!(&packet[11..15], &[0x02, 0x01, 0xFF, 0xCC]);
    }

    #[test]
    fn parses_patch_check_request() {
        let request = PatchCheckRequest::parse(&[0xC1, 0x06, 0x05, 1, 0, 3]).unwrap();
        assert_eq!(request.client_version, PatchVersion([1, 0, 3]));
    }

    #[test]
    fn parses_connection_info_request() {
        let request = ConnectionInfoRequest::parse(&[0xC1, 0x06, 0xF4, 0x03, 0x02, 0x01]).unwrap();
        assert_eq!(request.server_id, 0x0102);
    }

    #[test]
    fn truncated_requests_are_rejected() {
        assert_eq!(
            PatchCheckRequest::parse(&[0xC1, 0x04, 0x05, 0x01]),
            Err(PacketParseError::Truncated {
                expected: 6,
                actual: 4
            })
        );
        assert_eq!(
            ConnectionInfoRequest::parse(&[0xC1, 0x05, 0xF4, 0x03, 0x01]),
            Err(PacketParseError::Truncated {
                expected: 6,
                actual: 5
            })
        );
    }
}
