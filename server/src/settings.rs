use serde::Deserialize;
use std::fs;
use std::path::Path;

use protocol::{ClientLanguage, ClientVersion, PatchVersion};

use crate::error::{ConnectServerError, Result};

/// Process-wide gateway settings. Loaded once at startup and shared
/// immutably; no component reads configuration through globals.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub listener: ListenerSettings,
    pub limits: LimitSettings,
    pub patch: PatchSettings,
    pub max_receive_size: usize,
    pub disconnect_on_unknown_packet: bool,
    /// Version assumed for clients whose declared version has no
    /// registration of its own.
    pub default_client_version: ClientVersion,
    /// Static cipher registrations, one per supported protocol generation.
    pub clients: Vec<ClientSettings>,
    /// Backend game servers seeded into the directory at startup.
    pub servers: Vec<GameServerSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenerSettings {
    pub host: String,
    pub port: u16,
    pub backlog: u32,
    pub max_connections: usize,
    pub max_connections_per_address: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitSettings {
    pub max_ftp_requests: u32,
    pub max_ip_requests: u32,
    pub max_server_list_requests: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatchSettings {
    /// Patch level current clients must be at.
    pub current_version: PatchVersion,
    /// Address of the patch download server, sent obfuscated.
    pub address: String,
}

/// Cipher selection for one supported client generation.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    pub version: ClientVersion,
    pub cipher: CipherKind,
}

/// The cipher families the gateway knows how to assemble.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub enum CipherKind {
    /// Chained-XOR upstream, clear downstream.
    Classic,
    /// Both directions in the clear.
    Plaintext,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameServerSettings {
    pub id: u16,
    pub host: String,
    pub port: u16,
}

impl Settings {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConnectServerError::Config(format!("Failed to read config file: {}", e)))?;

        let settings: Settings = toml::from_str(&content)
            .map_err(|e| ConnectServerError::Config(format!("Failed to parse config file: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.max_receive_size < protocol::MIN_FRAME_LEN {
            return Err(ConnectServerError::Config(format!(
                "max_receive_size must be at least {}",
                protocol::MIN_FRAME_LEN
            )));
        }
        if self.patch.address.is_empty() {
            return Err(ConnectServerError::Config(
                "patch.address must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listener: ListenerSettings {
                host: "0.0.0.0".to_string(),
                port: 44405,
                backlog: 100,
                max_connections: 1_000,
                max_connections_per_address: 20,
            },
            limits: LimitSettings {
                max_ftp_requests: 3,
                max_ip_requests: 10,
                max_server_list_requests: 20,
            },
            patch: PatchSettings {
                current_version: PatchVersion([1, 0, 3]),
                address: "patch.mu.local:21".to_string(),
            },
            max_receive_size: 1024,
            disconnect_on_unknown_packet: true,
            default_client_version: ClientVersion::new(6, 3, ClientLanguage::Invariant),
            clients: vec![
                ClientSettings {
                    version: ClientVersion::new(6, 3, ClientLanguage::Invariant),
                    cipher: CipherKind::Classic,
                },
                ClientSettings {
                    version: ClientVersion::new(0, 75, ClientLanguage::Invariant),
                    cipher: CipherKind::Plaintext,
                },
            ],
            servers: vec![GameServerSettings {
                id: 0,
                host: "127.0.0.1".to_string(),
                port: 55901,
            }],
        }
    }
}
