use std::net::IpAddr;
use std::sync::Arc;

use dashmap::DashMap;

use protocol::{SERVER_FULL_LOAD, ServerListItem, build_connection_info, build_server_list};

use crate::error::{ConnectServerError, Result};
use crate::settings::Settings;

/// Availability of one backend game server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Online,
    /// Still listed, but serialized with the legacy "full" load marker so
    /// clients grey the entry out.
    Full,
    /// Dropped from the list and from connection-info responses.
    Offline,
}

/// One backend game server known to the gateway.
#[derive(Debug, Clone)]
pub struct ServerListEntry {
    pub server_id: u16,
    pub host: String,
    pub port: u16,
    pub state: ServerState,
    pub load: u8,
}

/// Deployment-specific host introspection, injectable so tests never sniff
/// the real process environment.
pub trait HostEnvironment: Send + Sync {
    fn is_containerized(&self) -> bool;
}

/// Environment variable marking a containerized gateway deployment.
pub const CONTAINER_MARKER_ENV: &str = "GATEWAY_IN_CONTAINER";

/// Production [`HostEnvironment`] backed by the process environment.
pub struct ProcessEnvironment;

impl HostEnvironment for ProcessEnvironment {
    fn is_containerized(&self) -> bool {
        std::env::var(CONTAINER_MARKER_ENV)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false)
    }
}

/// Registry of backend servers plus the write-once connection-info cache.
///
/// Entries change only through the explicit registration API used by
/// backend servers; the packet hot path reads them concurrently without
/// coordination.
pub struct ServerDirectory {
    entries: DashMap<u16, ServerListEntry>,
    connect_info_cache: DashMap<u16, Arc<Vec<u8>>>,
    gateway_addr: IpAddr,
    environment: Arc<dyn HostEnvironment>,
}

impl ServerDirectory {
    #[must_use]
    pub fn new(gateway_addr: IpAddr, environment: Arc<dyn HostEnvironment>) -> Self {
        Self {
            entries: DashMap::new(),
            connect_info_cache: DashMap::new(),
            gateway_addr,
            environment,
        }
    }

    /// Builds the directory seeded with the game servers named in the
    /// settings.
    pub fn from_settings(settings: &Settings, environment: Arc<dyn HostEnvironment>) -> Result<Self> {
        let gateway_addr: IpAddr = settings.listener.host.parse().map_err(|e| {
            ConnectServerError::Config(format!(
                "invalid listener host '{}': {}",
                settings.listener.host, e
            ))
        })?;

        let directory = Self::new(gateway_addr, environment);
        for server in &settings.servers {
            directory.register_server(ServerListEntry {
                server_id: server.id,
                host: server.host.clone(),
                port: server.port,
                state: ServerState::Online,
                load: 0,
            });
        }
        Ok(directory)
    }

    /// Registers or replaces a backend server entry and drops any stale
    /// cached response for it.
    pub fn register_server(&self, entry: ServerListEntry) {
        log::info!(
            "registered game server {} at {}:{}",
            entry.server_id,
            entry.host,
            entry.port
        );
        let server_id = entry.server_id;
        self.entries.insert(server_id, entry);
        self.connect_info_cache.remove(&server_id);
    }

    /// Updates one server's availability. Returns false for unknown ids.
    pub fn update_server_state(&self, server_id: u16, state: ServerState) -> bool {
        let Some(mut entry) = self.entries.get_mut(&server_id) else {
            return false;
        };
        entry.state = state;
        drop(entry);
        self.connect_info_cache.remove(&server_id);
        true
    }

    /// Updates one server's load percentage. Returns false for unknown ids.
    pub fn update_server_load(&self, server_id: u16, load: u8) -> bool {
        let Some(mut entry) = self.entries.get_mut(&server_id) else {
            return false;
        };
        entry.load = load;
        true
    }

    #[must_use]
    pub fn server_count(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn server(&self, server_id: u16) -> Option<ServerListEntry> {
        self.entries.get(&server_id).map(|e| e.clone())
    }

    /// Serializes the current list of reachable servers.
    ///
    /// Pure function of directory state: deterministic, carries no
    /// client-specific fields, and is therefore safe for callers to cache.
    #[must_use]
    pub fn serialize_server_list(&self) -> Vec<u8> {
        let mut items: Vec<ServerListItem> = self
            .entries
            .iter()
            .filter(|entry| entry.state != ServerState::Offline)
            .map(|entry| ServerListItem {
                server_id: entry.server_id,
                load: match entry.state {
                    ServerState::Full => SERVER_FULL_LOAD,
                    _ => entry.load,
                },
            })
            .collect();
        items.sort_by_key(|item| item.server_id);
        build_server_list(&items)
    }

    /// Resolves the connection-info response for one server.
    ///
    /// Same-host requests get a client-specific response substituting the
    /// address the client demonstrably reached us on; those are never
    /// cached. Everything else is served from the write-once cache, built
    /// on first request. `None` means the caller should fall back to the
    /// full server list.
    #[must_use]
    pub fn connect_info(&self, server_id: u16, observed_local: IpAddr) -> Option<Arc<Vec<u8>>> {
        let entry = self.entries.get(&server_id)?;
        if entry.state == ServerState::Offline {
            return None;
        }

        if let Some(bytes) = self.same_host_substitute(&entry, observed_local) {
            return Some(Arc::new(bytes));
        }

        let host = entry.host.clone();
        let port = entry.port;
        drop(entry);

        let cached = self
            .connect_info_cache
            .entry(server_id)
            .or_insert_with(|| Arc::new(build_connection_info(&host, port)));
        Some(Arc::clone(&cached))
    }

    /// Returns the cached response bytes for a server id, if any request
    /// populated them already.
    #[must_use]
    pub fn cached_connect_info(&self, server_id: u16) -> Option<Arc<Vec<u8>>> {
        self.connect_info_cache
            .get(&server_id)
            .map(|e| Arc::clone(&e))
    }

    fn same_host_substitute(
        &self,
        entry: &ServerListEntry,
        observed_local: IpAddr,
    ) -> Option<Vec<u8>> {
        let registered: IpAddr = entry.host.parse().ok()?;
        let local_to_gateway = registered == self.gateway_addr
            || (self.gateway_addr.is_unspecified() && registered.is_loopback());
        if !local_to_gateway {
            return None;
        }
        if self.environment.is_containerized() {
            return None;
        }
        if observed_local == registered {
            return None;
        }

        log::debug!(
            "substituting observed address {} for server {} registered at {}",
            observed_local,
            entry.server_id,
            registered
        );
        Some(build_connection_info(&observed_local.to_string(), entry.port))
    }
}
