use std::net::SocketAddr;

use protocol::{CipherBinding, Direction, PacketEncryptor};

/// Per-connection request counters checked by the abuse guard.
///
/// Each counter is independent and monotonically non-decreasing for the
/// lifetime of the connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbuseCounters {
    pub ftp_requests: u32,
    pub server_info_requests: u32,
    pub server_list_requests: u32,
}

/// State of one client session.
///
/// Owned and mutated exclusively by the task driving that session; packets
/// of one connection are processed strictly sequentially, so no field needs
/// synchronization.
pub struct Connection {
    remote_addr: SocketAddr,
    /// The gateway-side endpoint the client connected to, as observed on
    /// the accepted socket. Feeds the same-host address substitution.
    local_addr: SocketAddr,
    encryptor: PacketEncryptor,
    output: Vec<u8>,
    counters: AbuseCounters,
    open: bool,
}

impl Connection {
    #[must_use]
    pub fn new(remote_addr: SocketAddr, local_addr: SocketAddr, binding: &CipherBinding) -> Self {
        Self {
            remote_addr,
            local_addr,
            encryptor: binding.create_encryptor(Direction::ServerToClient),
            output: Vec::new(),
            counters: AbuseCounters::default(),
            open: true,
        }
    }

    #[must_use]
    pub const fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub const fn counters(&self) -> &AbuseCounters {
        &self.counters
    }

    pub fn counters_mut(&mut self) -> &mut AbuseCounters {
        &mut self.counters
    }

    /// Encrypts one complete response frame with the server-to-client
    /// transform and queues it for the next flush.
    pub fn send(&mut self, frame: &[u8]) {
        let encrypted = self.encryptor.encrypt(frame);
        self.output.extend_from_slice(&encrypted);
    }

    /// Drains the bytes queued since the last flush.
    #[must_use]
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    /// Marks the connection for teardown; the driving task stops its loop
    /// at the next boundary.
    pub fn disconnect(&mut self) {
        if self.open {
            log::debug!("disconnecting {}", self.remote_addr);
            self.open = false;
        }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::build_hello;

    fn sample_connection(binding: &CipherBinding) -> Connection {
        Connection::new(
            "203.0.113.9:51000".parse().unwrap(),
            "192.168.1.10:44405".parse().unwrap(),
            binding,
        )
    }

    #[test]
    fn queued_frames_accumulate_until_taken() {
        let binding = CipherBinding::plaintext();
        let mut connection = sample_connection(&binding);

        connection.send(&build_hello());
        connection.send(&build_hello());

        let output = connection.take_output();
        assert_eq!(output.len(), 8);
        assert!(connection.take_output().is_empty());
    }

    #[test]
    fn send_applies_the_downstream_transform() {
        // The classic binding leaves downstream traffic in the clear.
        let binding = CipherBinding::classic();
        let mut connection = sample_connection(&binding);

        connection.send(&build_hello());
        assert_eq!(connection.take_output(), build_hello());
    }

    #[test]
    fn disconnect_is_sticky() {
        let binding = CipherBinding::plaintext();
        let mut connection = sample_connection(&binding);

        assert!(connection.is_open());
        connection.disconnect();
        connection.disconnect();
        assert!(!connection.is_open());
    }
}
