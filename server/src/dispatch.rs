use std::sync::Arc;

use protocol::codec::MIN_FRAME_LEN;
use protocol::header::{packet_code, packet_sub_code};
use protocol::packets::{
    CODE_DIRECTORY, CODE_FTP, SUB_CONNECT_INFO, SUB_SERVER_LIST, SUB_SERVER_LIST_LEGACY,
};

use crate::connection::Connection;
use crate::directory::ServerDirectory;
use crate::error::Result;
use crate::handlers::{PatchHandler, ServerInfoHandler, ServerListHandler};
use crate::settings::Settings;

/// Canonical top-level packet kinds the gateway answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PacketKind {
    PatchCheck,
    Directory,
}

/// Canonical directory sub-requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DirectoryRequest {
    ConnectInfo,
    ServerList,
}

fn lookup_code(code: u8) -> Option<PacketKind> {
    match code {
        CODE_FTP => Some(PacketKind::PatchCheck),
        CODE_DIRECTORY => Some(PacketKind::Directory),
        _ => None,
    }
}

/// Maps an old packet-type encoding to the canonical one, if the byte is a
/// known alias. Ancient clients request the server list without the
/// directory envelope.
#[must_use]
pub fn normalize_legacy_code(code: u8) -> Option<u8> {
    match code {
        0x02 => Some(CODE_DIRECTORY),
        _ => None,
    }
}

fn lookup_sub_code(sub_code: u8) -> Option<DirectoryRequest> {
    match sub_code {
        SUB_CONNECT_INFO => Some(DirectoryRequest::ConnectInfo),
        SUB_SERVER_LIST => Some(DirectoryRequest::ServerList),
        _ => None,
    }
}

/// Maps the ancient server-list sub-code to the canonical one.
#[must_use]
pub fn normalize_legacy_sub_code(sub_code: u8) -> Option<u8> {
    match sub_code {
        SUB_SERVER_LIST_LEGACY => Some(SUB_SERVER_LIST),
        _ => None,
    }
}

/// Routes decrypted frames to their handlers by packet code, normalizing
/// legacy encodings once before giving up on a lookup miss.
pub struct PacketDispatcher {
    settings: Arc<Settings>,
    patch: PatchHandler,
    server_info: ServerInfoHandler,
    server_list: ServerListHandler,
}

impl PacketDispatcher {
    #[must_use]
    pub fn new(settings: Arc<Settings>, directory: Arc<ServerDirectory>) -> Self {
        Self {
            patch: PatchHandler::new(Arc::clone(&settings)),
            server_info: ServerInfoHandler::new(Arc::clone(&settings), Arc::clone(&directory)),
            server_list: ServerListHandler::new(Arc::clone(&settings), directory),
            settings,
        }
    }

    /// Dispatches one decrypted frame. Errors never propagate past this
    /// boundary; at worst the connection is marked for teardown.
    pub fn dispatch(&self, connection: &mut Connection, frame: &[u8]) {
        if frame.len() < MIN_FRAME_LEN || frame.len() > self.settings.max_receive_size {
            log::debug!(
                "rejecting {}-byte frame from {}",
                frame.len(),
                connection.remote_addr()
            );
            connection.disconnect();
            return;
        }

        let code = match packet_code(frame) {
            Some(code) => code,
            None => {
                connection.disconnect();
                return;
            }
        };

        let kind = lookup_code(code)
            .or_else(|| normalize_legacy_code(code).and_then(lookup_code));

        match kind {
            Some(PacketKind::PatchCheck) => {
                let result = self.patch.handle(connection, frame);
                self.finish(connection, frame, result);
            }
            Some(PacketKind::Directory) => self.dispatch_directory(connection, frame),
            None => self.unknown(connection, frame, code),
        }
    }

    fn dispatch_directory(&self, connection: &mut Connection, frame: &[u8]) {
        let sub_code = match packet_sub_code(frame) {
            Some(sub_code) => sub_code,
            None => {
                self.unknown(connection, frame, CODE_DIRECTORY);
                return;
            }
        };

        let request = lookup_sub_code(sub_code)
            .or_else(|| normalize_legacy_sub_code(sub_code).and_then(lookup_sub_code));

        match request {
            Some(DirectoryRequest::ConnectInfo) => {
                let result = self.server_info.handle(connection, frame);
                self.finish(connection, frame, result);
            }
            Some(DirectoryRequest::ServerList) => {
                let result = self.server_list.handle(connection, frame);
                self.finish(connection, frame, result);
            }
            None => self.unknown(connection, frame, sub_code),
        }
    }

    fn unknown(&self, connection: &mut Connection, frame: &[u8], code: u8) {
        log::debug!(
            "unknown packet code {:#04X} from {}: {}",
            code,
            connection.remote_addr(),
            hex_dump(frame)
        );
        if self.settings.disconnect_on_unknown_packet {
            connection.disconnect();
        }
    }

    /// Absorbs handler failures: logged with enough context to debug the
    /// client, the connection treated as a protocol violator, the process
    /// untouched.
    fn finish(&self, connection: &mut Connection, frame: &[u8], result: Result<()>) {
        if let Err(err) = result {
            log::warn!(
                "handler failed for {}: {} (packet: {})",
                connection.remote_addr(),
                err,
                hex_dump(frame)
            );
            if self.settings.disconnect_on_unknown_packet {
                connection.disconnect();
            }
        }
    }
}

fn hex_dump(frame: &[u8]) -> String {
    frame
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{HostEnvironment, ServerListEntry, ServerState};
    use protocol::CipherBinding;

    struct FixedEnvironment;

    impl HostEnvironment for FixedEnvironment {
        fn is_containerized(&self) -> bool {
            false
        }
    }

    fn dispatcher_with(settings: Settings) -> PacketDispatcher {
        let settings = Arc::new(settings);
        let directory = Arc::new(ServerDirectory::new(
            "192.168.1.10".parse().unwrap(),
            Arc::new(FixedEnvironment),
        ));
        directory.register_server(ServerListEntry {
            server_id: 0,
            host: "10.0.0.8".to_string(),
            port: 55901,
            state: ServerState::Online,
            load: 3,
        });
        PacketDispatcher::new(settings, directory)
    }

    fn dispatcher() -> PacketDispatcher {
        dispatcher_with(Settings::default())
    }

    fn connection() -> Connection {
        Connection::new(
            "203.0.113.9:51000".parse().unwrap(),
            "192.168.1.10:44405".parse().unwrap(),
            &CipherBinding::plaintext(),
        )
    }

    #[test]
    fn legacy_sub_code_reaches_the_canonical_handler() {
        let dispatcher = dispatcher();

        let mut canonical = connection();
        dispatcher.dispatch(&mut canonical, &[0xC1, 0x04, 0xF4, SUB_SERVER_LIST]);

        let mut legacy = connection();
        dispatcher.dispatch(&mut legacy, &[0xC1, 0x04, 0xF4, SUB_SERVER_LIST_LEGACY]);

        assert_eq!(canonical.take_output(), legacy.take_output());
        assert_eq!(legacy.counters().server_list_requests, 1);
    }

    #[test]
    fn legacy_top_level_code_is_normalized_once() {
        let dispatcher = dispatcher();
        let mut connection = connection();

        dispatcher.dispatch(&mut connection, &[0xC1, 0x04, 0x02, SUB_SERVER_LIST]);

        assert!(connection.is_open());
        assert_eq!(connection.counters().server_list_requests, 1);
    }

    #[test]
    fn unknown_code_disconnects_when_configured() {
        let dispatcher = dispatcher();
        let mut connection = connection();

        dispatcher.dispatch(&mut connection, &[0xC1, 0x04, 0x7B, 0x00]);

        assert!(!connection.is_open());
        assert!(connection.take_output().is_empty());
    }

    #[test]
    fn unknown_code_is_dropped_silently_when_configured() {
        let mut settings = Settings::default();
        settings.disconnect_on_unknown_packet = false;
        let dispatcher = dispatcher_with(settings);
        let mut connection = connection();

        dispatcher.dispatch(&mut connection, &[0xC1, 0x04, 0x7B, 0x00]);

        assert!(connection.is_open());
        assert!(connection.take_output().is_empty());
    }

    #[test]
    fn unknown_sub_code_follows_the_same_policy() {
        let dispatcher = dispatcher();
        let mut connection = connection();

        dispatcher.dispatch(&mut connection, &[0xC1, 0x04, 0xF4, 0x7B]);

        assert!(!connection.is_open());
    }

    #[test]
    fn undersized_frames_are_rejected() {
        let dispatcher = dispatcher();
        let mut connection = connection();

        dispatcher.dispatch(&mut connection, &[0xC1, 0x03, 0x05]);

        assert!(!connection.is_open());
    }

    #[test]
    fn oversized_frames_are_rejected() {
        let mut settings = Settings::default();
        settings.max_receive_size = 8;
        let dispatcher = dispatcher_with(settings);
        let mut connection = connection();

        let frame = vec![0xC1, 16, 0xF4, 0x06, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        dispatcher.dispatch(&mut connection, &frame);

        assert!(!connection.is_open());
    }

    #[test]
    fn handler_errors_are_absorbed_at_the_boundary() {
        let dispatcher = dispatcher();
        let mut connection = connection();

        // A connect-info request too short to carry its server id.
        dispatcher.dispatch(&mut connection, &[0xC1, 0x04, 0xF4, 0x03]);

        assert!(!connection.is_open());
        assert!(connection.take_output().is_empty());
    }
}
