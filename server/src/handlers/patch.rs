use std::sync::{Arc, OnceLock};

use protocol::packets::{PatchCheckRequest, build_patch_ok, build_patch_required};
use protocol::version::VersionCompareResult;

use crate::connection::Connection;
use crate::error::Result;
use crate::settings::Settings;

/// Repeating key applied to the patch-server address inside the download
/// packet.
const PATCH_ADDRESS_XOR_KEY: [u8; 3] = [0xFC, 0xCF, 0xAB];

/// Answers patch checks: up-to-date clients get the fixed acknowledgement,
/// everyone else is pointed at the patch server.
pub struct PatchHandler {
    settings: Arc<Settings>,
    patch_packet: OnceLock<Vec<u8>>,
}

impl PatchHandler {
    #[must_use]
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            patch_packet: OnceLock::new(),
        }
    }

    pub fn handle(&self, connection: &mut Connection, frame: &[u8]) -> Result<()> {
        if connection.counters().ftp_requests >= self.settings.limits.max_ftp_requests {
            log::debug!(
                "{} exceeded the patch request limit",
                connection.remote_addr()
            );
            connection.disconnect();
            return Ok(());
        }

        let request = PatchCheckRequest::parse(frame)?;
        let expected = &self.settings.patch.current_version;
        match expected.compare_to(&request.client_version) {
            VersionCompareResult::Match => connection.send(&build_patch_ok()),
            // Clients reporting a newer version than expected get the patch
            // packet too, matching deployed gateways.
            VersionCompareResult::TooLow | VersionCompareResult::Higher => {
                connection.send(self.patch_packet());
            }
        }

        connection.counters_mut().ftp_requests += 1;
        Ok(())
    }

    /// The patch-download packet never changes at runtime, so it is built
    /// once on first use.
    fn patch_packet(&self) -> &[u8] {
        self.patch_packet.get_or_init(|| {
            build_patch_required(
                &self.settings.patch.current_version,
                &self.settings.patch.address,
                &PATCH_ADDRESS_XOR_KEY,
            )
        })
    }
}
