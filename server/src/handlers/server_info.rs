use std::sync::Arc;

use protocol::packets::{ConnectionInfoRequest, build_hello};

use crate::connection::Connection;
use crate::directory::ServerDirectory;
use crate::error::Result;
use crate::settings::Settings;

/// Answers connection-info requests with the route to one backend server,
/// falling back to the full list when no route is known.
pub struct ServerInfoHandler {
    settings: Arc<Settings>,
    directory: Arc<ServerDirectory>,
}

impl ServerInfoHandler {
    #[must_use]
    pub fn new(settings: Arc<Settings>, directory: Arc<ServerDirectory>) -> Self {
        Self {
            settings,
            directory,
        }
    }

    pub fn handle(&self, connection: &mut Connection, frame: &[u8]) -> Result<()> {
        if connection.counters().server_info_requests >= self.settings.limits.max_ip_requests {
            log::debug!(
                "{} exceeded the server info request limit",
                connection.remote_addr()
            );
            connection.disconnect();
            return Ok(());
        }

        let request = ConnectionInfoRequest::parse(frame)?;
        match self
            .directory
            .connect_info(request.server_id, connection.local_addr().ip())
        {
            Some(response) => connection.send(&response),
            None => {
                log::debug!(
                    "no route for server {} requested by {}, sending the list instead",
                    request.server_id,
                    connection.remote_addr()
                );
                connection.send(&self.directory.serialize_server_list());
            }
        }

        connection.send(&build_hello());
        connection.counters_mut().server_info_requests += 1;
        Ok(())
    }
}
