use std::sync::Arc;

use crate::connection::Connection;
use crate::directory::ServerDirectory;
use crate::error::Result;
use crate::settings::Settings;

/// Answers server-list requests with the serialized directory.
pub struct ServerListHandler {
    settings: Arc<Settings>,
    directory: Arc<ServerDirectory>,
}

impl ServerListHandler {
    #[must_use]
    pub fn new(settings: Arc<Settings>, directory: Arc<ServerDirectory>) -> Self {
        Self {
            settings,
            directory,
        }
    }

    pub fn handle(&self, connection: &mut Connection, _frame: &[u8]) -> Result<()> {
        if connection.counters().server_list_requests >= self.settings.limits.max_server_list_requests
        {
            log::debug!(
                "{} exceeded the server list request limit",
                connection.remote_addr()
            );
            connection.disconnect();
            return Ok(());
        }

        connection.send(&self.directory.serialize_server_list());
        connection.counters_mut().server_list_requests += 1;
        Ok(())
    }
}
