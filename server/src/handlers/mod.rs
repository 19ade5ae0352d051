//! Per-request-kind packet handlers.
//!
//! Every rate-limited handler follows the same guard sequence: check the
//! connection's counter against its ceiling, disconnect without a response
//! when it is exhausted, otherwise do the work and increment the counter.

mod patch;
mod server_info;
mod server_list;

pub use patch::PatchHandler;
pub use server_info::ServerInfoHandler;
pub use server_list::ServerListHandler;
