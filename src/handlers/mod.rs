pub mod filesystem_handlers;
pub mod server_handlers;
