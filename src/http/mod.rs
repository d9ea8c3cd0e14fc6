pub mod encoding;
pub mod server;
pub mod session;
