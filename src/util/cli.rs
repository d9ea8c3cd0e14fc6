use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::http::session::SessionStore;
use crate::provider;

#[derive(Debug, Parser)]
#[clap(
    name = "oauthorized",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS")
)]
pub struct Options {
    #[clap(long, env = "BIND_ADDRESS", default_value = "127.0.0.1:8001")]
    pub bind_address: SocketAddr,
    /// JSON array of registered clients
    #[clap(long, env = "CLIENTS_FILE")]
    pub clients_file: PathBuf,
    #[clap(long, env = "TRANSACTION_FIELD", default_value = "transaction_id")]
    pub transaction_field: String,
    #[clap(long, env = "SESSION_KEY", default_value = "authorize")]
    pub session_key: String,
    #[clap(long, env = "CONTEXT_KEY", default_value = "oauth")]
    pub context_key: String,
    /// `false` only checks that the transaction exists
    #[clap(long, env = "LOAD_TRANSACTION")]
    pub load_transaction: Option<bool>,
    #[clap(long, env = "MAX_SESSIONS", default_value = "10000")]
    pub max_sessions: usize,
    /// Seconds a session may stay idle before it is dropped
    #[clap(long, env = "SESSION_TTL", default_value = "600")]
    pub session_ttl: u64,
    #[clap(long, env = "MAX_TRANSACTIONS", default_value = "16")]
    pub max_transactions: usize,
    /// Seconds between client registry reloads and session clean-ups
    #[clap(long, env = "RELOAD_INTERVAL", default_value = "15")]
    pub reload_interval: u64,
}

impl Options {
    pub fn loader_options(&self) -> provider::Options {
        provider::Options {
            transaction_field: self.transaction_field.clone(),
            session_key: self.session_key.clone(),
            context_key: self.context_key.clone(),
            load_transaction: self.load_transaction.unwrap_or(true),
        }
    }

    pub fn session_store<C>(&self) -> SessionStore<C> {
        SessionStore::with_limits(
            self.max_sessions,
            Duration::from_secs(self.session_ttl),
            self.max_transactions,
        )
    }

    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.reload_interval.max(1))
    }
}
