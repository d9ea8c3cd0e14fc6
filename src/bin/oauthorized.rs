use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use oauthorize::core::models::Client;
use oauthorize::db::MemoryStore;
use oauthorize::http::server::Server;
use oauthorize::http::session::SessionStore;
use oauthorize::provider::TransactionLoader;
use oauthorize::util::cli::Options;

async fn start_clean_up_worker(
    store: Arc<MemoryStore>,
    sessions: Arc<SessionStore<Client>>,
    clients_file: PathBuf,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        interval.tick().await;
        match store.reload(&clients_file).await {
            Ok(revoked) if !revoked.is_empty() => {
                tracing::info!(revoked = ?revoked, "Clients removed from registry")
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to reload client registry"),
        }
        let expired = sessions.clean_up().await;
        if expired > 0 {
            tracing::debug!(expired, "Dropped idle sessions");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let opts = Options::parse();
    let store = Arc::new(MemoryStore::acquire(&opts.clients_file).await?);
    tracing::info!(clients = store.len().await, "Loaded client registry");

    let sessions = Arc::new(opts.session_store());
    let _clean_up = tokio::spawn(start_clean_up_worker(
        Arc::clone(&store),
        Arc::clone(&sessions),
        opts.clients_file.clone(),
        opts.reload_interval(),
    ));

    let loader = TransactionLoader::new(store, opts.loader_options())?;
    let server = Server::new(Arc::new(loader), opts.bind_address).with_sessions(sessions);
    server.serve().await;
    Ok(())
}
