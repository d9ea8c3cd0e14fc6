use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

use crate::auth::ClientSource;
use crate::provider::TransactionLoader;

pub mod endpoints;

use endpoints::oauth::oauth_endpoint;

use super::encoding::error::handle_reject;
use super::session::SessionStore;

#[derive(Debug)]
pub struct Server<S: ClientSource> {
    loader: Arc<TransactionLoader<S>>,
    sessions: Arc<SessionStore<S::Client>>,
    addr: SocketAddr,
}

impl<S> Server<S>
where
    S: ClientSource + 'static,
    S::Client: serde::Serialize + 'static,
{
    pub fn new(loader: Arc<TransactionLoader<S>>, addr: SocketAddr) -> Self {
        Self {
            loader,
            sessions: Arc::new(SessionStore::new()),
            addr,
        }
    }

    pub fn with_sessions(mut self, sessions: Arc<SessionStore<S::Client>>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn sessions(&self) -> Arc<SessionStore<S::Client>> {
        Arc::clone(&self.sessions)
    }

    pub async fn serve(self) -> Option<()> {
        let oauth = warp::path("oauth").and(oauth_endpoint(self.loader, self.sessions));

        let routes = oauth.recover(handle_reject).with(warp::log("http-api"));

        tracing::info!(address = %self.addr, "Serving OAuth transaction endpoints");
        warp::serve(routes).run(self.addr).await;

        Some(())
    }
}
