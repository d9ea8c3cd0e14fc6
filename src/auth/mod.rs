use std::collections::HashMap;

use crate::core::models::{OAuthContext, Transaction};
use crate::core::types::{ClientId, TransactionId};
use crate::util::random::FromRandom;

pub mod error;

pub use error::{AuthorizationError, AuthorizationErrorCode};

/// Resolves the consumer key stored in a transaction back to a live client.
///
/// `Ok(None)` means the client has been deauthorized. `Err` is a failure of
/// the lookup itself and leaves the transaction intact.
#[async_trait::async_trait]
pub trait ClientSource: Send + Sync {
    type Client: Send + Sync;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn deserialize_client(&self, id: &ClientId) -> Result<Option<Self::Client>, Self::Error>;
}

/// Pending transactions of one session, keyed by transaction ID.
#[derive(Debug, Clone, Default, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TransactionStore(HashMap<TransactionId, Transaction>);

impl TransactionStore {
    pub fn get(&self, id: &TransactionId) -> Option<&Transaction> {
        self.0.get(id)
    }

    pub fn insert(&mut self, id: TransactionId, txn: Transaction) -> Option<Transaction> {
        self.0.insert(id, txn)
    }

    pub fn remove(&mut self, id: &TransactionId) -> Option<Transaction> {
        self.0.remove(id)
    }

    pub fn contains(&self, id: &TransactionId) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-user session state visible to the request pipeline.
#[derive(Debug)]
pub struct Session<C> {
    stores: HashMap<String, TransactionStore>,
    contexts: HashMap<String, OAuthContext<C>>,
}

impl<C> Default for Session<C> {
    fn default() -> Self {
        Self {
            stores: HashMap::new(),
            contexts: HashMap::new(),
        }
    }
}

impl<C> Clone for Session<C> {
    fn clone(&self) -> Self {
        Self {
            stores: self.stores.clone(),
            contexts: self.contexts.clone(),
        }
    }
}

impl<C> Session<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, key: &str) -> Option<&TransactionStore> {
        self.stores.get(key)
    }

    pub fn ensure_store(&mut self, key: &str) -> &mut TransactionStore {
        self.stores.entry(key.to_string()).or_default()
    }

    pub fn context(&self, key: &str) -> Option<&OAuthContext<C>> {
        self.contexts.get(key)
    }

    pub fn set_context(&mut self, key: &str, ctx: OAuthContext<C>) -> Option<OAuthContext<C>> {
        self.contexts.insert(key.to_string(), ctx)
    }

    pub fn take_context(&mut self, key: &str) -> Option<OAuthContext<C>> {
        self.contexts.remove(key)
    }

    /// Stores a new pending transaction under a fresh random ID. The saved
    /// request parameters always carry the callback URL.
    pub fn begin_transaction(&mut self, key: &str, mut txn: Transaction) -> TransactionId {
        let callback = serde_json::Value::from(txn.callback_url.0.clone());
        txn.req
            .0
            .entry(Transaction::CALLBACK_PARAM)
            .or_insert(callback);

        let id = TransactionId::from_random();
        self.ensure_store(key).insert(id.clone(), txn);
        id
    }

    /// Removes a transaction once its authorization decision has concluded.
    pub fn end_transaction(&mut self, key: &str, id: &TransactionId) -> Option<Transaction> {
        self.stores.get_mut(key)?.remove(id)
    }
}

/// The parts of an inbound request the transaction loader reads and writes.
#[derive(Debug)]
pub struct RequestState<C> {
    pub query: HashMap<String, String>,
    pub body: HashMap<String, String>,
    pub session: Option<Session<C>>,
}

impl<C> Default for RequestState<C> {
    fn default() -> Self {
        Self {
            query: HashMap::new(),
            body: HashMap::new(),
            session: None,
        }
    }
}

impl<C> RequestState<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, session: Session<C>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: HashMap<String, String>) -> Self {
        self.body = body;
        self
    }

    /// Looks `field` up in the query first, then in the body. Empty values
    /// count as missing.
    pub fn param(&self, field: &str) -> Option<&str> {
        fn non_empty(v: &String) -> Option<&str> {
            Some(v.as_str()).filter(|s| !s.is_empty())
        }

        self.query
            .get(field)
            .and_then(non_empty)
            .or_else(|| self.body.get(field).and_then(non_empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::RequestParams;
    use crate::core::types::CallbackUrl;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn txn() -> Transaction {
        Transaction::new(
            ClientId("1".to_string()),
            CallbackUrl("http://www.example.com/auth/callback".to_string()),
            RequestParams::default(),
        )
    }

    #[test]
    fn query_takes_priority_over_body() {
        let req: RequestState<()> = RequestState::new()
            .with_query(params(&[("transaction_id", "q")]))
            .with_body(params(&[("transaction_id", "b")]));
        assert_eq!(req.param("transaction_id"), Some("q"));
    }

    #[test]
    fn empty_query_value_falls_through_to_body() {
        let req: RequestState<()> = RequestState::new()
            .with_query(params(&[("transaction_id", "")]))
            .with_body(params(&[("transaction_id", "b")]));
        assert_eq!(req.param("transaction_id"), Some("b"));
        assert_eq!(req.param("txn_id"), None);
    }

    #[test]
    fn begin_and_end_transaction() {
        let mut session: Session<()> = Session::new();
        let id = session.begin_transaction("authorize", txn());
        assert!(session.store("authorize").unwrap().contains(&id));

        let removed = session.end_transaction("authorize", &id);
        assert_eq!(removed, Some(txn()));
        assert!(session.store("authorize").unwrap().is_empty());
        assert_eq!(session.end_transaction("missing", &id), None);
    }

    #[test]
    fn begun_transaction_records_callback_in_request() {
        let mut session: Session<()> = Session::new();
        let mut bare = txn();
        bare.req = RequestParams::default();
        let id = session.begin_transaction("authorize", bare);

        let stored = session.store("authorize").unwrap().get(&id).unwrap();
        assert_eq!(
            stored.req.get_str("callbackURL"),
            Some("http://www.example.com/auth/callback")
        );
    }

    #[test]
    fn ensure_store_keeps_existing_entries() {
        let mut session: Session<()> = Session::new();
        let id = TransactionId("1234".to_string());
        session.ensure_store("authorize").insert(id.clone(), txn());
        assert_eq!(session.ensure_store("authorize").len(), 1);
        assert!(session.store("other").is_none());
    }
}
