use std::sync::Arc;

use tracing::{event, Level};

use crate::auth::{AuthorizationError, ClientSource, RequestState};
use crate::core::models::OAuthContext;
use crate::core::types::TransactionId;

pub mod error;

use error::{ConfigError, Error};

/// Construction-time settings of a `TransactionLoader`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    /// Query or body field carrying the transaction ID.
    pub transaction_field: String,
    /// Session key of the pending transaction mapping.
    pub session_key: String,
    /// Session key the restored `OAuthContext` is written to.
    pub context_key: String,
    /// When false, only check that the transaction exists.
    pub load_transaction: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            transaction_field: "transaction_id".to_string(),
            session_key: "authorize".to_string(),
            context_key: "oauth".to_string(),
            load_transaction: true,
        }
    }
}

impl Options {
    fn validate(&self) -> Result<(), ConfigError> {
        let keys = [
            ("transactionField", &self.transaction_field),
            ("sessionKey", &self.session_key),
            ("contextKey", &self.context_key),
        ];
        match keys.iter().find(|(_, v)| v.is_empty()) {
            Some(&(name, _)) => Err(ConfigError::EmptyOption(name)),
            None => Ok(()),
        }
    }
}

/// Which non-error branch the loader took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loaded {
    /// The request named no transaction.
    NoTransaction,
    /// The named transaction is not pending in this session.
    NotFound(TransactionId),
    /// The transaction exists; client resolution was disabled.
    Deferred(TransactionId),
    /// The context was written to the session.
    Restored(TransactionId),
}

impl Loaded {
    pub fn status(&self) -> &'static str {
        match self {
            Self::NoTransaction => "no_transaction",
            Self::NotFound(_) => "not_found",
            Self::Deferred(_) => "deferred",
            Self::Restored(_) => "restored",
        }
    }

    pub fn transaction_id(&self) -> Option<&TransactionId> {
        match self {
            Self::NoTransaction => None,
            Self::NotFound(id) | Self::Deferred(id) | Self::Restored(id) => Some(id),
        }
    }
}

#[derive(Debug)]
pub struct Builder<S> {
    source: Option<Arc<S>>,
    options: Options,
}

impl<S: ClientSource> Builder<S> {
    pub fn client_source(mut self, source: Arc<S>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn transaction_field(mut self, field: impl Into<String>) -> Self {
        self.options.transaction_field = field.into();
        self
    }

    pub fn session_key(mut self, key: impl Into<String>) -> Self {
        self.options.session_key = key.into();
        self
    }

    pub fn context_key(mut self, key: impl Into<String>) -> Self {
        self.options.context_key = key.into();
        self
    }

    pub fn load_transaction(mut self, load: bool) -> Self {
        self.options.load_transaction = load;
        self
    }

    pub fn build(self) -> Result<TransactionLoader<S>, ConfigError> {
        let source = self.source.ok_or(ConfigError::MissingClientSource)?;
        self.options.validate()?;
        Ok(TransactionLoader {
            source,
            options: self.options,
        })
    }
}

/// Pipeline stage restoring a pending authorization transaction into the
/// session so later stages can act on it.
///
/// The loader keeps no per-request state; share it behind an `Arc`.
#[derive(Debug)]
pub struct TransactionLoader<S> {
    source: Arc<S>,
    options: Options,
}

impl<S: ClientSource> TransactionLoader<S> {
    pub fn builder() -> Builder<S> {
        Builder {
            source: None,
            options: Options::default(),
        }
    }

    pub fn new(source: Arc<S>, options: Options) -> Result<Self, ConfigError> {
        Self::builder().client_source(source).options(options).build()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    #[tracing::instrument(skip_all)]
    pub async fn load(&self, req: &mut RequestState<S::Client>) -> Result<Loaded, Error> {
        let opts = &self.options;
        let id = req
            .param(&opts.transaction_field)
            .map(|id| TransactionId(id.to_string()));

        let session = req.session.as_mut().ok_or(Error::NoSession)?;
        // Only a successful restore leaves a context behind.
        session.take_context(&opts.context_key);
        let store = session.ensure_store(&opts.session_key);

        let id = match id {
            Some(id) => id,
            None => return Ok(Loaded::NoTransaction),
        };

        let txn = match store.get(&id) {
            Some(txn) => txn.clone(),
            None => {
                event!(Level::DEBUG, transaction_id = %id, "No pending transaction");
                return Ok(Loaded::NotFound(id));
            }
        };

        if !opts.load_transaction {
            return Ok(Loaded::Deferred(id));
        }

        let client = match self.source.deserialize_client(&txn.client).await {
            Ok(client) => client,
            Err(e) => {
                event!(
                    Level::ERROR,
                    transaction_id = %id,
                    client_id = ?txn.client,
                    error = %e,
                    "Failed to deserialize client"
                );
                return Err(Error::lookup(e));
            }
        };

        let client = match client {
            Some(client) => Arc::new(client),
            None => {
                session.end_transaction(&opts.session_key, &id);
                event!(
                    Level::WARN,
                    transaction_id = %id,
                    client_id = ?txn.client,
                    "Client deauthorized, dropping transaction"
                );
                return Err(AuthorizationError::consumer_key_rejected().into());
            }
        };

        let ctx = OAuthContext::restore(id.clone(), client, &txn);
        session.set_context(&opts.context_key, ctx);

        event!(
            Level::DEBUG,
            transaction_id = %id,
            client_id = ?txn.client,
            "Restored authorization transaction"
        );
        Ok(Loaded::Restored(id))
    }
}
