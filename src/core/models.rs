use std::sync::Arc;

use serde_json::{Map, Value};

use super::types::*;

/// A registered consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
}

/// Protocol parameters captured when the authorization request was made.
#[derive(Debug, Clone, Default, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RequestParams(pub Map<String, Value>);

impl RequestParams {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }
}

/// Partial authorization decision. Both fields stay empty until granted.
#[derive(Debug, Clone, Default, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Authz {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Token>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(flatten)]
    pub ext: Map<String, Value>,
}

/// A pending authorization transaction as kept in the session.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    pub client: ClientId,
    #[serde(rename = "callbackURL")]
    pub callback_url: CallbackUrl,
    #[serde(default)]
    pub req: RequestParams,
    #[serde(default)]
    pub authz: Authz,
}

impl Transaction {
    pub const CALLBACK_PARAM: &'static str = "callbackURL";

    pub fn new(client: ClientId, callback_url: CallbackUrl, mut req: RequestParams) -> Self {
        req.insert(Self::CALLBACK_PARAM, callback_url.0.clone());
        Self {
            client,
            callback_url,
            req,
            authz: Authz::default(),
        }
    }

    pub fn with_authz(mut self, authz: Authz) -> Self {
        self.authz = authz;
        self
    }
}

/// Authorization context rebuilt for downstream stages.
///
/// `client` and `consumer` are the same allocation; both names are kept so
/// handlers written in either OAuth vocabulary can read it.
#[derive(Debug)]
#[derive(serde::Serialize)]
pub struct OAuthContext<C> {
    #[serde(rename = "transactionID")]
    pub transaction_id: TransactionId,
    pub client: Arc<C>,
    pub consumer: Arc<C>,
    #[serde(rename = "callbackURL")]
    pub callback_url: CallbackUrl,
    pub req: RequestParams,
    pub authz: Authz,
}

impl<C> OAuthContext<C> {
    pub fn restore(transaction_id: TransactionId, client: Arc<C>, txn: &Transaction) -> Self {
        Self {
            transaction_id,
            consumer: Arc::clone(&client),
            client,
            callback_url: txn.callback_url.clone(),
            req: txn.req.clone(),
            authz: txn.authz.clone(),
        }
    }
}

impl<C> Clone for OAuthContext<C> {
    fn clone(&self) -> Self {
        Self {
            transaction_id: self.transaction_id.clone(),
            client: Arc::clone(&self.client),
            consumer: Arc::clone(&self.consumer),
            callback_url: self.callback_url.clone(),
            req: self.req.clone(),
            authz: self.authz.clone(),
        }
    }
}
