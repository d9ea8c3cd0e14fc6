pub mod auth;
pub mod core;
pub mod db;
pub mod http;
pub mod provider;
pub mod util;

pub use crate::auth::{ClientSource, RequestState, Session};
pub use crate::core::models::{OAuthContext, Transaction};
pub use crate::provider::{error::Error, Loaded, Options, TransactionLoader};
