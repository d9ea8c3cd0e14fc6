use std::collections::HashMap;
use std::sync::Arc;

use tracing::{event, Level};
use warp::Filter;

use crate::auth::{ClientSource, RequestState};
use crate::core::models::{OAuthContext, Transaction};
use crate::core::types::TransactionId;
use crate::http::encoding::error::AuthRejection;
use crate::http::encoding::reply;
use crate::http::session::{session_cookie, SessionStore, SESSION_COOKIE};
use crate::provider::error::Error;
use crate::provider::TransactionLoader;

type Params = HashMap<String, String>;

#[derive(serde::Serialize)]
struct AuthorizeResponse<'a, C> {
    status: &'static str,
    #[serde(rename = "transactionID")]
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction_id: Option<&'a TransactionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    oauth: Option<OAuthContext<C>>,
}

#[derive(serde::Serialize)]
struct BeginResponse {
    #[serde(rename = "transactionID")]
    transaction_id: TransactionId,
}

#[derive(serde::Serialize)]
struct EndResponse {
    status: &'static str,
    #[serde(rename = "transactionID")]
    transaction_id: TransactionId,
}

async fn authorize<S>(
    loader: Arc<TransactionLoader<S>>,
    sessions: Arc<SessionStore<S::Client>>,
    sid: Option<String>,
    query: Params,
    body: Params,
) -> Result<warp::reply::Json, warp::Rejection>
where
    S: ClientSource,
    S::Client: serde::Serialize,
{
    let session = match &sid {
        Some(sid) => sessions.get(sid).await,
        None => None,
    };
    let mut req = RequestState::new().with_query(query).with_body(body);
    req.session = session;

    let result = loader.load(&mut req).await;

    // The context is scoped to this request and never written back.
    let oauth = req
        .session
        .as_mut()
        .and_then(|s| s.take_context(&loader.options().context_key));
    if let (Some(sid), Some(session)) = (sid, req.session) {
        sessions.put(sid, session).await;
    }

    let loaded = reply::accept(result)?;
    Ok(warp::reply::json(&AuthorizeResponse {
        status: loaded.status(),
        transaction_id: loaded.transaction_id(),
        oauth,
    }))
}

async fn begin_transaction<S>(
    loader: Arc<TransactionLoader<S>>,
    sessions: Arc<SessionStore<S::Client>>,
    sid: Option<String>,
    txn: Transaction,
) -> Result<impl warp::Reply, warp::Rejection>
where
    S: ClientSource,
{
    let (sid, mut session) = sessions.open(sid).await;
    let key = &loader.options().session_key;

    let limit = sessions.max_transactions();
    if session.store(key).map_or(0, |s| s.len()) >= limit {
        event!(Level::WARN, limit, "Session holds too many pending transactions");
        return Err(warp::reject::custom(AuthRejection::TooManyTransactions { limit }));
    }

    let client_id = txn.client.clone();
    let transaction_id = session.begin_transaction(key, txn);
    sessions.put(sid.clone(), session).await;

    event!(
        Level::DEBUG,
        client_id = ?client_id,
        transaction_id = %transaction_id,
        "Began authorization transaction"
    );
    let reply = warp::reply::json(&BeginResponse { transaction_id });
    Ok(warp::reply::with_header(
        reply,
        "set-cookie",
        session_cookie(&sid),
    ))
}

async fn end_transaction<S>(
    loader: Arc<TransactionLoader<S>>,
    sessions: Arc<SessionStore<S::Client>>,
    transaction_id: TransactionId,
    sid: Option<String>,
) -> Result<warp::reply::Json, warp::Rejection>
where
    S: ClientSource,
{
    let session = match &sid {
        Some(sid) => sessions.get(sid).await.map(|s| (sid.clone(), s)),
        None => None,
    };
    let (sid, mut session) = reply::accept(session.ok_or(Error::NoSession))?;

    let ended = session
        .end_transaction(&loader.options().session_key, &transaction_id)
        .is_some();
    sessions.put(sid, session).await;

    event!(Level::DEBUG, transaction_id = %transaction_id, ended, "Ended authorization transaction");
    Ok(warp::reply::json(&EndResponse {
        status: if ended { "ended" } else { "not_found" },
        transaction_id,
    }))
}

pub fn oauth_endpoint<S>(
    loader: Arc<TransactionLoader<S>>,
    sessions: Arc<SessionStore<S::Client>>,
) -> impl warp::Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone
where
    S: ClientSource + 'static,
    S::Client: serde::Serialize + 'static,
{
    let with_loader = warp::any().map(move || Arc::clone(&loader));
    let with_sessions = warp::any().map(move || Arc::clone(&sessions));
    let sid = warp::cookie::optional::<String>(SESSION_COOKIE);

    let authorize_query = warp::path("authorize")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_loader.clone())
        .and(with_sessions.clone())
        .and(sid.clone())
        .and(warp::query::<Params>())
        .and_then(|loader, sessions, sid, query| {
            authorize::<S>(loader, sessions, sid, query, Params::new())
        });

    // Transaction ID posted with the authorization decision form
    let authorize_form = warp::path("authorize")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_loader.clone())
        .and(with_sessions.clone())
        .and(sid.clone())
        .and(warp::query::<Params>())
        .and(warp::body::form::<Params>())
        .and_then(|loader, sessions, sid, query, body| {
            authorize::<S>(loader, sessions, sid, query, body)
        });

    let begin = warp::path("transaction")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_loader.clone())
        .and(with_sessions.clone())
        .and(sid.clone())
        .and(warp::body::json::<Transaction>())
        .and_then(|loader, sessions, sid, txn| begin_transaction::<S>(loader, sessions, sid, txn));

    // Called once the authorization decision has concluded
    let end = warp::path("transaction")
        .and(warp::path::param::<TransactionId>())
        .and(warp::path::end())
        .and(warp::delete())
        .and(with_loader)
        .and(with_sessions)
        .and(sid)
        .and_then(|id, loader, sessions, sid| end_transaction::<S>(loader, sessions, id, sid));

    warp::path("v1").and(authorize_query.or(authorize_form).or(begin).or(end))
}
