use crate::provider::error::Error;
use warp::{Rejection, Reply};

#[derive(Debug)]
pub enum AuthRejection {
    Transaction(Error),
    TooManyTransactions { limit: usize },
}

impl warp::reject::Reject for AuthRejection {}

impl From<Error> for AuthRejection {
    fn from(error: Error) -> Self {
        Self::Transaction(error)
    }
}

#[derive(serde::Serialize)]
struct ServerError {
    error: &'static str,
    error_description: String,
}

pub async fn handle_reject(err: Rejection) -> Result<impl Reply, Rejection> {
    use warp::http::StatusCode;

    match err.find::<AuthRejection>() {
        Some(AuthRejection::Transaction(e)) => match e {
            Error::Authorization(e) => Ok(warp::reply::with_status(
                warp::reply::json(e),
                StatusCode::FORBIDDEN,
            )),
            Error::NoSession | Error::Lookup(_) => {
                let body = ServerError {
                    error: "server_error",
                    error_description: e.to_string(),
                };
                Ok(warp::reply::with_status(
                    warp::reply::json(&body),
                    StatusCode::INTERNAL_SERVER_ERROR,
                ))
            }
        },
        Some(AuthRejection::TooManyTransactions { limit }) => {
            let body = ServerError {
                error: "too_many_transactions",
                error_description: format!("at most {} pending transactions per session", limit),
            };
            Ok(warp::reply::with_status(
                warp::reply::json(&body),
                StatusCode::TOO_MANY_REQUESTS,
            ))
        }
        None => Err(err),
    }
}
