use serde::{Deserialize, Serialize};
use std::{convert::Infallible, sync::Arc};
use tokio::task;
use tracing::{error, warn};
use warp::{
    http::StatusCode,
    reject::Rejection,
    reply::{self, Reply, Response},
};

use crate::error::Error;
use crate::stats::report::{school_types, top_categories, weakest_metrics};
use crate::stats::StatsSummary;
use crate::store::StatsCache;

/// Number of federative units; upper bound for `top`.
pub const MAX_TOP: usize = 27;
pub const DEFAULT_TOP: usize = 10;
pub const DEFAULT_WEAKEST: usize = 3;
pub const DEFAULT_ROUND: u32 = 2;
const MAX_ROUND: u32 = 10;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub detail: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopQuery {
    pub top: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WeakestQuery {
    pub n: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EvolutionQuery {
    pub round: Option<u32>,
}

fn error_reply(status: StatusCode, error: &str, detail: Option<String>) -> Response {
    reply::with_status(
        reply::json(&ErrorResponse {
            error: error.to_string(),
            detail,
        }),
        status,
    )
    .into_response()
}

fn bad_request(detail: String) -> Response {
    error_reply(StatusCode::BAD_REQUEST, "bad_request", Some(detail))
}

fn from_error(e: &Error) -> Response {
    if e.is_client_fault() {
        warn!(error = %e, "rejected request");
        error_reply(StatusCode::BAD_REQUEST, "invalid_year", Some(e.to_string()))
    } else {
        error!(error = %e, "request failed");
        error_reply(StatusCode::INTERNAL_SERVER_ERROR, "internal", Some(e.to_string()))
    }
}

/// Run `view` over the summary for `year` off the reactor.
async fn with_summary<F, T>(cache: Arc<StatsCache>, year: i32, view: F) -> Response
where
    F: FnOnce(&StatsSummary) -> T + Send + 'static,
    T: Serialize + Send + 'static,
{
    match task::spawn_blocking(move || cache.get(year).map(|s| view(s.as_ref()))).await {
        Ok(Ok(body)) => reply::json(&body).into_response(),
        Ok(Err(e)) => from_error(&e),
        Err(e) => {
            error!(year, error = %e, "summary task panicked");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "internal", None)
        }
    }
}

pub async fn health(cache: Arc<StatsCache>) -> Result<impl Reply, Infallible> {
    let overview = cache.overview();
    Ok(reply::json(&serde_json::json!({
        "status": "healthy",
        "time": chrono::Utc::now(),
        "years": overview.years,
    })))
}

pub async fn overview(cache: Arc<StatsCache>) -> Result<impl Reply, Infallible> {
    Ok(reply::json(&cache.overview()))
}

pub async fn summary(year: i32, cache: Arc<StatsCache>) -> Result<Response, Infallible> {
    Ok(with_summary(cache, year, StatsSummary::clone).await)
}

pub async fn by_state(
    year: i32,
    query: TopQuery,
    cache: Arc<StatsCache>,
) -> Result<Response, Infallible> {
    let top = query.top.unwrap_or(DEFAULT_TOP);
    if !(1..=MAX_TOP).contains(&top) {
        return Ok(bad_request(format!("top must be between 1 and {MAX_TOP}")));
    }
    Ok(with_summary(cache, year, move |s| {
        serde_json::json!({
            "year": s.year,
            "top": top,
            "states": top_categories(s, top),
        })
    })
    .await)
}

pub async fn by_school_type(year: i32, cache: Arc<StatsCache>) -> Result<Response, Infallible> {
    Ok(with_summary(cache, year, |s| {
        serde_json::json!({
            "year": s.year,
            "school_types": school_types(s),
        })
    })
    .await)
}

pub async fn presence(year: i32, cache: Arc<StatsCache>) -> Result<Response, Infallible> {
    Ok(with_summary(cache, year, |s| {
        serde_json::json!({
            "year": s.year,
            "total_rows": s.total_rows,
            "presence_rate": s.presence_rate,
        })
    })
    .await)
}

pub async fn weakest(
    year: i32,
    query: WeakestQuery,
    cache: Arc<StatsCache>,
) -> Result<Response, Infallible> {
    let n = query.n.unwrap_or(DEFAULT_WEAKEST);
    if n == 0 {
        return Ok(bad_request("n must be at least 1".to_string()));
    }
    Ok(with_summary(cache, year, move |s| {
        serde_json::json!({
            "year": s.year,
            "weakest": weakest_metrics(s, n),
        })
    })
    .await)
}

pub async fn evolution(
    query: EvolutionQuery,
    cache: Arc<StatsCache>,
) -> Result<Response, Infallible> {
    let digits = query.round.unwrap_or(DEFAULT_ROUND);
    if digits > MAX_ROUND {
        return Ok(bad_request(format!("round must be at most {MAX_ROUND}")));
    }
    let series = task::spawn_blocking(move || cache.series(Some(digits))).await;
    Ok(match series {
        Ok(series) => reply::json(&series).into_response(),
        Err(e) => {
            error!(error = %e, "evolution task panicked");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "internal", None)
        }
    })
}

/// Turn unmatched routes and malformed queries into JSON errors.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let response = if err.is_not_found() {
        error_reply(StatusCode::NOT_FOUND, "not_found", None)
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        bad_request(e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        error_reply(StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed", None)
    } else if let Some(e) = err.find::<warp::filters::cors::CorsForbidden>() {
        error_reply(StatusCode::FORBIDDEN, "forbidden", Some(e.to_string()))
    } else {
        error!(rejection = ?err, "unhandled rejection");
        error_reply(StatusCode::INTERNAL_SERVER_ERROR, "internal", None)
    };
    Ok(response)
}
