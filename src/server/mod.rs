//! JSON route table over the stats cache.

pub mod handlers;

use std::{convert::Infallible, sync::Arc};
use warp::{Filter, Reply};

use crate::store::StatsCache;
use handlers::{EvolutionQuery, TopQuery, WeakestQuery};

fn with_cache(
    cache: Arc<StatsCache>,
) -> impl Filter<Extract = (Arc<StatsCache>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&cache))
}

/// Every route, with CORS, request tracing and JSON rejections applied.
pub fn routes(
    cache: Arc<StatsCache>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path!("health")
        .and(warp::get())
        .and(with_cache(cache.clone()))
        .and_then(handlers::health);

    let overview = warp::path!("api" / "overview")
        .and(warp::get())
        .and(with_cache(cache.clone()))
        .and_then(handlers::overview);

    let summary = warp::path!("api" / "stats" / i32)
        .and(warp::get())
        .and(with_cache(cache.clone()))
        .and_then(handlers::summary);

    let by_state = warp::path!("api" / "stats" / i32 / "by-state")
        .and(warp::get())
        .and(warp::query::<TopQuery>())
        .and(with_cache(cache.clone()))
        .and_then(handlers::by_state);

    let by_school_type = warp::path!("api" / "stats" / i32 / "by-school-type")
        .and(warp::get())
        .and(with_cache(cache.clone()))
        .and_then(handlers::by_school_type);

    let presence = warp::path!("api" / "stats" / i32 / "presence")
        .and(warp::get())
        .and(with_cache(cache.clone()))
        .and_then(handlers::presence);

    let weakest = warp::path!("api" / "stats" / i32 / "weakest")
        .and(warp::get())
        .and(warp::query::<WeakestQuery>())
        .and(with_cache(cache.clone()))
        .and_then(handlers::weakest);

    let evolution = warp::path!("api" / "evolution")
        .and(warp::get())
        .and(warp::query::<EvolutionQuery>())
        .and(with_cache(cache))
        .and_then(handlers::evolution);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "OPTIONS"])
        .allow_header("content-type");

    health
        .or(overview)
        .or(summary)
        .or(by_state)
        .or(by_school_type)
        .or(presence)
        .or(weakest)
        .or(evolution)
        .with(cors)
        .with(warp::trace::request())
        .recover(handlers::handle_rejection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{raw, Canned, CountingSource};
    use crate::store::{RawSource, TableStore};
    use serde_json::Value;
    use warp::http::StatusCode;

    fn cache(canned: Canned) -> (Arc<CountingSource>, Arc<StatsCache>) {
        let source = Arc::new(CountingSource::new(canned));
        let tables = TableStore::new([2022, 2023], source.clone() as Arc<dyn RawSource>);
        (source, Arc::new(StatsCache::new(Arc::new(tables))))
    }

    fn sample() -> Canned {
        Canned::Table(raw(
            &[
                "NU_NOTA_MT",
                "NU_NOTA_REDACAO",
                "SG_UF_RESIDENCIA",
                "TP_ESCOLA",
                "TP_PRESENCA_MT",
            ],
            &[
                &["700", "800", "SP", "3", "1"],
                &["500", "", "SP", "2", "1"],
                &["400", "600", "BA", "2", "1"],
                &["", "", "BA", "1", "0"],
            ],
        ))
    }

    async fn get(cache: &Arc<StatsCache>, path: &str) -> (StatusCode, Value) {
        let res = warp::test::request()
            .method("GET")
            .path(path)
            .reply(&routes(cache.clone()))
            .await;
        let body = serde_json::from_slice(res.body()).unwrap_or(Value::Null);
        (res.status(), body)
    }

    #[tokio::test]
    async fn test_summary_shape() {
        let (_, cache) = cache(sample());
        let (status, body) = get(&cache, "/api/stats/2023").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["year"], 2023);
        assert_eq!(body["total_rows"], 4);
        assert_eq!(body["metric_means"]["Score_Essay"], 700.0);
        assert!(body["metric_means"]["Score_Nature"].is_null());
        assert_eq!(body["by_category"]["SP"]["count"], 2);
        assert_eq!(body["by_school_type"]["2"]["metric_means"]["Score_Math"], 450.0);
        assert_eq!(body["presence_rate"]["Presence_Math"], 75.0);
    }

    #[tokio::test]
    async fn test_unknown_year_is_client_error() {
        let (source, cache) = cache(sample());
        let (status, body) = get(&cache, "/api/stats/1999").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_year");
        assert!(body["detail"].as_str().unwrap().contains("1999"));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_year_is_ok_with_empty_stats() {
        let (_, cache) = cache(Canned::Missing);
        let (status, body) = get(&cache, "/api/stats/2022").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_rows"], 0);
        assert!(body["metric_means"]["Score_Math"].is_null());
    }

    #[tokio::test]
    async fn test_by_state_ranking_and_bounds() {
        let (_, cache) = cache(sample());
        let (status, body) = get(&cache, "/api/stats/2023/by-state?top=1").await;
        assert_eq!(status, StatusCode::OK);
        let states = body["states"].as_array().unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0]["key"], "SP");

        let (status, _) = get(&cache, "/api/stats/2023/by-state?top=28").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = get(&cache, "/api/stats/2023/by-state?top=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_school_types_and_weakest() {
        let (_, cache) = cache(sample());
        let (_, body) = get(&cache, "/api/stats/2023/by-school-type").await;
        let types = body["school_types"].as_array().unwrap();
        assert_eq!(types[0]["code"], "1");
        assert_eq!(types[1]["label"], "public");

        let (_, body) = get(&cache, "/api/stats/2023/weakest?n=1").await;
        assert_eq!(body["weakest"][0]["metric"], "Score_Math");
    }

    #[tokio::test]
    async fn test_overview_and_evolution() {
        let (_, cache) = cache(sample());
        let (_, body) = get(&cache, "/api/overview").await;
        assert_eq!(body["total_rows"], 0);

        let (status, body) = get(&cache, "/api/evolution").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["years"], serde_json::json!([2022, 2023]));
        assert_eq!(body["metrics"]["Score_Essay"][0], 700.0);

        let (_, body) = get(&cache, "/health").await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["years"][0]["state"], "summarized");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (_, cache) = cache(sample());
        let (status, body) = get(&cache, "/api/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }
}
