//! Benchmark and demonstration routes.

use super::response::{blocking, ApiError, ApiJson, ApiSuccess};
use super::AppState;
use crate::demo::{self, ConceptDemonstration, PerformanceReport};
use crate::hashing::{self, CollisionDemonstration, HashBenchmarkEntry};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::handler::Handler;
use axum::routing::{post, MethodRouter};
use axum::Router;
use serde::{Deserialize, Serialize};

const DEFAULT_BENCHMARK_DATA: &str = "Test data for hashing benchmark";

#[derive(Debug, Default, Deserialize)]
pub struct HashBenchmarkBody {
    pub data: Option<String>,
}

#[derive(Debug, Serialize)]
struct PerformanceBody {
    report: PerformanceReport,
}

#[derive(Debug, Serialize)]
struct HashBenchmarkBodyOut {
    iterations: usize,
    results: Vec<HashBenchmarkEntry>,
}

#[derive(Debug, Serialize)]
struct ConceptsBody {
    concepts: Vec<ConceptDemonstration>,
}

#[derive(Debug, Serialize)]
struct CollisionBody {
    demonstrations: Vec<CollisionDemonstration>,
}

fn method<H, T>(handler: H, with_get: bool) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    let route = post(handler.clone());
    if with_get { route.get(handler) } else { route }
}

pub struct DemoRoutes;

impl DemoRoutes {
    /// POST-only routes, mounted at the root.
    pub fn routes() -> Router<AppState> {
        Self::build(false)
    }

    /// The same routes accepting GET as well, mounted under `/api`.
    pub fn api_routes() -> Router<AppState> {
        Self::build(true)
    }

    fn build(with_get: bool) -> Router<AppState> {
        Router::new()
            .route("/benchmark/performance", method(Self::handle_performance, with_get))
            .route(
                "/benchmark/hash-algorithms",
                method(Self::handle_hash_benchmark, with_get),
            )
            .route("/demonstrate/concepts", method(Self::handle_concepts, with_get))
            .route(
                "/demonstrate/collision-resistance",
                method(Self::handle_collision_resistance, with_get),
            )
    }

    async fn handle_performance(
        State(state): State<AppState>,
    ) -> Result<impl IntoResponse, ApiError> {
        let sizes = state.service.config().supported_key_sizes.clone();
        let report = blocking(&state.service, move |_| demo::performance_benchmark(&sizes)).await?;
        Ok(ApiSuccess::new(PerformanceBody { report }))
    }

    async fn handle_hash_benchmark(
        State(state): State<AppState>,
        body: Option<ApiJson<HashBenchmarkBody>>,
    ) -> Result<impl IntoResponse, ApiError> {
        let data = body
            .and_then(|ApiJson(body)| body.data)
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_BENCHMARK_DATA.to_string());
        let iterations = state.service.config().hash_benchmark_iterations;
        let results =
            blocking(&state.service, move |_| hashing::benchmark(data.as_bytes(), iterations))
                .await?;
        Ok(ApiSuccess::new(HashBenchmarkBodyOut { iterations, results }))
    }

    async fn handle_concepts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
        let concepts =
            blocking(&state.service, |service| Ok(demo::demonstrate_concepts(service))).await?;
        Ok(ApiSuccess::new(ConceptsBody { concepts }))
    }

    async fn handle_collision_resistance(
        State(state): State<AppState>,
    ) -> Result<impl IntoResponse, ApiError> {
        let algorithm = state.service.config().default_hash_algorithm;
        Ok(ApiSuccess::new(CollisionBody {
            demonstrations: hashing::collision_resistance(algorithm),
        }))
    }
}
