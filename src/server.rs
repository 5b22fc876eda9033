use axum::{extract::Request, http::StatusCode, response::IntoResponse, routing::{any, get}, Router};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::db::SqliteRepository;
use crate::recommendations::RecommendationProxy;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqliteRepository>,
    pub recommendations: Option<Arc<RecommendationProxy>>,
}

impl AppState {
    pub fn new(db: Arc<SqliteRepository>, recommendations: Option<Arc<RecommendationProxy>>) -> Self {
        Self {
            db,
            recommendations,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let movie_routes = Router::new()
        .route("/api/movies", get(crate::movies::list_movies))
        .route("/api/movies/search", get(crate::movies::search_movies))
        .route("/api/movies/random", get(crate::movies::random_movie))
        .route("/api/movie/:id", get(crate::movies::get_movie))
        .route("/api/test-db", get(crate::movies::test_db));

    let app = Router::new()
        .merge(movie_routes)
        .route("/api/*path", any(crate::recommendations::proxy))
        .fallback(fallback_handler)
        .layer(axum::middleware::from_fn(crate::middleware::log_request))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Outer router so the path is rewritten before the inner one matches.
    Router::new()
        .fallback_service(app)
        .layer(axum::middleware::from_fn(crate::middleware::normalize_path))
}

async fn fallback_handler(req: Request<axum::body::Body>) -> impl IntoResponse {
    // CORS preflight for paths without a route
    if req.method() == axum::http::Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    StatusCode::NOT_FOUND.into_response()
}
