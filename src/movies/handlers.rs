use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::service::{self, MovieError};
use super::types::*;
use crate::server::AppState;

pub async fn list_movies(
    State(state): State<AppState>,
    Query(params): Query<GenreParams>,
) -> Result<Json<MovieList>, MovieError> {
    let movies = service::find_by_genre(state.db.as_ref(), params.genre.as_deref()).await?;
    Ok(Json(MovieList { movies }))
}

pub async fn search_movies(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<MovieList>, MovieError> {
    let movies = service::search(state.db.as_ref(), params.query.as_deref()).await?;
    Ok(Json(MovieList { movies }))
}

pub async fn random_movie(State(state): State<AppState>) -> Result<Json<MovieEnvelope>, MovieError> {
    let movie = service::random_movie(state.db.as_ref()).await?;
    Ok(Json(MovieEnvelope { movie }))
}

pub async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MovieEnvelope>, MovieError> {
    let movie = service::get_by_id(state.db.as_ref(), &id).await?;
    Ok(Json(MovieEnvelope { movie }))
}

pub async fn test_db(State(state): State<AppState>) -> Result<Json<DbProbe>, MovieError> {
    let (sample_movie, fields) = service::sample_movie(state.db.as_ref()).await?;
    Ok(Json(DbProbe {
        message: "Database connection successful!".to_string(),
        sample_movie,
        fields,
    }))
}
