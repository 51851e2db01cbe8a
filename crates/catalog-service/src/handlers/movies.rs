//! Movie handlers.
//!
//! - `GET /movies` - list (short projection)
//! - `GET /movies/:id` - detail with cast
//! - `POST /movies` - create, returns the short projection
//! - `PATCH /movies/:id` - partial update, returns the detail view
//! - `DELETE /movies/:id` - delete movie and its roles

use super::{parse_body, parse_id};
use crate::errors::CatalogError;
use crate::models::{
    CreateMovieRequest, DeleteResponse, MovieDetail, MovieShort, MoviesResponse,
    UpdateMovieRequest,
};
use crate::routes::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

#[instrument(skip_all, name = "catalog.handlers.list_movies")]
pub async fn list_movies(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MoviesResponse<MovieShort>>, CatalogError> {
    let movies = state.store.list_movies().await?;
    Ok(Json(MoviesResponse::new(movies)))
}

#[instrument(skip_all, name = "catalog.handlers.get_movie", fields(id = %id))]
pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MoviesResponse<MovieDetail>>, CatalogError> {
    let id = parse_id(&id)?;
    let movie = state.store.get_movie(id).await?;
    Ok(Json(MoviesResponse::new(vec![movie])))
}

#[instrument(skip_all, name = "catalog.handlers.create_movie")]
pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<MoviesResponse<MovieShort>>, CatalogError> {
    let new_movie = parse_body::<CreateMovieRequest>(&body)?
        .validate()
        .map_err(CatalogError::Unprocessable)?;

    let movie = state.store.create_movie(new_movie).await?;

    info!(target: "catalog.handlers.movies", movie_id = movie.id, "Movie created");

    Ok(Json(MoviesResponse::new(vec![MovieShort::from(&movie)])))
}

#[instrument(skip_all, name = "catalog.handlers.update_movie", fields(id = %id))]
pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<MoviesResponse<MovieDetail>>, CatalogError> {
    let id = parse_id(&id)?;
    let patch = parse_body::<UpdateMovieRequest>(&body)?
        .validate()
        .map_err(CatalogError::Unprocessable)?;

    let movie = state.store.update_movie(id, patch).await?;

    info!(target: "catalog.handlers.movies", movie_id = id, "Movie updated");

    Ok(Json(MoviesResponse::new(vec![movie])))
}

#[instrument(skip_all, name = "catalog.handlers.delete_movie", fields(id = %id))]
pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, CatalogError> {
    let id = parse_id(&id)?;
    state.store.delete_movie(id).await?;

    info!(target: "catalog.handlers.movies", movie_id = id, "Movie deleted");

    Ok(Json(DeleteResponse::new(id)))
}
