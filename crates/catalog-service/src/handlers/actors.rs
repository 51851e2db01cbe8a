//! Actor handlers.
//!
//! Same shape as the movie handlers: list and detail under `get:actors`,
//! create, partial update and delete each under their own permission.

use super::{parse_body, parse_id};
use crate::errors::CatalogError;
use crate::models::{
    ActorDetail, ActorShort, ActorsResponse, CreateActorRequest, DeleteResponse,
    UpdateActorRequest,
};
use crate::routes::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

#[instrument(skip_all, name = "catalog.handlers.list_actors")]
pub async fn list_actors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ActorsResponse<ActorShort>>, CatalogError> {
    let actors = state.store.list_actors().await?;
    Ok(Json(ActorsResponse::new(actors)))
}

#[instrument(skip_all, name = "catalog.handlers.get_actor", fields(id = %id))]
pub async fn get_actor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ActorsResponse<ActorDetail>>, CatalogError> {
    let id = parse_id(&id)?;
    let actor = state.store.get_actor(id).await?;
    Ok(Json(ActorsResponse::new(vec![actor])))
}

#[instrument(skip_all, name = "catalog.handlers.create_actor")]
pub async fn create_actor(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ActorsResponse<ActorShort>>, CatalogError> {
    let new_actor = parse_body::<CreateActorRequest>(&body)?
        .validate()
        .map_err(CatalogError::Unprocessable)?;

    let actor = state.store.create_actor(new_actor).await?;

    info!(target: "catalog.handlers.actors", actor_id = actor.id, "Actor created");

    Ok(Json(ActorsResponse::new(vec![ActorShort::from(&actor)])))
}

#[instrument(skip_all, name = "catalog.handlers.update_actor", fields(id = %id))]
pub async fn update_actor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ActorsResponse<ActorDetail>>, CatalogError> {
    let id = parse_id(&id)?;
    let patch = parse_body::<UpdateActorRequest>(&body)?
        .validate()
        .map_err(CatalogError::Unprocessable)?;

    let actor = state.store.update_actor(id, patch).await?;

    info!(target: "catalog.handlers.actors", actor_id = id, "Actor updated");

    Ok(Json(ActorsResponse::new(vec![actor])))
}

#[instrument(skip_all, name = "catalog.handlers.delete_actor", fields(id = %id))]
pub async fn delete_actor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, CatalogError> {
    let id = parse_id(&id)?;
    state.store.delete_actor(id).await?;

    info!(target: "catalog.handlers.actors", actor_id = id, "Actor deleted");

    Ok(Json(DeleteResponse::new(id)))
}
