//! Role handlers. A role casts one actor in one movie.

use super::{parse_body, parse_id};
use crate::errors::CatalogError;
use crate::models::{CreateRoleRequest, DeleteResponse, RolesResponse};
use crate::routes::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

#[instrument(skip_all, name = "catalog.handlers.list_roles")]
pub async fn list_roles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RolesResponse>, CatalogError> {
    let roles = state.store.list_roles().await?;
    Ok(Json(RolesResponse::new(roles)))
}

#[instrument(skip_all, name = "catalog.handlers.create_role")]
pub async fn create_role(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<RolesResponse>, CatalogError> {
    let new_role = parse_body::<CreateRoleRequest>(&body)?
        .validate()
        .map_err(CatalogError::Unprocessable)?;

    let role = state.store.create_role(new_role).await?;

    info!(
        target: "catalog.handlers.roles",
        role_id = role.id,
        movie_id = role.movie_id,
        actor_id = role.actor_id,
        "Role created"
    );

    Ok(Json(RolesResponse::new(vec![role])))
}

#[instrument(skip_all, name = "catalog.handlers.delete_role", fields(id = %id))]
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, CatalogError> {
    let id = parse_id(&id)?;
    state.store.delete_role(id).await?;

    info!(target: "catalog.handlers.roles", role_id = id, "Role deleted");

    Ok(Json(DeleteResponse::new(id)))
}
