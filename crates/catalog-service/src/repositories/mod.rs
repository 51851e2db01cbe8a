//! Repository layer for the catalog service.
//!
//! Handlers talk to a `CatalogStore`, which owns the Movie/Actor/Role
//! aggregate. Two implementations:
//!
//! - `PgCatalogStore` - PostgreSQL, transactional with row locks
//! - `InMemoryCatalogStore` - used when no database is configured, and by tests
//!
//! Both guarantee that deleting a movie or actor removes every role that
//! references it in the same atomic step, and that a role is only created
//! when both references exist.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryCatalogStore;
pub use postgres::PgCatalogStore;

use crate::errors::CatalogError;
use crate::models::{
    Actor, ActorDetail, ActorPatch, ActorShort, Movie, MovieDetail, MoviePatch, MovieShort,
    NewActor, NewMovie, NewRole, Role,
};
use async_trait::async_trait;

/// Storage for movies, actors and the roles that connect them.
///
/// # Errors
///
/// All operations return `CatalogError::NotFound` for unknown ids,
/// `CatalogError::Unprocessable` for constraint violations (duplicate title,
/// dangling role reference) and `CatalogError::Database` for backend failures.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_movies(&self) -> Result<Vec<MovieShort>, CatalogError>;

    async fn get_movie(&self, id: i64) -> Result<MovieDetail, CatalogError>;

    async fn create_movie(&self, movie: NewMovie) -> Result<Movie, CatalogError>;

    /// Apply the present fields of `patch` and return the updated detail view.
    async fn update_movie(&self, id: i64, patch: MoviePatch) -> Result<MovieDetail, CatalogError>;

    /// Delete the movie and every role referencing it.
    async fn delete_movie(&self, id: i64) -> Result<(), CatalogError>;

    async fn list_actors(&self) -> Result<Vec<ActorShort>, CatalogError>;

    async fn get_actor(&self, id: i64) -> Result<ActorDetail, CatalogError>;

    async fn create_actor(&self, actor: NewActor) -> Result<Actor, CatalogError>;

    /// Apply the present fields of `patch` and return the updated detail view.
    async fn update_actor(&self, id: i64, patch: ActorPatch) -> Result<ActorDetail, CatalogError>;

    /// Delete the actor and every role referencing them.
    async fn delete_actor(&self, id: i64) -> Result<(), CatalogError>;

    async fn list_roles(&self) -> Result<Vec<Role>, CatalogError>;

    /// Cast an actor in a movie; both must exist.
    async fn create_role(&self, role: NewRole) -> Result<Role, CatalogError>;

    async fn delete_role(&self, id: i64) -> Result<(), CatalogError>;

    /// Cheap liveness check of the backend, used by `/ready`.
    async fn ping(&self) -> Result<(), CatalogError>;

    /// Release backend resources on shutdown.
    async fn close(&self) {}
}

pub(crate) fn movie_not_found() -> CatalogError {
    CatalogError::NotFound("movie not found".to_string())
}

pub(crate) fn actor_not_found() -> CatalogError {
    CatalogError::NotFound("actor not found".to_string())
}

pub(crate) fn role_not_found() -> CatalogError {
    CatalogError::NotFound("role not found".to_string())
}

pub(crate) fn duplicate_title() -> CatalogError {
    CatalogError::Unprocessable("a movie with this title already exists".to_string())
}

pub(crate) fn unknown_role_movie() -> CatalogError {
    CatalogError::Unprocessable("movie_id does not reference an existing movie".to_string())
}

pub(crate) fn unknown_role_actor() -> CatalogError {
    CatalogError::Unprocessable("actor_id does not reference an existing actor".to_string())
}
