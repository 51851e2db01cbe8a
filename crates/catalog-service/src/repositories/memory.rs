//! In-memory catalog store.
//!
//! Every mutation runs under a single write lock, which gives it the same
//! atomicity the PostgreSQL store gets from transactions. Ids are assigned
//! from per-table counters starting at 1 and are never reused.

use super::{
    actor_not_found, duplicate_title, movie_not_found, role_not_found, unknown_role_actor,
    unknown_role_movie, CatalogStore,
};
use crate::errors::CatalogError;
use crate::models::{
    Actor, ActorDetail, ActorPatch, ActorShort, CastEntry, FilmographyEntry, Movie, MovieDetail,
    MoviePatch, MovieShort, NewActor, NewMovie, NewRole, Role,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::instrument;

#[derive(Default)]
struct Tables {
    movies: BTreeMap<i64, Movie>,
    actors: BTreeMap<i64, Actor>,
    roles: BTreeMap<i64, Role>,
    last_movie_id: i64,
    last_actor_id: i64,
    last_role_id: i64,
}

impl Tables {
    fn title_taken(&self, title: &str, except: Option<i64>) -> bool {
        self.movies
            .values()
            .any(|m| m.title == title && Some(m.id) != except)
    }

    fn movie_detail(&self, id: i64) -> Option<MovieDetail> {
        let movie = self.movies.get(&id)?;
        let actors = self
            .roles
            .values()
            .filter(|role| role.movie_id == id)
            .filter_map(|role| {
                self.actors.get(&role.actor_id).map(|actor| CastEntry {
                    role_id: role.id,
                    actor_id: actor.id,
                    name: actor.name.clone(),
                })
            })
            .collect();

        Some(MovieDetail {
            id: movie.id,
            title: movie.title.clone(),
            release: movie.release,
            actors,
        })
    }

    fn actor_detail(&self, id: i64) -> Option<ActorDetail> {
        let actor = self.actors.get(&id)?;
        let movies = self
            .roles
            .values()
            .filter(|role| role.actor_id == id)
            .filter_map(|role| {
                self.movies.get(&role.movie_id).map(|movie| FilmographyEntry {
                    role_id: role.id,
                    movie_id: movie.id,
                    title: movie.title.clone(),
                })
            })
            .collect();

        Some(ActorDetail {
            id: actor.id,
            name: actor.name.clone(),
            age: actor.age,
            gender: actor.gender.clone(),
            movies,
        })
    }
}

/// Catalog store backed by process memory.
#[derive(Default)]
pub struct InMemoryCatalogStore {
    tables: RwLock<Tables>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn list_movies(&self) -> Result<Vec<MovieShort>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables.movies.values().map(MovieShort::from).collect())
    }

    async fn get_movie(&self, id: i64) -> Result<MovieDetail, CatalogError> {
        let tables = self.tables.read().await;
        tables.movie_detail(id).ok_or_else(movie_not_found)
    }

    #[instrument(skip_all, name = "catalog.repo.memory.create_movie")]
    async fn create_movie(&self, movie: NewMovie) -> Result<Movie, CatalogError> {
        let mut tables = self.tables.write().await;
        if tables.title_taken(&movie.title, None) {
            return Err(duplicate_title());
        }

        tables.last_movie_id += 1;
        let created = Movie {
            id: tables.last_movie_id,
            title: movie.title,
            release: movie.release.unwrap_or_else(Utc::now),
        };
        tables.movies.insert(created.id, created.clone());
        Ok(created)
    }

    #[instrument(skip(self, patch), name = "catalog.repo.memory.update_movie")]
    async fn update_movie(&self, id: i64, patch: MoviePatch) -> Result<MovieDetail, CatalogError> {
        let mut tables = self.tables.write().await;
        if !tables.movies.contains_key(&id) {
            return Err(movie_not_found());
        }
        if let Some(title) = &patch.title {
            if tables.title_taken(title, Some(id)) {
                return Err(duplicate_title());
            }
        }

        if let Some(movie) = tables.movies.get_mut(&id) {
            if let Some(title) = patch.title {
                movie.title = title;
            }
            if let Some(release) = patch.release {
                movie.release = release;
            }
        }

        tables.movie_detail(id).ok_or_else(movie_not_found)
    }

    #[instrument(skip(self), name = "catalog.repo.memory.delete_movie")]
    async fn delete_movie(&self, id: i64) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        if tables.movies.remove(&id).is_none() {
            return Err(movie_not_found());
        }
        tables.roles.retain(|_, role| role.movie_id != id);
        Ok(())
    }

    async fn list_actors(&self) -> Result<Vec<ActorShort>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables.actors.values().map(ActorShort::from).collect())
    }

    async fn get_actor(&self, id: i64) -> Result<ActorDetail, CatalogError> {
        let tables = self.tables.read().await;
        tables.actor_detail(id).ok_or_else(actor_not_found)
    }

    #[instrument(skip_all, name = "catalog.repo.memory.create_actor")]
    async fn create_actor(&self, actor: NewActor) -> Result<Actor, CatalogError> {
        let mut tables = self.tables.write().await;
        tables.last_actor_id += 1;
        let created = Actor {
            id: tables.last_actor_id,
            name: actor.name,
            age: actor.age,
            gender: actor.gender,
        };
        tables.actors.insert(created.id, created.clone());
        Ok(created)
    }

    #[instrument(skip(self, patch), name = "catalog.repo.memory.update_actor")]
    async fn update_actor(&self, id: i64, patch: ActorPatch) -> Result<ActorDetail, CatalogError> {
        let mut tables = self.tables.write().await;
        let actor = tables.actors.get_mut(&id).ok_or_else(actor_not_found)?;
        if let Some(name) = patch.name {
            actor.name = name;
        }
        if let Some(age) = patch.age {
            actor.age = Some(age);
        }
        if let Some(gender) = patch.gender {
            actor.gender = Some(gender);
        }

        tables.actor_detail(id).ok_or_else(actor_not_found)
    }

    #[instrument(skip(self), name = "catalog.repo.memory.delete_actor")]
    async fn delete_actor(&self, id: i64) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        if tables.actors.remove(&id).is_none() {
            return Err(actor_not_found());
        }
        tables.roles.retain(|_, role| role.actor_id != id);
        Ok(())
    }

    async fn list_roles(&self) -> Result<Vec<Role>, CatalogError> {
        let tables = self.tables.read().await;
        Ok(tables.roles.values().copied().collect())
    }

    #[instrument(skip_all, name = "catalog.repo.memory.create_role")]
    async fn create_role(&self, role: NewRole) -> Result<Role, CatalogError> {
        let mut tables = self.tables.write().await;
        if !tables.movies.contains_key(&role.movie_id) {
            return Err(unknown_role_movie());
        }
        if !tables.actors.contains_key(&role.actor_id) {
            return Err(unknown_role_actor());
        }

        tables.last_role_id += 1;
        let created = Role {
            id: tables.last_role_id,
            movie_id: role.movie_id,
            actor_id: role.actor_id,
        };
        tables.roles.insert(created.id, created);
        Ok(created)
    }

    #[instrument(skip(self), name = "catalog.repo.memory.delete_role")]
    async fn delete_role(&self, id: i64) -> Result<(), CatalogError> {
        let mut tables = self.tables.write().await;
        tables
            .roles
            .remove(&id)
            .map(|_| ())
            .ok_or_else(role_not_found)
    }

    async fn ping(&self) -> Result<(), CatalogError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn new_movie(title: &str) -> NewMovie {
        NewMovie {
            title: title.to_string(),
            release: None,
        }
    }

    fn new_actor(name: &str) -> NewActor {
        NewActor {
            name: name.to_string(),
            age: None,
            gender: None,
        }
    }

    async fn seeded() -> (InMemoryCatalogStore, Movie, Actor, Role) {
        let store = InMemoryCatalogStore::new();
        let movie = store.create_movie(new_movie("Heat")).await.unwrap();
        let actor = store.create_actor(new_actor("Al Pacino")).await.unwrap();
        let role = store
            .create_role(NewRole {
                movie_id: movie.id,
                actor_id: actor.id,
            })
            .await
            .unwrap();
        (store, movie, actor, role)
    }

    #[tokio::test]
    async fn test_ids_start_at_one_and_are_not_reused() {
        let store = InMemoryCatalogStore::new();
        let first = store.create_movie(new_movie("A")).await.unwrap();
        assert_eq!(first.id, 1);

        store.delete_movie(first.id).await.unwrap();
        let second = store.create_movie(new_movie("B")).await.unwrap();
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn test_create_movie_defaults_release_to_now() {
        let before = Utc::now();
        let store = InMemoryCatalogStore::new();
        let movie = store.create_movie(new_movie("Heat")).await.unwrap();
        assert!(movie.release >= before);
        assert!(movie.release <= Utc::now());
    }

    #[tokio::test]
    async fn test_duplicate_title_is_unprocessable() {
        let store = InMemoryCatalogStore::new();
        store.create_movie(new_movie("Heat")).await.unwrap();
        let err = store.create_movie(new_movie("Heat")).await.unwrap_err();
        assert_eq!(err.status_code(), 422);

        let other = store.create_movie(new_movie("Ronin")).await.unwrap();
        let err = store
            .update_movie(
                other.id,
                MoviePatch {
                    title: Some("Heat".to_string()),
                    release: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);

        // Renaming a movie to its own title is not a conflict
        assert!(store
            .update_movie(
                other.id,
                MoviePatch {
                    title: Some("Ronin".to_string()),
                    release: None,
                },
            )
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_detail_views_follow_roles() {
        let (store, movie, actor, role) = seeded().await;

        let movie_detail = store.get_movie(movie.id).await.unwrap();
        assert_eq!(
            movie_detail.actors,
            vec![CastEntry {
                role_id: role.id,
                actor_id: actor.id,
                name: "Al Pacino".to_string()
            }]
        );

        let actor_detail = store.get_actor(actor.id).await.unwrap();
        assert_eq!(
            actor_detail.movies,
            vec![FilmographyEntry {
                role_id: role.id,
                movie_id: movie.id,
                title: "Heat".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_delete_movie_cascades_roles() {
        let (store, movie, actor, _) = seeded().await;

        store.delete_movie(movie.id).await.unwrap();

        assert!(store.list_roles().await.unwrap().is_empty());
        assert!(store.get_actor(actor.id).await.unwrap().movies.is_empty());
        assert_eq!(
            store.get_movie(movie.id).await.unwrap_err().status_code(),
            404
        );
    }

    #[tokio::test]
    async fn test_delete_actor_cascades_roles() {
        let (store, movie, actor, _) = seeded().await;

        store.delete_actor(actor.id).await.unwrap();

        assert!(store.list_roles().await.unwrap().is_empty());
        assert!(store.get_movie(movie.id).await.unwrap().actors.is_empty());
    }

    #[tokio::test]
    async fn test_create_role_requires_both_references() {
        let (store, movie, actor, _) = seeded().await;

        let err = store
            .create_role(NewRole {
                movie_id: 999,
                actor_id: actor.id,
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);

        let err = store
            .create_role(NewRole {
                movie_id: movie.id,
                actor_id: 999,
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);

        assert_eq!(store.list_roles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let store = InMemoryCatalogStore::new();

        assert_eq!(store.get_movie(1).await.unwrap_err().status_code(), 404);
        assert_eq!(store.get_actor(1).await.unwrap_err().status_code(), 404);
        assert_eq!(store.delete_movie(1).await.unwrap_err().status_code(), 404);
        assert_eq!(store.delete_actor(1).await.unwrap_err().status_code(), 404);
        assert_eq!(store.delete_role(1).await.unwrap_err().status_code(), 404);
        assert_eq!(
            store
                .update_movie(1, MoviePatch::default())
                .await
                .unwrap_err()
                .status_code(),
            404
        );
        assert_eq!(
            store
                .update_actor(1, ActorPatch::default())
                .await
                .unwrap_err()
                .status_code(),
            404
        );
    }

    #[tokio::test]
    async fn test_update_actor_applies_present_fields_only() {
        let store = InMemoryCatalogStore::new();
        let actor = store
            .create_actor(NewActor {
                name: "Val Kilmer".to_string(),
                age: Some(40),
                gender: Some("male".to_string()),
            })
            .await
            .unwrap();

        let detail = store
            .update_actor(
                actor.id,
                ActorPatch {
                    name: None,
                    age: Some(41),
                    gender: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(detail.name, "Val Kilmer");
        assert_eq!(detail.age, Some(41));
        assert_eq!(detail.gender.as_deref(), Some("male"));
    }

    #[tokio::test]
    async fn test_delete_role_leaves_entities() {
        let (store, movie, actor, role) = seeded().await;

        store.delete_role(role.id).await.unwrap();

        assert!(store.get_movie(movie.id).await.unwrap().actors.is_empty());
        assert!(store.get_actor(actor.id).await.is_ok());
    }
}
