//! PostgreSQL catalog store.
//!
//! # Consistency
//!
//! - Deletes lock the target row (`FOR UPDATE`), remove referencing roles,
//!   then the row, in one transaction. `ON DELETE CASCADE` on the join table
//!   is a backstop, not the mechanism.
//! - Role creation share-locks both referenced rows (`FOR SHARE`) so neither
//!   can be deleted between the existence check and the insert.
//! - Detail views are a single LEFT JOIN query so they never observe a
//!   half-applied cascade.
//!
//! All queries use parameterized statements.

use super::{
    actor_not_found, duplicate_title, movie_not_found, role_not_found, unknown_role_actor,
    unknown_role_movie, CatalogStore,
};
use crate::errors::CatalogError;
use crate::models::{
    Actor, ActorDetail, ActorPatch, ActorShort, CastEntry, FilmographyEntry, Movie, MovieDetail,
    MoviePatch, MovieShort, NewActor, NewMovie, NewRole, Role,
};
use crate::observability::metrics;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row};
use std::future::Future;
use std::time::Instant;
use tracing::instrument;

/// Catalog store backed by a PostgreSQL pool.
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Run `query`, recording its duration and outcome under `operation`.
async fn timed<T, F>(operation: &str, query: F) -> Result<T, CatalogError>
where
    F: Future<Output = Result<T, CatalogError>>,
{
    let start = Instant::now();
    let result = query.await;
    let status = match &result {
        Ok(_) => "success",
        Err(CatalogError::Database(_)) => "error",
        Err(_) => "rejected",
    };
    metrics::record_db_query(operation, status, start.elapsed());
    result
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

fn map_movie(row: &PgRow) -> Result<Movie, sqlx::Error> {
    Ok(Movie {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        release: row.try_get("release")?,
    })
}

fn map_actor(row: &PgRow) -> Result<Actor, sqlx::Error> {
    Ok(Actor {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        age: row.try_get("age")?,
        gender: row.try_get("gender")?,
    })
}

fn map_role(row: &PgRow) -> Result<Role, sqlx::Error> {
    Ok(Role {
        id: row.try_get("id")?,
        movie_id: row.try_get("movie_id")?,
        actor_id: row.try_get("actor_id")?,
    })
}

async fn fetch_movie_detail<'e, E>(executor: E, id: i64) -> Result<MovieDetail, CatalogError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let rows = sqlx::query(
        r#"
        SELECT m.id, m.title, m.release,
               r.id AS role_id, a.id AS actor_id, a.name AS actor_name
        FROM movies m
        LEFT JOIN roles r ON r.movie_id = m.id
        LEFT JOIN actors a ON a.id = r.actor_id
        WHERE m.id = $1
        ORDER BY r.id
        "#,
    )
    .bind(id)
    .fetch_all(executor)
    .await?;

    let first = rows.first().ok_or_else(movie_not_found)?;
    let movie = map_movie(first)?;

    let mut actors = Vec::with_capacity(rows.len());
    for row in &rows {
        let role_id: Option<i64> = row.try_get("role_id")?;
        let actor_id: Option<i64> = row.try_get("actor_id")?;
        let name: Option<String> = row.try_get("actor_name")?;
        if let (Some(role_id), Some(actor_id), Some(name)) = (role_id, actor_id, name) {
            actors.push(CastEntry {
                role_id,
                actor_id,
                name,
            });
        }
    }

    Ok(MovieDetail {
        id: movie.id,
        title: movie.title,
        release: movie.release,
        actors,
    })
}

async fn fetch_actor_detail<'e, E>(executor: E, id: i64) -> Result<ActorDetail, CatalogError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let rows = sqlx::query(
        r#"
        SELECT a.id, a.name, a.age, a.gender,
               r.id AS role_id, m.id AS movie_id, m.title AS movie_title
        FROM actors a
        LEFT JOIN roles r ON r.actor_id = a.id
        LEFT JOIN movies m ON m.id = r.movie_id
        WHERE a.id = $1
        ORDER BY r.id
        "#,
    )
    .bind(id)
    .fetch_all(executor)
    .await?;

    let first = rows.first().ok_or_else(actor_not_found)?;
    let actor = map_actor(first)?;

    let mut movies = Vec::with_capacity(rows.len());
    for row in &rows {
        let role_id: Option<i64> = row.try_get("role_id")?;
        let movie_id: Option<i64> = row.try_get("movie_id")?;
        let title: Option<String> = row.try_get("movie_title")?;
        if let (Some(role_id), Some(movie_id), Some(title)) = (role_id, movie_id, title) {
            movies.push(FilmographyEntry {
                role_id,
                movie_id,
                title,
            });
        }
    }

    Ok(ActorDetail {
        id: actor.id,
        name: actor.name,
        age: actor.age,
        gender: actor.gender,
        movies,
    })
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    #[instrument(skip_all, name = "catalog.repo.list_movies")]
    async fn list_movies(&self) -> Result<Vec<MovieShort>, CatalogError> {
        timed("list_movies", async {
            let rows = sqlx::query("SELECT id, title FROM movies ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
            rows.iter()
                .map(|row| -> Result<MovieShort, CatalogError> {
                    Ok(MovieShort {
                        id: row.try_get("id")?,
                        title: row.try_get("title")?,
                    })
                })
                .collect()
        })
        .await
    }

    #[instrument(skip(self), name = "catalog.repo.get_movie")]
    async fn get_movie(&self, id: i64) -> Result<MovieDetail, CatalogError> {
        timed("get_movie", fetch_movie_detail(&self.pool, id)).await
    }

    #[instrument(skip_all, name = "catalog.repo.create_movie")]
    async fn create_movie(&self, movie: NewMovie) -> Result<Movie, CatalogError> {
        timed("insert_movie", async {
            let row = sqlx::query(
                r#"
                INSERT INTO movies (title, release)
                VALUES ($1, COALESCE($2, NOW()))
                RETURNING id, title, release
                "#,
            )
            .bind(&movie.title)
            .bind(movie.release)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    duplicate_title()
                } else {
                    CatalogError::from(e)
                }
            })?;
            Ok(map_movie(&row)?)
        })
        .await
    }

    #[instrument(skip(self, patch), name = "catalog.repo.update_movie")]
    async fn update_movie(&self, id: i64, patch: MoviePatch) -> Result<MovieDetail, CatalogError> {
        timed("update_movie", async {
            let mut tx = self.pool.begin().await?;

            let updated = sqlx::query(
                r#"
                UPDATE movies
                SET title = COALESCE($2, title),
                    release = COALESCE($3, release)
                WHERE id = $1
                RETURNING id
                "#,
            )
            .bind(id)
            .bind(patch.title.as_deref())
            .bind(patch.release)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    duplicate_title()
                } else {
                    CatalogError::from(e)
                }
            })?;

            if updated.is_none() {
                return Err(movie_not_found());
            }

            let detail = fetch_movie_detail(&mut *tx, id).await?;
            tx.commit().await?;
            Ok(detail)
        })
        .await
    }

    #[instrument(skip(self), name = "catalog.repo.delete_movie")]
    async fn delete_movie(&self, id: i64) -> Result<(), CatalogError> {
        timed("delete_movie", async {
            let mut tx = self.pool.begin().await?;

            let locked = sqlx::query("SELECT id FROM movies WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
            if locked.is_none() {
                return Err(movie_not_found());
            }

            let removed_roles = sqlx::query("DELETE FROM roles WHERE movie_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            sqlx::query("DELETE FROM movies WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            tracing::debug!(target: "catalog.repo", movie_id = id, removed_roles, "Movie deleted");
            Ok(())
        })
        .await
    }

    #[instrument(skip_all, name = "catalog.repo.list_actors")]
    async fn list_actors(&self) -> Result<Vec<ActorShort>, CatalogError> {
        timed("list_actors", async {
            let rows = sqlx::query("SELECT id, name FROM actors ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
            rows.iter()
                .map(|row| -> Result<ActorShort, CatalogError> {
                    Ok(ActorShort {
                        id: row.try_get("id")?,
                        name: row.try_get("name")?,
                    })
                })
                .collect()
        })
        .await
    }

    #[instrument(skip(self), name = "catalog.repo.get_actor")]
    async fn get_actor(&self, id: i64) -> Result<ActorDetail, CatalogError> {
        timed("get_actor", fetch_actor_detail(&self.pool, id)).await
    }

    #[instrument(skip_all, name = "catalog.repo.create_actor")]
    async fn create_actor(&self, actor: NewActor) -> Result<Actor, CatalogError> {
        timed("insert_actor", async {
            let row = sqlx::query(
                r#"
                INSERT INTO actors (name, age, gender)
                VALUES ($1, $2, $3)
                RETURNING id, name, age, gender
                "#,
            )
            .bind(&actor.name)
            .bind(actor.age)
            .bind(actor.gender.as_deref())
            .fetch_one(&self.pool)
            .await?;
            Ok(map_actor(&row)?)
        })
        .await
    }

    #[instrument(skip(self, patch), name = "catalog.repo.update_actor")]
    async fn update_actor(&self, id: i64, patch: ActorPatch) -> Result<ActorDetail, CatalogError> {
        timed("update_actor", async {
            let mut tx = self.pool.begin().await?;

            let updated = sqlx::query(
                r#"
                UPDATE actors
                SET name = COALESCE($2, name),
                    age = COALESCE($3, age),
                    gender = COALESCE($4, gender)
                WHERE id = $1
                RETURNING id
                "#,
            )
            .bind(id)
            .bind(patch.name.as_deref())
            .bind(patch.age)
            .bind(patch.gender.as_deref())
            .fetch_optional(&mut *tx)
            .await?;

            if updated.is_none() {
                return Err(actor_not_found());
            }

            let detail = fetch_actor_detail(&mut *tx, id).await?;
            tx.commit().await?;
            Ok(detail)
        })
        .await
    }

    #[instrument(skip(self), name = "catalog.repo.delete_actor")]
    async fn delete_actor(&self, id: i64) -> Result<(), CatalogError> {
        timed("delete_actor", async {
            let mut tx = self.pool.begin().await?;

            let locked = sqlx::query("SELECT id FROM actors WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
            if locked.is_none() {
                return Err(actor_not_found());
            }

            let removed_roles = sqlx::query("DELETE FROM roles WHERE actor_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            sqlx::query("DELETE FROM actors WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            tracing::debug!(target: "catalog.repo", actor_id = id, removed_roles, "Actor deleted");
            Ok(())
        })
        .await
    }

    #[instrument(skip_all, name = "catalog.repo.list_roles")]
    async fn list_roles(&self) -> Result<Vec<Role>, CatalogError> {
        timed("list_roles", async {
            let rows = sqlx::query("SELECT id, movie_id, actor_id FROM roles ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
            rows.iter()
                .map(|row| map_role(row).map_err(CatalogError::from))
                .collect()
        })
        .await
    }

    #[instrument(skip(self), name = "catalog.repo.create_role")]
    async fn create_role(&self, role: NewRole) -> Result<Role, CatalogError> {
        timed("insert_role", async {
            let mut tx = self.pool.begin().await?;

            let movie = sqlx::query("SELECT id FROM movies WHERE id = $1 FOR SHARE")
                .bind(role.movie_id)
                .fetch_optional(&mut *tx)
                .await?;
            if movie.is_none() {
                return Err(unknown_role_movie());
            }

            let actor = sqlx::query("SELECT id FROM actors WHERE id = $1 FOR SHARE")
                .bind(role.actor_id)
                .fetch_optional(&mut *tx)
                .await?;
            if actor.is_none() {
                return Err(unknown_role_actor());
            }

            let row = sqlx::query(
                r#"
                INSERT INTO roles (movie_id, actor_id)
                VALUES ($1, $2)
                RETURNING id, movie_id, actor_id
                "#,
            )
            .bind(role.movie_id)
            .bind(role.actor_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    CatalogError::Unprocessable(
                        "role references a movie or actor that does not exist".to_string(),
                    )
                } else {
                    CatalogError::from(e)
                }
            })?;

            tx.commit().await?;
            Ok(map_role(&row)?)
        })
        .await
    }

    #[instrument(skip(self), name = "catalog.repo.delete_role")]
    async fn delete_role(&self, id: i64) -> Result<(), CatalogError> {
        timed("delete_role", async {
            let result = sqlx::query("DELETE FROM roles WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(role_not_found());
            }
            Ok(())
        })
        .await
    }

    async fn ping(&self) -> Result<(), CatalogError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
