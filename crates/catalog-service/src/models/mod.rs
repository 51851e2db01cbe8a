//! Catalog service models.
//!
//! Entities as stored, the projections returned by the API, request bodies,
//! and the validated inputs the store accepts.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Maximum movie title length in characters.
pub const MAX_TITLE_LENGTH: usize = 80;

/// Upper bound for an actor's age.
pub const MAX_ACTOR_AGE: i32 = 150;

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub release: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
}

/// Casting of one actor in one movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Role {
    pub id: i64,
    pub movie_id: i64,
    pub actor_id: i64,
}

// ============================================================================
// Projections
// ============================================================================

/// Movie list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieShort {
    pub id: i64,
    pub title: String,
}

impl From<&Movie> for MovieShort {
    fn from(movie: &Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
        }
    }
}

/// Actor list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorShort {
    pub id: i64,
    pub name: String,
}

impl From<&Actor> for ActorShort {
    fn from(actor: &Actor) -> Self {
        Self {
            id: actor.id,
            name: actor.name.clone(),
        }
    }
}

/// An actor as seen from a movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CastEntry {
    pub role_id: i64,
    pub actor_id: i64,
    pub name: String,
}

/// A movie as seen from an actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilmographyEntry {
    pub role_id: i64,
    pub movie_id: i64,
    pub title: String,
}

/// Movie with its cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieDetail {
    pub id: i64,
    pub title: String,
    pub release: DateTime<Utc>,
    pub actors: Vec<CastEntry>,
}

/// Actor with their filmography.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorDetail {
    pub id: i64,
    pub name: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub movies: Vec<FilmographyEntry>,
}

// ============================================================================
// Validated inputs
// ============================================================================

/// A movie ready to insert. `release: None` means "now".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovie {
    pub title: String,
    pub release: Option<DateTime<Utc>>,
}

/// Fields to change on a movie; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoviePatch {
    pub title: Option<String>,
    pub release: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActor {
    pub name: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
}

/// Fields to change on an actor; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorPatch {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewRole {
    pub movie_id: i64,
    pub actor_id: i64,
}

// ============================================================================
// Request bodies
// ============================================================================

/// Body of `POST /movies`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMovieRequest {
    pub title: Option<String>,
    pub release: Option<String>,
}

impl CreateMovieRequest {
    /// Validate the request.
    ///
    /// # Errors
    ///
    /// Returns an error message if a required field is missing or any field
    /// is invalid.
    pub fn validate(self) -> Result<NewMovie, String> {
        let title = self.title.ok_or("title is required")?;
        Ok(NewMovie {
            title: validate_title(&title)?,
            release: self.release.as_deref().map(parse_release).transpose()?,
        })
    }
}

/// Body of `PATCH /movies/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMovieRequest {
    pub title: Option<String>,
    pub release: Option<String>,
}

impl UpdateMovieRequest {
    /// Validate the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns an error message if a present field is invalid.
    pub fn validate(self) -> Result<MoviePatch, String> {
        Ok(MoviePatch {
            title: self.title.as_deref().map(validate_title).transpose()?,
            release: self.release.as_deref().map(parse_release).transpose()?,
        })
    }
}

/// Body of `POST /actors`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateActorRequest {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
}

impl CreateActorRequest {
    /// Validate the request.
    ///
    /// # Errors
    ///
    /// Returns an error message if `name` is missing or any field is invalid.
    pub fn validate(self) -> Result<NewActor, String> {
        let name = self.name.ok_or("name is required")?;
        Ok(NewActor {
            name: validate_name(&name)?,
            age: self.age.map(validate_age).transpose()?,
            gender: self.gender.as_deref().map(validate_gender).transpose()?,
        })
    }
}

/// Body of `PATCH /actors/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateActorRequest {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
}

impl UpdateActorRequest {
    /// Validate the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns an error message if a present field is invalid.
    pub fn validate(self) -> Result<ActorPatch, String> {
        Ok(ActorPatch {
            name: self.name.as_deref().map(validate_name).transpose()?,
            age: self.age.map(validate_age).transpose()?,
            gender: self.gender.as_deref().map(validate_gender).transpose()?,
        })
    }
}

/// Body of `POST /roles`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRoleRequest {
    pub movie_id: Option<i64>,
    pub actor_id: Option<i64>,
}

impl CreateRoleRequest {
    /// Validate the request.
    ///
    /// # Errors
    ///
    /// Returns an error message if either reference is missing or not positive.
    pub fn validate(self) -> Result<NewRole, String> {
        let movie_id = self.movie_id.ok_or("movie_id is required")?;
        let actor_id = self.actor_id.ok_or("actor_id is required")?;
        if movie_id <= 0 || actor_id <= 0 {
            return Err("movie_id and actor_id must be positive".to_string());
        }
        Ok(NewRole { movie_id, actor_id })
    }
}

fn validate_title(title: &str) -> Result<String, String> {
    let title = title.trim();
    if title.is_empty() {
        return Err("title must not be empty".to_string());
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(format!(
            "title must be at most {MAX_TITLE_LENGTH} characters"
        ));
    }
    Ok(title.to_string())
}

fn validate_name(name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("name must not be empty".to_string());
    }
    Ok(name.to_string())
}

fn validate_age(age: i32) -> Result<i32, String> {
    if (0..=MAX_ACTOR_AGE).contains(&age) {
        Ok(age)
    } else {
        Err(format!("age must be between 0 and {MAX_ACTOR_AGE}"))
    }
}

fn validate_gender(gender: &str) -> Result<String, String> {
    let gender = gender.trim();
    if gender.is_empty() {
        return Err("gender must not be empty".to_string());
    }
    Ok(gender.to_string())
}

/// Parse a release date: RFC 3339 timestamp or a bare `YYYY-MM-DD` (midnight UTC).
fn parse_release(value: &str) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| "release must be an RFC 3339 timestamp or YYYY-MM-DD date".to_string())
}

// ============================================================================
// Response envelopes
// ============================================================================

/// `{"success": true, "movies": [...]}`
#[derive(Debug, Clone, Serialize)]
pub struct MoviesResponse<T> {
    pub success: bool,
    pub movies: Vec<T>,
}

impl<T> MoviesResponse<T> {
    pub fn new(movies: Vec<T>) -> Self {
        Self {
            success: true,
            movies,
        }
    }
}

/// `{"success": true, "actors": [...]}`
#[derive(Debug, Clone, Serialize)]
pub struct ActorsResponse<T> {
    pub success: bool,
    pub actors: Vec<T>,
}

impl<T> ActorsResponse<T> {
    pub fn new(actors: Vec<T>) -> Self {
        Self {
            success: true,
            actors,
        }
    }
}

/// `{"success": true, "roles": [...]}`
#[derive(Debug, Clone, Serialize)]
pub struct RolesResponse {
    pub success: bool,
    pub roles: Vec<Role>,
}

impl RolesResponse {
    pub fn new(roles: Vec<Role>) -> Self {
        Self {
            success: true,
            roles,
        }
    }
}

/// `{"success": true, "delete": <id>}`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub delete: i64,
}

impl DeleteResponse {
    pub fn new(id: i64) -> Self {
        Self {
            success: true,
            delete: id,
        }
    }
}

/// Readiness probe response.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready".
    pub status: &'static str,

    /// Store connectivity ("healthy" / "unhealthy").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<&'static str>,

    /// Key set endpoint configuration ("configured").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<&'static str>,

    /// Generic error message (no infrastructure details).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
