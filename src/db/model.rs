use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::types::Json;

/// A movie document. Only the fields the service filters on are modeled;
/// everything else rides along in `attrs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres_tokens: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f64>,
    #[serde(flatten)]
    pub attrs: Map<String, Value>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MovieRow {
    pub id: String,
    pub title: String,
    pub genres: Option<String>,
    pub genres_tokens: Option<Json<Vec<String>>>,
    pub poster_path: Option<String>,
    pub vote_average: Option<f64>,
    pub attrs: Json<Map<String, Value>>,
}

impl From<MovieRow> for Movie {
    fn from(row: MovieRow) -> Self {
        Movie {
            id: row.id,
            title: row.title,
            genres: row.genres,
            genres_tokens: row.genres_tokens.map(|t| t.0),
            poster_path: row.poster_path,
            vote_average: row.vote_average,
            attrs: row.attrs.0,
        }
    }
}

/// The slice of a movie the genre migration reads.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GenreRow {
    pub rowid: i64,
    pub id: String,
    pub genres: Option<String>,
    pub genres_tokens: Option<Json<Vec<String>>>,
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

pub type DbResult<T> = Result<T, DbError>;
