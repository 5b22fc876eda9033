use serde::{Deserialize, Serialize};

use crate::db::Movie;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieList {
    pub movies: Vec<Movie>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieEnvelope {
    pub movie: Movie,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbProbe {
    pub message: String,
    #[serde(rename = "sampleMovie")]
    pub sample_movie: Movie,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenreParams {
    #[serde(default)]
    pub genre: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
}
