use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rand::Rng;
use tracing::error;

use super::types::ErrorBody;
use crate::db::{DbError, Movie, MovieRepo};
use crate::util::ObjectId;

pub const HOME_FEED_LIMIT: i64 = 20;
pub const GENRE_LIMIT: i64 = 50;
pub const SEARCH_LIMIT: i64 = 100;
pub const RANDOM_MIN_RATING: f64 = 6.0;

/// Label for movies without usable genre data. Never matched against tokens.
pub const UNKNOWN_GENRE: &str = "unknown genre";

#[derive(Debug, thiserror::Error)]
pub enum MovieError {
    #[error("{0}")]
    MissingParameter(String),
    #[error("{0}")]
    InvalidId(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Store(#[from] DbError),
}

impl MovieError {
    pub fn status(&self) -> StatusCode {
        match self {
            MovieError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            MovieError::NotFound(_) => StatusCode::NOT_FOUND,
            MovieError::InvalidId(_) | MovieError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MovieError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let MovieError::Store(ref e) = self {
            error!("Store error: {}", e);
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Home feed when `genre` is empty, otherwise an exact token match.
pub async fn find_by_genre<R: MovieRepo + ?Sized>(
    repo: &R,
    genre: Option<&str>,
) -> Result<Vec<Movie>, MovieError> {
    let genre = match genre {
        Some(g) if !g.is_empty() => g,
        _ => return Ok(repo.list_movies(HOME_FEED_LIMIT).await?),
    };

    if genre.to_lowercase() == UNKNOWN_GENRE {
        return Ok(Vec::new());
    }

    Ok(repo.find_by_genre_token(genre, GENRE_LIMIT).await?)
}

pub async fn search<R: MovieRepo + ?Sized>(
    repo: &R,
    query: Option<&str>,
) -> Result<Vec<Movie>, MovieError> {
    let query = query
        .filter(|q| !q.is_empty())
        .ok_or_else(|| MovieError::MissingParameter("Search query is required".to_string()))?;

    Ok(repo.search_by_title(query, SEARCH_LIMIT).await?)
}

/// Picks a movie with a poster and a decent rating. The count and the fetch
/// are separate reads, so the pick is only roughly uniform.
pub async fn random_movie<R: MovieRepo + ?Sized>(repo: &R) -> Result<Movie, MovieError> {
    let count = repo.count_with_poster(RANDOM_MIN_RATING).await?;
    if count == 0 {
        return Err(MovieError::NotFound("No movies found".to_string()));
    }

    let offset = rand::thread_rng().gen_range(0..count);
    repo.with_poster_at(RANDOM_MIN_RATING, offset)
        .await?
        .ok_or_else(|| MovieError::NotFound("No movie found".to_string()))
}

pub async fn get_by_id<R: MovieRepo + ?Sized>(repo: &R, id: &str) -> Result<Movie, MovieError> {
    let id = ObjectId::parse(id).map_err(|e| MovieError::InvalidId(e.to_string()))?;

    repo.get_movie(&id).await.map_err(|e| match e {
        DbError::NotFound(_) => MovieError::NotFound("Movie not found".to_string()),
        e => MovieError::Store(e),
    })
}

/// First movie in the store plus its field names.
pub async fn sample_movie<R: MovieRepo + ?Sized>(
    repo: &R,
) -> Result<(Movie, Vec<String>), MovieError> {
    let movie = repo
        .first_movie()
        .await?
        .ok_or_else(|| MovieError::NotFound("No movies found in collection".to_string()))?;

    let fields = match serde_json::to_value(&movie) {
        Ok(serde_json::Value::Object(map)) => map.keys().cloned().collect(),
        _ => Vec::new(),
    };

    Ok((movie, fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{GenreTokenRepo, SqliteRepository};
    use crate::migrate::GenreMigrator;
    use tempfile::TempDir;

    fn movie(title: &str, genres: Option<&str>) -> Movie {
        Movie {
            id: ObjectId::new().to_hex(),
            title: title.to_string(),
            genres: genres.map(str::to_string),
            genres_tokens: None,
            poster_path: None,
            vote_average: None,
            attrs: Default::default(),
        }
    }

    fn rated(title: &str, poster: Option<&str>, rating: Option<f64>) -> Movie {
        let mut m = movie(title, None);
        m.poster_path = poster.map(str::to_string);
        m.vote_average = rating;
        m
    }

    async fn store(movies: &[Movie]) -> (TempDir, SqliteRepository) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movies.db");
        let repo = SqliteRepository::new(path.to_str().unwrap()).await.unwrap();
        if !movies.is_empty() {
            repo.insert_movies(movies).await.unwrap();
        }
        (dir, repo)
    }

    #[tokio::test]
    async fn test_home_feed_caps_at_twenty() {
        let movies: Vec<Movie> = (0..30)
            .map(|i| movie(&format!("Movie {}", i), Some("Drama")))
            .collect();
        let (_dir, repo) = store(&movies).await;
        GenreMigrator::new(&repo).run().await.unwrap();

        let feed = find_by_genre(&repo, None).await.unwrap();
        assert_eq!(feed.len(), 20);
        assert_eq!(feed[0].title, "Movie 0");
        assert_eq!(find_by_genre(&repo, Some("")).await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_genre_lookup() {
        let mut movies: Vec<Movie> = (0..60)
            .map(|i| movie(&format!("Drama {}", i), Some("Drama, Romance")))
            .collect();
        movies.push(movie("Heat", Some(" Crime ,Thriller")));
        let (_dir, repo) = store(&movies).await;
        GenreMigrator::new(&repo).run().await.unwrap();

        assert_eq!(find_by_genre(&repo, Some("Drama")).await.unwrap().len(), 50);
        let crime = find_by_genre(&repo, Some("Crime")).await.unwrap();
        assert_eq!(crime.len(), 1);
        assert_eq!(crime[0].title, "Heat");

        // Case sensitive and no query-side trimming.
        assert!(find_by_genre(&repo, Some("crime")).await.unwrap().is_empty());
        assert!(find_by_genre(&repo, Some(" Crime")).await.unwrap().is_empty());
        assert!(find_by_genre(&repo, Some("Western")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_genre_is_always_empty() {
        let movies = vec![
            movie("Mystery Box", Some("Unknown Genre")),
            movie("Other Box", Some("unknown genre")),
        ];
        let (_dir, repo) = store(&movies).await;
        GenreMigrator::new(&repo).run().await.unwrap();

        assert!(find_by_genre(&repo, Some("unknown genre")).await.unwrap().is_empty());
        assert!(find_by_genre(&repo, Some("Unknown Genre")).await.unwrap().is_empty());
        assert!(find_by_genre(&repo, Some("UNKNOWN GENRE")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_genre_lookup_needs_migration() {
        let (_dir, repo) = store(&[movie("Heat", Some("Crime"))]).await;
        assert!(find_by_genre(&repo, Some("Crime")).await.unwrap().is_empty());
        repo.create_genre_index().await.unwrap();
        GenreMigrator::new(&repo).run().await.unwrap();
        assert_eq!(find_by_genre(&repo, Some("Crime")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search() {
        let movies = vec![
            movie("Inception", None),
            movie("The Incredibles", None),
            movie("Heat", None),
        ];
        let (_dir, repo) = store(&movies).await;

        let found = search(&repo, Some("incep")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Inception");
        assert_eq!(search(&repo, Some("INC")).await.unwrap().len(), 2);
        assert!(search(&repo, Some(".*")).await.unwrap().is_empty());

        assert!(matches!(
            search(&repo, Some("")).await,
            Err(MovieError::MissingParameter(_))
        ));
        assert!(matches!(
            search(&repo, None).await,
            Err(MovieError::MissingParameter(_))
        ));
    }

    #[tokio::test]
    async fn test_search_non_ascii_titles() {
        let movies = vec![movie("AMÉLIE", None), movie("Ödipussi", None), movie("Heat", None)];
        let (_dir, repo) = store(&movies).await;

        let found = search(&repo, Some("amélie")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "AMÉLIE");
        let found = search(&repo, Some("ödipus")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Ödipussi");
    }

    #[tokio::test]
    async fn test_search_caps_at_hundred() {
        let movies: Vec<Movie> = (0..120).map(|i| movie(&format!("Saw {}", i), None)).collect();
        let (_dir, repo) = store(&movies).await;
        assert_eq!(search(&repo, Some("saw")).await.unwrap().len(), 100);
    }

    #[tokio::test]
    async fn test_random_single_eligible() {
        let movies = vec![
            rated("No Poster", None, Some(9.0)),
            rated("Low Rated", Some("/low.jpg"), Some(5.9)),
            rated("Unrated", Some("/unrated.jpg"), None),
            rated("The One", Some("/one.jpg"), Some(6.0)),
        ];
        let (_dir, repo) = store(&movies).await;
        for _ in 0..5 {
            let m = random_movie(&repo).await.unwrap();
            assert_eq!(m.title, "The One");
        }
    }

    #[tokio::test]
    async fn test_random_none_eligible() {
        let movies = vec![rated("No Poster", None, Some(9.0))];
        let (_dir, repo) = store(&movies).await;
        assert!(matches!(
            random_movie(&repo).await,
            Err(MovieError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_random_stays_in_eligible_set() {
        let movies: Vec<Movie> = (0..10)
            .map(|i| {
                let rating = if i % 2 == 0 { 7.5 } else { 3.0 };
                rated(&format!("M{}", i), Some("/p.jpg"), Some(rating))
            })
            .collect();
        let (_dir, repo) = store(&movies).await;
        for _ in 0..20 {
            let m = random_movie(&repo).await.unwrap();
            assert!(m.vote_average.unwrap() >= RANDOM_MIN_RATING);
        }
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let m = movie("Inception", Some("Action"));
        let (_dir, repo) = store(std::slice::from_ref(&m)).await;

        assert_eq!(get_by_id(&repo, &m.id).await.unwrap().title, "Inception");
        assert_eq!(
            get_by_id(&repo, &m.id.to_uppercase()).await.unwrap().id,
            m.id
        );
        match get_by_id(&repo, "not-an-id").await {
            Err(e @ MovieError::InvalidId(_)) => {
                assert_eq!(e.to_string(), "invalid object id: \"not-an-id\"");
                assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
            }
            other => panic!("expected InvalidId, got {:?}", other),
        }
        assert!(matches!(
            get_by_id(&repo, &ObjectId::new().to_hex()).await,
            Err(MovieError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sample_movie() {
        let (_dir, repo) = store(&[]).await;
        assert!(matches!(
            sample_movie(&repo).await,
            Err(MovieError::NotFound(_))
        ));

        let mut m = movie("Inception", Some("Action"));
        m.attrs.insert("runtime".to_string(), serde_json::json!(148));
        repo.insert_movies(std::slice::from_ref(&m)).await.unwrap();
        let (sample, fields) = sample_movie(&repo).await.unwrap();
        assert_eq!(sample.id, m.id);
        for f in ["_id", "title", "genres", "runtime"] {
            assert!(fields.iter().any(|k| k == f), "missing {}", f);
        }
        for f in ["genres_tokens", "poster_path", "vote_average"] {
            assert!(!fields.iter().any(|k| k == f), "unexpected {}", f);
        }
    }

    #[test]
    fn test_error_status() {
        assert_eq!(
            MovieError::MissingParameter("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            MovieError::InvalidId("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(MovieError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            MovieError::Store(DbError::NotFound("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
