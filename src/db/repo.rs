use async_trait::async_trait;

use super::model::*;
use crate::util::ObjectId;

#[async_trait]
pub trait MovieRepo: Send + Sync {
    async fn count_movies(&self) -> DbResult<i64>;
    /// First `limit` movies in natural (insertion) order.
    async fn list_movies(&self, limit: i64) -> DbResult<Vec<Movie>>;
    /// Movies whose `genres_tokens` contain exactly `token`, via the token index.
    async fn find_by_genre_token(&self, token: &str, limit: i64) -> DbResult<Vec<Movie>>;
    /// Case-insensitive literal substring match on the title.
    async fn search_by_title(&self, fragment: &str, limit: i64) -> DbResult<Vec<Movie>>;
    async fn count_with_poster(&self, min_vote_average: f64) -> DbResult<i64>;
    async fn with_poster_at(&self, min_vote_average: f64, offset: i64) -> DbResult<Option<Movie>>;
    async fn get_movie(&self, id: &ObjectId) -> DbResult<Movie>;
    async fn first_movie(&self) -> DbResult<Option<Movie>>;
    async fn insert_movies(&self, movies: &[Movie]) -> DbResult<u64>;
}

#[async_trait]
pub trait GenreTokenRepo: Send + Sync {
    /// Up to `limit` movies with rowid greater than `after_rowid`, in rowid order.
    async fn genre_batch(&self, after_rowid: i64, limit: i64) -> DbResult<Vec<GenreRow>>;
    /// Writes all token lists in one transaction, returns the number of rows updated.
    async fn store_genre_tokens(&self, updates: &[(String, Vec<String>)]) -> DbResult<u64>;
    /// Fails with `DbError::AlreadyExists` if the index is already there.
    async fn create_genre_index(&self) -> DbResult<()>;
}
