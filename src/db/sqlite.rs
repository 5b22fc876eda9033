use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::types::Json;
use tracing::{debug, info};

use super::model::*;
use super::repo::*;
use crate::util::ObjectId;

const MOVIE_COLUMNS: &str =
    "id, title, genres, genres_tokens, poster_path, vote_average, attrs";

const GENRE_INDEX: &str = "idx_movie_genre_tokens_token";

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Opens the database, creating the file and schema if needed.
    pub async fn new(db_path: &str) -> DbResult<Self> {
        Self::open(db_path, true).await
    }

    /// Opens a database that must already exist.
    pub async fn open_existing(db_path: &str) -> DbResult<Self> {
        if !Path::new(db_path).exists() {
            return Err(DbError::NotFound(format!("Database file not found: {}", db_path)));
        }
        Self::open(db_path, false).await
    }

    async fn open(db_path: &str, create: bool) -> DbResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(create);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let repo = Self { pool };

        repo.init_schema().await?;

        info!("Database initialized at {}", db_path);

        Ok(repo)
    }

    async fn init_schema(&self) -> DbResult<()> {
        let schema = include_str!("schema.sql");
        sqlx::raw_sql(schema).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn genre_index_exists(&self) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?",
        )
        .bind(GENRE_INDEX)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn fetch_movies(&self, sql: &str, binds: &[&str], limit: i64) -> DbResult<Vec<Movie>> {
        let mut query = sqlx::query_as::<_, MovieRow>(sql);
        for b in binds {
            query = query.bind(*b);
        }
        let rows = query.bind(limit).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Movie::from).collect())
    }
}

/// Case folding used for `title_folded` and for search input alike.
fn fold_title(title: &str) -> String {
    title.to_lowercase()
}

#[async_trait]
impl MovieRepo for SqliteRepository {
    async fn count_movies(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movies")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_movies(&self, limit: i64) -> DbResult<Vec<Movie>> {
        let sql = format!("SELECT {} FROM movies ORDER BY rowid LIMIT ?", MOVIE_COLUMNS);
        self.fetch_movies(&sql, &[], limit).await
    }

    async fn find_by_genre_token(&self, token: &str, limit: i64) -> DbResult<Vec<Movie>> {
        let sql = format!(
            "SELECT {} FROM movies
             WHERE id IN (SELECT movie_id FROM movie_genre_tokens WHERE token = ?)
             ORDER BY rowid LIMIT ?",
            MOVIE_COLUMNS
        );
        self.fetch_movies(&sql, &[token], limit).await
    }

    async fn search_by_title(&self, fragment: &str, limit: i64) -> DbResult<Vec<Movie>> {
        let sql = format!(
            "SELECT {} FROM movies WHERE instr(title_folded, ?) > 0 ORDER BY rowid LIMIT ?",
            MOVIE_COLUMNS
        );
        let folded = fold_title(fragment);
        self.fetch_movies(&sql, &[folded.as_str()], limit).await
    }

    async fn count_with_poster(&self, min_vote_average: f64) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM movies WHERE poster_path IS NOT NULL AND vote_average >= ?",
        )
        .bind(min_vote_average)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn with_poster_at(&self, min_vote_average: f64, offset: i64) -> DbResult<Option<Movie>> {
        let sql = format!(
            "SELECT {} FROM movies
             WHERE poster_path IS NOT NULL AND vote_average >= ?
             ORDER BY rowid LIMIT 1 OFFSET ?",
            MOVIE_COLUMNS
        );
        let row = sqlx::query_as::<_, MovieRow>(&sql)
            .bind(min_vote_average)
            .bind(offset)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Movie::from))
    }

    async fn get_movie(&self, id: &ObjectId) -> DbResult<Movie> {
        let sql = format!("SELECT {} FROM movies WHERE id = ?", MOVIE_COLUMNS);
        sqlx::query_as::<_, MovieRow>(&sql)
            .bind(id.to_hex())
            .fetch_one(&self.pool)
            .await
            .map(Movie::from)
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => DbError::NotFound(format!("Movie not found: {}", id)),
                _ => DbError::Sqlx(e),
            })
    }

    async fn first_movie(&self) -> DbResult<Option<Movie>> {
        let sql = format!("SELECT {} FROM movies ORDER BY rowid LIMIT 1", MOVIE_COLUMNS);
        let row = sqlx::query_as::<_, MovieRow>(&sql)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Movie::from))
    }

    async fn insert_movies(&self, movies: &[Movie]) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for movie in movies {
            let result = sqlx::query(
                "INSERT INTO movies (id, title, title_folded, genres, genres_tokens, poster_path, vote_average, attrs)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&movie.id)
            .bind(&movie.title)
            .bind(fold_title(&movie.title))
            .bind(&movie.genres)
            .bind(movie.genres_tokens.as_ref().map(Json))
            .bind(&movie.poster_path)
            .bind(movie.vote_average)
            .bind(Json(&movie.attrs))
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    DbError::AlreadyExists(format!("Movie already exists: {}", movie.id))
                }
                _ => DbError::Sqlx(e),
            })?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }
}

#[async_trait]
impl GenreTokenRepo for SqliteRepository {
    async fn genre_batch(&self, after_rowid: i64, limit: i64) -> DbResult<Vec<GenreRow>> {
        let rows = sqlx::query_as::<_, GenreRow>(
            "SELECT rowid, id, genres, genres_tokens FROM movies
             WHERE rowid > ? ORDER BY rowid LIMIT ?",
        )
        .bind(after_rowid)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn store_genre_tokens(&self, updates: &[(String, Vec<String>)]) -> DbResult<u64> {
        if updates.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        let mut modified = 0;
        for (id, tokens) in updates {
            let result = sqlx::query("UPDATE movies SET genres_tokens = ? WHERE id = ?")
                .bind(Json(tokens))
                .bind(id)
                .execute(&mut *tx)
                .await?;
            modified += result.rows_affected();
        }
        tx.commit().await?;
        debug!("Stored genre tokens for {} movies", modified);
        Ok(modified)
    }

    async fn create_genre_index(&self) -> DbResult<()> {
        let sql = format!("CREATE INDEX {} ON movie_genre_tokens (token)", GENRE_INDEX);
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.message().contains("already exists") => {
                    DbError::AlreadyExists(format!("Index already exists: {}", GENRE_INDEX))
                }
                _ => DbError::Sqlx(e),
            })?;
        Ok(())
    }
}
