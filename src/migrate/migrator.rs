use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use super::tokenize::tokenize_genres;
use crate::db::{DbError, GenreTokenRepo, SqliteRepository};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Documents looked at.
    pub matched_count: u64,
    /// Documents whose stored `genres_tokens` actually changed.
    pub modified_count: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[source] DbError),
    #[error("Migration failed: {0}")]
    Store(#[from] DbError),
}

/// Derives `genres_tokens` from `genres` for every movie and builds the
/// token index. Safe to run any number of times.
pub struct GenreMigrator<'a, R: GenreTokenRepo + ?Sized> {
    repo: &'a R,
    batch_size: i64,
}

impl<'a, R: GenreTokenRepo + ?Sized> GenreMigrator<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self {
            repo,
            batch_size: 1000,
        }
    }

    pub fn batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = i64::from(batch_size.max(1));
        self
    }

    pub async fn run(&self) -> Result<MigrationReport, MigrateError> {
        let started = Instant::now();
        let report = self.tokenize_all().await?;
        info!(
            matched = report.matched_count,
            modified = report.modified_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "add-genres_tokens"
        );

        let started = Instant::now();
        match self.repo.create_genre_index().await {
            Ok(()) => info!("Index created on genres_tokens"),
            Err(DbError::AlreadyExists(_)) => info!("Index on genres_tokens already present"),
            Err(e) => return Err(e.into()),
        }
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "create-index");

        Ok(report)
    }

    async fn tokenize_all(&self) -> Result<MigrationReport, MigrateError> {
        let mut report = MigrationReport::default();
        let mut after_rowid = i64::MIN;

        loop {
            let batch = self.repo.genre_batch(after_rowid, self.batch_size).await?;
            let Some(last) = batch.last() else {
                break;
            };
            after_rowid = last.rowid;
            report.matched_count += batch.len() as u64;

            // Only rows whose derived tokens differ from what is stored get written.
            let updates: Vec<(String, Vec<String>)> = batch
                .into_iter()
                .filter_map(|row| {
                    let tokens = tokenize_genres(row.genres.as_deref());
                    let current = row.genres_tokens.map(|t| t.0);
                    if current.as_ref() == Some(&tokens) {
                        None
                    } else {
                        Some((row.id, tokens))
                    }
                })
                .collect();

            report.modified_count += self.repo.store_genre_tokens(&updates).await?;
            debug!(after_rowid, updated = updates.len(), "Migrated batch");
        }

        Ok(report)
    }
}

/// Opens the store at `db_path`, migrates it and closes it again.
pub async fn run(db_path: &str, batch_size: u32) -> Result<MigrationReport, MigrateError> {
    let repo = SqliteRepository::open_existing(db_path)
        .await
        .map_err(MigrateError::StoreUnavailable)?;

    let result = GenreMigrator::new(&repo).batch_size(batch_size).run().await;
    repo.close().await;
    result
}
