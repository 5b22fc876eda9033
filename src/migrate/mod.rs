mod migrator;
mod tokenize;

pub use migrator::{run, GenreMigrator, MigrateError, MigrationReport};
pub use tokenize::tokenize_genres;
