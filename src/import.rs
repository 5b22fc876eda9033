use std::io::BufRead;

use serde_json::{Map, Value};
use tracing::info;

use crate::db::{DbError, Movie, MovieRepo};
use crate::util::ObjectId;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Line {0}: {1}")]
    Parse(usize, String),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

/// Turns one exported document into a `Movie`. `_id` may be a plain hex
/// string or extended JSON `{"$oid": "..."}`; a missing one gets a new id.
pub fn parse_document(line: &str) -> Result<Movie, String> {
    let mut doc: Map<String, Value> = serde_json::from_str(line).map_err(|e| e.to_string())?;

    let id = match doc.remove("_id") {
        None | Some(Value::Null) => ObjectId::new(),
        Some(Value::String(s)) => ObjectId::parse(&s).map_err(|e| e.to_string())?,
        Some(Value::Object(mut o)) => match o.remove("$oid") {
            Some(Value::String(s)) => ObjectId::parse(&s).map_err(|e| e.to_string())?,
            _ => return Err("unsupported _id object".to_string()),
        },
        Some(other) => return Err(format!("unsupported _id: {}", other)),
    };

    doc.insert("_id".to_string(), Value::String(id.to_hex()));
    serde_json::from_value(Value::Object(doc)).map_err(|e| e.to_string())
}

/// Loads newline-delimited JSON documents into the store, `batch_size` per transaction.
pub async fn import_jsonl<R, B>(repo: &R, reader: B, batch_size: usize) -> Result<u64, ImportError>
where
    R: MovieRepo + ?Sized,
    B: BufRead,
{
    let batch_size = batch_size.max(1);
    let mut batch = Vec::with_capacity(batch_size);
    let mut imported = 0;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let movie = parse_document(&line).map_err(|e| ImportError::Parse(lineno + 1, e))?;
        batch.push(movie);

        if batch.len() >= batch_size {
            imported += repo.insert_movies(&batch).await?;
            batch.clear();
            info!("Imported {} movies", imported);
        }
    }

    if !batch.is_empty() {
        imported += repo.insert_movies(&batch).await?;
    }

    Ok(imported)
}
