//! Error type for `fieldtrack-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("geometry encoding error: {0}")]
  Geometry(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
