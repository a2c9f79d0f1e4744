//! [`SqliteStore`] — the SQLite implementation of [`TrackStore`] and
//! [`SurveyorStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use fieldtrack_core::{
  sample::{LocationSample, NewSample},
  store::{SurveyorStore, TrackStore},
  surveyor::Surveyor,
};

use crate::{
  Error, Result,
  encode::{RawSample, encode_dt, encode_geom},
  schema::SCHEMA,
};

fn surveyor_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Surveyor> {
  Ok(Surveyor {
    id:       row.get(0)?,
    name:     row.get(1)?,
    city:     row.get(2)?,
    project:  row.get(3)?,
    username: row.get(4)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A fieldtrack store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a sample query and decode every returned row.
  async fn query_samples(
    &self,
    sql: &'static str,
    params: Vec<String>,
  ) -> Result<Vec<LocationSample>> {
    let raw: Vec<RawSample> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(
          rusqlite::params_from_iter(params),
          RawSample::from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
      })
      .await?;

    raw.into_iter().map(RawSample::decode).collect()
  }
}

// ─── TrackStore ──────────────────────────────────────────────────────────────

impl TrackStore for SqliteStore {
  type Error = Error;

  async fn append(&self, sample: NewSample) -> Result<LocationSample> {
    let timestamp_str = encode_dt(sample.timestamp);
    let geom_str = sample.geom.as_ref().map(encode_geom).transpose()?;
    let insert = sample.clone();

    let sample_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO location_track
             (surveyor_id, latitude, longitude, timestamp, geom)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            insert.surveyor_id,
            insert.latitude,
            insert.longitude,
            timestamp_str,
            geom_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(LocationSample {
      sample_id,
      surveyor_id: sample.surveyor_id,
      latitude: sample.latitude,
      longitude: sample.longitude,
      timestamp: sample.timestamp,
      geom: sample.geom,
    })
  }

  async fn latest(&self, surveyor_id: &str) -> Result<Option<LocationSample>> {
    let id = surveyor_id.to_owned();
    let raw: Option<RawSample> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT sample_id, surveyor_id, latitude, longitude,
                      timestamp, geom
               FROM location_track
               WHERE surveyor_id = ?1
               ORDER BY timestamp DESC, sample_id DESC
               LIMIT 1",
              rusqlite::params![id],
              RawSample::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSample::decode).transpose()
  }

  async fn range(
    &self,
    surveyor_id: &str,
    start: chrono::DateTime<chrono::Utc>,
    end: chrono::DateTime<chrono::Utc>,
  ) -> Result<Vec<LocationSample>> {
    // Bounds are inclusive on both ends; RFC 3339 text compares in
    // timestamp order.
    self
      .query_samples(
        "SELECT sample_id, surveyor_id, latitude, longitude, timestamp, geom
         FROM location_track
         WHERE surveyor_id = ?1 AND timestamp >= ?2 AND timestamp <= ?3
         ORDER BY timestamp ASC, sample_id ASC",
        vec![surveyor_id.to_owned(), encode_dt(start), encode_dt(end)],
      )
      .await
  }

  async fn history(&self, surveyor_id: &str) -> Result<Vec<LocationSample>> {
    self
      .query_samples(
        "SELECT sample_id, surveyor_id, latitude, longitude, timestamp, geom
         FROM location_track
         WHERE surveyor_id = ?1
         ORDER BY timestamp ASC, sample_id ASC",
        vec![surveyor_id.to_owned()],
      )
      .await
  }
}

// ─── SurveyorStore ───────────────────────────────────────────────────────────

impl SurveyorStore for SqliteStore {
  type Error = Error;

  async fn upsert(
    &self,
    surveyor: Surveyor,
    password_hash: Option<String>,
  ) -> Result<Surveyor> {
    let stored = surveyor.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO surveyors
             (surveyor_id, name, city, project, username, password_hash)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT(surveyor_id) DO UPDATE SET
             name          = excluded.name,
             city          = excluded.city,
             project       = excluded.project,
             username      = excluded.username,
             password_hash =
               COALESCE(excluded.password_hash, surveyors.password_hash)",
          rusqlite::params![
            stored.id,
            stored.name,
            stored.city,
            stored.project,
            stored.username,
            password_hash,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(surveyor)
  }

  async fn get(&self, id: &str) -> Result<Option<Surveyor>> {
    let id = id.to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT surveyor_id, name, city, project, username
                 FROM surveyors WHERE surveyor_id = ?1",
                rusqlite::params![id],
                surveyor_from_row,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn list(&self) -> Result<Vec<Surveyor>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt = conn.prepare(
            "SELECT surveyor_id, name, city, project, username
             FROM surveyors ORDER BY surveyor_id",
          )?;
          let rows = stmt.query_map([], surveyor_from_row)?;
          Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await?,
    )
  }

  async fn filter(
    &self,
    city: Option<&str>,
    project: Option<&str>,
  ) -> Result<Vec<Surveyor>> {
    let city = city.map(str::to_owned);
    let project = project.map(str::to_owned);
    Ok(
      self
        .conn
        .call(move |conn| {
          let (sql, params): (&str, Vec<String>) = match (city, project) {
            (Some(c), Some(p)) => (
              "SELECT surveyor_id, name, city, project, username
               FROM surveyors WHERE city = ?1 AND project = ?2
               ORDER BY surveyor_id",
              vec![c, p],
            ),
            (Some(c), None) => (
              "SELECT surveyor_id, name, city, project, username
               FROM surveyors WHERE city = ?1 ORDER BY surveyor_id",
              vec![c],
            ),
            (None, Some(p)) => (
              "SELECT surveyor_id, name, city, project, username
               FROM surveyors WHERE project = ?1 ORDER BY surveyor_id",
              vec![p],
            ),
            (None, None) => (
              "SELECT surveyor_id, name, city, project, username
               FROM surveyors ORDER BY surveyor_id",
              Vec::new(),
            ),
          };
          let mut stmt = conn.prepare(sql)?;
          let rows =
            stmt.query_map(rusqlite::params_from_iter(params), surveyor_from_row)?;
          Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await?,
    )
  }

  async fn find_by_username(&self, username: &str) -> Result<Option<Surveyor>> {
    let username = username.to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT surveyor_id, name, city, project, username
                 FROM surveyors WHERE username = ?1",
                rusqlite::params![username],
                surveyor_from_row,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn username_taken(&self, username: &str) -> Result<bool> {
    let username = username.to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT 1 FROM surveyors WHERE username = ?1",
                rusqlite::params![username],
                |_| Ok(true),
              )
              .optional()?
              .unwrap_or(false),
          )
        })
        .await?,
    )
  }

  async fn credential_hash(&self, username: &str) -> Result<Option<String>> {
    let username = username.to_owned();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT password_hash FROM surveyors WHERE username = ?1",
                rusqlite::params![username],
                |row| row.get::<_, Option<String>>(0),
              )
              .optional()?
              .flatten(),
          )
        })
        .await?,
    )
  }
}
