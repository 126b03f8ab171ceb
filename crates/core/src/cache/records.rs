//! Durable snapshot records.
//!
//! Each query's latest snapshot is stored as a JSON body under its storage
//! key. Writes overwrite; nothing expires on its own.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::params;

use super::connection::RecordDb;
use super::tier::RecordStore;
use crate::{Error, model::Snapshot};

impl RecordDb {
    /// Get the raw JSON body stored under `key`.
    ///
    /// Returns None if the key doesn't exist.
    pub async fn get_body(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let mut stmt = conn.prepare("SELECT body FROM records WHERE key = ?1")?;

                match stmt.query_row(params![key], |row| row.get(0)) {
                    Ok(body) => Ok(Some(body)),
                    Err(tokio_rusqlite::rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace the raw JSON body stored under `key`.
    pub async fn put_body(&self, key: &str, body: &str) -> Result<(), Error> {
        let key = key.to_string();
        let body = body.to_string();
        let written_at = self.clock.now().to_rfc3339_opts(SecondsFormat::Micros, true);

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO records (key, body, written_at)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        body = excluded.body,
                        written_at = excluded.written_at",
                    params![key, body, written_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete records last written before `cutoff`, as measured by the
    /// store's clock.
    ///
    /// Returns the number of deleted records.
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let cutoff = cutoff.to_rfc3339_opts(SecondsFormat::Micros, true);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM records WHERE written_at < ?1", params![cutoff])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl RecordStore for RecordDb {
    async fn exists(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn
                    .query_row(
                        "SELECT EXISTS(SELECT 1 FROM records WHERE key = ?1)",
                        params![key],
                        |row| row.get(0),
                    )
                    .map_err(Error::from)?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    async fn read(&self, key: &str) -> Result<Option<Snapshot>, Error> {
        match self.get_body(key).await? {
            Some(body) => Snapshot::from_json(&body).map(Some),
            None => Ok(None),
        }
    }

    async fn write(&self, key: &str, snapshot: &Snapshot) -> Result<(), Error> {
        self.put_body(key, &snapshot.to_json()?).await
    }
}
