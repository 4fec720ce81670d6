//! Cached response CRUD within a generation.

use std::collections::BTreeMap;

use super::connection::CacheDb;
use super::hash::{canonical_url, compute_cache_key};
use crate::Error;
use crate::http::{AgentRequest, AgentResponse, Method};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored request identity, as returned by key listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheKey {
    pub hash: String,
    pub method: String,
    pub url: String,
    pub stored_at: String,
}

/// A row ready to be written.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl EntryRow {
    fn new(request: &AgentRequest, response: &AgentResponse) -> Result<Self, Error> {
        Ok(Self {
            key_hash: compute_cache_key(request.method, &request.url),
            method: request.method.to_string(),
            url: canonical_url(&request.url),
            status: response.status,
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.to_vec(),
            stored_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        })
    }
}

fn insert_row(conn: &rusqlite::Connection, generation: &str, row: &EntryRow) -> Result<(), Error> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM generations WHERE name = ?1)",
        params![generation],
        |r| r.get(0),
    )?;
    if !exists {
        return Err(Error::UnknownGeneration(generation.to_string()));
    }

    conn.execute(
        "INSERT INTO entries (generation, key_hash, method, url, status, headers_json, body, stored_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(generation, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            generation,
            &row.key_hash,
            &row.method,
            &row.url,
            row.status,
            &row.headers_json,
            &row.body,
            &row.stored_at,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Look up the stored response for a request.
    ///
    /// Returns None if the generation has no entry for it.
    pub async fn match_entry(
        &self, generation: &str, method: Method, url: &url::Url,
    ) -> Result<Option<AgentResponse>, Error> {
        let generation = generation.to_string();
        let key_hash = compute_cache_key(method, url);
        self.conn
            .call(move |conn| -> Result<Option<AgentResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, headers_json, body, stored_at
                    FROM entries WHERE generation = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![generation, key_hash], |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                });

                let (status, headers_json, body, stored_at) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let headers: BTreeMap<String, String> = serde_json::from_str(&headers_json)?;
                let stored_at = DateTime::parse_from_rfc3339(&stored_at)
                    .ok()
                    .map(|t| t.with_timezone(&Utc));

                Ok(Some(AgentResponse { status, headers, body: body.into(), stored_at }))
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace the entry for a request.
    ///
    /// A single statement, so a concurrent reader sees either the old or the
    /// new entry. Last write wins.
    pub async fn put_entry(
        &self, generation: &str, request: &AgentRequest, response: &AgentResponse,
    ) -> Result<(), Error> {
        let generation = generation.to_string();
        let row = EntryRow::new(request, response)?;
        self.conn
            .call(move |conn| -> Result<(), Error> { insert_row(conn, &generation, &row) })
            .await
            .map_err(Error::from)
    }

    /// Store several entries in one transaction: all of them or none.
    pub async fn put_entries(
        &self, generation: &str, entries: &[(AgentRequest, AgentResponse)],
    ) -> Result<(), Error> {
        let generation = generation.to_string();
        let rows = entries
            .iter()
            .map(|(request, response)| EntryRow::new(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for row in &rows {
                    insert_row(&tx, &generation, row)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the entry for a request.
    ///
    /// Returns false if there was nothing to delete.
    pub async fn delete_entry(&self, generation: &str, method: Method, url: &url::Url) -> Result<bool, Error> {
        let generation = generation.to_string();
        let key_hash = compute_cache_key(method, url);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE generation = ?1 AND key_hash = ?2",
                    params![generation, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// List the keys stored in a generation, oldest first.
    pub async fn entry_keys(&self, generation: &str) -> Result<Vec<CacheKey>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<CacheKey>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key_hash, method, url, stored_at FROM entries
                    WHERE generation = ?1 ORDER BY stored_at ASC, rowid ASC",
                )?;
                let keys = stmt
                    .query_map(params![generation], |row| {
                        Ok(CacheKey { hash: row.get(0)?, method: row.get(1)?, url: row.get(2)?, stored_at: row.get(3)? })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Purge oldest entries until the generation holds at most `max_entries`.
    ///
    /// Returns the number of deleted entries.
    pub async fn trim_generation(&self, generation: &str, max_entries: usize) -> Result<u64, Error> {
        let generation = generation.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE rowid IN (
                    SELECT rowid FROM entries WHERE generation = ?1
                    ORDER BY stored_at ASC, rowid ASC LIMIT ?2
                )",
                    params![generation, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry in a generation, keeping the generation itself.
    ///
    /// Returns the number of deleted entries.
    pub async fn clear_generation(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries WHERE generation = ?1", params![generation])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
