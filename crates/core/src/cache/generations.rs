//! Cache generation bookkeeping.
//!
//! A generation is a named scope of cached entries. Dropping a generation
//! drops every entry in it (`ON DELETE CASCADE`).

use std::fmt;
use std::str::FromStr;

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// What a generation holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CachePurpose {
    /// Precached critical assets and revalidated static files.
    Static,
    /// Runtime responses: pages, API reads.
    Dynamic,
}

impl CachePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            CachePurpose::Static => "static",
            CachePurpose::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for CachePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CachePurpose {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(CachePurpose::Static),
            "dynamic" => Ok(CachePurpose::Dynamic),
            other => Err(Error::InvalidInput(format!("unknown cache purpose: {other}"))),
        }
    }
}

/// A stored generation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheGeneration {
    pub name: String,
    pub purpose: CachePurpose,
    pub created_at_install: bool,
    pub created_at: String,
}

impl CacheDb {
    /// Create a generation if it does not exist yet.
    ///
    /// Opening an existing generation leaves its record untouched.
    pub async fn open_generation(
        &self, name: &str, purpose: CachePurpose, created_at_install: bool,
    ) -> Result<(), Error> {
        let name = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO generations (name, purpose, created_at_install, created_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(name) DO NOTHING",
                    params![name, purpose.as_str(), created_at_install as i32, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// List every generation, oldest first.
    pub async fn list_generations(&self) -> Result<Vec<CacheGeneration>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<CacheGeneration>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT name, purpose, created_at_install, created_at
                    FROM generations ORDER BY created_at ASC, name ASC",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, i32>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                rows.into_iter()
                    .map(|(name, purpose, created_at_install, created_at)| {
                        Ok(CacheGeneration {
                            name,
                            purpose: purpose.parse()?,
                            created_at_install: created_at_install == 1,
                            created_at,
                        })
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }

    /// Drop a generation and all of its entries.
    ///
    /// Returns false if no such generation existed.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}
