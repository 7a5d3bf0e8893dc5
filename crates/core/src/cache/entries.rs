//! Generation and entry operations backing [`CacheStore`] for [`CacheDb`].

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::store::{CacheStore, Generation, StoredResponse};
use crate::Error;

#[async_trait]
impl CacheStore for CacheDb {
    async fn lookup(&self, generation: &Generation, key: &str) -> Result<Option<StoredResponse>, Error> {
        let generation = generation.name().to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, headers_json, body FROM entries WHERE generation = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![generation, key], |row| {
                    let headers_json: String = row.get(2)?;
                    let body: Vec<u8> = row.get(3)?;
                    Ok(StoredResponse {
                        url: row.get(0)?,
                        status: row.get(1)?,
                        headers: serde_json::from_str(&headers_json).map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
                        })?,
                        body: Bytes::from(body),
                    })
                });

                match result {
                    Ok(response) => Ok(Some(response)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn write(&self, generation: &Generation, key: &str, response: &StoredResponse) -> Result<(), Error> {
        let generation = generation.name().to_string();
        let key = key.to_string();
        let response = response.clone();
        let headers_json = serde_json::to_string(&response.headers).unwrap_or_else(|_| "[]".to_string());
        let now = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![generation, now],
                )?;
                tx.execute(
                    "INSERT INTO entries (generation, key, url, status, headers_json, body, stored_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    ON CONFLICT(generation, key) DO UPDATE SET
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![generation, key, response.url, response.status, headers_json, response.body.as_ref(), now],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn remove(&self, generation: &Generation, key: &str) -> Result<bool, Error> {
        let generation = generation.name().to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count =
                    conn.execute("DELETE FROM entries WHERE generation = ?1 AND key = ?2", params![generation, key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn list_keys(&self, generation: &Generation) -> Result<Vec<String>, Error> {
        let generation = generation.name().to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT key FROM entries WHERE generation = ?1 ORDER BY key")?;
                let keys = stmt
                    .query_map(params![generation], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    async fn list_generations(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
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
