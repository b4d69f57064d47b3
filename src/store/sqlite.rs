//! SQLite-backed membership store
//!
//! One row per whitelisted identity, primary key `(realm_id, identity_key)`.
//! Schema is created on open. Queries are built at runtime so the crate does
//! not need a live database at compile time.

use super::traits::*;
use crate::whitelist::{IdentityKey, RealmId, WhitelistRecord};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

const MAX_CONNECTIONS: u32 = 4;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS whitelist (
    realm_id     TEXT    NOT NULL,
    identity_key TEXT    NOT NULL,
    granted_by   TEXT    NOT NULL,
    granted_at   INTEGER NOT NULL,
    PRIMARY KEY (realm_id, identity_key)
)";

#[derive(Clone)]
pub struct SqliteMembershipStore {
    pool: SqlitePool,
}

impl SqliteMembershipStore {
    /// Open (creating if missing) the database file at `path`.
    pub async fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Unavailable(format!(
                        "cannot create store directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA).execute(&pool).await?;
        info!(path = %path.display(), "whitelist store opened");

        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[async_trait]
impl MembershipStore for SqliteMembershipStore {
    async fn load_all(&self, realm: &RealmId) -> StoreResult<Vec<WhitelistRecord>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT identity_key, granted_by FROM whitelist \
             WHERE realm_id = ? ORDER BY identity_key",
        )
        .bind(realm.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(identity_key, granted_by)| {
                let key = IdentityKey::parse(&identity_key).map_err(|e| {
                    StoreError::Corrupt(format!("identity key {:?}: {}", identity_key, e))
                })?;
                Ok(WhitelistRecord::new(realm.clone(), key, granted_by))
            })
            .collect()
    }

    async fn insert_record(&self, record: &WhitelistRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO whitelist (realm_id, identity_key, granted_by, granted_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(record.realm_id.as_str())
        .bind(record.identity_key.as_str())
        .bind(&record.granted_by)
        .bind(unix_now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_record(&self, realm: &RealmId, key: &IdentityKey) -> StoreResult<()> {
        sqlx::query("DELETE FROM whitelist WHERE realm_id = ? AND identity_key = ?")
            .bind(realm.as_str())
            .bind(key.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count(&self, realm: &RealmId) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM whitelist WHERE realm_id = ?")
            .bind(realm.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(realm: &str, key: &str) -> WhitelistRecord {
        WhitelistRecord::new(
            RealmId::new(realm),
            IdentityKey::parse(key).unwrap(),
            "admin-1",
        )
    }

    #[tokio::test]
    async fn test_insert_load_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteMembershipStore::open(&temp_dir.path().join("whitelist.db"))
            .await
            .unwrap();
        let realm = RealmId::new("1");

        store.insert_record(&record("1", "abc")).await.unwrap();
        store.insert_record(&record("1", "def")).await.unwrap();
        store.insert_record(&record("2", "abc")).await.unwrap();

        let loaded = store.load_all(&realm).await.unwrap();
        assert_eq!(loaded, vec![record("1", "abc"), record("1", "def")]);
        assert_eq!(loaded[0].granted_by, "admin-1");

        store
            .delete_record(&realm, &IdentityKey::parse("abc").unwrap())
            .await
            .unwrap();
        assert_eq!(store.count(&realm).await.unwrap(), 1);
        assert_eq!(store.count(&RealmId::new("2")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_and_absent_delete_are_tolerated() {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteMembershipStore::open(&temp_dir.path().join("whitelist.db"))
            .await
            .unwrap();
        let realm = RealmId::new("1");

        store.insert_record(&record("1", "abc")).await.unwrap();
        store.insert_record(&record("1", "abc")).await.unwrap();
        assert_eq!(store.count(&realm).await.unwrap(), 1);

        let ghost = IdentityKey::parse("ghost").unwrap();
        store.delete_record(&realm, &ghost).await.unwrap();
        assert_eq!(store.count(&realm).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("whitelist.db");

        let store = SqliteMembershipStore::open(&path).await.unwrap();
        store.insert_record(&record("1", "abc")).await.unwrap();
        store.close().await;

        let reopened = SqliteMembershipStore::open(&path).await.unwrap();
        let loaded = reopened.load_all(&RealmId::new("1")).await.unwrap();
        assert_eq!(loaded, vec![record("1", "abc")]);
    }
}
