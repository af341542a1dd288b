use chrono::Utc;
use redb::{
    CommitError, Database, DatabaseError, ReadableTable, StorageError, TableDefinition, TableError,
    TransactionError,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RevocationError {
    #[error("Redb database error: {0}")]
    RedbDatabase(#[from] DatabaseError),
    #[error("Redb storage error: {0}")]
    RedbStorage(#[from] StorageError),
    #[error("Redb transaction error: {0}")]
    RedbTransaction(#[from] TransactionError),
    #[error("Redb table error: {0}")]
    RedbTable(#[from] TableError),
    #[error("Redb commit error: {0}")]
    RedbCommit(#[from] CommitError),
}

/// Token id (`jti`) -> unix expiry of the revoked token.
pub const REVOKED_TOKENS: TableDefinition<&str, i64> = TableDefinition::new("revoked_tokens");

/// Where logged-out token ids are remembered until they would have expired anyway.
pub trait RevocationStore: Send + Sync {
    fn revoke(&self, jti: &str, expires_at: i64) -> Result<(), RevocationError>;
    fn is_revoked(&self, jti: &str) -> Result<bool, RevocationError>;
    /// Drops entries whose tokens have expired. Returns how many were removed.
    fn purge_expired(&self) -> Result<usize, RevocationError>;
}

/// File-backed store. Revocations survive restarts and are shared by every
/// worker of the server holding the file open.
pub struct RedbRevocationStore {
    db: Database,
}

impl RedbRevocationStore {
    pub fn open(path: &Path) -> Result<Self, RevocationError> {
        let db = Database::create(path)?;
        let write_txn = db.begin_write()?;
        write_txn.open_table(REVOKED_TOKENS)?;
        write_txn.commit()?;
        Ok(RedbRevocationStore { db })
    }
}

impl RevocationStore for RedbRevocationStore {
    fn revoke(&self, jti: &str, expires_at: i64) -> Result<(), RevocationError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(REVOKED_TOKENS)?;
            table.insert(jti, expires_at)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn is_revoked(&self, jti: &str) -> Result<bool, RevocationError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REVOKED_TOKENS)?;
        let revoked = match table.get(jti)? {
            Some(expires_at) => expires_at.value() >= Utc::now().timestamp(),
            None => false,
        };
        Ok(revoked)
    }

    fn purge_expired(&self) -> Result<usize, RevocationError> {
        let now = Utc::now().timestamp();
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(REVOKED_TOKENS)?;
            let mut expired = Vec::new();
            for entry in table.iter()? {
                let (jti, expires_at) = entry?;
                if expires_at.value() < now {
                    expired.push(jti.value().to_string());
                }
            }
            for jti in &expired {
                table.remove(jti.as_str())?;
            }
            expired.len()
        };
        write_txn.commit()?;
        Ok(removed)
    }
}

/// Process-local store. Revocations are lost on restart and not shared
/// between instances.
#[derive(Default)]
pub struct InMemoryRevocationStore {
    entries: RwLock<HashMap<String, i64>>,
}

impl RevocationStore for InMemoryRevocationStore {
    fn revoke(&self, jti: &str, expires_at: i64) -> Result<(), RevocationError> {
        let mut entries = self.entries.write().unwrap_or_else(|poisoned| {
            log::error!("RwLock for revoked tokens was poisoned! Recovering lock.");
            poisoned.into_inner()
        });
        entries.insert(jti.to_string(), expires_at);
        Ok(())
    }

    fn is_revoked(&self, jti: &str) -> Result<bool, RevocationError> {
        let entries = self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries
            .get(jti)
            .map_or(false, |expires_at| *expires_at >= Utc::now().timestamp()))
    }

    fn purge_expired(&self) -> Result<usize, RevocationError> {
        let now = Utc::now().timestamp();
        let mut entries = self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at >= now);
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn RevocationStore) {
        let now = Utc::now().timestamp();
        assert!(!store.is_revoked("a").unwrap());

        store.revoke("a", now + 3600).unwrap();
        store.revoke("old", now - 10).unwrap();
        assert!(store.is_revoked("a").unwrap());
        // Past its expiry the token is rejected by signature validation anyway.
        assert!(!store.is_revoked("old").unwrap());

        assert_eq!(store.purge_expired().unwrap(), 1);
        assert!(store.is_revoked("a").unwrap());
        assert_eq!(store.purge_expired().unwrap(), 0);
    }

    #[test]
    fn in_memory_store_honours_expiry() {
        exercise(&InMemoryRevocationStore::default());
    }

    #[test]
    fn redb_store_honours_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbRevocationStore::open(&dir.path().join("revoked.redb")).unwrap();
        exercise(&store);
    }

    #[test]
    fn redb_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("revoked.redb");
        {
            let store = RedbRevocationStore::open(&path).unwrap();
            store.revoke("kept", Utc::now().timestamp() + 60).unwrap();
        }
        let reopened = RedbRevocationStore::open(&path).unwrap();
        assert!(reopened.is_revoked("kept").unwrap());
    }
}
