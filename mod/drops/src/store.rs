//! KV persistence for drops, waitlist entries, and claim records.
//!
//! Key layout:
//! - `drop/{id}`                     — Drop JSON
//! - `claim/{drop_id}/{user_id}`    — ClaimRecord JSON
//! - `waitlist/{drop_id}/{user_id}` — WaitlistEntry JSON
//!
//! The claim commit writes the decremented drop and the new claim record in
//! one `batch_set`, i.e. one redb transaction. Either both land or neither
//! does — an abandoned request can never strand a decrement without its
//! record, or the reverse.

use std::sync::Arc;

use dropspot_core::ServiceError;
use dropspot_kv::KVStore;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::model::{ClaimRecord, Drop, WaitlistEntry};

pub struct DropStore {
    kv: Arc<dyn KVStore>,
}

fn drop_key(id: &str) -> String {
    format!("drop/{}", id)
}

fn claim_key(drop_id: &str, user_id: &str) -> String {
    format!("claim/{}/{}", drop_id, user_id)
}

fn waitlist_key(drop_id: &str, user_id: &str) -> String {
    format!("waitlist/{}/{}", drop_id, user_id)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ServiceError> {
    serde_json::to_vec(value).map_err(|e| ServiceError::Internal(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ServiceError> {
    serde_json::from_slice(bytes).map_err(|e| ServiceError::Storage(e.to_string()))
}

impl DropStore {
    pub fn new(kv: Arc<dyn KVStore>) -> Self {
        Self { kv }
    }

    // ── Drops ───────────────────────────────────────────────────────

    pub fn get_drop(&self, id: &str) -> Result<Option<Drop>, ServiceError> {
        match self
            .kv
            .get(&drop_key(id))
            .map_err(|e| ServiceError::Storage(e.to_string()))?
        {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Get a drop, or NotFound.
    pub fn get_drop_or_err(&self, id: &str) -> Result<Drop, ServiceError> {
        self.get_drop(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("drop '{}' not found", id)))
    }

    pub fn put_drop(&self, drop: &Drop) -> Result<(), ServiceError> {
        self.kv
            .set(&drop_key(&drop.id), &encode(drop)?)
            .map_err(|e| ServiceError::Storage(e.to_string()))
    }

    pub fn list_drops(&self) -> Result<Vec<Drop>, ServiceError> {
        let rows = self
            .kv
            .scan("drop/")
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        rows.iter().map(|(_, v)| decode(v)).collect()
    }

    /// Delete a drop together with all of its claim records and waitlist
    /// entries, in one transaction (cascade policy).
    pub fn delete_drop_cascade(&self, id: &str) -> Result<(), ServiceError> {
        let mut keys = vec![drop_key(id)];
        for prefix in [format!("claim/{}/", id), format!("waitlist/{}/", id)] {
            let rows = self
                .kv
                .scan(&prefix)
                .map_err(|e| ServiceError::Storage(e.to_string()))?;
            keys.extend(rows.into_iter().map(|(k, _)| k));
        }
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.kv
            .batch_delete(&refs)
            .map_err(|e| ServiceError::Storage(e.to_string()))
    }

    // ── Claims ──────────────────────────────────────────────────────

    pub fn get_claim(&self, drop_id: &str, user_id: &str) -> Result<Option<ClaimRecord>, ServiceError> {
        match self
            .kv
            .get(&claim_key(drop_id, user_id))
            .map_err(|e| ServiceError::Storage(e.to_string()))?
        {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Commit a successful claim: the decremented drop and the new claim
    /// record land in a single write transaction.
    pub fn commit_claim(&self, drop: &Drop, claim: &ClaimRecord) -> Result<(), ServiceError> {
        let dk = drop_key(&drop.id);
        let ck = claim_key(&claim.drop_id, &claim.user_id);
        let dv = encode(drop)?;
        let cv = encode(claim)?;
        self.kv
            .batch_set(&[(dk.as_str(), dv.as_slice()), (ck.as_str(), cv.as_slice())])
            .map_err(|e| ServiceError::Storage(e.to_string()))
    }

    pub fn list_claims(&self, drop_id: &str) -> Result<Vec<ClaimRecord>, ServiceError> {
        let rows = self
            .kv
            .scan(&format!("claim/{}/", drop_id))
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        rows.iter().map(|(_, v)| decode(v)).collect()
    }

    // ── Waitlist ────────────────────────────────────────────────────

    pub fn get_waitlist_entry(
        &self,
        drop_id: &str,
        user_id: &str,
    ) -> Result<Option<WaitlistEntry>, ServiceError> {
        match self
            .kv
            .get(&waitlist_key(drop_id, user_id))
            .map_err(|e| ServiceError::Storage(e.to_string()))?
        {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_waitlist_entry(&self, entry: &WaitlistEntry) -> Result<(), ServiceError> {
        self.kv
            .set(&waitlist_key(&entry.drop_id, &entry.user_id), &encode(entry)?)
            .map_err(|e| ServiceError::Storage(e.to_string()))
    }

    pub fn delete_waitlist_entry(&self, drop_id: &str, user_id: &str) -> Result<(), ServiceError> {
        self.kv
            .delete(&waitlist_key(drop_id, user_id))
            .map_err(|e| ServiceError::Storage(e.to_string()))
    }

    pub fn list_waitlist(&self, drop_id: &str) -> Result<Vec<WaitlistEntry>, ServiceError> {
        let rows = self
            .kv
            .scan(&format!("waitlist/{}/", drop_id))
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        rows.iter().map(|(_, v)| decode(v)).collect()
    }
}
