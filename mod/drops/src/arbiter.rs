//! The claim arbiter — the authority for drop availability and claim
//! coordination.
//!
//! This is a **state machine over the store**, not a transport. It:
//! - Derives drop status from the claim window at every decision point.
//! - Serializes stock-touching operations (`claim`, `update`, `delete`)
//!   through a per-drop async mutex, so operations on different drops never
//!   contend while same-drop operations are linearizable.
//! - Commits a stock decrement and its claim record in one KV transaction.
//!
//! Lock acquisition is bounded: a caller that cannot take the per-drop lock
//! within `lock_wait` fails with a retryable `Busy` instead of queueing
//! unboundedly behind a hot drop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use dropspot_core::{new_id, now_rfc3339, ServiceError};

use crate::model::{ClaimRecord, Drop, DropCreate, DropStatus, DropUpdate, WaitlistEntry};
use crate::store::DropStore;

/// Arbiter tuning knobs.
#[derive(Debug, Clone)]
pub struct ArbiterConfig {
    /// Maximum time to wait for a drop's serialization lock before failing
    /// with `Busy`.
    pub lock_wait: Duration,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            lock_wait: Duration::from_secs(2),
        }
    }
}

pub struct DropArbiter {
    store: Arc<DropStore>,
    /// Per-drop serialization points, created lazily on first use.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    config: ArbiterConfig,
}

impl DropArbiter {
    pub fn new(store: Arc<DropStore>) -> Self {
        Self::with_config(store, ArbiterConfig::default())
    }

    pub fn with_config(store: Arc<DropStore>, config: ArbiterConfig) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &Arc<DropStore> {
        &self.store
    }

    async fn lock_handle(&self, drop_id: &str) -> Arc<Mutex<()>> {
        let mut map = self.locks.lock().await;
        map.entry(drop_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Take the per-drop lock with a bounded wait.
    async fn acquire(&self, drop_id: &str) -> Result<OwnedMutexGuard<()>, ServiceError> {
        let handle = self.lock_handle(drop_id).await;
        tokio::time::timeout(self.config.lock_wait, handle.lock_owned())
            .await
            .map_err(|_| {
                ServiceError::Busy(format!(
                    "drop '{}' is busy, retry shortly",
                    drop_id
                ))
            })
    }

    // =======================================================================
    // Reads
    // =======================================================================

    pub fn list(&self) -> Result<Vec<Drop>, ServiceError> {
        self.store.list_drops()
    }

    pub fn get(&self, drop_id: &str) -> Result<Drop, ServiceError> {
        self.store.get_drop_or_err(drop_id)
    }

    pub fn claims(&self, drop_id: &str) -> Result<Vec<ClaimRecord>, ServiceError> {
        self.store.list_claims(drop_id)
    }

    pub fn waitlist(&self, drop_id: &str) -> Result<Vec<WaitlistEntry>, ServiceError> {
        self.store.list_waitlist(drop_id)
    }

    // =======================================================================
    // Administrative CRUD
    // =======================================================================

    /// Create a new drop. The id is server-assigned.
    pub fn create(&self, input: DropCreate) -> Result<Drop, ServiceError> {
        validate_title(&input.title)?;
        validate_window(input.claim_window_start, input.claim_window_end)?;

        let now = now_rfc3339();
        let drop = Drop {
            id: new_id(),
            title: input.title,
            description: input.description,
            stock: input.stock,
            claim_window_start: input.claim_window_start,
            claim_window_end: input.claim_window_end,
            created_at: now.clone(),
            updated_at: now,
        };
        self.store.put_drop(&drop)?;
        info!(drop_id = %drop.id, stock = drop.stock, "drop created");
        Ok(drop)
    }

    /// Apply an administrative edit. Provided fields replace the current
    /// values; `stock` is an absolute target, never a relative decrement.
    ///
    /// Serializes through the same per-drop lock as `claim`, so an edit
    /// racing an in-flight claim resolves by commit order — the edit can
    /// never silently overwrite a decrement.
    pub async fn update(&self, drop_id: &str, patch: DropUpdate) -> Result<Drop, ServiceError> {
        let _guard = self.acquire(drop_id).await?;

        let mut drop = self.store.get_drop_or_err(drop_id)?;
        if let Some(title) = patch.title {
            validate_title(&title)?;
            drop.title = title;
        }
        if let Some(description) = patch.description {
            drop.description = description;
        }
        if let Some(stock) = patch.stock {
            drop.stock = stock;
        }
        if let Some(start) = patch.claim_window_start {
            drop.claim_window_start = start;
        }
        if let Some(end) = patch.claim_window_end {
            drop.claim_window_end = end;
        }
        validate_window(drop.claim_window_start, drop.claim_window_end)?;

        drop.updated_at = now_rfc3339();
        self.store.put_drop(&drop)?;
        info!(drop_id = %drop.id, "drop updated");
        Ok(drop)
    }

    /// Delete a drop. Cascades: waitlist entries and claim records are
    /// removed in the same transaction.
    pub async fn delete(&self, drop_id: &str) -> Result<Drop, ServiceError> {
        let _guard = self.acquire(drop_id).await?;

        let drop = self.store.get_drop_or_err(drop_id)?;
        self.store.delete_drop_cascade(drop_id)?;
        // The drop is gone; reap its serialization point so the lock map
        // does not grow without bound. In-flight holders of the old handle
        // re-read the store and observe NotFound.
        self.locks.lock().await.remove(drop_id);
        info!(drop_id = %drop_id, "drop deleted (cascade)");
        Ok(drop)
    }

    // =======================================================================
    // User-facing operations
    // =======================================================================

    /// Join a drop's waitlist. Idempotent: re-joining is a no-op success.
    /// Returns true when a new membership was created.
    ///
    /// Waitlist writes never touch stock, so they skip the per-drop lock.
    pub fn join(&self, drop_id: &str, user_id: &str) -> Result<bool, ServiceError> {
        let drop = self.store.get_drop_or_err(drop_id)?;
        if drop.status_at(Utc::now()).is_closed() {
            return Err(ServiceError::WindowClosed(format!(
                "drop '{}' has closed",
                drop_id
            )));
        }

        if self.store.get_waitlist_entry(drop_id, user_id)?.is_some() {
            return Ok(false);
        }
        self.store.put_waitlist_entry(&WaitlistEntry {
            drop_id: drop_id.to_string(),
            user_id: user_id.to_string(),
            created_at: now_rfc3339(),
        })?;
        debug!(drop_id = %drop_id, user_id = %user_id, "joined waitlist");
        Ok(true)
    }

    /// Leave a drop's waitlist. Idempotent. Returns true when a membership
    /// was actually removed.
    pub fn leave(&self, drop_id: &str, user_id: &str) -> Result<bool, ServiceError> {
        let drop = self.store.get_drop_or_err(drop_id)?;
        if drop.status_at(Utc::now()).is_closed() {
            return Err(ServiceError::WindowClosed(format!(
                "drop '{}' has closed",
                drop_id
            )));
        }

        if self.store.get_waitlist_entry(drop_id, user_id)?.is_none() {
            return Ok(false);
        }
        self.store.delete_waitlist_entry(drop_id, user_id)?;
        debug!(drop_id = %drop_id, user_id = %user_id, "left waitlist");
        Ok(true)
    }

    /// Claim one unit of a drop's stock.
    ///
    /// Evaluated as a single atomic step under the drop's lock:
    /// 1. status must be OPEN,
    /// 2. no existing claim for `(drop_id, user_id)`,
    /// 3. stock must be non-zero,
    /// 4. decrement + claim record commit together.
    ///
    /// Under concurrent claims on a drop with stock = 1, exactly one caller
    /// succeeds; the rest observe OutOfStock.
    pub async fn claim(&self, drop_id: &str, user_id: &str) -> Result<ClaimRecord, ServiceError> {
        let _guard = self.acquire(drop_id).await?;

        let mut drop = self.store.get_drop_or_err(drop_id)?;

        let status = drop.status_at(Utc::now());
        if !status.is_open() {
            return Err(ServiceError::WindowNotOpen(format!(
                "claim window for drop '{}' is not open (status: {})",
                drop_id, status
            )));
        }

        if self.store.get_claim(drop_id, user_id)?.is_some() {
            return Err(ServiceError::AlreadyClaimed(format!(
                "user has already claimed drop '{}'",
                drop_id
            )));
        }

        if drop.stock == 0 {
            return Err(ServiceError::OutOfStock(format!(
                "drop '{}' has no stock left",
                drop_id
            )));
        }

        drop.stock -= 1;
        drop.updated_at = now_rfc3339();
        let claim = ClaimRecord {
            id: new_id(),
            drop_id: drop_id.to_string(),
            user_id: user_id.to_string(),
            code: new_id(),
            created_at: now_rfc3339(),
        };
        self.store.commit_claim(&drop, &claim)?;
        info!(drop_id = %drop_id, user_id = %user_id, remaining = drop.stock, "claim issued");
        Ok(claim)
    }
}

fn validate_title(title: &str) -> Result<(), ServiceError> {
    if title.trim().is_empty() {
        return Err(ServiceError::Validation("title must not be empty".into()));
    }
    Ok(())
}

fn validate_window(
    start: chrono::DateTime<Utc>,
    end: chrono::DateTime<Utc>,
) -> Result<(), ServiceError> {
    if end <= start {
        return Err(ServiceError::Validation(
            "claim_window_end must be after claim_window_start".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use dropspot_kv::{KVStore, RedbStore};

    fn make_arbiter() -> (Arc<DropArbiter>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let kv: Arc<dyn KVStore> = Arc::new(RedbStore::open(&dir.path().join("kv.redb")).unwrap());
        let arbiter = Arc::new(DropArbiter::new(Arc::new(DropStore::new(kv))));
        (arbiter, dir)
    }

    fn open_window() -> (chrono::DateTime<Utc>, chrono::DateTime<Utc>) {
        let now = Utc::now();
        (now - ChronoDuration::minutes(1), now + ChronoDuration::hours(1))
    }

    fn create_open_drop(arbiter: &DropArbiter, stock: u32) -> Drop {
        let (start, end) = open_window();
        arbiter
            .create(DropCreate {
                title: format!("Test Drop Stock {}", stock),
                description: "...".into(),
                stock,
                claim_window_start: start,
                claim_window_end: end,
            })
            .unwrap()
    }

    #[test]
    fn create_validates_fields() {
        let (arbiter, _dir) = make_arbiter();
        let (start, end) = open_window();

        let err = arbiter
            .create(DropCreate {
                title: "  ".into(),
                description: String::new(),
                stock: 1,
                claim_window_start: start,
                claim_window_end: end,
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = arbiter
            .create(DropCreate {
                title: "Backwards".into(),
                description: String::new(),
                stock: 1,
                claim_window_start: end,
                claim_window_end: start,
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn join_leave_join_is_single_membership() {
        let (arbiter, _dir) = make_arbiter();
        let drop = create_open_drop(&arbiter, 5);

        assert!(arbiter.join(&drop.id, "u1").unwrap());
        assert!(!arbiter.join(&drop.id, "u1").unwrap()); // idempotent no-op
        assert!(arbiter.leave(&drop.id, "u1").unwrap());
        assert!(!arbiter.leave(&drop.id, "u1").unwrap());
        assert!(arbiter.join(&drop.id, "u1").unwrap());

        assert_eq!(arbiter.waitlist(&drop.id).unwrap().len(), 1);
    }

    #[test]
    fn join_missing_drop_is_not_found() {
        let (arbiter, _dir) = make_arbiter();
        let err = arbiter.join("nope", "u1").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn join_closed_drop_is_rejected() {
        let (arbiter, _dir) = make_arbiter();
        let now = Utc::now();
        let drop = arbiter
            .create(DropCreate {
                title: "Closed".into(),
                description: String::new(),
                stock: 10,
                claim_window_start: now - ChronoDuration::days(2),
                claim_window_end: now - ChronoDuration::days(1),
            })
            .unwrap();

        let err = arbiter.join(&drop.id, "u1").unwrap_err();
        assert!(matches!(err, ServiceError::WindowClosed(_)));
        let err = arbiter.leave(&drop.id, "u1").unwrap_err();
        assert!(matches!(err, ServiceError::WindowClosed(_)));
    }

    #[tokio::test]
    async fn full_claim_flow() {
        let (arbiter, _dir) = make_arbiter();
        let drop = create_open_drop(&arbiter, 2);

        // User 1 claims (2 -> 1), gets a code.
        let claim1 = arbiter.claim(&drop.id, "u1").await.unwrap();
        assert!(!claim1.code.is_empty());
        assert_eq!(arbiter.get(&drop.id).unwrap().stock, 1);

        // Same user again: AlreadyClaimed, stock untouched.
        let err = arbiter.claim(&drop.id, "u1").await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyClaimed(_)));
        assert_eq!(arbiter.get(&drop.id).unwrap().stock, 1);

        // User 2 claims (1 -> 0).
        let claim2 = arbiter.claim(&drop.id, "u2").await.unwrap();
        assert_ne!(claim1.code, claim2.code);
        assert_eq!(arbiter.get(&drop.id).unwrap().stock, 0);

        // User 3: out of stock.
        let err = arbiter.claim(&drop.id, "u3").await.unwrap_err();
        assert!(matches!(err, ServiceError::OutOfStock(_)));

        assert_eq!(arbiter.claims(&drop.id).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn claim_outside_window_fails_regardless_of_stock() {
        let (arbiter, _dir) = make_arbiter();
        let now = Utc::now();

        let past = arbiter
            .create(DropCreate {
                title: "Past".into(),
                description: String::new(),
                stock: 10,
                claim_window_start: now - ChronoDuration::days(2),
                claim_window_end: now - ChronoDuration::days(1),
            })
            .unwrap();
        let err = arbiter.claim(&past.id, "u1").await.unwrap_err();
        assert!(matches!(err, ServiceError::WindowNotOpen(_)));

        let future = arbiter
            .create(DropCreate {
                title: "Future".into(),
                description: String::new(),
                stock: 10,
                claim_window_start: now + ChronoDuration::days(1),
                claim_window_end: now + ChronoDuration::days(2),
            })
            .unwrap();
        let err = arbiter.claim(&future.id, "u1").await.unwrap_err();
        assert!(matches!(err, ServiceError::WindowNotOpen(_)));
    }

    #[tokio::test]
    async fn claim_open_drop_with_zero_stock() {
        let (arbiter, _dir) = make_arbiter();
        let drop = create_open_drop(&arbiter, 0);
        let err = arbiter.claim(&drop.id, "u1").await.unwrap_err();
        assert!(matches!(err, ServiceError::OutOfStock(_)));
    }

    #[tokio::test]
    async fn concurrent_claims_on_single_unit() {
        let (arbiter, _dir) = make_arbiter();
        let drop = create_open_drop(&arbiter, 1);

        let mut handles = Vec::new();
        for i in 0..8 {
            let arbiter = Arc::clone(&arbiter);
            let drop_id = drop.id.clone();
            handles.push(tokio::spawn(async move {
                arbiter.claim(&drop_id, &format!("user-{}", i)).await
            }));
        }

        let mut successes = 0;
        let mut out_of_stock = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(claim) => {
                    assert!(!claim.code.is_empty());
                    successes += 1;
                }
                Err(ServiceError::OutOfStock(_)) => out_of_stock += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(out_of_stock, 7);
        assert_eq!(arbiter.get(&drop.id).unwrap().stock, 0);
        assert_eq!(arbiter.claims(&drop.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn title_only_update_preserves_stock_and_claims() {
        let (arbiter, _dir) = make_arbiter();
        let drop = create_open_drop(&arbiter, 3);
        arbiter.claim(&drop.id, "u1").await.unwrap();

        let updated = arbiter
            .update(
                &drop.id,
                DropUpdate {
                    title: Some("Renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.stock, 2);
        assert_eq!(arbiter.claims(&drop.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_replaces_stock_absolutely() {
        let (arbiter, _dir) = make_arbiter();
        let drop = create_open_drop(&arbiter, 3);
        arbiter.claim(&drop.id, "u1").await.unwrap();

        let updated = arbiter
            .update(
                &drop.id,
                DropUpdate {
                    stock: Some(10),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.stock, 10);
    }

    #[tokio::test]
    async fn window_edit_reopens_closed_drop() {
        let (arbiter, _dir) = make_arbiter();
        let now = Utc::now();
        let drop = arbiter
            .create(DropCreate {
                title: "Was closed".into(),
                description: String::new(),
                stock: 1,
                claim_window_start: now - ChronoDuration::days(2),
                claim_window_end: now - ChronoDuration::days(1),
            })
            .unwrap();
        assert_eq!(drop.status_at(Utc::now()), DropStatus::Closed);

        let (start, end) = open_window();
        let updated = arbiter
            .update(
                &drop.id,
                DropUpdate {
                    claim_window_start: Some(start),
                    claim_window_end: Some(end),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status_at(Utc::now()), DropStatus::Open);
        arbiter.claim(&drop.id, "u1").await.unwrap();
    }

    #[tokio::test]
    async fn window_edit_keeps_waitlist() {
        // An UPCOMING drop edited straight to CLOSED keeps its memberships:
        // gating happens at request time only.
        let (arbiter, _dir) = make_arbiter();
        let now = Utc::now();
        let drop = arbiter
            .create(DropCreate {
                title: "Upcoming".into(),
                description: String::new(),
                stock: 1,
                claim_window_start: now + ChronoDuration::days(1),
                claim_window_end: now + ChronoDuration::days(2),
            })
            .unwrap();
        arbiter.join(&drop.id, "u1").unwrap();

        arbiter
            .update(
                &drop.id,
                DropUpdate {
                    claim_window_start: Some(now - ChronoDuration::days(2)),
                    claim_window_end: Some(now - ChronoDuration::days(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(arbiter.waitlist(&drop.id).unwrap().len(), 1);
        // But further membership changes are rejected while closed.
        assert!(matches!(
            arbiter.leave(&drop.id, "u1").unwrap_err(),
            ServiceError::WindowClosed(_)
        ));
    }

    #[tokio::test]
    async fn update_validates_resulting_window() {
        let (arbiter, _dir) = make_arbiter();
        let drop = create_open_drop(&arbiter, 1);

        let err = arbiter
            .update(
                &drop.id,
                DropUpdate {
                    claim_window_end: Some(drop.claim_window_start - ChronoDuration::hours(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_cascades_claims_and_waitlist() {
        let (arbiter, _dir) = make_arbiter();
        let drop = create_open_drop(&arbiter, 2);
        arbiter.join(&drop.id, "u1").unwrap();
        arbiter.claim(&drop.id, "u2").await.unwrap();

        arbiter.delete(&drop.id).await.unwrap();

        assert!(matches!(
            arbiter.get(&drop.id).unwrap_err(),
            ServiceError::NotFound(_)
        ));
        assert!(arbiter.claims(&drop.id).unwrap().is_empty());
        assert!(arbiter.waitlist(&drop.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_reaps_lock_entry() {
        let (arbiter, _dir) = make_arbiter();
        let drop = create_open_drop(&arbiter, 1);

        arbiter.claim(&drop.id, "u1").await.unwrap();
        assert!(arbiter.locks.lock().await.contains_key(&drop.id));

        arbiter.delete(&drop.id).await.unwrap();
        assert!(arbiter.locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn delete_missing_drop_is_not_found() {
        let (arbiter, _dir) = make_arbiter();
        let err = arbiter.delete("nope").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn contended_lock_fails_busy() {
        let dir = tempfile::tempdir().unwrap();
        let kv: Arc<dyn KVStore> = Arc::new(RedbStore::open(&dir.path().join("kv.redb")).unwrap());
        let arbiter = Arc::new(DropArbiter::with_config(
            Arc::new(DropStore::new(kv)),
            ArbiterConfig {
                lock_wait: Duration::from_millis(50),
            },
        ));
        let drop = create_open_drop(&arbiter, 1);

        // Hold the drop's lock, then try to claim.
        let handle = arbiter.lock_handle(&drop.id).await;
        let _held = handle.lock().await;

        let err = arbiter.claim(&drop.id, "u1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Busy(_)));
        // No partial state: stock untouched, no claim record.
        assert_eq!(arbiter.get(&drop.id).unwrap().stock, 1);
        assert!(arbiter.claims(&drop.id).unwrap().is_empty());
    }
}
