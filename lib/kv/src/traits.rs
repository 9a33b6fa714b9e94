use crate::error::KVError;

/// KVStore provides the key-value storage interface for all DropSpot records.
///
/// Keys follow a namespaced convention: `drop/{id}`, `claim/{drop_id}/{user_id}`,
/// `waitlist/{drop_id}/{user_id}`, `account/user/{id}`.
///
/// Batch operations commit all entries in a single storage transaction. The
/// claim path depends on this: a stock decrement and its claim record must
/// land together or not at all.
pub trait KVStore: Send + Sync {
    /// Get the value for a key. Returns None if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError>;

    /// Set a key-value pair.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError>;

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), KVError>;

    /// Set multiple key-value pairs atomically (one transaction).
    fn batch_set(&self, entries: &[(&str, &[u8])]) -> Result<(), KVError>;

    /// Delete multiple keys atomically (one transaction).
    fn batch_delete(&self, keys: &[&str]) -> Result<(), KVError>;

    /// Scan all keys matching a prefix. Returns sorted (key, value) pairs.
    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError>;
}
