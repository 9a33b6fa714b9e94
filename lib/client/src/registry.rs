//! Drop registry: HTTP transport plus a local cache of drop records.
//!
//! The cache is only ever patched from server-confirmed responses. A
//! concurrent claim may change `stock` between any two calls, so writes
//! never merge local state into the cache — the server's returned record
//! replaces the entry wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{ApiError, TokenSource};

// ── Wire types ──────────────────────────────────────────────────────

/// A drop record as returned by the administrative API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub stock: u32,
    pub claim_window_start: DateTime<Utc>,
    pub claim_window_end: DateTime<Utc>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Fields for creating or updating a drop. All optional so the same type
/// serves partial updates; [`DropRegistry::create`] checks the required
/// ones before sending.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DropFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_window_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_window_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    items: Vec<DropRecord>,
    #[allow(dead_code)]
    total: usize,
}

/// Server error payload.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[allow(dead_code)]
    code: String,
    detail: String,
}

// ── Transport ───────────────────────────────────────────────────────

/// Transport to the drop administration API. Abstracted so the registry's
/// reconciliation policy can be tested without a server.
#[async_trait::async_trait]
pub trait ArbitratorApi: Send + Sync {
    async fn list(&self) -> Result<Vec<DropRecord>, ApiError>;
    async fn get(&self, id: &str) -> Result<DropRecord, ApiError>;
    async fn create(&self, fields: &DropFields) -> Result<DropRecord, ApiError>;
    async fn update(&self, id: &str, fields: &DropFields) -> Result<DropRecord, ApiError>;
    async fn delete(&self, id: &str) -> Result<DropRecord, ApiError>;
}

/// reqwest-backed [`ArbitratorApi`] against `{base_url}/admin/drops`.
pub struct HttpArbitrator {
    http: reqwest::Client,
    base_url: String,
    token_source: Arc<dyn TokenSource>,
}

impl HttpArbitrator {
    pub fn new(base_url: impl Into<String>, token_source: Arc<dyn TokenSource>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token_source,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/admin/drops", self.base_url)
    }

    fn item_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection_url(), id)
    }

    async fn authed(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, ApiError> {
        match self.token_source.token().await? {
            Some(token) => Ok(builder.bearer_auth(token)),
            None => Ok(builder),
        }
    }

    /// Parse an API response, mapping HTTP errors to `ApiError`.
    async fn parse<R: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<R, ApiError> {
        let status = resp.status();
        if !status.is_success() {
            let code = status.as_u16();
            let body = resp.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.detail)
                .unwrap_or(body);
            return Err(match code {
                401 => ApiError::Auth(detail),
                404 => ApiError::NotFound(detail),
                _ => ApiError::Server {
                    status: code,
                    message: detail,
                },
            });
        }
        resp.json::<R>()
            .await
            .map_err(|e| ApiError::Decode(format!("response body: {}", e)))
    }
}

#[async_trait::async_trait]
impl ArbitratorApi for HttpArbitrator {
    async fn list(&self) -> Result<Vec<DropRecord>, ApiError> {
        let req = self.authed(self.http.get(&self.collection_url())).await?;
        let lr: ListResponse = Self::parse(req.send().await?).await?;
        Ok(lr.items)
    }

    async fn get(&self, id: &str) -> Result<DropRecord, ApiError> {
        let req = self.authed(self.http.get(&self.item_url(id))).await?;
        Self::parse(req.send().await?).await
    }

    async fn create(&self, fields: &DropFields) -> Result<DropRecord, ApiError> {
        let req = self
            .authed(self.http.post(&self.collection_url()).json(fields))
            .await?;
        Self::parse(req.send().await?).await
    }

    async fn update(&self, id: &str, fields: &DropFields) -> Result<DropRecord, ApiError> {
        let req = self
            .authed(self.http.put(&self.item_url(id)).json(fields))
            .await?;
        Self::parse(req.send().await?).await
    }

    async fn delete(&self, id: &str) -> Result<DropRecord, ApiError> {
        let req = self.authed(self.http.delete(&self.item_url(id))).await?;
        Self::parse(req.send().await?).await
    }
}

// ── Registry ────────────────────────────────────────────────────────

/// Local cache of drops with a strict reconciliation policy: entries are
/// created, replaced, and removed only from server-confirmed responses.
/// Unconfirmed writes are never pre-applied.
pub struct DropRegistry<A: ArbitratorApi> {
    api: A,
    cache: Vec<DropRecord>,
}

impl<A: ArbitratorApi> DropRegistry<A> {
    pub fn new(api: A) -> Self {
        Self { api, cache: Vec::new() }
    }

    /// Current cache contents. Stale until the next confirmed operation.
    pub fn drops(&self) -> &[DropRecord] {
        &self.cache
    }

    pub fn cached(&self, id: &str) -> Option<&DropRecord> {
        self.cache.iter().find(|d| d.id == id)
    }

    /// Fetch all drops and replace the cache wholesale.
    pub async fn refresh(&mut self) -> Result<&[DropRecord], ApiError> {
        let items = self.api.list().await?;
        self.cache = items;
        Ok(&self.cache)
    }

    /// Fetch a single drop and patch its cache entry.
    pub async fn fetch(&mut self, id: &str) -> Result<DropRecord, ApiError> {
        let record = self.api.get(id).await?;
        self.patch(record.clone());
        Ok(record)
    }

    /// Create a drop. Validates locally before any round trip; on
    /// acceptance appends the server-returned record (server-assigned id).
    pub async fn create(&mut self, fields: DropFields) -> Result<DropRecord, ApiError> {
        if fields.title.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(ApiError::Validation("title must not be empty".into()));
        }
        let start = fields
            .claim_window_start
            .ok_or_else(|| ApiError::Validation("claim_window_start is required".into()))?;
        let end = fields
            .claim_window_end
            .ok_or_else(|| ApiError::Validation("claim_window_end is required".into()))?;
        validate_window(start, end)?;
        if fields.stock.is_none() {
            return Err(ApiError::Validation("stock is required".into()));
        }

        let record = self.api.create(&fields).await?;
        self.cache.push(record.clone());
        Ok(record)
    }

    /// Update a drop. Validates the window when both bounds are present;
    /// on acceptance replaces the cache entry with the server-returned
    /// record.
    pub async fn update(&mut self, id: &str, fields: DropFields) -> Result<DropRecord, ApiError> {
        if let Some(title) = fields.title.as_deref() {
            if title.trim().is_empty() {
                return Err(ApiError::Validation("title must not be empty".into()));
            }
        }
        if let (Some(start), Some(end)) = (fields.claim_window_start, fields.claim_window_end) {
            validate_window(start, end)?;
        }

        let record = self.api.update(id, &fields).await?;
        self.patch(record.clone());
        Ok(record)
    }

    /// Delete a drop. Returns `Ok(true)` when the server confirmed the
    /// delete, `Ok(false)` when the record was already gone (404); the
    /// cache entry is removed in both cases.
    pub async fn delete(&mut self, id: &str) -> Result<bool, ApiError> {
        match self.api.delete(id).await {
            Ok(_) => {
                self.cache.retain(|d| d.id != id);
                Ok(true)
            }
            Err(ApiError::NotFound(_)) => {
                self.cache.retain(|d| d.id != id);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn patch(&mut self, record: DropRecord) {
        match self.cache.iter_mut().find(|d| d.id == record.id) {
            Some(slot) => *slot = record,
            None => self.cache.push(record),
        }
    }
}

fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ApiError> {
    if end <= start {
        return Err(ApiError::Validation(
            "claim_window_end must be after claim_window_start".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock transport: scripted responses plus a call log, so tests can
    /// assert which operations actually reached the "server".
    #[derive(Default)]
    struct MockApi {
        records: Mutex<Vec<DropRecord>>,
        calls: Mutex<Vec<String>>,
        fail_delete_with_404: bool,
    }

    impl MockApi {
        fn with_records(records: Vec<DropRecord>) -> Self {
            Self {
                records: Mutex::new(records),
                ..Default::default()
            }
        }

        fn log(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn record(id: &str, title: &str, stock: u32) -> DropRecord {
        DropRecord {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            stock,
            claim_window_start: "2026-09-01T10:00:00Z".parse().unwrap(),
            claim_window_end: "2026-09-01T12:00:00Z".parse().unwrap(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[async_trait::async_trait]
    impl ArbitratorApi for MockApi {
        async fn list(&self) -> Result<Vec<DropRecord>, ApiError> {
            self.log("list");
            Ok(self.records.lock().unwrap().clone())
        }

        async fn get(&self, id: &str) -> Result<DropRecord, ApiError> {
            self.log("get");
            self.records
                .lock()
                .unwrap()
                .iter()
                .find(|d| d.id == id)
                .cloned()
                .ok_or_else(|| ApiError::NotFound(id.into()))
        }

        async fn create(&self, fields: &DropFields) -> Result<DropRecord, ApiError> {
            self.log("create");
            let mut rec = record("server-assigned", "", 0);
            rec.title = fields.title.clone().unwrap_or_default();
            rec.stock = fields.stock.unwrap_or_default();
            Ok(rec)
        }

        async fn update(&self, id: &str, fields: &DropFields) -> Result<DropRecord, ApiError> {
            self.log("update");
            // The server may report different stock than the client sent
            // (a claim landed in between); return stock 1 regardless.
            let mut rec = record(id, "updated", 1);
            if let Some(ref t) = fields.title {
                rec.title = t.clone();
            }
            Ok(rec)
        }

        async fn delete(&self, id: &str) -> Result<DropRecord, ApiError> {
            self.log("delete");
            if self.fail_delete_with_404 {
                return Err(ApiError::NotFound(id.into()));
            }
            Ok(record(id, "gone", 0))
        }
    }

    fn fields(title: &str, stock: u32) -> DropFields {
        DropFields {
            title: Some(title.into()),
            stock: Some(stock),
            claim_window_start: Some("2026-09-01T10:00:00Z".parse().unwrap()),
            claim_window_end: Some("2026-09-01T12:00:00Z".parse().unwrap()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn refresh_replaces_cache_wholesale() {
        let api = MockApi::with_records(vec![record("a", "A", 1)]);
        let mut reg = DropRegistry::new(api);
        reg.refresh().await.unwrap();
        assert_eq!(reg.drops().len(), 1);

        *reg.api.records.lock().unwrap() = vec![record("b", "B", 2), record("c", "C", 3)];
        reg.refresh().await.unwrap();

        let ids: Vec<_> = reg.drops().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn create_validates_before_round_trip() {
        let api = MockApi::default();
        let mut reg = DropRegistry::new(api);

        let err = reg.create(fields("  ", 5)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let mut inverted = fields("ok", 5);
        std::mem::swap(
            &mut inverted.claim_window_start,
            &mut inverted.claim_window_end,
        );
        let err = reg.create(inverted).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        // Nothing reached the transport.
        assert!(reg.api.calls().is_empty());
        assert!(reg.drops().is_empty());
    }

    #[tokio::test]
    async fn create_appends_server_record() {
        let api = MockApi::default();
        let mut reg = DropRegistry::new(api);

        let created = reg.create(fields("Launch", 5)).await.unwrap();
        assert_eq!(created.id, "server-assigned");
        assert_eq!(reg.drops().len(), 1);
        assert_eq!(reg.drops()[0].id, "server-assigned");
    }

    #[tokio::test]
    async fn update_patches_from_confirmed_response_only() {
        let api = MockApi::with_records(vec![record("a", "A", 5)]);
        let mut reg = DropRegistry::new(api);
        reg.refresh().await.unwrap();

        let mut f = DropFields::default();
        f.title = Some("New title".into());
        f.stock = Some(99);
        reg.update("a", f).await.unwrap();

        // The cache holds the server's record: stock 1, not the 99 we sent.
        let cached = reg.cached("a").unwrap();
        assert_eq!(cached.title, "New title");
        assert_eq!(cached.stock, 1);
    }

    #[tokio::test]
    async fn update_rejects_inverted_window_locally() {
        let api = MockApi::default();
        let mut reg = DropRegistry::new(api);

        let mut f = DropFields::default();
        f.claim_window_start = Some("2026-09-01T12:00:00Z".parse().unwrap());
        f.claim_window_end = Some("2026-09-01T10:00:00Z".parse().unwrap());
        let err = reg.update("a", f).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(reg.api.calls().is_empty());
    }

    #[tokio::test]
    async fn delete_confirmed_removes_entry() {
        let api = MockApi::with_records(vec![record("a", "A", 1)]);
        let mut reg = DropRegistry::new(api);
        reg.refresh().await.unwrap();

        assert!(reg.delete("a").await.unwrap());
        assert!(reg.drops().is_empty());
    }

    #[tokio::test]
    async fn delete_tolerates_already_gone() {
        let api = MockApi {
            records: Mutex::new(vec![record("a", "A", 1)]),
            fail_delete_with_404: true,
            ..Default::default()
        };
        let mut reg = DropRegistry::new(api);
        reg.refresh().await.unwrap();

        // Another administrator deleted it first: not fatal, entry dropped.
        assert!(!reg.delete("a").await.unwrap());
        assert!(reg.drops().is_empty());
    }
}
