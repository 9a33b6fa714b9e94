use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DropStatus
// ---------------------------------------------------------------------------

/// Derived lifecycle state of a drop. Never stored — always recomputed from
/// the claim window and the current instant (see [`crate::window::status`]).
///
/// ```text
/// UPCOMING → OPEN → CLOSED
/// ```
///
/// Transitions are monotonic under advancing time. An administrative window
/// edit re-derives status from the new bounds, which may move a CLOSED drop
/// back to UPCOMING or OPEN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DropStatus {
    Upcoming,
    Open,
    Closed,
}

impl DropStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "UPCOMING",
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }

    /// Whether claims are currently permitted.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Whether join/leave are still permitted (anything before the window ends).
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for DropStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Drop — the unit of availability
// ---------------------------------------------------------------------------

/// A stock-limited, time-windowed claimable offer.
///
/// `stock` is the remaining claimable units; the arbiter is its sole writer.
/// Administrative edits replace the field with an absolute target — they are
/// never relative decrements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drop {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub stock: u32,
    pub claim_window_start: DateTime<Utc>,
    pub claim_window_end: DateTime<Utc>,
    pub created_at: String,
    pub updated_at: String,
}

impl Drop {
    /// Derived status at the given instant.
    pub fn status_at(&self, now: DateTime<Utc>) -> DropStatus {
        crate::window::status(now, self.claim_window_start, self.claim_window_end)
    }
}

/// Fields accepted when creating a drop. The server assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropCreate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub stock: u32,
    pub claim_window_start: DateTime<Utc>,
    pub claim_window_end: DateTime<Utc>,
}

/// Fields accepted when updating a drop. Absent fields keep their current
/// value; `stock` is an absolute replacement target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DropUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default)]
    pub claim_window_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub claim_window_end: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// WaitlistEntry
// ---------------------------------------------------------------------------

/// Membership of a user on a drop's waitlist. At most one per
/// `(drop_id, user_id)`. Has no effect on stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub drop_id: String,
    pub user_id: String,
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// ClaimRecord
// ---------------------------------------------------------------------------

/// Proof of a successful claim. Exactly one may exist per
/// `(drop_id, user_id)`; `code` is the opaque token handed to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub id: String,
    pub drop_id: String,
    pub user_id: String,
    pub code: String,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_screaming_snake() {
        assert_eq!(serde_json::to_string(&DropStatus::Upcoming).unwrap(), "\"UPCOMING\"");
        assert_eq!(serde_json::to_string(&DropStatus::Open).unwrap(), "\"OPEN\"");
        assert_eq!(serde_json::to_string(&DropStatus::Closed).unwrap(), "\"CLOSED\"");
    }

    #[test]
    fn drop_roundtrips_with_rfc3339_window() {
        let d = Drop {
            id: "d1".into(),
            title: "Launch".into(),
            description: String::new(),
            stock: 3,
            claim_window_start: "2026-01-01T00:00:00Z".parse().unwrap(),
            claim_window_end: "2026-01-02T00:00:00Z".parse().unwrap(),
            created_at: "2025-12-31T00:00:00+00:00".into(),
            updated_at: "2025-12-31T00:00:00+00:00".into(),
        };
        let json = serde_json::to_value(&d).unwrap();
        assert!(json["claim_window_start"].as_str().unwrap().starts_with("2026-01-01"));
        let back: Drop = serde_json::from_value(json).unwrap();
        assert_eq!(back.stock, 3);
        assert_eq!(back.claim_window_end, d.claim_window_end);
    }

    #[test]
    fn update_defaults_to_all_absent() {
        let u: DropUpdate = serde_json::from_str("{}").unwrap();
        assert!(u.title.is_none());
        assert!(u.stock.is_none());
        assert!(u.claim_window_start.is_none());
    }
}
