//! Public drop endpoints: listing plus join/leave/claim.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use dropspot_core::{Identity, ListResult, ServiceError};

use crate::arbiter::DropArbiter;
use crate::model::{ClaimRecord, Drop, DropStatus};

type S = Arc<DropArbiter>;

pub fn routes(arbiter: S) -> Router {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(get_one))
        .route("/{id}/join", post(join))
        .route("/{id}/leave", post(leave))
        .route("/{id}/claim", post(claim))
        .with_state(arbiter)
}

/// Read projection of a drop: the stored record plus the status derived at
/// response time. Status is never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct DropView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub stock: u32,
    pub claim_window_start: DateTime<Utc>,
    pub claim_window_end: DateTime<Utc>,
    pub status: DropStatus,
}

fn project(d: &Drop, now: DateTime<Utc>) -> DropView {
    DropView {
        id: d.id.clone(),
        title: d.title.clone(),
        description: d.description.clone(),
        stock: d.stock,
        claim_window_start: d.claim_window_start,
        claim_window_end: d.claim_window_end,
        status: d.status_at(now),
    }
}

#[derive(Debug, Serialize)]
struct Message {
    detail: String,
}

async fn list(State(arbiter): State<S>) -> Result<Json<ListResult<DropView>>, ServiceError> {
    let now = Utc::now();
    let items: Vec<DropView> = arbiter.list()?.iter().map(|d| project(d, now)).collect();
    let total = items.len();
    Ok(Json(ListResult { items, total }))
}

async fn get_one(
    State(arbiter): State<S>,
    Path(id): Path<String>,
) -> Result<Json<DropView>, ServiceError> {
    let drop = arbiter.get(&id)?;
    Ok(Json(project(&drop, Utc::now())))
}

async fn join(
    State(arbiter): State<S>,
    Path(id): Path<String>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Message>, ServiceError> {
    let joined = arbiter.join(&id, &identity.user_id)?;
    let detail = if joined {
        "joined the waitlist".to_string()
    } else {
        "already on the waitlist".to_string()
    };
    Ok(Json(Message { detail }))
}

async fn leave(
    State(arbiter): State<S>,
    Path(id): Path<String>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Message>, ServiceError> {
    let left = arbiter.leave(&id, &identity.user_id)?;
    let detail = if left {
        "left the waitlist".to_string()
    } else {
        "not on the waitlist".to_string()
    };
    Ok(Json(Message { detail }))
}

async fn claim(
    State(arbiter): State<S>,
    Path(id): Path<String>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ClaimRecord>, ServiceError> {
    let record = arbiter.claim(&id, &identity.user_id).await?;
    Ok(Json(record))
}
