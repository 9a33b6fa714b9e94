//! Administrative drop CRUD. Every handler requires the admin flag on the
//! caller's identity; the auth middleware has already validated the token.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};

use dropspot_core::{Identity, ListResult, ServiceError};

use crate::arbiter::DropArbiter;
use crate::model::{Drop, DropCreate, DropUpdate};

type S = Arc<DropArbiter>;

pub fn routes(arbiter: S) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_one).put(update).delete(delete))
        .with_state(arbiter)
}

async fn list(
    State(arbiter): State<S>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ListResult<Drop>>, ServiceError> {
    identity.require_admin()?;
    let items = arbiter.list()?;
    let total = items.len();
    Ok(Json(ListResult { items, total }))
}

async fn get_one(
    State(arbiter): State<S>,
    Path(id): Path<String>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Drop>, ServiceError> {
    identity.require_admin()?;
    Ok(Json(arbiter.get(&id)?))
}

async fn create(
    State(arbiter): State<S>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<DropCreate>,
) -> Result<(StatusCode, Json<Drop>), ServiceError> {
    identity.require_admin()?;
    let drop = arbiter.create(body)?;
    Ok((StatusCode::CREATED, Json(drop)))
}

async fn update(
    State(arbiter): State<S>,
    Path(id): Path<String>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<DropUpdate>,
) -> Result<Json<Drop>, ServiceError> {
    identity.require_admin()?;
    let drop = arbiter.update(&id, body).await?;
    Ok(Json(drop))
}

async fn delete(
    State(arbiter): State<S>,
    Path(id): Path<String>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Drop>, ServiceError> {
    identity.require_admin()?;
    let drop = arbiter.delete(&id).await?;
    Ok(Json(drop))
}
