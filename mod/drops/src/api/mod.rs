mod admin;
mod drops;

use std::sync::Arc;

use axum::Router;

use crate::arbiter::DropArbiter;

/// Build the public drops router.
///
/// Routes (nested under `/drops` by the binary):
/// - `GET  /`            — list drops with derived status
/// - `GET  /{id}`        — get one drop
/// - `POST /{id}/join`   — join the waitlist (idempotent)
/// - `POST /{id}/leave`  — leave the waitlist (idempotent)
/// - `POST /{id}/claim`  — claim one unit of stock
pub fn router(arbiter: Arc<DropArbiter>) -> Router {
    drops::routes(arbiter)
}

/// Build the administrative CRUD router (nested under `/admin/drops`).
///
/// - `GET    /`      — list all drops
/// - `POST   /`      — create a drop
/// - `GET    /{id}`  — get a drop
/// - `PUT    /{id}`  — update (absolute stock/window replacement)
/// - `DELETE /{id}`  — delete (cascades claims + waitlist)
pub fn admin_router(arbiter: Arc<DropArbiter>) -> Router {
    admin::routes(arbiter)
}
