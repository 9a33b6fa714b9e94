//! Account HTTP handlers.
//!
//! | Method | Path       | Description                     |
//! |--------|------------|---------------------------------|
//! | POST   | `/signup`  | Register a new account          |
//! | POST   | `/login`   | Exchange credentials for a JWT  |
//! | GET    | `/me`      | Current caller's account        |

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};

use dropspot_core::{Identity, ServiceError};

use crate::model::{LoginRequest, SignupRequest, TokenResponse, UserView};
use crate::service::AccountsService;

type S = Arc<AccountsService>;

pub fn router(service: S) -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/me", get(me))
        .with_state(service)
}

async fn signup(
    State(service): State<S>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserView>), ServiceError> {
    let user = service.signup(&body.email, &body.password)?;
    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

async fn login(
    State(service): State<S>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ServiceError> {
    let (_, token) = service.login(&body.username, &body.password)?;
    Ok(Json(token))
}

async fn me(
    State(service): State<S>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<UserView>, ServiceError> {
    let user = service.get_user(&identity.user_id)?;
    Ok(Json(UserView::from(&user)))
}
