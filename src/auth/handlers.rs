use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::dto::{LoginRequest, LoginResponse, RegisterRequest},
    errors::AuthError,
    response::ResponseData,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/registrar", post(register))
        .route("/auth/login", post(login))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AuthError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| AuthError::Validation(rejection.body_text()))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ResponseData<i32>>), AuthError> {
    let mut req = body(payload)?;
    req.validate()?;

    let user_id = state.auth.register(req).await?;
    Ok((StatusCode::CREATED, Json(ResponseData::new(user_id))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ResponseData<LoginResponse>>, AuthError> {
    let mut req = body(payload)?;
    req.validate()?;

    let response = state.auth.login(req).await?;
    Ok(Json(ResponseData::new(response)))
}
