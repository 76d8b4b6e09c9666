use axum::{extract::State, response::Json, routing::post, Router};
use std::sync::Arc;
use tracing::instrument;

use super::error::{ApiError, ApiQuery};
use crate::models::{LoginResponse, LoginUserRequest, MessageResponse, RegisterUserRequest};
use crate::observability::BusinessTracingMiddleware;
use crate::services::AuthService;

const SERVICE: &str = "auth";

#[derive(Clone)]
pub struct AuthState {
    pub auth_service: Arc<AuthService>,
    pub tracer: Arc<BusinessTracingMiddleware>,
}

pub fn auth_router(state: AuthState) -> Router {
    Router::new()
        .route("/register_user", post(register_user))
        .route("/login_user", post(login_user))
        .with_state(state)
}

#[instrument(name = "register_user", skip(state, request), fields(username = %request.username))]
pub async fn register_user(
    State(state): State<AuthState>,
    ApiQuery(request): ApiQuery<RegisterUserRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let response = state
        .tracer
        .trace_operation(
            SERVICE,
            "register_user",
            state.auth_service.register_user(request),
        )
        .await?;
    Ok(Json(response))
}

#[instrument(name = "login_user", skip(state, request), fields(username = %request.username))]
pub async fn login_user(
    State(state): State<AuthState>,
    ApiQuery(request): ApiQuery<LoginUserRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let response = state
        .tracer
        .trace_operation(SERVICE, "login_user", state.auth_service.login_user(request))
        .await?;
    Ok(Json(response))
}
