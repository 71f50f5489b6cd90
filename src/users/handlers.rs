use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{authenticator::Authenticator, extractors::CurrentUser, jwt::JwtKeys},
    error::{AppError, AppResult},
    extract::{ApiJson, ApiQuery},
    response::ApiResponse,
    state::AppState,
    users::{
        dto::{
            ChangePasswordRequest, DeleteUserRequest, ListQuery, LoginRequest, PublicUser,
            RegisterRequest, UpdateUserRequest,
        },
        services,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/register", post(register))
        .route("/change", post(change))
        .route("/get", get(list))
        .route("/delete", post(delete))
        .route("/update", post(update))
}

#[instrument(skip_all)]
pub async fn login(
    State(authenticator): State<Authenticator>,
    State(keys): State<JwtKeys>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<String>>> {
    let user = authenticator
        .authenticate(&payload.username, &payload.password)
        .await?
        .ok_or(AppError::BadCredentials)?;

    let token = keys.issue(&user.username, None)?;
    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok(Json(ApiResponse::with_data("login succeeded", token)))
}

/// Tokens are stateless; the client drops its copy.
#[instrument(skip_all)]
pub async fn logout(CurrentUser(user): CurrentUser) -> Json<ApiResponse<()>> {
    info!(user_id = user.id, "user logged out");
    Json(ApiResponse::ok("logged out"))
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    services::register(&state, payload).await?;
    Ok(Json(ApiResponse::ok("registration succeeded")))
}

#[instrument(skip_all)]
pub async fn change(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    services::change_password(&state, &user, payload).await?;
    Ok(Json(ApiResponse::ok("password changed")))
}

#[instrument(skip(state, _caller))]
pub async fn list(
    State(state): State<AppState>,
    _caller: CurrentUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<PublicUser>>>> {
    let (users, count) = services::list_users(&state, &query).await?;
    let data = users.into_iter().map(PublicUser::from).collect();
    Ok(Json(ApiResponse::with_count("query succeeded", data, count)))
}

#[instrument(skip(state, _caller))]
pub async fn delete(
    State(state): State<AppState>,
    _caller: CurrentUser,
    ApiJson(payload): ApiJson<DeleteUserRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    services::delete_user(&state, payload.id).await?;
    Ok(Json(ApiResponse::ok("user deleted")))
}

#[instrument(skip(state, _caller, payload))]
pub async fn update(
    State(state): State<AppState>,
    _caller: CurrentUser,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    services::update_user(&state, payload).await?;
    Ok(Json(ApiResponse::ok("user updated")))
}
