use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info};

use service::errors::ServiceError;
use service::file::user_records::{NewUser, User, UserPatch, UserStore};

use crate::errors::ApiError;

#[derive(Clone)]
pub struct ServerState {
    pub users: Arc<UserStore>,
}

/// 列出全部用户
pub async fn list_users(State(state): State<ServerState>) -> Json<Vec<User>> {
    Json(state.users.list().await)
}

/// 创建用户，返回 201 与新记录
pub async fn create_user(
    State(state): State<ServerState>,
    Json(input): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.users.create(input).await.map_err(reject)?;
    info!(id = %user.id, "created user");
    Ok((StatusCode::CREATED, Json(user)))
}

/// 获取指定用户
pub async fn get_user(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    match state.users.get(&id).await {
        Some(user) => Ok(Json(user)),
        None => Err(ApiError::not_found()),
    }
}

/// 更新指定用户，只覆盖请求体中出现的字段
pub async fn update_user(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<User>, ApiError> {
    let user = state.users.update(&id, patch).await.map_err(reject)?;
    info!(id = %user.id, "updated user");
    Ok(Json(user))
}

/// 删除指定用户，返回被删除的记录
pub async fn delete_user(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user = state.users.delete(&id).await.map_err(reject)?;
    info!(id = %user.id, "deleted user");
    Ok(Json(user))
}

/// Map service failures onto the wire contract. Validation messages pass
/// through verbatim; storage faults are logged and reported as a bare 500.
fn reject(err: ServiceError) -> ApiError {
    match err {
        ServiceError::Validation(msg) => ApiError::new(StatusCode::BAD_REQUEST, msg),
        ServiceError::NotFound(_) => ApiError::not_found(),
        ServiceError::Storage(msg) => {
            error!(error = %msg, "persisting user collection failed");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}
