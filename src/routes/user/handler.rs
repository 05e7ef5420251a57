use axum::{
    Extension,
    http::StatusCode,
    response::IntoResponse,
};

use crate::{error::AppError, models::Session, utils::success_to_api_response};

use super::model::ProfileResponse;

// 获取当前用户资料
pub async fn profile(Extension(session): Extension<Session>) -> Result<impl IntoResponse, AppError> {
    let profile = ProfileResponse::from_session(&session).ok_or(AppError::Unauthorized)?;
    Ok((StatusCode::OK, success_to_api_response(profile)))
}
