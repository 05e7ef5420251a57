use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::utils::{error_codes, error_to_api_response};

/// 托管后端调用失败
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to backend failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend rejected the session")]
    Unauthorized,

    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed to decode backend response: {0}")]
    Decode(String),
}

/// 单条活动记录不合法
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("event {0} has an empty title")]
    EmptyTitle(String),
}

/// 设备定位失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// 活动列表整体不可用（所有分区查询均失败）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("no event partition could be loaded")]
    Unavailable,
}

/// 筛选条件不合法
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("unknown sort strategy: {0}")]
    UnknownSort(String),

    #[error("radius {0} is not one of the offered options")]
    RadiusNotOffered(f64),

    #[error("sort strategy {0} is not offered")]
    SortNotOffered(String),

    #[error("invalid location: {0}")]
    InvalidLocation(String),

    #[error("invalid utc offset: {0} minutes")]
    InvalidOffset(i32),
}

#[derive(Debug)]
pub enum AppError {
    Unauthorized,
    Validation(String),
}

impl From<FilterError> for AppError {
    fn from(err: FilterError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, error_message) = match self {
            AppError::Unauthorized => (error_codes::AUTH_FAILED, "未授权访问".to_string()),
            AppError::Validation(msg) => (error_codes::VALIDATION_ERROR, format!("参数错误: {}", msg)),
        };

        (StatusCode::OK, error_to_api_response::<()>(code, error_message)).into_response()
    }
}
