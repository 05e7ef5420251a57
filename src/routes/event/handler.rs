use axum::{
    Extension,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::{
    AppState,
    backend::EventBackend,
    error::AppError,
    models::Session,
    utils::{degraded_to_api_response, error_codes, success_to_api_response},
};

use super::model::{
    EventView, FeedQuery, FeedResponse, MapPin, OptionsResponse, load_feed,
};

// 获取活动列表
pub async fn feed<B: EventBackend + 'static>(
    State(state): State<AppState<B>>,
    Extension(session): Extension<Session>,
    Query(query): Query<FeedQuery>,
) -> Result<Response, AppError> {
    let request = query.into_request(&state.pipeline)?;
    let loaded = load_feed(&*state.backend, &state.pipeline, &session, &request).await;

    let now = Utc::now();
    let events: Vec<EventView> = loaded
        .events
        .into_iter()
        .map(|e| EventView::new(e, request.location.as_ref(), now))
        .collect();
    let body = FeedResponse {
        total: events.len(),
        events,
        filter: request.filter,
        degraded: loaded.degraded,
    };

    // 全部分区失败时返回 503，由 log_errors 记录
    if loaded.error.is_some() {
        return Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            degraded_to_api_response(
                error_codes::FEED_UNAVAILABLE,
                "活动加载失败，请稍后重试".to_string(),
                body,
            ),
        )
            .into_response());
    }

    Ok((StatusCode::OK, success_to_api_response(body)).into_response())
}

// 获取地图上的活动标记，仅包含有坐标的活动
pub async fn map<B: EventBackend + 'static>(
    State(state): State<AppState<B>>,
    Extension(session): Extension<Session>,
    Query(query): Query<FeedQuery>,
) -> Result<Response, AppError> {
    let request = query.into_request(&state.pipeline)?;
    let loaded = load_feed(&*state.backend, &state.pipeline, &session, &request).await;

    let pins: Vec<MapPin> = loaded
        .events
        .into_iter()
        .filter_map(MapPin::from_event)
        .collect();

    // 全部分区失败时返回 503，由 log_errors 记录
    if loaded.error.is_some() {
        return Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            degraded_to_api_response(
                error_codes::FEED_UNAVAILABLE,
                "活动加载失败，请稍后重试".to_string(),
                pins,
            ),
        )
            .into_response());
    }

    Ok((StatusCode::OK, success_to_api_response(pins)).into_response())
}

// 获取可选的筛选项
pub async fn options<B: EventBackend + 'static>(State(state): State<AppState<B>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        success_to_api_response(OptionsResponse::from(&*state.pipeline)),
    )
}
