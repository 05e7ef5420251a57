pub mod event;
pub mod health;
pub mod user;

use axum::{Router, routing::get};

use crate::{
    AppState,
    backend::EventBackend,
    middleware::{log_errors, session_middleware},
};

/// 组装全部路由；只有依赖会话的接口经过会话解析
pub fn app_router<B: EventBackend + 'static>(state: AppState<B>) -> Router {
    let with_session = Router::new()
        .route("/events/feed", get(event::feed::<B>))
        .route("/events/map", get(event::map::<B>))
        .route("/users/profile", get(user::profile))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_middleware::<B>,
        ));

    let api = Router::new()
        .route("/ping", get(health::ping))
        .route("/events/options", get(event::options::<B>))
        .merge(with_session);

    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(base, api)
    };

    router
        .layer(axum::middleware::from_fn(log_errors))
        .with_state(state)
}
