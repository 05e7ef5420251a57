use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::{AppState, backend::EventBackend, models::Session};

/// 解析 Bearer token 并把会话放进请求扩展
///
/// 会话无效时不拒绝请求，而是以匿名身份继续（只能看到公开活动）。
pub async fn session_middleware<B: EventBackend + 'static>(
    State(state): State<AppState<B>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string());

    let session = Session::resolve(&*state.backend, token).await;
    req.extensions_mut().insert(session);

    next.run(req).await
}
