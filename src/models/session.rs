use serde::{Deserialize, Serialize};

use crate::backend::EventBackend;

/// 托管认证服务返回的用户身份
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    /// 用户所在大学，可能为空
    pub organization: Option<String>,
}

/// 一次请求（或一个客户端协调器）持有的会话
///
/// 由唯一的持有者解析并写入，其它组件只读取引用。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub user: Option<UserIdentity>,
    pub organization: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// 解析会话：token 无效时退化为匿名会话，资料读取失败时只丢失组织信息
    pub async fn resolve<B: EventBackend>(backend: &B, access_token: Option<String>) -> Self {
        let Some(token) = access_token else {
            return Self::anonymous();
        };

        let user = match backend.current_user(&token).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("Failed to resolve current user, falling back to public feed: {}", e);
                return Self::anonymous();
            }
        };

        let organization = match backend.profile(&token, &user.id).await {
            Ok(profile) => profile.organization.filter(|o| !o.is_empty()),
            Err(e) => {
                tracing::warn!("Failed to load profile for {}: {}", user.id, e);
                None
            }
        };

        tracing::debug!("Resolved session for {} (organization: {:?})", user.id, organization);

        Self {
            access_token: Some(token),
            user: Some(user),
            organization,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;

    #[tokio::test]
    async fn missing_token_is_anonymous() {
        let backend = InMemoryBackend::new();
        assert_eq!(Session::resolve(&backend, None).await, Session::anonymous());
    }

    #[tokio::test]
    async fn rejected_token_is_anonymous() {
        let backend = InMemoryBackend::new().with_user("tok", "u1", Some("MIT"));
        let session = Session::resolve(&backend, Some("stale".into())).await;
        assert_eq!(session, Session::anonymous());
    }

    #[tokio::test]
    async fn profile_failure_keeps_user_but_drops_organization() {
        let backend = InMemoryBackend::new().with_profileless_user("tok", "u2");
        let session = Session::resolve(&backend, Some("tok".into())).await;

        assert_eq!(session.access_token.as_deref(), Some("tok"));
        assert_eq!(session.user.map(|u| u.id).as_deref(), Some("u2"));
        assert_eq!(session.organization, None);
    }

    #[tokio::test]
    async fn resolved_session_carries_organization() {
        let backend = InMemoryBackend::new().with_user("tok", "u1", Some("MIT"));
        let session = Session::resolve(&backend, Some("tok".into())).await;
        assert_eq!(session.organization.as_deref(), Some("MIT"));
    }
}
