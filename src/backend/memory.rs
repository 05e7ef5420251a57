use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::BackendError;
use crate::models::{Event, EventCategory, Position, Profile, UserIdentity};

use super::{EventBackend, EventOrder, EventQuery, Scope};

/// 内存后端：构造完成后只读，按 EventQuery 的语义返回数据
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    events: Vec<Event>,
    users: HashMap<String, UserIdentity>,
    profiles: HashMap<String, Profile>,
    fail_scoped: bool,
    fail_public: bool,
    /// 用户查询次数，克隆之间共享
    user_lookups: Arc<AtomicUsize>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, events: impl IntoIterator<Item = Event>) -> Self {
        self.events.extend(events);
        self
    }

    /// 注册一个 token 对应的用户及其所在组织
    pub fn with_user(mut self, token: &str, user_id: &str, organization: Option<&str>) -> Self {
        self.users.insert(
            token.to_string(),
            UserIdentity {
                id: user_id.to_string(),
                email: None,
            },
        );
        self.profiles.insert(
            user_id.to_string(),
            Profile {
                user_id: user_id.to_string(),
                organization: organization.map(str::to_string),
            },
        );
        self
    }

    /// 只注册用户身份，不写资料；资料读取会失败
    pub fn with_profileless_user(mut self, token: &str, user_id: &str) -> Self {
        self.users.insert(
            token.to_string(),
            UserIdentity {
                id: user_id.to_string(),
                email: None,
            },
        );
        self
    }

    pub fn user_lookups(&self) -> usize {
        self.user_lookups.load(Ordering::Relaxed)
    }

    pub fn failing_scoped(mut self) -> Self {
        self.fail_scoped = true;
        self
    }

    pub fn failing_public(mut self) -> Self {
        self.fail_public = true;
        self
    }

    /// 生成一条带随机 id 的活动
    pub fn event(
        title: &str,
        category: EventCategory,
        start_time: DateTime<Utc>,
        created_at: DateTime<Utc>,
        position: Position,
        organization: Option<&str>,
    ) -> Event {
        Event {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: String::new(),
            category,
            start_time,
            created_at,
            position,
            address: None,
            place_name: None,
            organization: organization.map(str::to_string),
            creator_id: "fixture".to_string(),
        }
    }
}

impl EventBackend for InMemoryBackend {
    async fn current_user(&self, access_token: &str) -> Result<UserIdentity, BackendError> {
        self.user_lookups.fetch_add(1, Ordering::Relaxed);
        self.users
            .get(access_token)
            .cloned()
            .ok_or(BackendError::Unauthorized)
    }

    async fn profile(&self, _access_token: &str, user_id: &str) -> Result<Profile, BackendError> {
        self.profiles
            .get(user_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("profile {}", user_id)))
    }

    async fn query_events(
        &self,
        _access_token: Option<&str>,
        query: &EventQuery,
    ) -> Result<Vec<Event>, BackendError> {
        let failing = match query.scope {
            Scope::Organization(_) => self.fail_scoped,
            Scope::Public => self.fail_public,
        };
        if failing {
            return Err(BackendError::Status {
                status: 503,
                message: "injected failure".into(),
            });
        }

        let mut events: Vec<Event> = self
            .events
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();

        match query.order {
            EventOrder::StartTimeAsc => events.sort_by(|a, b| a.start_time.cmp(&b.start_time)),
            EventOrder::StartTimeDesc => events.sort_by(|a, b| b.start_time.cmp(&a.start_time)),
            EventOrder::CreatedAtAsc => events.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            EventOrder::CreatedAtDesc => events.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[tokio::test]
    async fn query_applies_scope_category_and_start_bound() {
        let now = Utc::now();
        let backend = InMemoryBackend::new().with_events([
            InMemoryBackend::event("a", EventCategory::Food, now + TimeDelta::days(1), now, Position::Unlocated, Some("MIT")),
            InMemoryBackend::event("b", EventCategory::Sports, now + TimeDelta::days(1), now, Position::Unlocated, Some("MIT")),
            InMemoryBackend::event("c", EventCategory::Food, now - TimeDelta::days(2), now, Position::Unlocated, Some("MIT")),
            InMemoryBackend::event("d", EventCategory::Food, now + TimeDelta::days(1), now, Position::Unlocated, None),
        ]);

        let mut query = EventQuery::new(Scope::Organization("MIT".into()), now - TimeDelta::hours(1));
        query.category = Some(EventCategory::Food);
        let events = backend.query_events(None, &query).await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "a");
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let backend = InMemoryBackend::new().with_user("tok", "u1", Some("MIT"));
        assert!(matches!(
            backend.current_user("other").await,
            Err(BackendError::Unauthorized)
        ));
        assert_eq!(backend.current_user("tok").await.unwrap().id, "u1");
    }

    #[tokio::test]
    async fn profileless_user_has_no_profile() {
        let backend = InMemoryBackend::new().with_profileless_user("tok", "u2");
        assert_eq!(backend.current_user("tok").await.unwrap().id, "u2");
        assert!(matches!(
            backend.profile("tok", "u2").await,
            Err(BackendError::NotFound(_))
        ));
        assert_eq!(backend.clone().user_lookups(), 1);
    }
}
