// 托管后端与设备定位的抽象
// 管道只依赖这里的 trait，具体实现见 rest（HTTP）与 memory（内存）

mod memory;
mod rest;

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error::{BackendError, LocationError};
use crate::models::{Event, EventCategory, Profile, UserIdentity, UserLocation};

pub use memory::InMemoryBackend;
pub use rest::RestBackend;

/// 按组织字段筛选
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// organization = 给定值
    Organization(String),
    /// organization IS NULL
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventOrder {
    #[default]
    StartTimeAsc,
    StartTimeDesc,
    CreatedAtAsc,
    CreatedAtDesc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub scope: Scope,
    pub category: Option<EventCategory>,
    /// start_time >= starts_after
    pub starts_after: DateTime<Utc>,
    pub order: EventOrder,
}

impl EventQuery {
    pub fn new(scope: Scope, starts_after: DateTime<Utc>) -> Self {
        Self {
            scope,
            category: None,
            starts_after,
            order: EventOrder::default(),
        }
    }

    /// 判断一条活动是否满足本查询的筛选条件
    pub fn matches(&self, event: &Event) -> bool {
        let scope_ok = match &self.scope {
            Scope::Organization(org) => event.organization.as_deref() == Some(org.as_str()),
            Scope::Public => event.organization.is_none(),
        };
        scope_ok
            && self.category.is_none_or(|c| event.category == c)
            && event.start_time >= self.starts_after
    }
}

pub trait EventBackend: Send + Sync {
    fn current_user(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<UserIdentity, BackendError>> + Send;

    fn profile(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<Profile, BackendError>> + Send;

    fn query_events(
        &self,
        access_token: Option<&str>,
        query: &EventQuery,
    ) -> impl Future<Output = Result<Vec<Event>, BackendError>> + Send;
}

/// 设备定位能力
pub trait LocationProvider: Send + Sync {
    fn current_location(&self) -> impl Future<Output = Result<UserLocation, LocationError>> + Send;
}

/// 固定位置；None 表示用户拒绝了定位权限
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocation(pub Option<UserLocation>);

impl LocationProvider for FixedLocation {
    async fn current_location(&self) -> Result<UserLocation, LocationError> {
        self.0.ok_or(LocationError::PermissionDenied)
    }
}
