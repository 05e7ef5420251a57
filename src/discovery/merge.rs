// 可见性合并：本校活动 ∪ 公开活动

use chrono::{DateTime, Utc};
use futures_util::future::join;

use crate::backend::{EventBackend, EventQuery, Scope};
use crate::error::FeedError;
use crate::models::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Organization,
    Public,
}

#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub events: Vec<Event>,
    /// 查询失败、被降级为空的分区
    pub failed: Vec<Partition>,
    /// 实际发出查询的分区数
    pub queried: usize,
}

impl MergeOutcome {
    /// 所有分区都失败时才对外报错
    pub fn error(&self) -> Option<FeedError> {
        (self.queried > 0 && self.failed.len() == self.queried).then_some(FeedError::Unavailable)
    }

    pub fn is_degraded(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// 查询调用方组织的活动和公开活动并合并
///
/// 两个分区的开始时间下限相同。组织为空时只查公开分区。
/// 组织字段不可能既等于调用方组织又为空，所以结果天然不重复。
pub async fn merge_visible<B: EventBackend>(
    backend: &B,
    access_token: Option<&str>,
    organization: Option<&str>,
    starts_after: DateTime<Utc>,
) -> MergeOutcome {
    let public_query = EventQuery::new(Scope::Public, starts_after);
    let mut outcome = MergeOutcome::default();

    let (scoped, public) = match organization.filter(|o| !o.is_empty()) {
        Some(org) => {
            let scoped_query = EventQuery::new(Scope::Organization(org.to_string()), starts_after);
            outcome.queried = 2;
            let (scoped, public) = join(
                backend.query_events(access_token, &scoped_query),
                backend.query_events(access_token, &public_query),
            )
            .await;
            (Some((scoped, scoped_query)), public)
        }
        None => {
            outcome.queried = 1;
            (None, backend.query_events(access_token, &public_query).await)
        }
    };

    if let Some((result, query)) = scoped {
        match result {
            Ok(events) => outcome
                .events
                .extend(events.into_iter().filter(|e| query.matches(e))),
            Err(e) => {
                tracing::warn!("Organization partition failed, serving public events only: {}", e);
                outcome.failed.push(Partition::Organization);
            }
        }
    }

    match public {
        Ok(events) => outcome
            .events
            .extend(events.into_iter().filter(|e| public_query.matches(e))),
        Err(e) => {
            tracing::warn!("Public partition failed: {}", e);
            outcome.failed.push(Partition::Public);
        }
    }

    tracing::debug!(
        "Merged {} visible events ({} of {} partitions failed)",
        outcome.events.len(),
        outcome.failed.len(),
        outcome.queried
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::models::{EventCategory, Position};
    use chrono::TimeDelta;
    use std::collections::HashSet;

    fn backend() -> InMemoryBackend {
        let now = Utc::now();
        InMemoryBackend::new().with_events([
            InMemoryBackend::event("mit", EventCategory::Food, now + TimeDelta::days(1), now, Position::Unlocated, Some("MIT")),
            InMemoryBackend::event("open", EventCategory::Sports, now + TimeDelta::days(2), now, Position::Unlocated, None),
            InMemoryBackend::event("harvard", EventCategory::Food, now + TimeDelta::days(3), now, Position::Unlocated, Some("Harvard")),
        ])
    }

    #[tokio::test]
    async fn union_is_disjoint_and_scoped() {
        let outcome = merge_visible(&backend(), None, Some("MIT"), Utc::now()).await;

        assert_eq!(outcome.events.len(), 2);
        assert!(outcome.events.iter().all(|e| e.organization.is_none()
            || e.organization.as_deref() == Some("MIT")));
        let ids: HashSet<_> = outcome.events.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids.len(), outcome.events.len());
        assert!(outcome.error().is_none());
    }

    #[tokio::test]
    async fn missing_organization_queries_public_only() {
        let outcome = merge_visible(&backend(), None, None, Utc::now()).await;
        assert_eq!(outcome.queried, 1);
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].title, "open");
    }

    #[tokio::test]
    async fn organization_failure_degrades_to_public() {
        let outcome = merge_visible(&backend().failing_scoped(), None, Some("MIT"), Utc::now()).await;
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.failed, vec![Partition::Organization]);
        assert!(outcome.is_degraded());
        assert!(outcome.error().is_none());
    }

    #[tokio::test]
    async fn all_partitions_failing_surfaces_error() {
        let failing = backend().failing_scoped().failing_public();
        let outcome = merge_visible(&failing, None, Some("MIT"), Utc::now()).await;
        assert!(outcome.events.is_empty());
        assert_eq!(outcome.error(), Some(FeedError::Unavailable));

        let outcome = merge_visible(&backend().failing_public(), None, None, Utc::now()).await;
        assert_eq!(outcome.error(), Some(FeedError::Unavailable));
    }

    #[tokio::test]
    async fn past_events_are_excluded_from_both_partitions() {
        let outcome = merge_visible(
            &backend(),
            None,
            Some("MIT"),
            Utc::now() + TimeDelta::days(10),
        )
        .await;
        assert!(outcome.events.is_empty());
    }
}
