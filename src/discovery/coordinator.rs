// 管道协调器
// 持有筛选状态、用户位置和最近一次合并结果，状态变化时重新计算并发布

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use tokio::sync::watch;

use crate::backend::{EventBackend, LocationProvider};
use crate::error::{FeedError, FilterError, LocationError};
use crate::models::{CategorySelection, Event, FilterState, Session, SortStrategy, UserLocation};
use crate::utils::start_of_today;

use super::merge::{MergeOutcome, merge_visible};
use super::pipeline::Pipeline;

/// 发给渲染端的结果
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub events: Vec<Event>,
    pub filter: FilterState,
    pub location: Option<UserLocation>,
    pub error: Option<FeedError>,
    /// 产生这批原始数据的请求代号
    pub generation: u64,
}

/// 一次已发出、尚未完成的拉取
pub struct PendingRefresh<B> {
    backend: Arc<B>,
    generation: u64,
    access_token: Option<String>,
    organization: Option<String>,
    starts_after: DateTime<Utc>,
}

pub struct FetchedEvents {
    generation: u64,
    outcome: MergeOutcome,
}

impl<B: EventBackend> PendingRefresh<B> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn fetch(self) -> FetchedEvents {
        let outcome = merge_visible(
            &*self.backend,
            self.access_token.as_deref(),
            self.organization.as_deref(),
            self.starts_after,
        )
        .await;
        FetchedEvents {
            generation: self.generation,
            outcome,
        }
    }
}

pub struct Coordinator<B, L> {
    backend: Arc<B>,
    locator: L,
    pipeline: Pipeline,
    session: Session,
    filter: FilterState,
    location: Option<UserLocation>,
    raw: Vec<Event>,
    error: Option<FeedError>,
    issued: u64,
    applied: u64,
    sender: watch::Sender<FeedSnapshot>,
}

impl<B: EventBackend, L: LocationProvider> Coordinator<B, L> {
    pub fn new(backend: Arc<B>, locator: L, pipeline: Pipeline, session: Session) -> Self {
        let filter = pipeline.default_filter();
        let (sender, _) = watch::channel(FeedSnapshot {
            events: Vec::new(),
            filter,
            location: None,
            error: None,
            generation: 0,
        });
        Self {
            backend,
            locator,
            pipeline,
            session,
            filter,
            location: None,
            raw: Vec::new(),
            error: None,
            issued: 0,
            applied: 0,
            sender,
        }
    }

    /// 订阅结果；渲染端只读
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.sender.subscribe()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.sender.borrow().clone()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn location(&self) -> Option<&UserLocation> {
        self.location.as_ref()
    }

    pub fn set_category(&mut self, category: CategorySelection) {
        self.filter.category = category;
        self.republish();
    }

    pub fn set_sort(&mut self, sort: SortStrategy) -> Result<(), FilterError> {
        self.filter.sort = self.pipeline.check_sort(sort)?;
        self.republish();
        Ok(())
    }

    pub fn set_radius(&mut self, radius_miles: f64) -> Result<(), FilterError> {
        self.filter.radius_miles = self.pipeline.check_radius(radius_miles)?;
        self.republish();
        Ok(())
    }

    pub fn set_location(&mut self, location: Option<UserLocation>) {
        self.location = location;
        self.republish();
    }

    /// 向定位能力请求位置。拒绝授权时清空位置，暂时不可用时保留上次的位置
    pub async fn resolve_location(&mut self) -> Result<(), LocationError> {
        match self.locator.current_location().await {
            Ok(location) => {
                self.set_location(Some(location));
                Ok(())
            }
            Err(LocationError::PermissionDenied) => {
                tracing::info!("Location permission denied, distance filtering disabled");
                self.set_location(None);
                Err(LocationError::PermissionDenied)
            }
            Err(e) => {
                tracing::warn!("Location unavailable, keeping last known position: {}", e);
                Err(e)
            }
        }
    }

    pub fn begin_refresh(&mut self) -> PendingRefresh<B> {
        self.begin_refresh_at(start_of_today(&Local::now()))
    }

    pub fn begin_refresh_at(&mut self, starts_after: DateTime<Utc>) -> PendingRefresh<B> {
        self.issued += 1;
        PendingRefresh {
            backend: Arc::clone(&self.backend),
            generation: self.issued,
            access_token: self.session.access_token.clone(),
            organization: self.session.organization.clone(),
            starts_after,
        }
    }

    /// 安装拉取结果；比已安装结果更旧的直接丢弃，返回是否生效
    pub fn apply_fetch(&mut self, fetched: FetchedEvents) -> bool {
        if fetched.generation <= self.applied {
            tracing::debug!(
                "Discarding stale fetch {} (latest applied {})",
                fetched.generation,
                self.applied
            );
            return false;
        }
        self.applied = fetched.generation;
        self.error = fetched.outcome.error();
        self.raw = fetched.outcome.events;
        self.republish();
        true
    }

    pub async fn refresh(&mut self) -> bool {
        let pending = self.begin_refresh();
        let fetched = pending.fetch().await;
        self.apply_fetch(fetched)
    }

    fn republish(&mut self) {
        let events = self.pipeline.run(&self.raw, &self.filter, self.location.as_ref());
        self.sender.send_replace(FeedSnapshot {
            events,
            filter: self.filter,
            location: self.location,
            error: self.error.clone(),
            generation: self.applied,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FixedLocation, InMemoryBackend};
    use crate::discovery::PipelineConfig;
    use crate::models::{Coordinate, EventCategory, Position};
    use chrono::TimeDelta;
    use std::sync::atomic::{AtomicBool, Ordering};

    // 第一次返回位置，之后一直暂时不可用
    struct FlakyLocation {
        first: UserLocation,
        used: AtomicBool,
    }

    impl LocationProvider for FlakyLocation {
        async fn current_location(&self) -> Result<UserLocation, LocationError> {
            if self.used.swap(true, Ordering::SeqCst) {
                Err(LocationError::Unavailable("gps timeout".into()))
            } else {
                Ok(self.first)
            }
        }
    }

    fn located(lat: f64) -> Position {
        Position::Located(Coordinate::new(lat, -74.0).unwrap())
    }

    fn session(org: &str) -> Session {
        Session {
            access_token: Some("tok".into()),
            user: None,
            organization: Some(org.into()),
        }
    }

    fn coordinator(backend: InMemoryBackend, locator: FixedLocation) -> Coordinator<InMemoryBackend, FixedLocation> {
        Coordinator::new(
            Arc::new(backend),
            locator,
            Pipeline::new(PipelineConfig::default()),
            session("MIT"),
        )
    }

    fn campus() -> InMemoryBackend {
        let now = Utc::now();
        InMemoryBackend::new().with_events([
            InMemoryBackend::event("pizza", EventCategory::Food, now + TimeDelta::days(1), now - TimeDelta::hours(3), located(40.01), Some("MIT")),
            InMemoryBackend::event("soccer", EventCategory::Sports, now + TimeDelta::days(2), now - TimeDelta::hours(1), located(40.3), None),
            InMemoryBackend::event("lecture", EventCategory::Academic, now + TimeDelta::days(1), now - TimeDelta::hours(2), Position::Unlocated, None),
        ])
    }

    #[tokio::test]
    async fn refresh_publishes_merged_and_sorted_events() {
        let mut coordinator = coordinator(campus(), FixedLocation(None));
        let receiver = coordinator.subscribe();

        assert!(coordinator.refresh().await);
        let snapshot = receiver.borrow().clone();
        let titles: Vec<_> = snapshot.events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["soccer", "lecture", "pizza"]);
        assert_eq!(snapshot.generation, 1);
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn filter_changes_rerun_the_pipeline() {
        let here = UserLocation::new(40.0, -74.0).unwrap();
        let mut coordinator = coordinator(campus(), FixedLocation(Some(here)));
        coordinator.refresh().await;

        coordinator.set_category(CategorySelection::Only(EventCategory::Food));
        assert_eq!(coordinator.snapshot().events.len(), 1);

        coordinator.set_category(CategorySelection::All);
        coordinator.resolve_location().await.unwrap();
        coordinator.set_radius(5.0).unwrap();
        coordinator.set_sort(SortStrategy::Nearby).unwrap();
        let titles: Vec<_> = coordinator
            .snapshot()
            .events
            .iter()
            .map(|e| e.title.clone())
            .collect();
        assert_eq!(titles, ["pizza"]);

        assert!(coordinator.set_radius(3.0).is_err());
        assert_eq!(coordinator.filter().radius_miles, 5.0);
    }

    #[tokio::test]
    async fn denied_location_makes_geo_filter_inert() {
        let mut coordinator = coordinator(campus(), FixedLocation(None));
        coordinator.refresh().await;
        coordinator.set_radius(1.0).unwrap();
        coordinator.set_sort(SortStrategy::Nearby).unwrap();

        assert_eq!(
            coordinator.resolve_location().await,
            Err(LocationError::PermissionDenied)
        );
        assert!(coordinator.location().is_none());
        assert_eq!(coordinator.snapshot().events.len(), 3);
    }

    #[tokio::test]
    async fn stale_fetch_does_not_overwrite_newer_result() {
        let mut coordinator = coordinator(campus(), FixedLocation(None));
        let now = Utc::now();

        let old = coordinator.begin_refresh_at(now + TimeDelta::days(30));
        let new = coordinator.begin_refresh_at(now - TimeDelta::days(1));
        assert!(new.generation() > old.generation());

        let new_result = new.fetch().await;
        let old_result = old.fetch().await;

        assert!(coordinator.apply_fetch(new_result));
        assert!(!coordinator.apply_fetch(old_result));
        assert_eq!(coordinator.snapshot().events.len(), 3);
        assert_eq!(coordinator.snapshot().generation, 2);
    }

    #[tokio::test]
    async fn total_failure_surfaces_error_with_empty_feed() {
        let backend = campus().failing_scoped().failing_public();
        let mut coordinator = coordinator(backend, FixedLocation(None));
        coordinator.refresh().await;

        let snapshot = coordinator.snapshot();
        assert!(snapshot.events.is_empty());
        assert_eq!(snapshot.error, Some(FeedError::Unavailable));
    }

    #[tokio::test]
    async fn unavailable_location_keeps_last_position() {
        let here = UserLocation::new(40.0, -74.0).unwrap();
        let locator = FlakyLocation {
            first: here,
            used: AtomicBool::new(false),
        };
        let mut coordinator = Coordinator::new(
            Arc::new(campus()),
            locator,
            Pipeline::new(PipelineConfig::default()),
            session("MIT"),
        );
        coordinator.refresh().await;
        coordinator.set_radius(5.0).unwrap();

        coordinator.resolve_location().await.unwrap();
        let before = coordinator.snapshot();
        assert_eq!(before.events.len(), 1);

        assert!(matches!(
            coordinator.resolve_location().await,
            Err(LocationError::Unavailable(_))
        ));
        assert_eq!(coordinator.location(), Some(&here));
        let after = coordinator.snapshot();
        assert_eq!(after.location, Some(here));
        let titles: Vec<_> = after.events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["pizza"]);
    }
}
