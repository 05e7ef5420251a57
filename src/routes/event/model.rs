use chrono::{DateTime, FixedOffset, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::EventBackend;
use crate::discovery::{Pipeline, merge_visible};
use crate::error::{FeedError, FilterError};
use crate::models::{Event, EventCategory, FilterState, Session, SortStrategy, UserLocation};
use crate::utils::start_of_today;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub category: Option<String>,
    pub sort: Option<String>,
    pub radius: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// 客户端所在时区相对 UTC 的分钟数，用来确定"今天"
    pub utc_offset_minutes: Option<i32>,
}

/// 校验后的请求
#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub filter: FilterState,
    pub location: Option<UserLocation>,
    pub starts_after: DateTime<Utc>,
}

impl FeedQuery {
    pub fn into_request(self, pipeline: &Pipeline) -> Result<FeedRequest, FilterError> {
        let filter = pipeline.filter_state(
            self.category.as_deref(),
            self.sort.as_deref(),
            self.radius,
        )?;
        let location = UserLocation::from_query(self.latitude, self.longitude)?;

        let starts_after = match self.utc_offset_minutes {
            Some(minutes) => {
                let offset = minutes
                    .checked_mul(60)
                    .and_then(FixedOffset::east_opt)
                    .ok_or(FilterError::InvalidOffset(minutes))?;
                start_of_today(&Utc::now().with_timezone(&offset))
            }
            None => start_of_today(&Local::now()),
        };

        Ok(FeedRequest {
            filter,
            location,
            starts_after,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct EventView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: EventCategory,
    pub start_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub place_name: Option<String>,
    pub university: Option<String>,
    pub creator_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_miles: Option<f64>,
    /// 已开始的活动，客户端置灰显示
    pub expired: bool,
}

impl EventView {
    pub fn new(event: Event, location: Option<&UserLocation>, now: DateTime<Utc>) -> Self {
        let coordinate = event.position.coordinate();
        Self {
            distance_miles: location.and_then(|l| event.distance_from(l)),
            expired: event.is_past(now),
            latitude: coordinate.map(|c| c.latitude),
            longitude: coordinate.map(|c| c.longitude),
            id: event.id,
            title: event.title,
            description: event.description,
            category: event.category,
            start_time: event.start_time,
            created_at: event.created_at,
            address: event.address,
            place_name: event.place_name,
            university: event.organization,
            creator_id: event.creator_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub events: Vec<EventView>,
    pub total: usize,
    pub filter: FilterState,
    /// 有分区查询失败、结果不完整
    pub degraded: bool,
}

#[derive(Debug, Serialize)]
pub struct MapPin {
    pub id: String,
    pub title: String,
    pub category: EventCategory,
    pub latitude: f64,
    pub longitude: f64,
    pub place_name: Option<String>,
}

impl MapPin {
    pub fn from_event(event: Event) -> Option<Self> {
        let coordinate = event.position.coordinate()?;
        Some(Self {
            id: event.id,
            title: event.title,
            category: event.category,
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            place_name: event.place_name,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub radius_options: Vec<f64>,
    pub default_radius: f64,
    pub sort_strategies: Vec<SortStrategy>,
    pub default_sort: SortStrategy,
    pub categories: Vec<EventCategory>,
}

impl From<&Pipeline> for OptionsResponse {
    fn from(pipeline: &Pipeline) -> Self {
        let config = pipeline.config();
        Self {
            radius_options: config.radius_options.clone(),
            default_radius: config.default_radius,
            sort_strategies: config.sort_strategies.clone(),
            default_sort: config.default_sort,
            categories: EventCategory::ALL.to_vec(),
        }
    }
}

pub struct LoadedFeed {
    pub events: Vec<Event>,
    pub degraded: bool,
    pub error: Option<FeedError>,
}

/// 拉取可见活动并跑一遍管道
pub async fn load_feed<B: EventBackend>(
    backend: &B,
    pipeline: &Pipeline,
    session: &Session,
    request: &FeedRequest,
) -> LoadedFeed {
    let outcome = merge_visible(
        backend,
        session.access_token.as_deref(),
        session.organization.as_deref(),
        request.starts_after,
    )
    .await;

    let events = pipeline.run(&outcome.events, &request.filter, request.location.as_ref());
    LoadedFeed {
        events,
        degraded: outcome.is_degraded(),
        error: outcome.error(),
    }
}
