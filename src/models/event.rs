// 活动实体
// 后端返回的原始行以及校验过的领域模型

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FilterError, RowError};
use crate::utils::calculate_distance;

use super::location::UserLocation;

/// 活动类别，后端以大写字符串存储
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventCategory {
    Food,
    Concert,
    Sports,
    Academic,
    Other,
}

impl EventCategory {
    pub const ALL: [EventCategory; 5] = [
        EventCategory::Food,
        EventCategory::Concert,
        EventCategory::Sports,
        EventCategory::Academic,
        EventCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Food => "FOOD",
            EventCategory::Concert => "CONCERT",
            EventCategory::Sports => "SPORTS",
            EventCategory::Academic => "ACADEMIC",
            EventCategory::Other => "OTHER",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = FilterError;

    // 区分大小写，只接受后端存储的大写形式
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| FilterError::UnknownCategory(s.to_string()))
    }
}

/// 经纬度坐标（已校验范围）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// 两个值都有限且在合法范围内才构成坐标
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }
}

/// 活动位置：要么有可用坐标，要么没有
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    Located(Coordinate),
    Unlocated,
}

impl Position {
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Self {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Coordinate::new(lat, lon)
                .map(Position::Located)
                .unwrap_or(Position::Unlocated),
            _ => Position::Unlocated,
        }
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            Position::Located(c) => Some(*c),
            Position::Unlocated => None,
        }
    }
}

/// 后端 events 表的一行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: EventCategory,
    pub start_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub place_name: Option<String>,
    /// 所属组织（大学），为空表示公开
    #[serde(default)]
    pub university: Option<String>,
    pub creator_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: EventCategory,
    pub start_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub position: Position,
    pub address: Option<String>,
    pub place_name: Option<String>,
    pub organization: Option<String>,
    pub creator_id: String,
}

impl Event {
    /// 到用户位置的距离（英里），活动没有坐标时为 None
    pub fn distance_from(&self, location: &UserLocation) -> Option<f64> {
        self.position.coordinate().map(|c| {
            calculate_distance(
                location.latitude,
                location.longitude,
                c.latitude,
                c.longitude,
            )
        })
    }

    /// 已开始的活动只做置灰展示，不删除
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.start_time < now
    }

    pub fn is_public(&self) -> bool {
        self.organization.is_none()
    }
}

impl TryFrom<EventRow> for Event {
    type Error = RowError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        if row.title.trim().is_empty() {
            return Err(RowError::EmptyTitle(row.id));
        }

        Ok(Event {
            position: Position::from_parts(row.latitude, row.longitude),
            id: row.id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            category: row.category,
            start_time: row.start_time,
            created_at: row.created_at,
            address: row.address,
            place_name: row.place_name,
            organization: row.university.filter(|u| !u.is_empty()),
            creator_id: row.creator_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use serde_json::json;

    fn row(latitude: Option<f64>, longitude: Option<f64>) -> EventRow {
        serde_json::from_value(json!({
            "id": "evt-1",
            "title": "Free pizza",
            "description": null,
            "category": "FOOD",
            "start_time": "2026-10-15T18:00:00+00:00",
            "created_at": "2026-10-14T09:00:00+00:00",
            "latitude": latitude,
            "longitude": longitude,
            "university": "MIT",
            "creator_id": "user-1"
        }))
        .unwrap()
    }

    #[test]
    fn row_with_both_coordinates_is_located() {
        let event = Event::try_from(row(Some(42.36), Some(-71.09))).unwrap();
        assert_eq!(
            event.position,
            Position::Located(Coordinate {
                latitude: 42.36,
                longitude: -71.09
            })
        );
        assert_eq!(event.organization.as_deref(), Some("MIT"));
        assert_eq!(event.description, "");
    }

    #[test]
    fn row_missing_a_coordinate_is_unlocated() {
        assert_eq!(
            Event::try_from(row(Some(42.36), None)).unwrap().position,
            Position::Unlocated
        );
        assert_eq!(
            Event::try_from(row(None, None)).unwrap().position,
            Position::Unlocated
        );
    }

    #[test]
    fn out_of_range_coordinate_is_unlocated() {
        assert_eq!(
            Event::try_from(row(Some(91.0), Some(10.0))).unwrap().position,
            Position::Unlocated
        );
        assert_eq!(
            Event::try_from(row(Some(10.0), Some(-181.0))).unwrap().position,
            Position::Unlocated
        );
    }

    #[test]
    fn unlocated_event_has_no_distance() {
        let event = Event::try_from(row(None, None)).unwrap();
        let here = UserLocation::new(42.36, -71.09).unwrap();
        assert_eq!(event.distance_from(&here), None);
    }

    #[test]
    fn blank_title_is_rejected() {
        let mut r = row(None, None);
        r.title = "   ".into();
        assert_eq!(
            Event::try_from(r).unwrap_err(),
            RowError::EmptyTitle("evt-1".into())
        );
    }

    #[test]
    fn empty_university_means_public() {
        let mut r = row(None, None);
        r.university = Some(String::new());
        assert!(Event::try_from(r).unwrap().is_public());
    }

    #[test]
    fn category_parsing_is_case_sensitive() {
        assert_eq!("SPORTS".parse::<EventCategory>(), Ok(EventCategory::Sports));
        assert!("sports".parse::<EventCategory>().is_err());
        assert!("ALL".parse::<EventCategory>().is_err());
    }

    #[test]
    fn past_events_are_flagged() {
        let event = Event::try_from(row(None, None)).unwrap();
        assert!(!event.is_past(event.start_time - TimeDelta::hours(1)));
        assert!(event.is_past(event.start_time + TimeDelta::seconds(1)));
    }
}
