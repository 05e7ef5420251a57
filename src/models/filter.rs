use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FilterError;

use super::event::EventCategory;

/// 类别筛选，ALL 表示不过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategorySelection {
    #[default]
    All,
    Only(EventCategory),
}

impl FromStr for CategorySelection {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "ALL" {
            Ok(CategorySelection::All)
        } else {
            s.parse().map(CategorySelection::Only)
        }
    }
}

impl fmt::Display for CategorySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategorySelection::All => f.write_str("ALL"),
            CategorySelection::Only(c) => c.fmt(f),
        }
    }
}

impl Serialize for CategorySelection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CategorySelection {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortStrategy {
    /// 按创建时间倒序
    Recent,
    /// 占位实现：按开始时间升序，数据模型里还没有热度信号
    Popular,
    /// 按距离升序，需要用户位置
    Nearby,
}

impl SortStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortStrategy::Recent => "RECENT",
            SortStrategy::Popular => "POPULAR",
            SortStrategy::Nearby => "NEARBY",
        }
    }
}

impl fmt::Display for SortStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortStrategy {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECENT" => Ok(SortStrategy::Recent),
            "POPULAR" => Ok(SortStrategy::Popular),
            "NEARBY" => Ok(SortStrategy::Nearby),
            other => Err(FilterError::UnknownSort(other.to_string())),
        }
    }
}

/// 当前的筛选状态，不持久化
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FilterState {
    pub category: CategorySelection,
    pub sort: SortStrategy,
    pub radius_miles: f64,
}
