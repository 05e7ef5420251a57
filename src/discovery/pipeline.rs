use serde::Serialize;

use crate::error::FilterError;
use crate::models::{CategorySelection, Event, FilterState, SortStrategy, UserLocation};

use super::filter::{filter_by_category, filter_by_radius};
use super::sort::sort_events;

/// 不同页面之间的差异以配置表达：可选半径与可用排序方式
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineConfig {
    /// 可选半径（英里）
    pub radius_options: Vec<f64>,
    pub default_radius: f64,
    pub sort_strategies: Vec<SortStrategy>,
    pub default_sort: SortStrategy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            radius_options: vec![1.0, 5.0, 10.0, 25.0],
            default_radius: 10.0,
            sort_strategies: vec![SortStrategy::Recent, SortStrategy::Popular, SortStrategy::Nearby],
            default_sort: SortStrategy::Recent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn default_filter(&self) -> FilterState {
        FilterState {
            category: CategorySelection::All,
            sort: self.config.default_sort,
            radius_miles: self.config.default_radius,
        }
    }

    pub fn check_radius(&self, radius_miles: f64) -> Result<f64, FilterError> {
        if self.config.radius_options.contains(&radius_miles) {
            Ok(radius_miles)
        } else {
            Err(FilterError::RadiusNotOffered(radius_miles))
        }
    }

    pub fn check_sort(&self, sort: SortStrategy) -> Result<SortStrategy, FilterError> {
        if self.config.sort_strategies.contains(&sort) {
            Ok(sort)
        } else {
            Err(FilterError::SortNotOffered(sort.to_string()))
        }
    }

    /// 由可选的请求参数构造筛选状态，缺省项取默认值
    pub fn filter_state(
        &self,
        category: Option<&str>,
        sort: Option<&str>,
        radius_miles: Option<f64>,
    ) -> Result<FilterState, FilterError> {
        let mut state = self.default_filter();
        if let Some(category) = category {
            state.category = category.parse()?;
        }
        if let Some(sort) = sort {
            state.sort = self.check_sort(sort.parse()?)?;
        }
        if let Some(radius) = radius_miles {
            state.radius_miles = self.check_radius(radius)?;
        }
        Ok(state)
    }

    /// 类别 → 半径 → 排序，顺序固定：先按半径排除没有坐标的活动再按距离排序
    pub fn run(
        &self,
        events: &[Event],
        filter: &FilterState,
        location: Option<&UserLocation>,
    ) -> Vec<Event> {
        let by_category = filter_by_category(events, filter.category);
        let in_range = filter_by_radius(&by_category, location, filter.radius_miles);
        sort_events(&in_range, filter.sort, location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventCategory;

    #[test]
    fn missing_params_fall_back_to_defaults() {
        let pipeline = Pipeline::new(PipelineConfig::default());
        let state = pipeline.filter_state(None, None, None).unwrap();
        assert_eq!(state, pipeline.default_filter());
        assert_eq!(state.radius_miles, 10.0);
    }

    #[test]
    fn radius_must_be_offered() {
        let pipeline = Pipeline::new(PipelineConfig::default());
        assert_eq!(
            pipeline.filter_state(None, None, Some(7.0)),
            Err(FilterError::RadiusNotOffered(7.0))
        );
        assert_eq!(pipeline.filter_state(None, None, Some(25.0)).unwrap().radius_miles, 25.0);
    }

    #[test]
    fn disabled_sort_is_rejected() {
        let pipeline = Pipeline::new(PipelineConfig {
            sort_strategies: vec![SortStrategy::Recent],
            ..PipelineConfig::default()
        });
        assert!(matches!(
            pipeline.filter_state(None, Some("NEARBY"), None),
            Err(FilterError::SortNotOffered(_))
        ));
        let state = pipeline.filter_state(Some("FOOD"), Some("RECENT"), None).unwrap();
        assert_eq!(state.category, CategorySelection::Only(EventCategory::Food));
    }
}
