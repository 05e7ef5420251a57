use std::cmp::Ordering;

use crate::models::{Event, SortStrategy, UserLocation};

/// 排序，返回新的序列，不修改输入
///
/// 全部使用稳定排序，相同键保持原有相对顺序。
pub fn sort_events(
    events: &[Event],
    strategy: SortStrategy,
    location: Option<&UserLocation>,
) -> Vec<Event> {
    let mut sorted = events.to_vec();
    match strategy {
        SortStrategy::Recent => sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        // 占位：没有热度数据，先按开始时间
        SortStrategy::Popular => sorted.sort_by(|a, b| a.start_time.cmp(&b.start_time)),
        SortStrategy::Nearby => {
            let Some(location) = location else {
                return sorted;
            };
            let mut keyed: Vec<(Option<f64>, Event)> = sorted
                .into_iter()
                .map(|e| (e.distance_from(location), e))
                .collect();
            keyed.sort_by(|(a, _), (b, _)| compare_distance(*a, *b));
            sorted = keyed.into_iter().map(|(_, e)| e).collect();
        }
    }
    sorted
}

// 没有坐标的排在最后
fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
