use crate::models::{CategorySelection, Event, UserLocation};

/// 按类别筛选；ALL 原样返回
pub fn filter_by_category(events: &[Event], selection: CategorySelection) -> Vec<Event> {
    match selection {
        CategorySelection::All => events.to_vec(),
        CategorySelection::Only(category) => events
            .iter()
            .filter(|e| e.category == category)
            .cloned()
            .collect(),
    }
}

/// 按半径（英里）筛选
///
/// 位置未知时不做筛选；位置已知时，没有坐标的活动一律排除。
pub fn filter_by_radius(
    events: &[Event],
    location: Option<&UserLocation>,
    radius_miles: f64,
) -> Vec<Event> {
    let Some(location) = location else {
        return events.to_vec();
    };

    events
        .iter()
        .filter(|e| {
            e.distance_from(location)
                .is_some_and(|distance| distance <= radius_miles)
        })
        .cloned()
        .collect()
}
