// 活动发现管道
// 合并 → 类别筛选 → 半径筛选 → 排序

mod coordinator;
mod filter;
mod merge;
mod pipeline;
mod sort;

pub use coordinator::{Coordinator, FeedSnapshot, FetchedEvents, PendingRefresh};
pub use filter::{filter_by_category, filter_by_radius};
pub use merge::{MergeOutcome, Partition, merge_visible};
pub use pipeline::{Pipeline, PipelineConfig};
pub use sort::sort_events;
