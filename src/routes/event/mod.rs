mod handler;
mod model;

pub use handler::{feed, map, options};
pub use model::{
    EventView, FeedQuery, FeedRequest, FeedResponse, LoadedFeed, MapPin, OptionsResponse,
    load_feed,
};
