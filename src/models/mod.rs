mod event;
mod filter;
mod location;
mod session;

pub use event::{Coordinate, Event, EventCategory, EventRow, Position};
pub use filter::{CategorySelection, FilterState, SortStrategy};
pub use location::UserLocation;
pub use session::{Profile, Session, UserIdentity};
