mod handler;
mod model;

pub use handler::profile;
pub use model::ProfileResponse;
