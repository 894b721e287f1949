mod refreshable;
mod bulb;
mod manager;

pub use refreshable::*;
pub use bulb::*;
pub use manager::{interface_broadcasts, Manager};
pub(crate) use manager::Shared;
