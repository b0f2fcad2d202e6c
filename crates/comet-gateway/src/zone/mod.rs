//! Session registry sharded by routing id

mod registry;
mod routing;

pub use registry::{PushOutcome, Zone, ZoneStats, Zones};
pub use routing::RoutingId;
