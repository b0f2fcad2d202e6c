//! Operation handlers
//!
//! Each handler rewrites a parsed request into its response in place.

mod error;
mod heartbeat;
mod route_change;
mod table;

pub use error::{HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use route_change::RouteChangeHandler;
pub use table::{HandlerTable, OperationHandler};
