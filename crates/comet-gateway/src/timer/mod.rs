//! Deadline scheduling for handshake and heartbeat timeouts

mod guard;
mod wheel;

pub use guard::TimerGuard;
pub use wheel::{TimerCallback, TimerHandle, TimerWheel};
