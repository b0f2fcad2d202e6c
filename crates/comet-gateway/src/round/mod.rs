//! Sharded resource pools handed to connections at accept time

mod distributor;
mod pool;

pub use distributor::{Round, RoundOptions};
pub use pool::{BufferPool, PooledBuffer};
