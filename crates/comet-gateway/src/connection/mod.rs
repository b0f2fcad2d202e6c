//! Connection lifecycle
//!
//! Sessions, the per-connection pipelining ring, the close signal and the
//! state machine that ties them to a transport.

mod closer;
mod error;
mod ring;
mod serve;
mod session;

pub use closer::{CloseReason, Closer};
pub use error::ConnectionError;
pub use ring::{ring, ReadSlot, RingConsumer, RingError, RingProducer, WriteSlot};
pub use serve::{arm_handshake_timer, serve_connection};
pub use session::{PushError, Session, Signal};
