//! Dispatch table indexed by op code

use super::{HandlerError, HandlerResult, HeartbeatHandler, RouteChangeHandler};
use crate::protocol::{OpCode, Proto, C2S_MAX};
use crate::zone::RoutingId;
use std::fmt;
use std::sync::Arc;

/// Turns a request into its response in place
///
/// Implementations replace `op` with the reply code and rewrite or clear the
/// body. An error closes the connection.
pub trait OperationHandler: Send + Sync {
    fn handle(&self, id: RoutingId, proto: &mut Proto) -> HandlerResult<()>;
}

/// Handlers for the client-to-server op codes
pub struct HandlerTable {
    handlers: Vec<Option<Arc<dyn OperationHandler>>>,
}

impl HandlerTable {
    /// An empty table covering every client op code
    #[must_use]
    pub fn empty() -> Self {
        Self {
            handlers: vec![None; C2S_MAX as usize],
        }
    }

    /// Register `handler` for `op`
    ///
    /// Codes outside the client range cannot be registered; returns false.
    pub fn register(&mut self, op: OpCode, handler: Arc<dyn OperationHandler>) -> bool {
        match self.handlers.get_mut(op.as_i16() as usize) {
            Some(slot) if op.is_client_op() => {
                *slot = Some(handler);
                true
            }
            _ => false,
        }
    }

    /// Run the handler for `proto.op`
    pub fn dispatch(&self, id: RoutingId, proto: &mut Proto) -> HandlerResult<()> {
        let handler = usize::try_from(proto.op)
            .ok()
            .and_then(|index| self.handlers.get(index))
            .and_then(Option::as_ref)
            .ok_or(HandlerError::UnknownOperation(proto.op))?;
        handler.handle(id, proto)
    }

    #[must_use]
    pub fn is_registered(&self, op: i16) -> bool {
        usize::try_from(op)
            .ok()
            .and_then(|index| self.handlers.get(index))
            .is_some_and(Option::is_some)
    }
}

impl Default for HandlerTable {
    /// Routing change and heartbeat; auth is only valid as the handshake frame
    fn default() -> Self {
        let mut table = Self::empty();
        table.register(OpCode::RouteChange, Arc::new(RouteChangeHandler));
        table.register(OpCode::Heartbeat, Arc::new(HeartbeatHandler));
        table
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered: Vec<usize> = self
            .handlers
            .iter()
            .enumerate()
            .filter_map(|(op, handler)| handler.as_ref().map(|_| op))
            .collect();
        f.debug_struct("HandlerTable")
            .field("registered", &registered)
            .finish()
    }
}
