//! Routing change handler (op 0)

use super::{HandlerResult, OperationHandler};
use crate::protocol::{OpCode, Proto, RouteChangePayload};
use crate::zone::RoutingId;

/// Acknowledges a routing change with an empty reply
#[derive(Debug, Default, Clone, Copy)]
pub struct RouteChangeHandler;

impl OperationHandler for RouteChangeHandler {
    fn handle(&self, id: RoutingId, proto: &mut Proto) -> HandlerResult<()> {
        let change: RouteChangePayload = serde_json::from_slice(&proto.body)?;
        tracing::debug!(id = %id, uid = change.uid, mid = change.mid, "routing change");

        proto.set_reply(OpCode::RouteChangeReply, &[]);
        Ok(())
    }
}
