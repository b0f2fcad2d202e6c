//! Heartbeat handler (op 1)

use super::{HandlerResult, OperationHandler};
use crate::protocol::{HeartbeatAckPayload, HeartbeatPayload, OpCode, Proto};
use crate::zone::RoutingId;

/// Answers a heartbeat with the server time
///
/// Pushing the connection's deadline out is done by the read loop, not here.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeartbeatHandler;

impl OperationHandler for HeartbeatHandler {
    fn handle(&self, id: RoutingId, proto: &mut Proto) -> HandlerResult<()> {
        if !proto.body.is_empty() {
            let beat: HeartbeatPayload = serde_json::from_slice(&proto.body)?;
            tracing::trace!(id = %id, uid = beat.uid, x = beat.x, y = beat.y, "heartbeat");
        }

        let ack = HeartbeatAckPayload {
            time: chrono::Utc::now().to_rfc3339(),
        };
        let body = serde_json::to_vec(&ack)?;
        proto.set_reply(OpCode::HeartbeatReply, &body);
        Ok(())
    }
}
