//! Per-connection state machine
//!
//! `Accepted -> Handshaking -> Established -> Draining -> Closed`
//!
//! The caller arms the handshake deadline at accept time and hands over the
//! transport halves. After a successful handshake the same timer entry becomes
//! the heartbeat deadline, the session is registered, and two tasks run: the
//! read loop (this task) and the dispatch loop (spawned). Teardown runs once,
//! here, whichever side failed first.

use super::closer::{CloseReason, Closer};
use super::error::ConnectionError;
use super::ring::{ring, RingConsumer, RingProducer};
use super::session::{Session, Signal};
use crate::auth::{AuthError, Grant};
use crate::protocol::{AuthAckPayload, AuthPayload, OpCode, Proto, ProtocolError, ProtocolResult};
use crate::server::Server;
use crate::timer::TimerGuard;
use crate::transport::{FrameReader, FrameWriter};
use crate::zone::RoutingId;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Upper bound on flushing and closing the outbound half during teardown
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Arm the handshake deadline for a freshly accepted connection
pub fn arm_handshake_timer(server: &Server, index: usize, closer: &Closer) -> TimerGuard {
    let wheel = Arc::clone(server.round().pick_timer(index));
    let closer = closer.clone();
    TimerGuard::arm(wheel, server.options().handshake_timeout, move || {
        closer.close(CloseReason::Expired);
    })
}

/// Drive one connection from handshake to teardown
pub async fn serve_connection<R, W>(
    server: Arc<Server>,
    mut reader: R,
    mut writer: W,
    timer: TimerGuard,
    closer: Closer,
    addr: SocketAddr,
) -> Result<(), ConnectionError>
where
    R: FrameReader,
    W: FrameWriter + 'static,
{
    let mut proto = Proto::default();

    let handshake = tokio::select! {
        biased;
        reason = closer.closed() => Err(ConnectionError::from_close(reason, false)),
        grant = handshake(&server, &mut reader, &mut proto) => grant,
    };
    let grant = match handshake {
        Ok(grant) => grant,
        Err(e) => {
            closer.close(CloseReason::Local);
            return Err(e);
        }
    };

    let id = grant.routing_id;
    timer.set_key(id.as_u64());
    // Fails only if the handshake deadline fired meanwhile; the closer is set then.
    timer.reschedule(grant.heartbeat);

    let (tx, rx) = mpsc::channel(server.options().svr_proto);
    let session = Session::new(id, tx, closer.clone());
    if !server.zones().put(Arc::clone(&session)) {
        closer.close(CloseReason::Local);
        return Err(AuthError::ZoneMismatch {
            id,
            zone: grant.zone,
        }
        .into());
    }
    tracing::info!(id = %id, addr = %addr, zone = grant.zone, "connection established");

    let ack = tokio::select! {
        biased;
        reason = closer.closed() => Err(ConnectionError::from_close(reason, true)),
        written = write_auth_ack(&mut writer, &mut proto, &grant) => written.map_err(Into::into),
    };

    let result = match ack {
        Ok(()) => {
            let (mut producer, consumer) = ring(server.options().cli_proto);
            let dispatch = tokio::spawn(dispatch_loop(
                Arc::clone(&server),
                writer,
                consumer,
                rx,
                closer.clone(),
                id,
            ));

            let result = read_loop(
                &server,
                &mut reader,
                &mut producer,
                &session,
                &closer,
                &timer,
                grant.heartbeat,
                &mut proto,
            )
            .await;

            server.zones().remove_session(&session);
            closer.close(CloseReason::Local);
            // Fails only when the dispatch loop already exited.
            let _ = session.signal(Signal::Finish).await;
            if let Err(e) = dispatch.await {
                tracing::error!(id = %id, error = %e, "dispatch loop panicked");
            }
            result
        }
        Err(e) => Err(e),
    };

    server.zones().remove_session(&session);
    drop(timer);
    closer.close(CloseReason::Local);
    tracing::info!(id = %id, addr = %addr, "connection closed");
    result
}

/// Read the auth frame and consult the authorizer
async fn handshake<R: FrameReader>(
    server: &Server,
    reader: &mut R,
    proto: &mut Proto,
) -> Result<Grant, ConnectionError> {
    reader.read_frame(proto).await?;
    if proto.op != OpCode::Auth.as_i16() {
        return Err(ConnectionError::NotAuth(proto.op));
    }

    let credentials: AuthPayload = serde_json::from_slice(&proto.body).map_err(AuthError::from)?;
    let grant = server.authorizer().authorize(&credentials).await?;

    if grant.zone != grant.routing_id.zone() || usize::from(grant.zone) >= server.zones().len() {
        return Err(AuthError::ZoneMismatch {
            id: grant.routing_id,
            zone: grant.zone,
        }
        .into());
    }
    Ok(grant)
}

/// Answer the auth frame in place, keeping its `ver` and `seq`
async fn write_auth_ack<W: FrameWriter>(
    writer: &mut W,
    proto: &mut Proto,
    grant: &Grant,
) -> ProtocolResult<()> {
    let ack = AuthAckPayload {
        id: grant.routing_id.as_u64(),
        zone: grant.zone,
        heartbeat_ms: u64::try_from(grant.heartbeat.as_millis()).unwrap_or(u64::MAX),
    };
    let body = serde_json::to_vec(&ack)?;
    proto.set_reply(OpCode::AuthReply, &body);
    writer.write_frame(proto).await?;
    writer.flush().await
}

#[allow(clippy::too_many_arguments)]
async fn read_loop<R: FrameReader>(
    server: &Server,
    reader: &mut R,
    producer: &mut RingProducer,
    session: &Session,
    closer: &Closer,
    timer: &TimerGuard,
    heartbeat: Duration,
    scratch: &mut Proto,
) -> Result<(), ConnectionError> {
    let _routine = server.stats().read_routine();
    loop {
        let mut slot = producer.reserve_write()?;
        tokio::select! {
            biased;
            reason = closer.closed() => return Err(ConnectionError::from_close(reason, true)),
            read = reader.read_frame(scratch) => read?,
        }

        // The handler rewrites `op`, so decide on the request code first.
        let is_heartbeat = scratch.op == OpCode::Heartbeat.as_i16();
        server.handlers().dispatch(session.id(), scratch)?;
        if is_heartbeat {
            timer.reschedule(heartbeat);
            tracing::debug!(id = %session.id(), "heartbeat");
        }

        slot.swap(scratch);
        slot.commit();
        session
            .signal(Signal::Ready)
            .await
            .map_err(|_| ConnectionError::DispatchClosed)?;
    }
}

async fn dispatch_loop<W: FrameWriter>(
    server: Arc<Server>,
    mut writer: W,
    mut consumer: RingConsumer,
    mut signals: mpsc::Receiver<Signal>,
    closer: Closer,
    id: RoutingId,
) {
    let _routine = server.stats().write_routine();
    let mut scratch = Proto::default();

    let written = write_signals(&mut writer, &mut consumer, &mut signals, &closer, &mut scratch);
    let finished = match written.await {
        Ok(()) => true,
        Err(e) => {
            if e.is_orderly() {
                tracing::debug!(id = %id, error = %e, "dispatch loop stopped");
            } else {
                tracing::warn!(id = %id, error = %e, "dispatch loop failed");
            }
            closer.close(CloseReason::Local);
            false
        }
    };

    // Keep receiving until the read loop's Finish so no sender stays blocked.
    if !finished {
        while let Some(signal) = signals.recv().await {
            if matches!(signal, Signal::Finish) {
                break;
            }
        }
    }

    match tokio::time::timeout(CLOSE_TIMEOUT, writer.close()).await {
        Ok(Err(e)) if !e.is_closed() => {
            tracing::debug!(id = %id, error = %e, "closing outbound half failed");
        }
        _ => {}
    }
}

/// Returns `Ok` on Finish; any other exit is an error
async fn write_signals<W: FrameWriter>(
    writer: &mut W,
    consumer: &mut RingConsumer,
    signals: &mut mpsc::Receiver<Signal>,
    closer: &Closer,
    scratch: &mut Proto,
) -> Result<(), ConnectionError> {
    loop {
        let signal = tokio::select! {
            biased;
            reason = closer.closed() => return Err(ConnectionError::Closed(reason)),
            signal = signals.recv() => signal,
        };
        let signal = match signal {
            None | Some(Signal::Finish) => return Ok(()),
            Some(signal) => signal,
        };

        tokio::select! {
            biased;
            reason = closer.closed() => return Err(ConnectionError::Closed(reason)),
            written = write_signal(writer, consumer, scratch, signal) => written?,
        }
    }
}

/// Write one push, or every ready response, then flush once
async fn write_signal<W: FrameWriter>(
    writer: &mut W,
    consumer: &mut RingConsumer,
    scratch: &mut Proto,
    signal: Signal,
) -> ProtocolResult<()> {
    match signal {
        Signal::Push(proto) => match writer.write_frame(&proto).await {
            Err(ProtocolError::Json(e)) => {
                tracing::warn!(op = proto.op, error = %e, "dropping push with a non-JSON body");
            }
            written => written?,
        },
        Signal::Ready => {
            while let Ok(mut slot) = consumer.reserve_read() {
                slot.swap(scratch);
                writer.write_frame(scratch).await?;
                slot.commit();
            }
        }
        Signal::Finish => {}
    }
    writer.flush().await
}
