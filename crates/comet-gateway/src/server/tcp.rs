//! Raw TCP listener

use super::Server;
use crate::connection::{arm_handshake_timer, serve_connection, Closer, ConnectionError};
use crate::transport::{TcpFrameReader, TcpFrameWriter};
use comet_common::{AppError, AppResult, TcpConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::task::JoinHandle;

const LISTEN_BACKLOG: u32 = 1024;

/// Pause after a failed accept, e.g. when out of file descriptors
const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(100);

/// Bind a listening socket with the configured socket options
///
/// Accepted sockets inherit keepalive and buffer sizes from the listener.
pub fn bind_listener(addr: SocketAddr, config: &TcpConfig) -> AppResult<TcpListener> {
    let bind = |e| AppError::bind(addr, e);
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(bind)?;

    socket.set_reuseaddr(true).map_err(bind)?;
    socket.set_keepalive(config.keepalive).map_err(bind)?;
    socket.set_send_buffer_size(config.sndbuf_size).map_err(bind)?;
    socket.set_recv_buffer_size(config.rcvbuf_size).map_err(bind)?;
    socket.bind(addr).map_err(bind)?;
    socket.listen(LISTEN_BACKLOG).map_err(bind)
}

/// Start `accept` accept tasks on one listener
pub fn spawn_accept_loops(
    server: &Arc<Server>,
    listener: TcpListener,
    accept: usize,
) -> Vec<JoinHandle<()>> {
    let listener = Arc::new(listener);
    (0..accept.max(1))
        .map(|task| {
            tokio::spawn(accept_loop(
                Arc::clone(server),
                Arc::clone(&listener),
                task,
            ))
        })
        .collect()
}

async fn accept_loop(server: Arc<Server>, listener: Arc<TcpListener>, mut index: usize) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::error!(error = %e, "tcp accept failed");
                tokio::time::sleep(ACCEPT_ERROR_DELAY).await;
                continue;
            }
        };
        tokio::spawn(serve_tcp(Arc::clone(&server), stream, addr, index));
        index = index.wrapping_add(1);
    }
}

/// Run one raw TCP connection to completion
pub async fn serve_tcp(server: Arc<Server>, stream: TcpStream, addr: SocketAddr, index: usize) {
    tracing::debug!(addr = %addr, "tcp connection accepted");
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(addr = %addr, error = %e, "set_nodelay failed");
    }

    let closer = Closer::new();
    let timer = arm_handshake_timer(&server, index, &closer);
    let round = server.round();
    let (read_half, write_half) = stream.into_split();
    let reader = TcpFrameReader::new(
        read_half,
        round.pick_reader(index).acquire(),
        server.options().max_body_size,
    );
    let writer = TcpFrameWriter::new(write_half, round.pick_writer(index).acquire());

    let result = serve_connection(Arc::clone(&server), reader, writer, timer, closer, addr).await;
    log_close(addr, result);
}

pub(crate) fn log_close(addr: SocketAddr, result: Result<(), ConnectionError>) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_orderly() => tracing::debug!(addr = %addr, reason = %e, "connection ended"),
        Err(e) if e.is_timeout() => {
            tracing::info!(addr = %addr, reason = %e, "connection timed out");
        }
        Err(e) => tracing::warn!(addr = %addr, error = %e, "connection failed"),
    }
}
