//! WebSocket listeners, plain and TLS
//!
//! The handshake deadline is armed at accept, so a client stalling in the TLS
//! or HTTP upgrade is closed the same way as one that never authenticates.

use super::tcp::log_close;
use super::Server;
use crate::connection::{arm_handshake_timer, serve_connection, Closer, ConnectionError};
use crate::protocol::ProtocolError;
use crate::timer::TimerGuard;
use crate::transport::{split_websocket, websocket_config};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(100);

/// Start `accept` accept tasks on one listener; `tls` turns it into wss
pub fn spawn_accept_loops(
    server: &Arc<Server>,
    listener: TcpListener,
    accept: usize,
    tls: Option<TlsAcceptor>,
) -> Vec<JoinHandle<()>> {
    let listener = Arc::new(listener);
    (0..accept.max(1))
        .map(|task| {
            tokio::spawn(accept_loop(
                Arc::clone(server),
                Arc::clone(&listener),
                tls.clone(),
                task,
            ))
        })
        .collect()
}

async fn accept_loop(
    server: Arc<Server>,
    listener: Arc<TcpListener>,
    tls: Option<TlsAcceptor>,
    mut index: usize,
) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::error!(error = %e, "websocket accept failed");
                tokio::time::sleep(ACCEPT_ERROR_DELAY).await;
                continue;
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(addr = %addr, error = %e, "set_nodelay failed");
        }

        let server = Arc::clone(&server);
        let tls = tls.clone();
        tokio::spawn(async move {
            let closer = Closer::new();
            let timer = arm_handshake_timer(&server, index, &closer);
            let result = match tls {
                Some(acceptor) => {
                    let accept =
                        async { acceptor.accept(stream).await.map_err(ProtocolError::from) };
                    match until_closed(&closer, accept).await {
                        Ok(stream) => serve_websocket(server, stream, addr, timer, closer).await,
                        Err(e) => Err(e),
                    }
                }
                None => serve_websocket(server, stream, addr, timer, closer).await,
            };
            log_close(addr, result);
        });
        index = index.wrapping_add(1);
    }
}

/// Run one step of the opening exchange, giving up once `closer` fires
async fn until_closed<T, F>(closer: &Closer, step: F) -> Result<T, ConnectionError>
where
    F: Future<Output = Result<T, ProtocolError>>,
{
    tokio::select! {
        biased;
        reason = closer.closed() => Err(ConnectionError::from_close(reason, false)),
        result = step => result.map_err(ConnectionError::from),
    }
}

/// Refuse upgrades on any path but `path` with a 404
fn check_path(
    path: &str,
    request: &Request,
    response: Response,
) -> Result<Response, ErrorResponse> {
    if request.uri().path() == path {
        return Ok(response);
    }
    let mut refused = ErrorResponse::new(None);
    *refused.status_mut() = StatusCode::NOT_FOUND;
    Err(refused)
}

/// Upgrade `stream` on the configured path and run the connection
///
/// Only the upgrade races the close signal. Once upgraded, `serve_connection`
/// watches `closer` itself and always runs its teardown.
pub async fn serve_websocket<S>(
    server: Arc<Server>,
    stream: S,
    addr: SocketAddr,
    timer: TimerGuard,
    closer: Closer,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let options = server.options();
    let path = options.ws_path.clone();
    let config = websocket_config(options.max_body_size);
    let callback = move |request: &Request, response| check_path(&path, request, response);

    let upgrade = async {
        tokio_tungstenite::accept_hdr_async_with_config(stream, callback, Some(config))
            .await
            .map_err(ProtocolError::from)
    };
    let ws = until_closed(&closer, upgrade).await?;
    tracing::debug!(addr = %addr, "websocket upgraded");

    let (reader, writer) = split_websocket(ws);
    serve_connection(server, reader, writer, timer, closer, addr).await
}
