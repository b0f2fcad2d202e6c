//! Gateway server setup
//!
//! Binds the raw TCP, WebSocket and stat listeners described by the config
//! and owns their accept tasks until shutdown.

mod admin;
mod state;
mod tcp;
mod tls;
mod websocket;

pub use admin::create_router;
pub use state::{Server, ServerOptions};
pub use tcp::{bind_listener, serve_tcp};
pub use tls::load_acceptor;
pub use websocket::serve_websocket;

use crate::auth::Authorizer;
use comet_common::{AppConfig, AppError, AppResult};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;

/// A bound gateway
///
/// Dropping it aborts the accept tasks; live connections are only closed by
/// [`Gateway::shutdown`].
pub struct Gateway {
    server: Arc<Server>,
    tcp_addrs: Vec<SocketAddr>,
    ws_addrs: Vec<SocketAddr>,
    wss_addrs: Vec<SocketAddr>,
    stat_addrs: Vec<SocketAddr>,
    tasks: Vec<JoinHandle<()>>,
}

impl Gateway {
    /// Bind every configured listener and start accepting
    ///
    /// Fails without leaving tasks behind if any address cannot be bound.
    pub async fn bind(config: &AppConfig, authorizer: Arc<dyn Authorizer>) -> AppResult<Self> {
        let server = Arc::new(Server::new(config, authorizer));
        let mut gateway = Self {
            server,
            tcp_addrs: Vec::new(),
            ws_addrs: Vec::new(),
            wss_addrs: Vec::new(),
            stat_addrs: Vec::new(),
            tasks: Vec::new(),
        };

        for addr in &config.tcp.bind {
            let listener = tcp::bind_listener(parse_addr(addr)?, &config.tcp)?;
            let local = listener.local_addr()?;
            gateway.tasks.extend(tcp::spawn_accept_loops(
                &gateway.server,
                listener,
                config.tcp.accept,
            ));
            tracing::info!(addr = %local, "tcp listener bound");
            gateway.tcp_addrs.push(local);
        }

        for addr in &config.websocket.bind {
            let listener = tcp::bind_listener(parse_addr(addr)?, &config.tcp)?;
            let local = listener.local_addr()?;
            gateway.tasks.extend(websocket::spawn_accept_loops(
                &gateway.server,
                listener,
                config.tcp.accept,
                None,
            ));
            tracing::info!(
                addr = %local,
                path = %config.websocket.path,
                "websocket listener bound"
            );
            gateway.ws_addrs.push(local);
        }

        if config.websocket.tls_open {
            let acceptor =
                tls::load_acceptor(&config.websocket.cert_file, &config.websocket.private_file)?;
            for addr in &config.websocket.tls_bind {
                let listener = tcp::bind_listener(parse_addr(addr)?, &config.tcp)?;
                let local = listener.local_addr()?;
                gateway.tasks.extend(websocket::spawn_accept_loops(
                    &gateway.server,
                    listener,
                    config.tcp.accept,
                    Some(acceptor.clone()),
                ));
                tracing::info!(
                    addr = %local,
                    path = %config.websocket.path,
                    "websocket tls listener bound"
                );
                gateway.wss_addrs.push(local);
            }
        }

        for addr in &config.stat.bind {
            let addr = parse_addr(addr)?;
            let listener = TcpListener::bind(addr)
                .await
                .map_err(|e| AppError::bind(addr, e))?;
            let local = listener.local_addr()?;
            let app = admin::create_router(Arc::clone(&gateway.server));
            gateway.tasks.push(tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app).await {
                    tracing::error!(addr = %local, error = %e, "stat server failed");
                }
            }));
            tracing::info!(addr = %local, "stat listener bound");
            gateway.stat_addrs.push(local);
        }

        Ok(gateway)
    }

    pub fn server(&self) -> &Arc<Server> {
        &self.server
    }

    pub fn tcp_addrs(&self) -> &[SocketAddr] {
        &self.tcp_addrs
    }

    pub fn ws_addrs(&self) -> &[SocketAddr] {
        &self.ws_addrs
    }

    pub fn wss_addrs(&self) -> &[SocketAddr] {
        &self.wss_addrs
    }

    pub fn stat_addrs(&self) -> &[SocketAddr] {
        &self.stat_addrs
    }

    /// Serve until `shutdown` resolves, then shut down
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        shutdown.await;
        tracing::info!("shutdown signal received");
        self.shutdown();
    }

    /// Stop accepting and close every registered connection
    ///
    /// Returns the number of connections closed.
    pub fn shutdown(&mut self) -> usize {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        let closed = self.server.zones().close_all();
        tracing::info!(closed, "gateway stopped");
        closed
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("tcp_addrs", &self.tcp_addrs)
            .field("ws_addrs", &self.ws_addrs)
            .field("wss_addrs", &self.wss_addrs)
            .field("stat_addrs", &self.stat_addrs)
            .finish_non_exhaustive()
    }
}

fn parse_addr(addr: &str) -> AppResult<SocketAddr> {
    addr.parse().map_err(|e| {
        AppError::bind(
            addr,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        )
    })
}

/// Resolve on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticAuthorizer;

    fn local_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.tcp.bind = vec!["127.0.0.1:0".to_string()];
        config.tcp.accept = 1;
        config.websocket.bind = vec!["127.0.0.1:0".to_string()];
        config.stat.bind = vec!["127.0.0.1:0".to_string()];
        config
    }

    #[tokio::test]
    async fn test_bind_records_addresses() {
        let config = local_config();
        let mut gateway = Gateway::bind(&config, Arc::new(StaticAuthorizer::from_config(&config)))
            .await
            .unwrap();

        assert_eq!(gateway.tcp_addrs().len(), 1);
        assert_eq!(gateway.ws_addrs().len(), 1);
        assert!(gateway.wss_addrs().is_empty());
        assert_ne!(gateway.stat_addrs()[0].port(), 0);
        assert_eq!(gateway.shutdown(), 0);
    }

    #[tokio::test]
    async fn test_bad_address_is_bind_error() {
        let mut config = local_config();
        config.tcp.bind = vec!["not-an-address".to_string()];
        let err = Gateway::bind(&config, Arc::new(StaticAuthorizer::from_config(&config)))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "BIND_ERROR");
    }
}
