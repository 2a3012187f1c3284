//! Listener setup and the serving task.

use crate::error::StartupError;
use axum::Router;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Binds the HTTP listener.
#[derive(Debug, Clone)]
pub struct HttpServer {
    reuse_address: bool,
    backlog: i32,
}

impl Default for HttpServer {
    fn default() -> Self {
        Self {
            reuse_address: true,
            backlog: 1024,
        }
    }
}

impl HttpServer {
    pub fn new(reuse_address: bool, backlog: i32) -> Self {
        Self {
            reuse_address,
            backlog,
        }
    }

    /// Binds `host:port`, or every interface when `host` is `None`.
    pub async fn bind(&self, host: Option<&str>, port: u16) -> Result<TcpListener, StartupError> {
        let host = host.unwrap_or("0.0.0.0");
        let address = format!("{}:{}", host, port);
        let bind_error = |source| StartupError::Bind {
            address: address.clone(),
            source,
        };

        let addr = tokio::net::lookup_host((host, port))
            .await
            .map_err(bind_error)?
            .next()
            .ok_or_else(|| {
                bind_error(std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    "host resolved to no addresses",
                ))
            })?;

        self.bind_addr(addr).map_err(bind_error)
    }

    pub fn bind_addr(&self, addr: SocketAddr) -> std::io::Result<TcpListener> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        if self.reuse_address {
            socket.set_reuse_address(true)?;
        }
        socket.bind(&addr.into())?;
        socket.listen(self.backlog)?;

        let std_listener: StdTcpListener = socket.into();
        std_listener.set_nonblocking(true)?;
        TcpListener::from_std(std_listener)
    }

    /// Spawns the serving task; it runs until [`ServerHandle::shutdown`].
    pub fn serve(&self, listener: TcpListener, router: Router) -> std::io::Result<ServerHandle> {
        let local_addr = listener.local_addr()?;
        let (shutdown, signal) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let result = axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(async {
                    let _ = signal.await;
                })
                .await;
            if let Err(e) = &result {
                error!("HTTP server stopped with error: {}", e);
            }
            result
        });

        Ok(ServerHandle {
            local_addr,
            shutdown: Some(shutdown),
            task,
        })
    }
}

/// A running server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections and lets in-flight requests finish.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            info!("Shutting down HTTP server on {}", self.local_addr);
            let _ = tx.send(());
        }
    }

    /// Waits for the serving task to end.
    pub async fn wait(self) -> std::io::Result<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(std::io::Error::other(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_binds_ephemeral_port() {
        let listener = HttpServer::default().bind(Some("127.0.0.1"), 0).await.unwrap();

        let addr = listener.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let server = HttpServer::new(false, 16);
        let first = server.bind(Some("127.0.0.1"), 0).await.unwrap();
        let port = first.local_addr().unwrap().port();

        let err = server.bind(Some("127.0.0.1"), port).await.unwrap_err();

        assert!(matches!(err, StartupError::Bind { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_ends_serving_task() {
        let server = HttpServer::default();
        let listener = server.bind(Some("127.0.0.1"), 0).await.unwrap();
        let mut handle = server.serve(listener, Router::new()).unwrap();

        handle.shutdown();

        handle.wait().await.unwrap();
    }
}
