use socketioxide::layer::SocketIoLayer;
use socketioxide::SocketIo;
use std::time::Duration;
use tracing::info;

/// Builds the Socket.IO server attached to the HTTP router.
#[derive(Debug, Clone)]
pub struct SocketIoFactory {
    enabled: bool,
    ping_interval: Duration,
    ping_timeout: Duration,
}

impl Default for SocketIoFactory {
    fn default() -> Self {
        Self {
            enabled: true,
            ping_interval: Duration::from_secs(25),
            ping_timeout: Duration::from_secs(20),
        }
    }
}

impl SocketIoFactory {
    /// A factory that never attaches a Socket.IO server.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The layer to wrap the router with, and the handle bundles register
    /// namespaces on.
    pub fn listen(&self) -> Option<(SocketIoLayer, SocketIo)> {
        if !self.enabled {
            return None;
        }
        let (layer, io) = SocketIo::builder()
            .ping_interval(self.ping_interval)
            .ping_timeout(self.ping_timeout)
            .build_layer();
        info!("Socket.IO server attached");
        Some((layer, io))
    }
}
