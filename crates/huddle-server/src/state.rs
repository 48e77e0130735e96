use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tokio::sync::RwLock;

use huddle_core::player::ConnectionId;

use crate::broadcast::Broadcaster;
use crate::config::ServerConfig;
use crate::registry::PlayerRegistry;

pub type SharedRegistry = Arc<RwLock<PlayerRegistry>>;

/// Everything the handlers share. Built once per server; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub registry: SharedRegistry,
    pub broadcaster: Broadcaster,
    pub config: Arc<ServerConfig>,
    /// Live WebSocket connections, joined or not.
    pub connection_count: Arc<AtomicUsize>,
    next_connection_id: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let registry: SharedRegistry = Arc::new(RwLock::new(PlayerRegistry::new()));
        Self {
            broadcaster: Broadcaster::new(Arc::clone(&registry)),
            registry,
            config: Arc::new(config),
            connection_count: Arc::new(AtomicUsize::new(0)),
            next_connection_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Allocate a fresh connection id. Ids are never reused.
    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Keeps `connection_count` accurate for the lifetime of a socket task.
pub struct ConnectionGuard {
    count: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::Relaxed);
        Self { count }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }
}
