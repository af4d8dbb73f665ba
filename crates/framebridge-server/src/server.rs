//! HTTP/WebSocket front of the bridge.

use crate::config::ServerConfig;
use crate::connection::{ConnectionState, handle_socket};
use crate::error::BridgeError;
use crate::storage::{ArtifactStore, FileStore};
use axum::{
    Router,
    extract::{State, WebSocketUpgrade, ws::rejection::WebSocketUpgradeRejection},
    response::{IntoResponse, Response},
    routing::get,
};
use dashmap::DashMap;
use framebridge_core::Message;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

/// Body returned to plain HTTP requests.
pub const LIVENESS_TEXT: &str = "FrameBridge server is running";

const RELAY_CAPACITY: usize = 256;

/// Shared state of every connection.
pub struct AppState {
    pub(crate) store: Arc<dyn ArtifactStore>,
    pub(crate) connections: DashMap<Uuid, ConnectionState>,
    /// Relayed messages tagged with the sending connection.
    pub(crate) relay: broadcast::Sender<(Uuid, Message)>,
    pub(crate) shutdown: watch::Receiver<bool>,
    /// Each connection holds a clone; `stop` waits for all of them to drop.
    alive: Mutex<Option<mpsc::Sender<()>>>,
}

impl AppState {
    fn new(store: Arc<dyn ArtifactStore>, shutdown: watch::Receiver<bool>, alive: mpsc::Sender<()>) -> Self {
        let (relay, _) = broadcast::channel(RELAY_CAPACITY);
        Self {
            store,
            connections: DashMap::new(),
            relay,
            shutdown,
            alive: Mutex::new(Some(alive)),
        }
    }

    pub(crate) fn alive_token(&self) -> Option<mpsc::Sender<()>> {
        self.alive.lock().ok().and_then(|alive| alive.clone())
    }

    fn release_alive(&self) {
        if let Ok(mut alive) = self.alive.lock() {
            alive.take();
        }
    }

    pub(crate) fn transition(&self, id: Uuid, state: ConnectionState) {
        debug!("Connection {} is {}", id, state);
        match state {
            ConnectionState::Closed => {
                self.connections.remove(&id);
            }
            _ => {
                self.connections.insert(id, state);
            }
        }
    }
}

/// Resolves once shutdown was requested or the controlling handle is gone.
pub(crate) async fn shutdown_requested(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Build the router: `/health`, and WebSocket upgrades on any other path.
pub(crate) fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .fallback(upgrade_or_liveness)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// Upgrade WebSocket requests; answer anything else with the liveness text.
async fn upgrade_or_liveness(
    State(state): State<Arc<AppState>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state)),
        Err(_) => LIVENESS_TEXT.into_response(),
    }
}

/// A configured, not yet listening bridge.
pub struct BridgeServer {
    config: ServerConfig,
    store: Arc<dyn ArtifactStore>,
}

impl BridgeServer {
    /// Bridge writing to the directories named by `config`.
    pub fn new(config: ServerConfig) -> Result<Self, BridgeError> {
        let store = FileStore::new(&config)?;
        info!("Images directory: {}", store.images_dir().display());
        info!("Design data file: {}", store.design_path().display());
        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Bridge with a custom artifact store.
    pub fn with_store(config: ServerConfig, store: Arc<dyn ArtifactStore>) -> Self {
        Self { config, store }
    }

    /// Bind and start serving in the background.
    pub async fn start(self) -> Result<RunningBridge, BridgeError> {
        let addr = self.config.bind;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| BridgeError::Bind { addr, source })?;
        let local_addr = listener.local_addr().map_err(BridgeError::Serve)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (alive_tx, alive_rx) = mpsc::channel(1);
        let state = Arc::new(AppState::new(self.store, shutdown_rx.clone(), alive_tx));
        let app = router(state.clone());

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_requested(shutdown_rx))
                .await
                .map_err(BridgeError::Serve)
        });

        info!("FrameBridge server listening on {}", local_addr);
        info!("WebSocket endpoint: ws://{}", local_addr);

        Ok(RunningBridge {
            local_addr,
            state,
            shutdown: shutdown_tx,
            alive: alive_rx,
            task,
        })
    }
}

/// Handle to a listening bridge. Dropping it also shuts the bridge down.
pub struct RunningBridge {
    local_addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: watch::Sender<bool>,
    alive: mpsc::Receiver<()>,
    task: JoinHandle<Result<(), BridgeError>>,
}

impl RunningBridge {
    /// Address actually bound, useful with port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Connections that are open or active.
    pub fn connection_count(&self) -> usize {
        self.state.connections.len()
    }

    /// Resolves if the server stops on its own, which only happens on error.
    pub async fn finished(&mut self) -> Result<(), BridgeError> {
        (&mut self.task).await?
    }

    /// Stop accepting, close every connection and wait until they are gone.
    pub async fn stop(mut self) -> Result<(), BridgeError> {
        info!("Shutting down FrameBridge server");
        let _ = self.shutdown.send(true);
        self.state.release_alive();
        // Yields None once every connection dropped its token.
        let _ = self.alive.recv().await;
        self.task.await?
    }
}
