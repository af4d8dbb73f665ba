//! FrameBridge Server
//!
//! Local WebSocket endpoint the plugin UI connects to. Exported images and
//! design metadata are written to disk; create commands from external tools
//! are relayed to the other connected clients.
//!
//! ## Protocol
//!
//! Every frame is a JSON object tagged by `type`:
//! ```json
//! { "type": "export-image", "data": { "fileName": "Card.png", "base64Data": "data:image/png;base64,..." } }
//! { "type": "export-design", "designData": { "name": "Card", "type": "FRAME", ... } }
//! { "type": "create-rectangle", "data": { "x": 100, "y": 100, "width": 200, "height": 100 } }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod server;
pub mod storage;

pub use config::{DEFAULT_PORT, ServerConfig};
pub use connection::{CONNECTED_MESSAGE, ConnectionState};
pub use error::BridgeError;
pub use handler::{Outcome, handle_message, process_frame};
pub use server::{BridgeServer, LIVENESS_TEXT, RunningBridge};
pub use storage::{ArtifactStore, FileStore, MemoryStore, StoreError, StoreResult};
