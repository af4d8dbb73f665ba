//! Server error types.

use crate::storage::StoreError;
use framebridge_core::ProtocolError;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors raised while serving or while handling one message.
///
/// Message-level variants are turned into an `error` reply on the same
/// connection; only `Bind` and `Serve` end the process.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Unexpected message type from client: {0}")]
    UnexpectedMessage(&'static str),
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
    #[error("Server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
