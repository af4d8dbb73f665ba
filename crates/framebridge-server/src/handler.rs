//! Per-message processing.
//!
//! Every inbound frame ends here and produces at most one outcome. Failures
//! never escape: they become an `error` reply on the same connection.

use crate::error::BridgeError;
use crate::storage::ArtifactStore;
use framebridge_core::protocol::{DesignSaved, ImageSaved};
use framebridge_core::{Message, ProtocolError};
use serde_json::Value;
use tracing::{debug, info, warn};

/// What the connection should do after a frame was processed.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Send this back to the sender.
    Reply(Message),
    /// Pass this on to every other open connection.
    Relay(Message),
    /// Nothing to send.
    Nothing,
}

/// Decode and handle one raw frame.
pub async fn process_frame(store: &dyn ArtifactStore, frame: &[u8]) -> Outcome {
    match handle_frame(store, frame).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Message failed: {}", e);
            Outcome::Reply(Message::error(e.to_string()))
        }
    }
}

async fn handle_frame(store: &dyn ArtifactStore, frame: &[u8]) -> Result<Outcome, BridgeError> {
    let value: Value = serde_json::from_slice(frame).map_err(ProtocolError::Decode)?;
    // Design metadata is stored as sent, not as re-encoded by the typed model.
    let raw_design = value.get("designData").cloned();
    let msg = Message::from_value(value)?;
    handle_message(store, msg, raw_design).await
}

/// Handle one decoded message. `raw_design` is the `designData` object as it
/// arrived on the wire, if any.
pub async fn handle_message(
    store: &dyn ArtifactStore,
    msg: Message,
    raw_design: Option<Value>,
) -> Result<Outcome, BridgeError> {
    debug!("Received message type: {}", msg.kind());
    match msg {
        Message::ExportImage { data } => {
            let bytes = data.decode()?;
            let path = store.save_image(&data.file_name, bytes).await?;
            let path = path.display().to_string();
            info!("Image saved: {}", path);
            Ok(Outcome::Reply(Message::ImageSaved {
                data: ImageSaved {
                    file_name: data.file_name,
                    path,
                },
            }))
        }
        Message::ExportDesign { design_data } => {
            let design = match raw_design {
                Some(raw) => raw,
                None => serde_json::to_value(&design_data).map_err(ProtocolError::Encode)?,
            };
            let path = store.save_design(&design).await?;
            let path = path.display().to_string();
            info!("Design data saved: {}", path);
            Ok(Outcome::Reply(Message::DesignSaved {
                data: DesignSaved { path },
            }))
        }
        msg @ (Message::CreateRectangle { .. }
        | Message::CreateText { .. }
        | Message::RectangleCreated { .. }
        | Message::TextCreated { .. }) => Ok(Outcome::Relay(msg)),
        Message::Status { message } => {
            info!("Client status: {}", message);
            Ok(Outcome::Nothing)
        }
        Message::Error { message } => {
            warn!("Client reported error: {}", message);
            Ok(Outcome::Nothing)
        }
        other @ (Message::Connected { .. }
        | Message::ExportRequest
        | Message::ImageSaved { .. }
        | Message::DesignSaved { .. }) => Err(BridgeError::UnexpectedMessage(other.kind())),
    }
}
