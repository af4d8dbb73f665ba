//! Wire protocol shared by the plugin sandbox, its UI surface and the bridge server.
//!
//! Every frame is a JSON object tagged by its `type` field:
//! ```json
//! { "type": "connected", "message": "Successfully connected to server" }
//! { "type": "export-image", "data": { "fileName": "Card.png", "base64Data": "data:image/png;base64,..." } }
//! { "type": "create-rectangle", "data": { "x": 100, "y": 100, "width": 200, "height": 100 } }
//! ```

use crate::node::DesignData;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix of the data URL carried by `export-image` payloads.
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Protocol errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid message: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("Invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// A message exchanged between sandbox, UI surface, bridge server and external tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Message {
    /// Server acknowledgement sent as soon as a connection opens.
    Connected { message: String },
    /// UI asks the sandbox to export the current selection.
    ExportRequest,
    /// Rasterized node on its way to disk.
    ExportImage { data: ImageExport },
    /// Geometry and style of an exported node.
    ExportDesign {
        #[serde(rename = "designData")]
        design_data: DesignData,
    },
    /// Server confirms an image write.
    ImageSaved { data: ImageSaved },
    /// Server confirms the design metadata write.
    DesignSaved { data: DesignSaved },
    /// A failure, reported once.
    Error { message: String },
    /// Informational progress from the sandbox.
    Status { message: String },
    /// Create a rectangle in the host document.
    CreateRectangle {
        #[serde(default)]
        data: RectangleCommand,
    },
    /// Create a text node in the host document.
    CreateText {
        #[serde(default)]
        data: TextCommand,
    },
    /// Result of a `create-rectangle` command.
    RectangleCreated { data: CreatedNode },
    /// Result of a `create-text` command.
    TextCreated { data: CreatedNode },
}

impl Message {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }

    pub fn status(message: impl Into<String>) -> Self {
        Self::Status { message: message.into() }
    }

    /// The wire tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Connected { .. } => "connected",
            Message::ExportRequest => "export-request",
            Message::ExportImage { .. } => "export-image",
            Message::ExportDesign { .. } => "export-design",
            Message::ImageSaved { .. } => "image-saved",
            Message::DesignSaved { .. } => "design-saved",
            Message::Error { .. } => "error",
            Message::Status { .. } => "status",
            Message::CreateRectangle { .. } => "create-rectangle",
            Message::CreateText { .. } => "create-text",
            Message::RectangleCreated { .. } => "rectangle-created",
            Message::TextCreated { .. } => "text-created",
        }
    }

    /// Whether this is a command meant for the sandbox's dispatcher.
    pub fn is_command(&self) -> bool {
        matches!(self, Message::CreateRectangle { .. } | Message::CreateText { .. })
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(json).map_err(ProtocolError::Decode)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(bytes).map_err(ProtocolError::Decode)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ProtocolError> {
        serde_json::from_value(value).map_err(ProtocolError::Decode)
    }
}

/// Payload of `export-image`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageExport {
    pub file_name: String,
    /// Data URL, e.g. `data:image/png;base64,iVBOR...`.
    pub base64_data: String,
}

impl ImageExport {
    /// Wrap PNG bytes as a data URL payload.
    pub fn from_png(file_name: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            file_name: file_name.into(),
            base64_data: format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(bytes)),
        }
    }

    /// Decode the image bytes.
    ///
    /// Everything up to and including the first comma is the data-URL header
    /// and is discarded. A payload without a comma is treated as bare base64.
    pub fn decode(&self) -> Result<Vec<u8>, ProtocolError> {
        let encoded = match self.base64_data.split_once(',') {
            Some((_, rest)) => rest,
            None => self.base64_data.as_str(),
        };
        Ok(STANDARD.decode(encoded.trim())?)
    }
}

/// Payload of `image-saved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSaved {
    pub file_name: String,
    pub path: String,
}

/// Payload of `design-saved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignSaved {
    pub path: String,
}

/// Solid RGB color with channels in `0.0..=1.0`. Missing channels are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RgbColor {
    #[serde(default)]
    pub r: f64,
    #[serde(default)]
    pub g: f64,
    #[serde(default)]
    pub b: f64,
}

impl RgbColor {
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Convert to an opaque peniko color.
    pub fn to_color(self) -> peniko::Color {
        peniko::Color::new([self.r as f32, self.g as f32, self.b as f32, 1.0])
    }
}

/// Payload of `create-rectangle`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RectangleCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<RgbColor>,
}

/// Payload of `create-text`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
}

/// Identity and resolved geometry of a node created by a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}
