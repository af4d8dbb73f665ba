//! The design tool as seen from inside the plugin sandbox.
//!
//! The sandbox only ever talks to the host through [`DesignHost`], so the
//! encoder and dispatcher run unchanged against the real tool or [`MemoryHost`].

mod memory;

pub use memory::MemoryHost;

use crate::node::{Node, NodeId};
use crate::protocol::RgbColor;
use kurbo::Point;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Host errors.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("Export failed: {0}")]
    Export(String),
    #[error("Font not loaded: {0}")]
    FontNotLoaded(FontName),
    #[error("Font unavailable: {0}")]
    FontUnavailable(FontName),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;

/// Boxed future for async host operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Raster format of an exported node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
        }
    }
}

/// Export constraint passed to [`DesignHost::export_node`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportSettings {
    pub format: ExportFormat,
    /// Linear scale relative to the node's native size.
    pub scale: f64,
}

impl ExportSettings {
    /// Lossless PNG at twice the native size.
    pub const PNG_2X: Self = Self {
        format: ExportFormat::Png,
        scale: 2.0,
    };
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::PNG_2X
    }
}

/// Font family and style, e.g. `Inter Regular`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontName {
    pub family: String,
    pub style: String,
}

impl FontName {
    pub fn new(family: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            style: style.into(),
        }
    }

    /// Font used for text created by commands.
    pub fn inter_regular() -> Self {
        Self::new("Inter", "Regular")
    }
}

impl fmt::Display for FontName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.family, self.style)
    }
}

/// Resolved parameters of a rectangle to create.
#[derive(Debug, Clone, PartialEq)]
pub struct RectangleSpec {
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub fill: Option<RgbColor>,
}

/// Resolved parameters of a text node to create.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpec {
    pub position: Point,
    pub content: String,
    /// `None` keeps the host default.
    pub font_size: Option<f64>,
    pub font: FontName,
}

/// Capabilities the plugin sandbox gets from the design tool.
pub trait DesignHost {
    /// The current selection, in host order.
    fn selection(&self) -> Vec<Node>;

    /// Rasterize a node.
    fn export_node(&self, id: &NodeId, settings: ExportSettings) -> BoxFuture<'_, HostResult<Vec<u8>>>;

    /// Create a rectangle on the current page.
    fn create_rectangle(&mut self, spec: RectangleSpec) -> HostResult<Node>;

    /// Create a text node on the current page. The font must already be loaded.
    fn create_text(&mut self, spec: TextSpec) -> HostResult<Node>;

    /// Make a font available for text edits.
    fn load_font(&mut self, font: &FontName) -> BoxFuture<'_, HostResult<()>>;

    /// Bring the given nodes into the viewport.
    fn scroll_into_view(&mut self, ids: &[NodeId]);
}
