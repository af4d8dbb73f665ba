//! In-memory design host.

use super::{
    BoxFuture, DesignHost, ExportFormat, ExportSettings, FontName, HostError, HostResult,
    RectangleSpec, TextSpec,
};
use crate::node::{Node, NodeId, NodeKind, NodeStyle};
use crate::protocol::RgbColor;
use kurbo::Rect;
use peniko::Color;
use std::collections::HashSet;
use std::io::Write;

/// Largest raster edge, in pixels, the host agrees to produce.
const MAX_EXPORT_EDGE: u32 = 8_192;

/// Font size the host gives text nodes when none is requested.
const DEFAULT_FONT_SIZE: f64 = 12.0;

/// Fill the host gives new rectangles when none is requested.
const DEFAULT_RECTANGLE_FILL: RgbColor = RgbColor { r: 0.85, g: 0.85, b: 0.85 };

/// A single-page document held in memory.
///
/// Rasterizes nodes to real PNGs filled with their first solid fill, so
/// exports can be decoded and checked.
pub struct MemoryHost {
    page: u32,
    next_id: u32,
    nodes: Vec<Node>,
    selection: Vec<NodeId>,
    loaded_fonts: HashSet<FontName>,
    /// `None` means every font can be loaded.
    available_fonts: Option<HashSet<FontName>>,
    failing_exports: HashSet<NodeId>,
    viewport: Vec<NodeId>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            page: 0,
            next_id: 1,
            nodes: Vec::new(),
            selection: Vec::new(),
            loaded_fonts: HashSet::new(),
            available_fonts: None,
            failing_exports: HashSet::new(),
            viewport: Vec::new(),
        }
    }

    /// Restrict the fonts [`DesignHost::load_font`] can find.
    pub fn with_available_fonts(mut self, fonts: impl IntoIterator<Item = FontName>) -> Self {
        self.available_fonts = Some(fonts.into_iter().collect());
        self
    }

    fn allocate_id(&mut self) -> NodeId {
        let id = NodeId::new(format!("{}:{}", self.page, self.next_id));
        self.next_id += 1;
        id
    }

    /// Add a node to the page and return its id.
    pub fn add_node(&mut self, name: &str, kind: NodeKind, bounds: Rect, style: NodeStyle) -> NodeId {
        let id = self.allocate_id();
        self.nodes
            .push(Node::new(id.clone(), name, kind, bounds).with_style(style));
        id
    }

    /// Replace the selection. Unknown ids are ignored.
    pub fn select(&mut self, ids: &[NodeId]) {
        self.selection = ids
            .iter()
            .filter(|id| self.node(id).is_some())
            .cloned()
            .collect();
    }

    /// Make every future export of `id` fail.
    pub fn fail_export(&mut self, id: &NodeId) {
        self.failing_exports.insert(id.clone());
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// All nodes on the page, back to front.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Nodes most recently brought into view.
    pub fn viewport(&self) -> &[NodeId] {
        &self.viewport
    }

    pub fn is_font_loaded(&self, font: &FontName) -> bool {
        self.loaded_fonts.contains(font)
    }

    fn rasterize(node: &Node, settings: ExportSettings) -> HostResult<Vec<u8>> {
        let ExportFormat::Png = settings.format;
        let width = scaled_edge(node.width, settings.scale)?;
        let height = scaled_edge(node.height, settings.scale)?;

        let color = node.style.first_solid_fill().unwrap_or(Color::WHITE);
        let rgba = color.to_rgba8();
        let pixel = [rgba.r, rgba.g, rgba.b, rgba.a];
        // Every row is identical, so only one is ever held in memory.
        let row: Vec<u8> = pixel.iter().copied().cycle().take(width as usize * 4).collect();

        let mut bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut bytes, width, height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder
                .write_header()
                .map_err(|e| HostError::Export(format!("PNG header: {}", e)))?;
            let mut stream = writer
                .stream_writer()
                .map_err(|e| HostError::Export(format!("PNG data: {}", e)))?;
            for _ in 0..height {
                stream
                    .write_all(&row)
                    .map_err(|e| HostError::Export(format!("PNG data: {}", e)))?;
            }
            stream
                .finish()
                .map_err(|e| HostError::Export(format!("PNG data: {}", e)))?;
        }
        Ok(bytes)
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Pixel length of a scaled edge, at least one pixel.
fn scaled_edge(length: f64, scale: f64) -> HostResult<u32> {
    let scaled = (length * scale).ceil();
    if !scaled.is_finite() || scaled < 0.0 {
        return Err(HostError::Export(format!("Invalid export size: {}", scaled)));
    }
    if scaled > MAX_EXPORT_EDGE as f64 {
        return Err(HostError::Export(format!(
            "Export size {} exceeds {} pixels",
            scaled, MAX_EXPORT_EDGE
        )));
    }
    Ok((scaled as u32).max(1))
}

fn validate_position(x: f64, y: f64) -> HostResult<()> {
    if x.is_finite() && y.is_finite() {
        Ok(())
    } else {
        Err(HostError::InvalidArgument("position must be finite".to_string()))
    }
}

impl DesignHost for MemoryHost {
    fn selection(&self) -> Vec<Node> {
        self.selection
            .iter()
            .filter_map(|id| self.node(id).cloned())
            .collect()
    }

    fn export_node(&self, id: &NodeId, settings: ExportSettings) -> BoxFuture<'_, HostResult<Vec<u8>>> {
        let result = match self.node(id) {
            None => Err(HostError::NodeNotFound(id.clone())),
            Some(_) if self.failing_exports.contains(id) => {
                Err(HostError::Export(format!("Render failed for node {}", id)))
            }
            Some(node) => Self::rasterize(node, settings),
        };
        Box::pin(async move { result })
    }

    fn create_rectangle(&mut self, spec: RectangleSpec) -> HostResult<Node> {
        validate_position(spec.position.x, spec.position.y)?;
        if !(spec.width.is_finite() && spec.height.is_finite() && spec.width > 0.0 && spec.height > 0.0) {
            return Err(HostError::InvalidArgument(format!(
                "width and height must be positive, got {}x{}",
                spec.width, spec.height
            )));
        }

        let id = self.allocate_id();
        let bounds = Rect::from_origin_size(spec.position, (spec.width, spec.height));
        let style = NodeStyle::solid(spec.fill.unwrap_or(DEFAULT_RECTANGLE_FILL));
        let node = Node::new(id, "Rectangle", NodeKind::Rectangle, bounds).with_style(style);
        self.nodes.push(node.clone());
        Ok(node)
    }

    fn create_text(&mut self, spec: TextSpec) -> HostResult<Node> {
        validate_position(spec.position.x, spec.position.y)?;
        if !self.loaded_fonts.contains(&spec.font) {
            return Err(HostError::FontNotLoaded(spec.font));
        }
        let font_size = spec.font_size.unwrap_or(DEFAULT_FONT_SIZE);
        if !(font_size.is_finite() && font_size >= 1.0) {
            return Err(HostError::InvalidArgument(format!(
                "font size must be at least 1, got {}",
                font_size
            )));
        }

        // Rough metrics: the host lays text out on a single line.
        let width = spec.content.chars().count() as f64 * font_size * 0.6;
        let height = font_size * 1.2;

        let id = self.allocate_id();
        let name = if spec.content.is_empty() { "Text" } else { spec.content.as_str() };
        let bounds = Rect::from_origin_size(spec.position, (width, height));
        let mut node = Node::new(id, name, NodeKind::Text, bounds)
            .with_style(NodeStyle::solid(RgbColor::new(0.0, 0.0, 0.0)));
        node.characters = Some(spec.content);
        self.nodes.push(node.clone());
        Ok(node)
    }

    fn load_font(&mut self, font: &FontName) -> BoxFuture<'_, HostResult<()>> {
        let available = self
            .available_fonts
            .as_ref()
            .is_none_or(|fonts| fonts.contains(font));
        let result = if available {
            self.loaded_fonts.insert(font.clone());
            Ok(())
        } else {
            Err(HostError::FontUnavailable(font.clone()))
        };
        Box::pin(async move { result })
    }

    fn scroll_into_view(&mut self, ids: &[NodeId]) {
        self.viewport = ids.to_vec();
    }
}
