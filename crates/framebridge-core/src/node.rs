//! Host nodes and the design metadata extracted from them.

use crate::host::ExportFormat;
use crate::protocol::RgbColor;
use kurbo::{Point, Rect};
use peniko::Color;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// Host-assigned node identity (e.g. `"12:7"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind tag of a host node, in the host's upper-case form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    Frame,
    Component,
    Rectangle,
    Text,
    Other(String),
}

impl NodeKind {
    /// Only frames and components are exported as artifacts.
    pub fn is_exportable(&self) -> bool {
        matches!(self, NodeKind::Frame | NodeKind::Component)
    }

    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Frame => "FRAME",
            NodeKind::Component => "COMPONENT",
            NodeKind::Rectangle => "RECTANGLE",
            NodeKind::Text => "TEXT",
            NodeKind::Other(name) => name,
        }
    }
}

impl From<String> for NodeKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "FRAME" => NodeKind::Frame,
            "COMPONENT" => NodeKind::Component,
            "RECTANGLE" => NodeKind::Rectangle,
            "TEXT" => NodeKind::Text,
            _ => NodeKind::Other(name),
        }
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Visual style of a node. The values are host structures passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    #[serde(default)]
    pub fills: Value,
    #[serde(default)]
    pub strokes: Value,
    #[serde(default)]
    pub effects: Value,
}

impl NodeStyle {
    /// Style with a single solid fill and no strokes or effects.
    pub fn solid(color: RgbColor) -> Self {
        Self {
            fills: json!([{
                "type": "SOLID",
                "color": { "r": color.r, "g": color.g, "b": color.b },
            }]),
            strokes: json!([]),
            effects: json!([]),
        }
    }

    /// Style with nothing painted.
    pub fn empty() -> Self {
        Self {
            fills: json!([]),
            strokes: json!([]),
            effects: json!([]),
        }
    }

    /// The first visible solid fill, if any.
    pub fn first_solid_fill(&self) -> Option<Color> {
        self.fills.as_array()?.iter().find_map(|fill| {
            if fill.get("type")?.as_str()? != "SOLID" {
                return None;
            }
            if fill.get("visible").and_then(Value::as_bool) == Some(false) {
                return None;
            }
            let rgb: RgbColor = serde_json::from_value(fill.get("color")?.clone()).ok()?;
            let opacity = fill.get("opacity").and_then(Value::as_f64).unwrap_or(1.0);
            let [r, g, b, _] = rgb.to_color().components;
            Some(Color::new([r, g, b, opacity as f32]))
        })
    }
}

/// A node of the host document.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    /// Top-left corner.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub style: NodeStyle,
    /// Text content, for text nodes.
    pub characters: Option<String>,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>, kind: NodeKind, bounds: Rect) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            position: Point::new(bounds.x0, bounds.y0),
            width: bounds.width(),
            height: bounds.height(),
            style: NodeStyle::empty(),
            characters: None,
        }
    }

    pub fn with_style(mut self, style: NodeStyle) -> Self {
        self.style = style;
        self
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
    }

    /// File name of the exported image for this node.
    pub fn image_file_name(&self, format: ExportFormat) -> String {
        format!("{}.{}", self.name, format.extension())
    }
}

/// Serializable description of an exported node (`designData` on the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignData {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
    pub styles: NodeStyle,
}

impl DesignData {
    pub fn from_node(node: &Node) -> Self {
        Self {
            name: node.name.clone(),
            kind: node.kind.clone(),
            width: node.width,
            height: node.height,
            x: node.position.x,
            y: node.position.y,
            styles: node.style.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Node {
        Node::new(
            NodeId::new("1:1"),
            "Hero",
            NodeKind::Frame,
            Rect::new(10.0, 20.0, 110.0, 70.0),
        )
    }

    #[test]
    fn test_kind_round_trips_through_host_names() {
        assert_eq!(NodeKind::from("FRAME".to_string()), NodeKind::Frame);
        assert_eq!(
            NodeKind::from("ELLIPSE".to_string()),
            NodeKind::Other("ELLIPSE".to_string())
        );
        assert_eq!(String::from(NodeKind::Component), "COMPONENT");
    }

    #[test]
    fn test_only_frames_and_components_export() {
        assert!(NodeKind::Frame.is_exportable());
        assert!(NodeKind::Component.is_exportable());
        assert!(!NodeKind::Text.is_exportable());
        assert!(!NodeKind::Other("GROUP".to_string()).is_exportable());
    }

    #[test]
    fn test_node_geometry() {
        let node = frame();
        assert!((node.position.x - 10.0).abs() < f64::EPSILON);
        assert!((node.width - 100.0).abs() < f64::EPSILON);
        assert!((node.height - 50.0).abs() < f64::EPSILON);
        assert_eq!(node.bounds(), Rect::new(10.0, 20.0, 110.0, 70.0));
        assert_eq!(node.image_file_name(ExportFormat::Png), "Hero.png");
    }

    #[test]
    fn test_design_data_wire_shape() {
        let node = frame().with_style(NodeStyle::solid(RgbColor::new(1.0, 0.0, 0.0)));
        let value = serde_json::to_value(DesignData::from_node(&node)).unwrap();
        assert_eq!(value["type"], "FRAME");
        assert_eq!(value["x"], 10.0);
        assert_eq!(value["styles"]["fills"][0]["type"], "SOLID");
        assert_eq!(value["styles"]["effects"], json!([]));
    }

    #[test]
    fn test_first_solid_fill_skips_hidden_and_gradients() {
        let style = NodeStyle {
            fills: json!([
                { "type": "GRADIENT_LINEAR" },
                { "type": "SOLID", "visible": false, "color": { "r": 0, "g": 1, "b": 0 } },
                { "type": "SOLID", "color": { "r": 0, "g": 0, "b": 1 }, "opacity": 0.5 },
            ]),
            ..NodeStyle::default()
        };
        let rgba = style.first_solid_fill().unwrap().to_rgba8();
        assert_eq!((rgba.r, rgba.g, rgba.b), (0, 0, 255));
        assert_eq!(rgba.a, 128);
    }

    #[test]
    fn test_no_fill_when_fills_are_opaque_value() {
        let style = NodeStyle {
            fills: json!("mixed"),
            ..NodeStyle::default()
        };
        assert!(style.first_solid_fill().is_none());
    }
}
