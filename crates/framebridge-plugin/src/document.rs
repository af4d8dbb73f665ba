//! Demo document the headless plugin runs against.

use framebridge_core::kurbo::Rect;
use framebridge_core::protocol::RgbColor;
use framebridge_core::{MemoryHost, NodeId, NodeKind, NodeStyle};

const FRAME_WIDTH: f64 = 320.0;
const FRAME_HEIGHT: f64 = 200.0;
const GAP: f64 = 40.0;

const PALETTE: [RgbColor; 4] = [
    RgbColor { r: 0.95, g: 0.33, b: 0.25 },
    RgbColor { r: 0.20, g: 0.55, b: 0.90 },
    RgbColor { r: 0.30, g: 0.75, b: 0.45 },
    RgbColor { r: 0.98, g: 0.80, b: 0.20 },
];

/// A page with `frames` frames in a row plus a component and a loose
/// rectangle. The frames and the rectangle are selected, so an export
/// produces one artifact pair per frame and skips the rectangle.
pub fn demo_host(frames: usize) -> MemoryHost {
    let mut host = MemoryHost::new();
    let mut selection: Vec<NodeId> = (0..frames)
        .map(|i| {
            let x = i as f64 * (FRAME_WIDTH + GAP);
            let fill = PALETTE[i % PALETTE.len()];
            host.add_node(
                &format!("Frame {}", i + 1),
                NodeKind::Frame,
                Rect::new(x, 0.0, x + FRAME_WIDTH, FRAME_HEIGHT),
                NodeStyle::solid(fill),
            )
        })
        .collect();

    host.add_node(
        "Button",
        NodeKind::Component,
        Rect::new(0.0, FRAME_HEIGHT + GAP, 120.0, FRAME_HEIGHT + GAP + 40.0),
        NodeStyle::solid(RgbColor::new(0.1, 0.1, 0.1)),
    );

    if frames > 0 {
        let loose = host.add_node(
            "Divider",
            NodeKind::Rectangle,
            Rect::new(0.0, -GAP, FRAME_WIDTH, -GAP + 2.0),
            NodeStyle::empty(),
        );
        selection.push(loose);
    }

    host.select(&selection);
    host
}
