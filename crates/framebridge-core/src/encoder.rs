//! Turns the host selection into exportable artifacts.

use crate::host::{DesignHost, ExportSettings};
use crate::node::{DesignData, Node};
use crate::protocol::{ImageExport, Message};
use crate::transport::Outbox;

/// Reported when the export is requested with nothing selected.
pub const EMPTY_SELECTION_MESSAGE: &str = "Select a frame or component to export.";

/// Reported after each node's artifacts have been posted.
pub const EXPORT_COMPLETE_MESSAGE: &str = "Export complete!";

/// Outcome of one export pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub exported: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Export every frame and component of `selection`.
///
/// Per exported node the UI receives `export-image`, `export-design` and a
/// `status`, in that order. A node that fails to rasterize is reported with an
/// `error` and the remaining nodes are still exported.
pub async fn export_selection<H: DesignHost + ?Sized>(
    host: &H,
    selection: &[Node],
    outbox: &Outbox,
) -> ExportSummary {
    let mut summary = ExportSummary::default();

    if selection.is_empty() {
        outbox.post(Message::error(EMPTY_SELECTION_MESSAGE));
        return summary;
    }

    for node in selection {
        if !node.kind.is_exportable() {
            log::debug!("Skipping {} ({}): not exportable", node.name, node.kind.as_str());
            summary.skipped += 1;
            continue;
        }

        log::info!("Exporting {} ({})", node.name, node.kind.as_str());
        let settings = ExportSettings::PNG_2X;
        let bytes = match host.export_node(&node.id, settings).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Export of {} failed: {}", node.name, e);
                outbox.post(Message::error(e.to_string()));
                summary.failed += 1;
                continue;
            }
        };
        log::debug!("Rasterized {}: {} bytes", node.name, bytes.len());

        outbox.post(Message::ExportImage {
            data: ImageExport::from_png(node.image_file_name(settings.format), &bytes),
        });
        outbox.post(Message::ExportDesign {
            design_data: DesignData::from_node(node),
        });
        outbox.post(Message::status(EXPORT_COMPLETE_MESSAGE));
        summary.exported += 1;
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_on;
    use crate::host::MemoryHost;
    use crate::node::{NodeKind, NodeStyle};
    use crate::protocol::RgbColor;
    use crate::transport::PluginTransport;
    use kurbo::Rect;

    fn host_with(kinds: &[(&str, NodeKind)]) -> MemoryHost {
        let mut host = MemoryHost::new();
        let ids: Vec<_> = kinds
            .iter()
            .enumerate()
            .map(|(i, (name, kind))| {
                let x = i as f64 * 50.0;
                host.add_node(
                    name,
                    kind.clone(),
                    Rect::new(x, 0.0, x + 20.0, 10.0),
                    NodeStyle::solid(RgbColor::new(0.0, 0.0, 1.0)),
                )
            })
            .collect();
        host.select(&ids);
        host
    }

    #[test]
    fn test_empty_selection_posts_single_error() {
        let host = MemoryHost::new();
        let (sandbox, ui) = PluginTransport::pair();

        let summary = block_on(export_selection(&host, &host.selection(), &sandbox.outbox()));

        assert_eq!(summary, ExportSummary::default());
        assert_eq!(ui.drain(), vec![Message::error(EMPTY_SELECTION_MESSAGE)]);
    }

    #[test]
    fn test_one_image_per_exportable_node() {
        let host = host_with(&[("Hero", NodeKind::Frame), ("Button", NodeKind::Component)]);
        let (sandbox, ui) = PluginTransport::pair();

        let summary = block_on(export_selection(&host, &host.selection(), &sandbox.outbox()));
        assert_eq!(summary.exported, 2);

        let messages = ui.drain();
        let kinds: Vec<_> = messages.iter().map(Message::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "export-image", "export-design", "status",
                "export-image", "export-design", "status",
            ]
        );

        let names: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                Message::ExportImage { data } => Some(data.file_name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["Hero.png", "Button.png"]);
    }

    #[test]
    fn test_image_bytes_are_base64_png() {
        let host = host_with(&[("Hero", NodeKind::Frame)]);
        let (sandbox, ui) = PluginTransport::pair();
        block_on(export_selection(&host, &host.selection(), &sandbox.outbox()));

        let Some(Message::ExportImage { data }) = ui.try_recv() else {
            panic!("expected export-image first");
        };
        let bytes = data.decode().unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_design_data_matches_node() {
        let host = host_with(&[("Hero", NodeKind::Frame)]);
        let node = host.selection().remove(0);
        let (sandbox, ui) = PluginTransport::pair();
        block_on(export_selection(&host, &[node.clone()], &sandbox.outbox()));

        let design = ui
            .drain()
            .into_iter()
            .find_map(|m| match m {
                Message::ExportDesign { design_data } => Some(design_data),
                _ => None,
            })
            .unwrap();
        assert_eq!(design, DesignData::from_node(&node));
        assert!((design.width - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_failing_node_does_not_abort_batch() {
        let mut host = host_with(&[
            ("First", NodeKind::Frame),
            ("Broken", NodeKind::Frame),
            ("Last", NodeKind::Component),
        ]);
        let broken = host.selection()[1].id.clone();
        host.fail_export(&broken);
        let (sandbox, ui) = PluginTransport::pair();

        let summary = block_on(export_selection(&host, &host.selection(), &sandbox.outbox()));
        assert_eq!(summary, ExportSummary { exported: 2, failed: 1, skipped: 0 });

        let messages = ui.drain();
        assert_eq!(messages.iter().filter(|m| m.kind() == "export-image").count(), 2);
        let errors: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                Message::Error { message } => Some(message.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Render failed"));
        assert_eq!(messages.last().map(Message::kind), Some("status"));
    }

    #[test]
    fn test_non_exportable_nodes_are_skipped() {
        let host = host_with(&[("Label", NodeKind::Text), ("Card", NodeKind::Frame)]);
        let (sandbox, ui) = PluginTransport::pair();

        let summary = block_on(export_selection(&host, &host.selection(), &sandbox.outbox()));
        assert_eq!(summary, ExportSummary { exported: 1, failed: 0, skipped: 1 });
        assert_eq!(ui.drain().len(), 3);
    }
}
