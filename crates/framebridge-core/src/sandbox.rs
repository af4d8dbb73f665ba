//! The plugin's sandbox-side event loop.

use crate::dispatcher::CommandDispatcher;
use crate::encoder::{ExportSummary, export_selection};
use crate::host::DesignHost;
use crate::protocol::Message;
use crate::transport::SandboxPort;

/// Plugin logic running inside the design tool.
///
/// Owns the host capabilities and the sandbox end of the transport. Each
/// inbound message runs to completion before the next one is taken.
pub struct Sandbox<H: DesignHost> {
    host: H,
    port: SandboxPort,
    dispatcher: CommandDispatcher,
    last_export: Option<ExportSummary>,
}

impl<H: DesignHost> Sandbox<H> {
    pub fn new(host: H, port: SandboxPort) -> Self {
        Self {
            host,
            port,
            dispatcher: CommandDispatcher::new(),
            last_export: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Summary of the most recent export pass, if one has run.
    pub fn last_export(&self) -> Option<ExportSummary> {
        self.last_export
    }

    /// Handle every message the UI has posted so far, oldest first.
    /// Returns the number of messages handled.
    pub async fn process_pending(&mut self) -> usize {
        let pending = self.port.drain();
        let count = pending.len();
        for msg in pending {
            self.handle(msg).await;
        }
        count
    }

    /// Handle a single message from the UI.
    pub async fn handle(&mut self, msg: Message) {
        log::debug!("Sandbox received {}", msg.kind());
        match msg {
            Message::ExportRequest => {
                let selection = self.host.selection();
                log::info!("Export requested for {} selected nodes", selection.len());
                let summary = export_selection(&self.host, &selection, &self.port.outbox()).await;
                log::info!(
                    "Export finished: {} exported, {} failed, {} skipped",
                    summary.exported,
                    summary.failed,
                    summary.skipped
                );
                self.last_export = Some(summary);
            }
            cmd @ (Message::CreateRectangle { .. } | Message::CreateText { .. }) => {
                let outbox = self.port.outbox();
                self.dispatcher.dispatch(&mut self.host, cmd, &outbox).await;
            }
            other => {
                log::debug!("Sandbox ignoring {} message", other.kind());
            }
        }
    }
}
