//! Headless FrameBridge plugin (native).
//!
//! Runs the sandbox against an in-memory demo document and the UI surface
//! against a live bridge server. Commands from the server are applied to the
//! document; `--export` exports the demo selection once connected.

mod document;

use clap::Parser;
use framebridge_core::{BridgeClient, ConnectionState, ExportSummary, PluginTransport, Sandbox, UiSurface};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Time allowed for the server to acknowledge every exported artifact.
const ACK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
#[command(name = "framebridge-plugin", version, about)]
struct Cli {
    /// Bridge server URL.
    #[arg(long, env = "FRAMEBRIDGE_SERVER", default_value = "ws://127.0.0.1:3055")]
    server: String,

    /// Export the demo selection once connected, then exit.
    #[arg(long)]
    export: bool,

    /// Number of frames in the demo document.
    #[arg(long, default_value_t = 2)]
    demo_frames: usize,
}

#[derive(Debug, Error)]
enum PluginError {
    #[error("Failed to connect: {0}")]
    Connect(String),
    #[error("Connection to the bridge server was lost")]
    Disconnected,
    #[error("Server acknowledged {received} of {expected} artifacts")]
    Unacknowledged { received: usize, expected: usize },
}

/// Each exported node sends an image and its design data, and the server
/// answers each with a save confirmation or an error.
fn export_settled(summary: ExportSummary, acknowledged: usize) -> bool {
    acknowledged >= summary.exported * 2
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    log::info!("Starting FrameBridge plugin");

    if let Err(e) = run(cli) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), PluginError> {
    let (sandbox_port, ui_port) = PluginTransport::pair();
    let mut sandbox = Sandbox::new(document::demo_host(cli.demo_frames), sandbox_port);
    let mut surface = UiSurface::new(ui_port);

    let mut client = BridgeClient::new();
    client.connect(&cli.server).map_err(PluginError::Connect)?;

    let mut was_connected = false;
    let mut export_requested_at: Option<Instant> = None;

    loop {
        surface.deliver_inbound(&mut client);
        let handled = pollster::block_on(sandbox.process_pending());
        if handled > 0 {
            log::debug!("Sandbox handled {} messages", handled);
        }
        surface.forward_outbound(&client);

        match client.state() {
            ConnectionState::Connected => was_connected = true,
            ConnectionState::Error => return Err(PluginError::Disconnected),
            ConnectionState::Disconnected if was_connected => return Err(PluginError::Disconnected),
            _ => {}
        }

        if cli.export {
            if client.is_connected() && export_requested_at.is_none() {
                surface.request_export();
                export_requested_at = Some(Instant::now());
            }
            if let Some(summary) = sandbox.last_export() {
                if export_settled(summary, surface.acknowledged()) {
                    log::info!(
                        "Export finished: {} saved, {} failed, {} skipped, {} rejected by the server",
                        surface.saved_images().len(),
                        summary.failed,
                        summary.skipped,
                        surface.server_errors()
                    );
                    return Ok(());
                }
                if export_requested_at.is_some_and(|at| at.elapsed() >= ACK_TIMEOUT) {
                    return Err(PluginError::Unacknowledged {
                        received: surface.acknowledged(),
                        expected: summary.exported * 2,
                    });
                }
            }
        }

        thread::sleep(POLL_INTERVAL);
    }
}
