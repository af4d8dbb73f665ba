//! FrameBridge Core Library
//!
//! Plugin-side logic of the FrameBridge export bridge: the wire protocol, the
//! design host abstraction, the artifact encoder, the command dispatcher and
//! the in-process transport between sandbox and UI surface.

pub mod client;
pub mod dispatcher;
pub mod encoder;
pub mod host;
pub mod node;
pub mod protocol;
pub mod sandbox;
pub mod transport;

#[cfg(not(target_arch = "wasm32"))]
pub use client::BridgeClient;
pub use kurbo;

pub use client::{ClientEvent, ConnectionState, ServerLink, UiSurface};
pub use dispatcher::{CommandDispatcher, Dispatch};
pub use encoder::{ExportSummary, export_selection};
pub use host::{DesignHost, ExportSettings, FontName, HostError, HostResult, MemoryHost};
pub use node::{DesignData, Node, NodeId, NodeKind, NodeStyle};
pub use protocol::{Message, ProtocolError};
pub use sandbox::Sandbox;
pub use transport::{Outbox, PluginTransport, SandboxPort, UiPort};

/// Simple blocking executor for tests. Host futures here never park.
#[cfg(test)]
pub(crate) fn block_on<F: std::future::Future>(f: F) -> F::Output {
    use std::task::{Context, Poll, Waker};

    let mut cx = Context::from_waker(Waker::noop());
    let mut f = std::pin::pin!(f);

    loop {
        match f.as_mut().poll(&mut cx) {
            Poll::Ready(result) => return result,
            Poll::Pending => {}
        }
    }
}
