//! UI-surface side of the bridge: a WebSocket client to the bridge server and
//! the glue between it and the plugin transport.

use crate::protocol::{ImageSaved, Message};
use crate::transport::UiPort;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events from the bridge connection
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Socket opened
    Connected,
    /// Socket closed
    Disconnected,
    /// A message from the server or an external tool
    Received(Message),
    /// Error occurred
    Error { message: String },
}

/// Anything the UI surface can push messages through and poll events from.
pub trait ServerLink {
    fn send(&self, msg: &Message) -> Result<(), String>;
    fn poll_events(&mut self) -> Vec<ClientEvent>;
}

#[cfg(not(target_arch = "wasm32"))]
mod native_client {
    use super::*;
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::{Message as Frame, connect};
    use url::Url;

    /// Commands sent to the WebSocket thread.
    enum WsCommand {
        Send(String),
        Close,
    }

    /// Bridge server client.
    ///
    /// Uses a background thread for non-blocking operation.
    pub struct BridgeClient {
        state: ConnectionState,
        events: Vec<ClientEvent>,
        cmd_tx: Option<Sender<WsCommand>>,
        event_rx: Option<Receiver<ClientEvent>>,
        _thread: Option<JoinHandle<()>>,
    }

    impl BridgeClient {
        pub fn new() -> Self {
            Self {
                state: ConnectionState::Disconnected,
                events: Vec::new(),
                cmd_tx: None,
                event_rx: None,
                _thread: None,
            }
        }

        /// Connect to a bridge server, e.g. `ws://127.0.0.1:3055`.
        pub fn connect(&mut self, url: &str) -> Result<(), String> {
            if self.cmd_tx.is_some() {
                return Err("Already connected".to_string());
            }

            let parsed_url = Url::parse(url).map_err(|e| format!("Invalid URL: {}", e))?;
            if parsed_url.scheme() != "ws" && parsed_url.scheme() != "wss" {
                return Err(format!("Invalid WebSocket URL scheme: {}", parsed_url.scheme()));
            }

            self.state = ConnectionState::Connecting;

            let (cmd_tx, cmd_rx) = channel::<WsCommand>();
            let (event_tx, event_rx) = channel::<ClientEvent>();
            let url = url.to_string();

            let handle = thread::spawn(move || {
                log::info!("Bridge client: connecting to {}", url);

                let (mut socket, response) = match connect(&url) {
                    Ok(connected) => connected,
                    Err(e) => {
                        log::error!("Bridge connection failed: {}", e);
                        let _ = event_tx.send(ClientEvent::Error {
                            message: format!("Connection failed: {}", e),
                        });
                        return;
                    }
                };
                log::info!("Bridge connected, status: {}", response.status());
                let _ = event_tx.send(ClientEvent::Connected);

                // Short read timeout so queued sends are not starved by a quiet server.
                if let tungstenite::stream::MaybeTlsStream::Plain(tcp) = socket.get_mut() {
                    let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
                    let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
                }

                loop {
                    match cmd_rx.try_recv() {
                        Ok(WsCommand::Send(msg)) => {
                            if let Err(e) = socket.send(Frame::Text(msg)) {
                                log::error!("Bridge send error: {}", e);
                                break;
                            }
                        }
                        Ok(WsCommand::Close) => {
                            log::info!("Bridge close requested");
                            let _ = socket.close(None);
                            let _ = socket.flush();
                            break;
                        }
                        Err(TryRecvError::Disconnected) => break,
                        Err(TryRecvError::Empty) => {}
                    }

                    match socket.read() {
                        Ok(Frame::Text(txt)) => match Message::from_json(&txt) {
                            Ok(msg) => {
                                let _ = event_tx.send(ClientEvent::Received(msg));
                            }
                            Err(e) => log::warn!("Skipping unparseable frame: {}", e),
                        },
                        Ok(Frame::Ping(data)) => {
                            let _ = socket.send(Frame::Pong(data));
                        }
                        Ok(Frame::Close(_)) => {
                            log::info!("Bridge received close frame");
                            break;
                        }
                        Ok(_) => {}
                        Err(tungstenite::Error::Io(ref e))
                            if e.kind() == std::io::ErrorKind::WouldBlock
                                || e.kind() == std::io::ErrorKind::TimedOut =>
                        {
                            continue;
                        }
                        Err(e) => {
                            log::error!("Bridge read error: {}", e);
                            break;
                        }
                    }
                }

                log::info!("Bridge client thread exiting");
                let _ = event_tx.send(ClientEvent::Disconnected);
            });

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);
            Ok(())
        }

        pub fn disconnect(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(WsCommand::Close);
            }
            self.event_rx = None;
            self._thread = None;
            self.state = ConnectionState::Disconnected;
        }

        pub fn state(&self) -> ConnectionState {
            self.state
        }

        pub fn is_connected(&self) -> bool {
            self.state == ConnectionState::Connected
        }
    }

    impl ServerLink for BridgeClient {
        fn send(&self, msg: &Message) -> Result<(), String> {
            let json = msg.to_json().map_err(|e| e.to_string())?;
            match self.cmd_tx {
                Some(ref tx) => tx
                    .send(WsCommand::Send(json))
                    .map_err(|e| format!("Send failed: {}", e)),
                None => Err("Not connected".to_string()),
            }
        }

        fn poll_events(&mut self) -> Vec<ClientEvent> {
            if let Some(ref rx) = self.event_rx {
                while let Ok(event) = rx.try_recv() {
                    match &event {
                        ClientEvent::Connected => self.state = ConnectionState::Connected,
                        ClientEvent::Disconnected => self.state = ConnectionState::Disconnected,
                        ClientEvent::Error { .. } => self.state = ConnectionState::Error,
                        ClientEvent::Received(_) => {}
                    }
                    self.events.push(event);
                }
            }
            std::mem::take(&mut self.events)
        }
    }

    impl Default for BridgeClient {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for BridgeClient {
        fn drop(&mut self) {
            self.disconnect();
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native_client::BridgeClient;

/// The plugin's UI panel: relays between the sandbox transport and the server.
pub struct UiSurface {
    port: UiPort,
    last_status: Option<String>,
    saved_images: Vec<ImageSaved>,
    designs_saved: usize,
    server_errors: usize,
}

impl UiSurface {
    pub fn new(port: UiPort) -> Self {
        Self {
            port,
            last_status: None,
            saved_images: Vec::new(),
            designs_saved: 0,
            server_errors: 0,
        }
    }

    /// Ask the sandbox to export the current selection.
    pub fn request_export(&self) {
        self.port.post(Message::ExportRequest);
    }

    /// Last status or error line shown to the user.
    pub fn last_status(&self) -> Option<&str> {
        self.last_status.as_deref()
    }

    /// Images the server has confirmed, in arrival order.
    pub fn saved_images(&self) -> &[ImageSaved] {
        &self.saved_images
    }

    pub fn designs_saved(&self) -> usize {
        self.designs_saved
    }

    /// `error` replies received from the server.
    pub fn server_errors(&self) -> usize {
        self.server_errors
    }

    /// Server replies of any kind to forwarded artifacts.
    pub fn acknowledged(&self) -> usize {
        self.saved_images.len() + self.designs_saved + self.server_errors
    }

    /// Send the sandbox's artifacts and command results to the server.
    /// Returns the number of messages sent.
    pub fn forward_outbound(&mut self, link: &impl ServerLink) -> usize {
        let mut sent = 0;
        for msg in self.port.drain() {
            match msg {
                Message::ExportImage { .. }
                | Message::ExportDesign { .. }
                | Message::RectangleCreated { .. }
                | Message::TextCreated { .. } => {
                    let kind = msg.kind();
                    match link.send(&msg) {
                        Ok(()) => sent += 1,
                        Err(e) => {
                            log::warn!("Dropped {} message: {}", kind, e);
                            self.last_status = Some(e);
                        }
                    }
                }
                Message::Status { message } => {
                    log::info!("{}", message);
                    self.last_status = Some(message);
                }
                Message::Error { message } => {
                    log::warn!("{}", message);
                    self.last_status = Some(message);
                }
                other => log::debug!("UI ignoring {} from sandbox", other.kind()),
            }
        }
        sent
    }

    /// Deliver commands received from the server into the sandbox.
    /// Returns the number of commands delivered.
    pub fn deliver_inbound(&mut self, link: &mut impl ServerLink) -> usize {
        let mut delivered = 0;
        for event in link.poll_events() {
            match event {
                ClientEvent::Received(msg) if msg.is_command() => {
                    self.port.post(msg);
                    delivered += 1;
                }
                ClientEvent::Received(Message::Connected { message }) => log::info!("{}", message),
                ClientEvent::Received(Message::ImageSaved { data }) => {
                    log::info!("Saved {} to {}", data.file_name, data.path);
                    self.saved_images.push(data);
                }
                ClientEvent::Received(Message::DesignSaved { data }) => {
                    log::info!("Saved design data to {}", data.path);
                    self.designs_saved += 1;
                }
                ClientEvent::Received(Message::Error { message }) => {
                    log::warn!("Server error: {}", message);
                    self.server_errors += 1;
                    self.last_status = Some(message);
                }
                ClientEvent::Received(other) => log::debug!("UI ignoring {} from server", other.kind()),
                ClientEvent::Connected => log::info!("Connected to bridge server"),
                ClientEvent::Disconnected => log::info!("Disconnected from bridge server"),
                ClientEvent::Error { message } => {
                    log::error!("{}", message);
                    self.last_status = Some(message);
                }
            }
        }
        delivered
    }
}
