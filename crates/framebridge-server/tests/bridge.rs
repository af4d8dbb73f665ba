//! End-to-end tests against a listening bridge.

use framebridge_core::Message;
use framebridge_core::kurbo::Rect;
use framebridge_core::protocol::{ImageExport, RectangleCommand, RgbColor};
use framebridge_core::{DesignData, Node, NodeId, NodeKind, NodeStyle};
use framebridge_server::{
    BridgeServer, CONNECTED_MESSAGE, LIVENESS_TEXT, MemoryStore, RunningBridge, ServerConfig,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{TempDir, tempdir};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn start_bridge() -> (RunningBridge, TempDir) {
    let dir = tempdir().unwrap();
    let mut config = ServerConfig::with_root(dir.path());
    config.bind = "127.0.0.1:0".parse().unwrap();
    let running = BridgeServer::new(config).unwrap().start().await.unwrap();
    (running, dir)
}

async fn connect_raw(addr: SocketAddr) -> Client {
    let (ws, _) = timeout(WAIT, connect_async(format!("ws://{}", addr)))
        .await
        .expect("connect timed out")
        .unwrap();
    ws
}

/// Connect and consume the greeting.
async fn connect(addr: SocketAddr) -> Client {
    let mut ws = connect_raw(addr).await;
    assert!(matches!(recv(&mut ws).await, Message::Connected { .. }));
    ws
}

async fn recv(ws: &mut Client) -> Message {
    loop {
        let frame = timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for a message")
            .expect("connection closed")
            .unwrap();
        if let WsMessage::Text(text) = frame {
            return Message::from_json(text.as_str()).unwrap();
        }
    }
}

async fn send(ws: &mut Client, msg: &Message) {
    ws.send(WsMessage::text(msg.to_json().unwrap())).await.unwrap();
}

async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n", path, addr);
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    timeout(WAIT, stream.read_to_string(&mut response))
        .await
        .expect("http timed out")
        .unwrap();
    response
}

fn design(name: &str) -> DesignData {
    let node = Node::new(NodeId::new("1:2"), name, NodeKind::Frame, Rect::new(10.0, 20.0, 210.0, 120.0))
        .with_style(NodeStyle::solid(RgbColor::new(0.1, 0.2, 0.3)));
    DesignData::from_node(&node)
}

#[tokio::test]
async fn test_greeting_is_first_frame() {
    let (running, _dir) = start_bridge().await;
    let mut ws = connect_raw(running.local_addr()).await;

    match recv(&mut ws).await {
        Message::Connected { message } => assert_eq!(message, CONNECTED_MESSAGE),
        other => panic!("expected connected, got {:?}", other),
    }
    assert_eq!(running.connection_count(), 1);

    running.stop().await.unwrap();
}

#[tokio::test]
async fn test_export_image_is_written() {
    let (running, dir) = start_bridge().await;
    let mut ws = connect(running.local_addr()).await;
    let png = [0x89, b'P', b'N', b'G', 1, 2, 3];

    send(&mut ws, &Message::ExportImage { data: ImageExport::from_png("Hero.png", &png) }).await;

    let Message::ImageSaved { data } = recv(&mut ws).await else {
        panic!("expected image-saved");
    };
    assert_eq!(data.file_name, "Hero.png");
    let expected = dir.path().join("images").join("Hero.png");
    assert_eq!(Path::new(&data.path), expected);
    assert_eq!(std::fs::read(expected).unwrap(), png);

    running.stop().await.unwrap();
}

#[tokio::test]
async fn test_repeated_export_is_idempotent() {
    let (running, dir) = start_bridge().await;
    let mut ws = connect(running.local_addr()).await;
    let msg = Message::ExportImage { data: ImageExport::from_png("Card.png", &[4, 5, 6]) };

    send(&mut ws, &msg).await;
    let first = recv(&mut ws).await;
    send(&mut ws, &msg).await;
    let second = recv(&mut ws).await;

    assert_eq!(first, second);
    let images = dir.path().join("images");
    assert_eq!(std::fs::read_dir(&images).unwrap().count(), 1);
    assert_eq!(std::fs::read(images.join("Card.png")).unwrap(), vec![4, 5, 6]);

    running.stop().await.unwrap();
}

#[tokio::test]
async fn test_export_design_round_trips() {
    let (running, dir) = start_bridge().await;
    let mut ws = connect(running.local_addr()).await;
    let original = design("Landing");

    send(&mut ws, &Message::ExportDesign { design_data: original.clone() }).await;

    let Message::DesignSaved { data } = recv(&mut ws).await else {
        panic!("expected design-saved");
    };
    let expected = dir.path().join("data").join("design-data.json");
    assert_eq!(Path::new(&data.path), expected);
    let loaded: Value = serde_json::from_slice(&std::fs::read(expected).unwrap()).unwrap();
    assert_eq!(loaded, serde_json::to_value(&original).unwrap());

    running.stop().await.unwrap();
}

#[tokio::test]
async fn test_design_file_matches_sent_payload() {
    let (running, dir) = start_bridge().await;
    let mut ws = connect(running.local_addr()).await;
    let payload = json!({
        "type": "export-design",
        "designData": {
            "name": "Pricing",
            "type": "COMPONENT",
            "width": 100,
            "height": 40,
            "x": 12,
            "y": 0,
            "styles": { "fills": [], "strokes": [] },
        },
    });

    ws.send(WsMessage::text(payload.to_string())).await.unwrap();
    assert!(matches!(recv(&mut ws).await, Message::DesignSaved { .. }));

    let written = std::fs::read(dir.path().join("data").join("design-data.json")).unwrap();
    let loaded: Value = serde_json::from_slice(&written).unwrap();
    assert_eq!(loaded, payload["designData"]);
    assert!(!String::from_utf8(written).unwrap().contains("100.0"));

    running.stop().await.unwrap();
}

#[tokio::test]
async fn test_custom_store_receives_artifacts() {
    let dir = tempdir().unwrap();
    let mut config = ServerConfig::with_root(dir.path());
    config.bind = "127.0.0.1:0".parse().unwrap();
    let store = Arc::new(MemoryStore::new());
    let running = BridgeServer::with_store(config, store.clone()).start().await.unwrap();
    let mut ws = connect(running.local_addr()).await;

    send(&mut ws, &Message::ExportImage { data: ImageExport::from_png("Logo.png", &[7, 7]) }).await;

    let Message::ImageSaved { data } = recv(&mut ws).await else {
        panic!("expected image-saved");
    };
    assert_eq!(store.get(Path::new(&data.path)), Some(vec![7, 7]));
    assert!(!dir.path().join("images").exists());

    running.stop().await.unwrap();
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let (running, _dir) = start_bridge().await;
    let mut ws = connect(running.local_addr()).await;

    ws.send(WsMessage::text("this is not json")).await.unwrap();
    assert!(matches!(recv(&mut ws).await, Message::Error { .. }));

    send(&mut ws, &Message::ExportImage { data: ImageExport::from_png("after.png", &[1]) }).await;
    assert!(matches!(recv(&mut ws).await, Message::ImageSaved { .. }));

    running.stop().await.unwrap();
}

#[tokio::test]
async fn test_traversal_name_is_rejected() {
    let (running, dir) = start_bridge().await;
    let mut ws = connect(running.local_addr()).await;

    send(&mut ws, &Message::ExportImage { data: ImageExport::from_png("../evil.png", &[1]) }).await;

    match recv(&mut ws).await {
        Message::Error { message } => assert!(message.contains("Invalid file name"), "{}", message),
        other => panic!("expected error, got {:?}", other),
    }
    assert!(!dir.path().join("evil.png").exists());

    running.stop().await.unwrap();
}

#[tokio::test]
async fn test_commands_relay_to_other_clients_only() {
    let (running, _dir) = start_bridge().await;
    let mut tool = connect(running.local_addr()).await;
    let mut plugin = connect(running.local_addr()).await;

    let command = Message::CreateRectangle {
        data: RectangleCommand {
            x: Some(100.0),
            y: Some(100.0),
            width: Some(200.0),
            height: Some(100.0),
            fill: Some(RgbColor::new(1.0, 0.0, 0.0)),
        },
    };
    send(&mut tool, &command).await;

    assert_eq!(recv(&mut plugin).await, command);

    // The sender's next frame is the reply to this, not its own command.
    send(&mut tool, &Message::ExportRequest).await;
    match recv(&mut tool).await {
        Message::Error { message } => assert!(message.contains("export-request")),
        other => panic!("command was echoed back: {:?}", other),
    }

    running.stop().await.unwrap();
}

#[tokio::test]
async fn test_plain_http_gets_liveness_text() {
    let (running, _dir) = start_bridge().await;

    let root = http_get(running.local_addr(), "/").await;
    assert!(root.starts_with("HTTP/1.1 200"), "{}", root);
    assert!(root.ends_with(LIVENESS_TEXT), "{}", root);

    let health = http_get(running.local_addr(), "/health").await;
    assert!(health.ends_with("ok"), "{}", health);

    running.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_closes_connections() {
    let (running, _dir) = start_bridge().await;
    let mut ws = connect(running.local_addr()).await;

    timeout(WAIT, running.stop()).await.expect("stop timed out").unwrap();

    loop {
        match timeout(WAIT, ws.next()).await.expect("connection not closed") {
            Some(Ok(WsMessage::Close(_))) | None | Some(Err(_)) => break,
            Some(Ok(_)) => {}
        }
    }
}
