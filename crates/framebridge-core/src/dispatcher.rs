//! Executes creation commands against the host document.

use crate::host::{DesignHost, FontName, HostError, RectangleSpec, TextSpec};
use crate::protocol::{CreatedNode, Message, RectangleCommand, TextCommand};
use crate::transport::Outbox;
use kurbo::Point;

const DEFAULT_RECTANGLE_SIZE: f64 = 100.0;

/// What happened to a message handed to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The object was created and reported.
    Created(CreatedNode),
    /// Creation failed and an error was reported.
    Failed,
    /// Not a creation command.
    Ignored,
}

/// Runs `create-rectangle` and `create-text` commands.
pub struct CommandDispatcher {
    font: FontName,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self {
            font: FontName::inter_regular(),
        }
    }

    /// Execute `msg` if it is a creation command and report the outcome on `outbox`.
    pub async fn dispatch<H: DesignHost + ?Sized>(
        &self,
        host: &mut H,
        msg: Message,
        outbox: &Outbox,
    ) -> Dispatch {
        let (result, reply): (Result<CreatedNode, String>, fn(CreatedNode) -> Message) = match msg {
            Message::CreateRectangle { data } => (
                self.create_rectangle(host, data)
                    .map_err(|e| format!("Failed to create rectangle: {}", e)),
                rectangle_created,
            ),
            Message::CreateText { data } => (
                self.create_text(host, data)
                    .await
                    .map_err(|e| format!("Failed to create text: {}", e)),
                text_created,
            ),
            other => {
                log::debug!("Dispatcher ignoring {} message", other.kind());
                return Dispatch::Ignored;
            }
        };

        match result {
            Ok(created) => {
                log::info!("Created node {}", created.id);
                outbox.post(reply(created.clone()));
                Dispatch::Created(created)
            }
            Err(message) => {
                log::warn!("{}", message);
                outbox.post(Message::error(message));
                Dispatch::Failed
            }
        }
    }

    fn create_rectangle<H: DesignHost + ?Sized>(
        &self,
        host: &mut H,
        command: RectangleCommand,
    ) -> Result<CreatedNode, HostError> {
        let spec = RectangleSpec {
            position: Point::new(command.x.unwrap_or(0.0), command.y.unwrap_or(0.0)),
            width: command.width.unwrap_or(DEFAULT_RECTANGLE_SIZE),
            height: command.height.unwrap_or(DEFAULT_RECTANGLE_SIZE),
            fill: command.fill,
        };
        let node = host.create_rectangle(spec)?;
        host.scroll_into_view(std::slice::from_ref(&node.id));

        Ok(CreatedNode {
            id: node.id.to_string(),
            x: node.position.x,
            y: node.position.y,
            width: Some(node.width),
            height: Some(node.height),
            content: None,
        })
    }

    async fn create_text<H: DesignHost + ?Sized>(
        &self,
        host: &mut H,
        command: TextCommand,
    ) -> Result<CreatedNode, HostError> {
        // Characters can only be assigned once the font is available.
        host.load_font(&self.font).await?;

        let spec = TextSpec {
            position: Point::new(command.x.unwrap_or(0.0), command.y.unwrap_or(0.0)),
            content: command.content.unwrap_or_default(),
            font_size: command.font_size,
            font: self.font.clone(),
        };
        let node = host.create_text(spec)?;
        host.scroll_into_view(std::slice::from_ref(&node.id));

        Ok(CreatedNode {
            id: node.id.to_string(),
            x: node.position.x,
            y: node.position.y,
            width: None,
            height: None,
            content: Some(node.characters.unwrap_or_default()),
        })
    }
}

fn rectangle_created(data: CreatedNode) -> Message {
    Message::RectangleCreated { data }
}

fn text_created(data: CreatedNode) -> Message {
    Message::TextCreated { data }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
