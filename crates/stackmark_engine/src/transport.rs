use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::SessionError;

/// A duplex channel of text frames.
#[async_trait]
pub trait Transport: Send {
    async fn send_text(&mut self, text: String) -> Result<(), SessionError>;

    /// Next inbound text frame. Pending until one arrives.
    async fn recv_text(&mut self) -> Result<String, SessionError>;
}

/// Websocket transport to the browser's debugger endpoint.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTransport {
    pub async fn connect(ws_url: &str) -> Result<Self, SessionError> {
        let (stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|err| SessionError::Connection {
                endpoint: ws_url.to_string(),
                reason: err.to_string(),
            })?;
        Ok(Self { stream })
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), SessionError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|err| SessionError::Transport(err.to_string()))
    }

    async fn recv_text(&mut self) -> Result<String, SessionError> {
        while let Some(message) = self.stream.next().await {
            match message {
                Ok(Message::Text(text)) => return Ok(text.as_str().to_owned()),
                Ok(Message::Binary(bytes)) => {
                    return String::from_utf8(bytes.to_vec())
                        .map_err(|err| SessionError::Transport(err.to_string()))
                }
                Ok(Message::Close(_)) => {
                    return Err(SessionError::Transport("closed by browser".into()))
                }
                Ok(_) => continue,
                Err(err) => return Err(SessionError::Transport(err.to_string())),
            }
        }
        Err(SessionError::Transport("stream ended".into()))
    }
}
