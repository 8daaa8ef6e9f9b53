use std::pin::Pin;

use futures_util::future::BoxFuture;
use futures_util::{Sink, Stream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};

pub type FrameSink = Pin<Box<dyn Sink<Message, Error = tungstenite::Error> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Message, tungstenite::Error>> + Send>>;

/// An open socket, split into its write and read halves.
pub struct Socket {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// Opens WebSocket connections to the gateway.
pub trait Transport: Send + Sync + 'static {
    fn connect(&self, url: String) -> BoxFuture<'static, Result<Socket, tungstenite::Error>>;
}

/// The real network transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteTransport;

impl Transport for TungsteniteTransport {
    fn connect(&self, url: String) -> BoxFuture<'static, Result<Socket, tungstenite::Error>> {
        Box::pin(async move {
            let (ws, _response) = connect_async(url.as_str()).await?;
            let (sink, stream) = ws.split();
            Ok(Socket {
                sink: Box::pin(sink),
                stream: Box::pin(stream),
            })
        })
    }
}

/// Build the gateway URL with version and encoding query parameters.
pub fn gateway_url(base: &str, version: u8) -> String {
    let base = base.trim_end_matches(['/', '?']);
    format!("{base}/?v={version}&encoding=json")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_url() {
        assert_eq!(
            gateway_url("wss://gateway.discord.gg", 10),
            "wss://gateway.discord.gg/?v=10&encoding=json"
        );
        assert_eq!(
            gateway_url("ws://127.0.0.1:9000/", 9),
            "ws://127.0.0.1:9000/?v=9&encoding=json"
        );
    }
}
