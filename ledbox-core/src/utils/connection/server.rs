//! WebSocket Server Module
//!
//! Serves the door-lock web UI with `picoserve`. Browsers send JSON
//! [`LockCommand`]s over `/ws`; each one is handed to the door task and its
//! [`LockReply`] goes back on the same socket.

extern crate alloc;

use embassy_net::Stack;
use embassy_time::Duration;
use picoserve::{
    io::embedded_io_async as embedded_aio,
    response::{
        ws::{Message, ReadMessageError, SocketRx, SocketTx, WebSocketCallback, WebSocketUpgrade},
        StatusCode,
    },
    Router,
};

use crate::utils::{
    frontend::{HTML, JAVA},
    lock::door::{request, LockCommand, LockReply},
};

pub struct WebSocket;

/// Forward a decoded command and encode the reply.
async fn handle(cmd: LockCommand) -> Result<alloc::string::String, serde_json::Error> {
    let reply: LockReply = request(cmd).await;
    serde_json::to_string(&reply)
}

/// Handles incoming WebSocket connections.
impl WebSocketCallback for WebSocket {
    async fn run<Reader, Writer>(
        self,
        mut rx: SocketRx<Reader>,
        mut tx: SocketTx<Writer>,
    ) -> Result<(), Writer::Error>
    where
        Reader: embedded_aio::Read,
        Writer: embedded_aio::Write<Error = Reader::Error>,
    {
        let mut buffer = [0; 1024];

        tx.send_text("Connected").await?;

        let close_reason = loop {
            match rx.next_message(&mut buffer).await {
                Ok(Message::Pong(_)) => continue,
                Ok(Message::Ping(data)) => tx.send_pong(data).await?,
                Ok(Message::Close(reason)) => {
                    tracing::info!(?reason, "websocket closed");
                    break None;
                }
                Ok(Message::Text(data)) => match serde_json::from_str::<LockCommand>(data) {
                    Ok(cmd) => match handle(cmd).await {
                        Ok(json) => tx.send_text(&json).await?,
                        Err(error) => tracing::error!(?error, "error serializing LockReply"),
                    },
                    Err(error) => {
                        tracing::error!(?error, "error deserializing LockCommand");
                        tx.send_text("Invalid command format").await?
                    }
                },
                Ok(Message::Binary(data)) => match serde_json::from_slice::<LockCommand>(data) {
                    Ok(cmd) => match handle(cmd).await {
                        Ok(json) => tx.send_binary(json.as_bytes()).await?,
                        Err(error) => tracing::error!(?error, "error serializing LockReply"),
                    },
                    Err(error) => {
                        tracing::error!(?error, "error deserializing incoming message");
                        tx.send_binary(b"Invalid command format").await?
                    }
                },
                Err(error) => {
                    tracing::error!(?error, "websocket error");
                    let code = match error {
                        ReadMessageError::TextIsNotUtf8 => 1007,
                        ReadMessageError::ReservedOpcode(_) => 1003,
                        ReadMessageError::ReadFrameError(_)
                        | ReadMessageError::UnexpectedMessageStart
                        | ReadMessageError::MessageStartsWithContinuation => 1002,
                        ReadMessageError::Io(err) => return Err(err),
                    };
                    break Some((code, "Websocket Error"));
                }
            };
        };

        tx.close(close_reason).await
    }
}

/// Creates WS Server
pub async fn run(
    id: usize,
    port: u16,
    stack: Stack<'static>,
    config: Option<&'static picoserve::Config<Duration>>,
) -> ! {
    let default_config = picoserve::Config::new(picoserve::Timeouts {
        start_read_request: Some(Duration::from_secs(5)),
        persistent_start_read_request: None,
        read_request: Some(Duration::from_secs(1)),
        write: Some(Duration::from_secs(5)),
    });

    let config = config.unwrap_or(&default_config);

    let router = Router::new()
        .route(
            "/",
            picoserve::routing::get(|| async {
                picoserve::response::Response::new(StatusCode::OK, HTML)
                    .with_headers([("Content-Type", "text/html; charset=utf-8")])
            }),
        )
        .route(
            "/script.js",
            picoserve::routing::get(|| async {
                picoserve::response::Response::new(StatusCode::OK, JAVA)
                    .with_headers([("Content-Type", "application/javascript; charset=utf-8")])
            }),
        )
        .route(
            "/ws",
            picoserve::routing::get(|upgrade: WebSocketUpgrade| async move {
                tracing::info!("new websocket connection");
                upgrade.on_upgrade(WebSocket).with_protocol("messages")
            }),
        );

    if let Some(ip_cfg) = stack.config_v4() {
        tracing::info!("Starting server at {}:{}", ip_cfg.address, port);
    } else {
        tracing::warn!(
            "Starting WebSocket server on port {port}, but no IPv4 address is assigned yet!"
        );
    }

    let (mut rx_buffer, mut tx_buffer, mut http_buffer) = ([0; 1024], [0; 1024], [0; 4096]);

    picoserve::listen_and_serve_with_state(
        id,
        &router,
        config,
        stack,
        port,
        &mut rx_buffer,
        &mut tx_buffer,
        &mut http_buffer,
        &(),
    )
    .await
}
