use crate::interface_adapters::protocol::{ClientMessage, ServerMessage, TopicDto};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{ChannelError, ClientId, Fleet, Outbound, Topic};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    // The update channel dropped this client (pruned or disconnected elsewhere).
    UpdatesClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let fleet = state.fleet.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, fleet))
}

async fn handle_socket(mut socket: WebSocket, fleet: Fleet) {
    // Register with the update channel before anything else so no tick is missed.
    let (client_id, outbound_rx) = fleet.channel().connect().await;
    let span = info_span!("conn", client_id);

    async move {
        let identity = ServerMessage::Identity {
            client_id: client_id.to_string(),
        };
        let identity_bytes = match send_message(&mut socket, &identity).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = ?e, "failed to send identity");
                fleet.channel().disconnect(client_id).await;
                return;
            }
        };
        info!("client connected");

        let now = Instant::now() - LOG_THROTTLE;
        let mut ctx = ConnCtx {
            client_id,
            fleet,
            outbound_rx,
            msgs_in: 0,
            msgs_out: 1,
            bytes_in: 0,
            bytes_out: identity_bytes as u64,
            invalid_json: 0,
            last_invalid_log: now,
            close_frame: None,
        };

        if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
            warn!(error = ?e, "client loop exited with error");
        }
        ctx.disconnect_cleanup().await;
    }
    .instrument(span)
    .await
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    // Serialization and send errors go back to the caller.
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    client_id: ClientId,
    fleet: Fleet,
    // Per-connection queue filled by the update channel.
    outbound_rx: mpsc::Receiver<Outbound>,

    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,

    invalid_json: u32,
    last_invalid_log: Instant,

    close_frame: Option<CloseFrame>,
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming command from the client
            incoming = socket.recv() => {
                match ctx.handle_incoming(socket, incoming).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing world snapshot or ship update
            outbound = ctx.outbound_rx.recv() => {
                match outbound {
                    Some(msg) => match ctx.forward_outbound(socket, &msg).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    None => {
                        fatal = Some(NetError::UpdatesClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

impl ConnCtx {
    async fn handle_incoming(
        &mut self,
        socket: &mut WebSocket,
        incoming: Option<Result<Message, Error>>,
    ) -> Result<LoopControl, NetError> {
        let client_id = self.client_id;
        match incoming {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    self.msgs_in += 1;
                    self.bytes_in += text.len() as u64;

                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(cmd) => {
                            let reply = self.apply_command(cmd).await?;
                            self.reply(socket, &reply).await
                        }
                        Err(parse_err) => {
                            self.invalid_json += 1;
                            if should_log(&mut self.last_invalid_log) {
                                warn!(
                                    client_id,
                                    bytes = text.len(),
                                    error = %parse_err,
                                    "failed to parse client message"
                                );
                            }

                            if self.invalid_json > MAX_INVALID_JSON {
                                self.close_frame = Some(CloseFrame {
                                    code: close_code::POLICY,
                                    reason: "too many invalid messages".into(),
                                });
                                return Ok(LoopControl::Disconnect);
                            }
                            Ok(LoopControl::Continue)
                        }
                    }
                }
                Message::Binary(_) => {
                    self.close_frame = Some(CloseFrame {
                        code: close_code::UNSUPPORTED,
                        reason: "binary messages not supported".into(),
                    });
                    Ok(LoopControl::Disconnect)
                }
                Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
                Message::Close(_) => Ok(LoopControl::Disconnect),
            },
            Some(Err(e)) => {
                warn!(client_id, error = %e, "websocket recv error");
                Ok(LoopControl::Disconnect)
            }
            None => {
                info!(client_id, "websocket closed");
                Ok(LoopControl::Disconnect)
            }
        }
    }

    // Applies a client command to the update channel and returns the acknowledgement.
    async fn apply_command(&self, cmd: ClientMessage) -> Result<ServerMessage, NetError> {
        let channel = self.fleet.channel();
        let result = match cmd {
            ClientMessage::Board { ship } => {
                let ship = ship.trim();
                if let Err(e) = self.fleet.registry().find(ship).await {
                    return Ok(ServerMessage::Error {
                        message: e.to_string(),
                    });
                }
                channel
                    .board(self.client_id, Arc::from(ship))
                    .await
                    .map(|()| ServerMessage::Boarded {
                        ship: ship.to_string(),
                    })
            }
            ClientMessage::Subscribe(topic) => {
                let topic = Topic::from(topic);
                if let Topic::Ship(name) = &topic {
                    if let Err(e) = self.fleet.registry().find(name).await {
                        return Ok(ServerMessage::Error {
                            message: e.to_string(),
                        });
                    }
                }
                let ack = TopicDto::from(&topic);
                channel
                    .subscribe(self.client_id, topic)
                    .await
                    .map(|_| ServerMessage::Subscribed { topic: ack })
            }
            ClientMessage::Unsubscribe(topic) => {
                let topic = Topic::from(topic);
                channel
                    .unsubscribe(self.client_id, &topic)
                    .await
                    .map(|_| ServerMessage::Unsubscribed {
                        topic: TopicDto::from(&topic),
                    })
            }
        };

        // The channel only forgets a client that is already gone.
        result.map_err(|ChannelError::UnknownClient(_)| NetError::UpdatesClosed)
    }

    async fn reply(
        &mut self,
        socket: &mut WebSocket,
        msg: &ServerMessage,
    ) -> Result<LoopControl, NetError> {
        match send_message(socket, msg).await {
            Ok(bytes) => {
                self.msgs_out += 1;
                self.bytes_out += bytes as u64;
                Ok(LoopControl::Continue)
            }
            Err(err) => {
                // Log unexpected send failures; disconnect will follow immediately.
                warn!(error = ?err, "failed to send reply");
                Ok(LoopControl::Disconnect)
            }
        }
    }

    async fn forward_outbound(&mut self, socket: &mut WebSocket, msg: &Outbound) -> LoopControl {
        match send_message(socket, &ServerMessage::from(msg)).await {
            Ok(bytes) => {
                self.msgs_out += 1;
                self.bytes_out += bytes as u64;
                LoopControl::Continue
            }
            Err(err) => {
                // A failed send only ends this connection; other clients keep their queues.
                warn!(error = ?err, "failed to send update");
                LoopControl::Disconnect
            }
        }
    }

    async fn disconnect_cleanup(&self) {
        // Drop all subscriptions immediately so no more work is queued for this client.
        self.fleet.channel().disconnect(self.client_id).await;

        debug!(
            client_id = self.client_id,
            msgs_in = self.msgs_in,
            msgs_out = self.msgs_out,
            bytes_in = self.bytes_in,
            bytes_out = self.bytes_out,
            invalid_json = self.invalid_json,
            "connection stats"
        );
        info!(client_id = self.client_id, "client disconnected");
    }
}
