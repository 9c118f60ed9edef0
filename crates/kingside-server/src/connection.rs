//! Per-connection WebSocket plumbing.
//!
//! Each accepted socket gets a reader loop (this task) and a writer task.
//! The reader forwards text frames into the registry mailbox; the writer
//! drains the connection's outbound queue. Neither touches game state.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use kingside_protocol::{encode_server_message, ServerMessage};

use crate::registry::Command;

/// Run one connection to completion. Always emits `Disconnect` on the way
/// out, whatever tears the socket down.
pub async fn handle_connection(stream: TcpStream, commands: mpsc::UnboundedSender<Command>) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            warn!(error = %err, "websocket handshake failed");
            return;
        }
    };
    let (mut sink, mut source) = ws.split();

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let (reply_tx, reply_rx) = oneshot::channel();
    if commands
        .send(Command::Connect {
            out: out_tx,
            reply: reply_tx,
        })
        .is_err()
    {
        return;
    }
    let Ok(player) = reply_rx.await else {
        return;
    };

    let writer = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            match encode_server_message(&message) {
                Ok(text) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(err) => warn!(error = %err, "unserializable outbound message"),
            }
        }
    });

    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if commands
                    .send(Command::Inbound { player, raw: text })
                    .is_err()
                {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            // Pings are answered by the websocket layer; other frame kinds
            // carry nothing for us.
            Ok(_) => {}
            Err(err) => {
                debug!(player = %player, error = %err, "connection error");
                break;
            }
        }
    }

    let _ = commands.send(Command::Disconnect { player });
    writer.abort();
}
