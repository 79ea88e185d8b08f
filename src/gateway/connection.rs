use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use chrono::Utc;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::protocol::ServerMessage;
use crate::router;
use crate::state::ServiceState;

use super::CLOSE_INTERNAL_ERROR;

/// Actor for one authenticated journey channel.
///
/// The socket is split: a writer task owns the sink and drains an mpsc
/// channel, so the registry, the keep-alive sweep and this reader loop
/// can all push frames without sharing the sink. The reader processes
/// inbound frames in arrival order. The cancel handle lets the registry
/// tear the actor down when the entry is reaped or superseded, even if
/// the peer never closes its end.
pub async fn run_connection(
    socket: WebSocket,
    state: ServiceState,
    worker_id: Uuid,
    journey_id: Uuid,
) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();
    let cancel = Arc::new(Notify::new());

    let conn_id = state
        .registry
        .register(worker_id, journey_id, tx.clone(), cancel.clone());

    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Registration is itself a sign of life; the liveness row must exist
    // before the scanner's next pass.
    if let Err(e) = state.store.ensure_record(worker_id, journey_id, Utc::now()).await {
        error!(%worker_id, %journey_id, "failed to create liveness record: {}", e);
        let _ = tx.send(Message::Close(Some(CloseFrame {
            code: CLOSE_INTERNAL_ERROR,
            reason: "liveness store unavailable".into(),
        })));
        state.registry.remove(worker_id, journey_id, conn_id);
        drain_writer(tx, writer_handle).await;
        return;
    }

    let _ = tx.send(
        ServerMessage::ConnectionEstablished { message: "journey channel established".to_string() }
            .to_ws_message(),
    );

    info!(%worker_id, %journey_id, "journey channel open");

    loop {
        tokio::select! {
            _ = cancel.notified() => {
                debug!(%worker_id, %journey_id, "connection cancelled by registry");
                break;
            }
            frame = ws_receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    router::process_frame(&state.store, worker_id, journey_id, text.as_str(), &tx)
                        .await;
                }
                Some(Ok(Message::Pong(_))) => {
                    state.registry.mark_alive(worker_id, journey_id, conn_id);
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = tx.send(Message::Pong(data));
                }
                Some(Ok(Message::Binary(_))) => {
                    debug!(%worker_id, %journey_id, "binary frame dropped");
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(%worker_id, %journey_id, reason = ?frame, "client closed channel");
                    break;
                }
                Some(Err(e)) => {
                    warn!(%worker_id, %journey_id, "receive error: {}", e);
                    break;
                }
                None => {
                    info!(%worker_id, %journey_id, "channel stream ended");
                    break;
                }
            }
        }
    }

    state.registry.remove(worker_id, journey_id, conn_id);
    drain_writer(tx, writer_handle).await;
    info!(%worker_id, %journey_id, "journey channel closed");
}

/// Drop the last senders and wait for the writer to flush queued frames
/// (a close frame from the registry may still be in the channel). The
/// timeout guards against a peer that never drains its receive buffer.
async fn drain_writer(tx: mpsc::UnboundedSender<Message>, mut writer: tokio::task::JoinHandle<()>) {
    drop(tx);
    if tokio::time::timeout(std::time::Duration::from_secs(5), &mut writer).await.is_err() {
        debug!("writer did not flush in time, aborting");
        writer.abort();
    }
}

/// Forwards queued outbound frames to the socket sink until the channel
/// or the sink closes.
async fn writer_task(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            break;
        }
    }
}
