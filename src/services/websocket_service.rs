use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    dto::ws::{ParticipantInboundMessage, ParticipantOutboundMessage},
    error::ServiceError,
    state::{SharedState, registry::ConnectionId},
};

/// The writer side of a participant socket is gone.
#[derive(Debug, Error)]
#[error("connection closed")]
struct ConnectionClosed;

/// Handle the full lifecycle for an individual participant WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket, identity: String) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<ParticipantOutboundMessage>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    // Participant events end when the participant actor stops.
    let events_tx_writer = outbound_tx.clone();
    let forwarder_task = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if send_message_to_websocket(&events_tx_writer, &event).is_err() {
                break;
            }
        }
    });

    let connection_id = match state.registry().connect(Some(&identity), events_tx).await {
        Ok(connection_id) => {
            state.update_degraded(false);
            connection_id
        }
        Err(err) => {
            if matches!(
                err,
                ServiceError::AdapterFailure(_) | ServiceError::AdapterTimeout
            ) {
                state.update_degraded(true);
            }
            warn!(identity = %identity, error = %err, "rejecting participant connection");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, forwarder_task, outbound_tx).await;
            return;
        }
    };

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(%connection_id, payload = %text.as_str(), "received participant message");
                handle_text(&state, &connection_id, text.as_str());
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(%connection_id, identity = %identity, "participant closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    state.registry().disconnect(&connection_id);
    finalize(writer_task, forwarder_task, outbound_tx).await;
}

/// Route one inbound text frame to the registry.
fn handle_text(state: &SharedState, connection_id: &ConnectionId, text: &str) {
    let result = match ParticipantInboundMessage::from_json_str(text) {
        Ok(ParticipantInboundMessage::Start) => state.registry().start(connection_id),
        Ok(ParticipantInboundMessage::Answer(payload)) => {
            state.registry().submit_answer(connection_id, payload)
        }
        Ok(ParticipantInboundMessage::Unknown) => {
            warn!(%connection_id, "ignoring unknown participant message");
            Ok(())
        }
        Err(err) => {
            warn!(%connection_id, error = %err, "failed to parse or validate participant message");
            Ok(())
        }
    };

    if let Err(err) = result {
        // The participant already finished; late frames have nowhere to go.
        debug!(%connection_id, error = %err, "participant message dropped");
    }
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Serialization failures are logged and swallowed; only a closed writer is
/// reported back to the caller.
fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
) -> Result<(), ConnectionClosed>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| ConnectionClosed)
}

/// Ensure the forwarder and writer tasks wind down before we return from the socket handler.
async fn finalize(
    writer_task: JoinHandle<()>,
    forwarder_task: JoinHandle<()>,
    outbound_tx: mpsc::UnboundedSender<Message>,
) {
    drop(outbound_tx);
    let _ = forwarder_task.await;
    let _ = writer_task.await;
}
