//! Lifecycle of a single channel endpoint.
//!
//! Each accepted WebSocket is split in two. A writer task owns the write
//! half and drains the endpoint's outbound queue; the read loop owns the
//! read half, echoes every message back and rebinds the endpoint's device
//! identifier to the message content.

use std::fmt;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::EndpointSettings;
use crate::domain::{Binding, ConnectionId, DeviceId, DeviceRegistry, EndpointHandle, Frame};

/// Why a read loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The peer sent a close frame.
    PeerClosed,
    /// The inbound stream ended without a close frame.
    StreamEnded,
    /// Reading from the socket failed.
    ReadError,
    /// Echoing a message back failed.
    WriteError,
    /// The relay closed or evicted the endpoint.
    Evicted,
}

impl EndReason {
    /// Returns the label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PeerClosed => "peer_closed",
            Self::StreamEnded => "stream_ended",
            Self::ReadError => "read_error",
            Self::WriteError => "write_error",
            Self::Evicted => "evicted",
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Services one accepted WebSocket until it closes.
///
/// The endpoint is attached to `registry` unbound. Whatever ends the read
/// loop, the endpoint is evicted, closed and its writer awaited before this
/// function returns.
pub async fn run_connection(
    socket: WebSocket,
    registry: Arc<DeviceRegistry>,
    settings: EndpointSettings,
) {
    let conn_id = ConnectionId::new();
    let (ws_tx, mut ws_rx) = socket.split();
    let (handle, outbound) =
        EndpointHandle::channel(conn_id, settings.queue_capacity, settings.send_timeout);
    let writer = tokio::spawn(write_loop(
        conn_id,
        ws_tx,
        outbound,
        handle.close_token(),
    ));

    registry.attach(handle.clone()).await;
    tracing::info!(conn_id = %conn_id, "channel opened");

    let reason = read_loop(&mut ws_rx, &handle, &registry).await;

    let device = registry.evict(conn_id).await;
    handle.close();
    drop(handle);
    if let Err(err) = writer.await {
        tracing::warn!(conn_id = %conn_id, error = %err, "writer task failed");
    }

    tracing::info!(
        conn_id = %conn_id,
        device_id = device.as_ref().map(DeviceId::as_str),
        reason = %reason,
        "channel closed"
    );
}

/// Reads messages until the channel ends, echoing and rebinding each one.
///
/// Ping and pong frames are skipped. Every text or binary message is sent
/// back unchanged first; only when the echo is queued does its content
/// become the endpoint's device identifier. The loop stops as soon as the
/// endpoint is closed, or once the registry no longer holds it.
pub async fn read_loop<S>(
    inbound: &mut S,
    handle: &EndpointHandle,
    registry: &DeviceRegistry,
) -> EndReason
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let conn_id = handle.id();
    loop {
        let next = tokio::select! {
            biased;
            () = handle.closed() => return EndReason::Evicted,
            next = inbound.next() => next,
        };
        let frame = match next {
            Some(Ok(Message::Text(text))) => Frame::Text(text.to_string()),
            Some(Ok(Message::Binary(bytes))) => Frame::Binary(bytes.to_vec()),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) => return EndReason::PeerClosed,
            Some(Err(err)) => {
                tracing::warn!(conn_id = %conn_id, error = %err, "read error");
                return EndReason::ReadError;
            }
            None => return EndReason::StreamEnded,
        };
        tracing::debug!(conn_id = %conn_id, message = ?frame, "recv");

        if let Err(err) = handle.send(frame.clone()).await {
            tracing::warn!(conn_id = %conn_id, error = %err, "write error");
            return EndReason::WriteError;
        }

        let device = DeviceId::from_frame(&frame);
        match registry.bind(device.clone(), handle).await {
            Binding::Bound => {}
            Binding::Displaced(displaced) => {
                tracing::debug!(
                    conn_id = %conn_id,
                    displaced = %displaced,
                    device_id = device.as_str(),
                    "device identifier moved to a newer endpoint"
                );
            }
            Binding::NotAttached => return EndReason::Evicted,
        }
    }
}

/// Drains the outbound queue into the socket's write half.
///
/// Stops once `closed` is cancelled, on the first write failure, or once
/// every [`EndpointHandle`] is dropped. A write failure cancels `closed`, so
/// all later sends fail with [`crate::error::ChannelError::Closed`]. Frames
/// still queued when the endpoint closes are dropped.
async fn write_loop<S>(
    conn_id: ConnectionId,
    mut sink: S,
    mut outbound: mpsc::Receiver<Frame>,
    closed: CancellationToken,
) where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    loop {
        let frame = tokio::select! {
            biased;
            () = closed.cancelled() => break,
            frame = outbound.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };
        if let Err(err) = sink.send(to_message(frame)).await {
            tracing::debug!(conn_id = %conn_id, error = %err, "socket write failed");
            closed.cancel();
            return;
        }
    }
    outbound.close();
    if let Err(err) = sink.send(Message::Close(None)).await {
        tracing::debug!(conn_id = %conn_id, error = %err, "close frame not sent");
    }
    if let Err(err) = sink.close().await {
        tracing::debug!(conn_id = %conn_id, error = %err, "socket close failed");
    }
}

fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(bytes) => Message::Binary(bytes.into()),
    }
}
