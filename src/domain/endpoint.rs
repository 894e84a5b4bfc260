//! Outbound side of a channel endpoint.
//!
//! Every accepted WebSocket gets one writer task owning the socket's write
//! half. Everything else (the read loop's echo, the dispatcher's pushes, the
//! shutdown path) writes through a cloneable [`EndpointHandle`] that feeds
//! that task over a bounded queue, so writes to one socket never interleave.
//! Closing does not go through the queue: a full queue must never keep an
//! endpoint open.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio_util::sync::CancellationToken;

use super::ConnectionId;
use crate::error::ChannelError;

/// One message written to, or read from, a channel endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text message.
    Text(String),
    /// Binary message.
    Binary(Vec<u8>),
}

/// Cloneable write handle for a single channel endpoint.
///
/// The registry stores clones of this handle; the read loop that created it
/// owns the endpoint itself. Once the endpoint is closed or its writer task
/// stops, every further [`send`](Self::send) fails with
/// [`ChannelError::Closed`].
#[derive(Debug, Clone)]
pub struct EndpointHandle {
    id: ConnectionId,
    tx: mpsc::Sender<Frame>,
    closed: CancellationToken,
    send_timeout: Duration,
}

impl EndpointHandle {
    /// Creates a handle and the receiving end its writer task consumes.
    ///
    /// `capacity` bounds the outbound queue; `send_timeout` bounds how long a
    /// single [`send`](Self::send) waits for queue space.
    #[must_use]
    pub fn channel(
        id: ConnectionId,
        capacity: usize,
        send_timeout: Duration,
    ) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                id,
                tx,
                closed: CancellationToken::new(),
                send_timeout,
            },
            rx,
        )
    }

    /// Returns the connection this handle writes to.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues one frame for writing.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] if the endpoint is closed or its
    /// writer has stopped, or [`ChannelError::Timeout`] if the queue stayed
    /// full for the whole send timeout.
    pub async fn send(&self, frame: Frame) -> Result<(), ChannelError> {
        if self.closed.is_cancelled() {
            return Err(ChannelError::Closed);
        }
        tokio::select! {
            biased;
            () = self.closed.cancelled() => Err(ChannelError::Closed),
            sent = self.tx.send_timeout(frame, self.send_timeout) => sent.map_err(|err| match err {
                SendTimeoutError::Timeout(_) => ChannelError::Timeout(self.send_timeout),
                SendTimeoutError::Closed(_) => ChannelError::Closed,
            }),
        }
    }

    /// Closes the endpoint. Idempotent, never blocks and never waits for
    /// queue space.
    ///
    /// The writer stops and sends a close frame; the read loop stops too.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Resolves once [`close`](Self::close) has been called on any clone.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }

    /// Returns the token cancelled when this endpoint closes.
    ///
    /// The writer task watches it, and cancels it itself when a socket
    /// write fails.
    #[must_use]
    pub fn close_token(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Returns `true` once the endpoint is closed or its writer has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled() || self.tx.is_closed()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    fn handle(capacity: usize) -> (EndpointHandle, mpsc::Receiver<Frame>) {
        EndpointHandle::channel(ConnectionId::new(), capacity, Duration::from_millis(20))
    }

    #[tokio::test]
    async fn send_reaches_writer() {
        let (endpoint, mut rx) = handle(4);
        assert_ok!(endpoint.send(Frame::Text("hello".to_string())).await);
        assert_eq!(rx.recv().await, Some(Frame::Text("hello".to_string())));
    }

    #[tokio::test]
    async fn send_after_writer_stopped_is_closed() {
        let (endpoint, rx) = handle(4);
        drop(rx);
        assert!(endpoint.is_closed());
        let err = assert_err!(endpoint.send(Frame::Text("late".to_string())).await);
        assert_eq!(err, ChannelError::Closed);
    }

    #[tokio::test]
    async fn send_on_full_queue_times_out() {
        let (endpoint, _rx) = handle(1);
        assert_ok!(endpoint.send(Frame::Text("one".to_string())).await);
        let Err(ChannelError::Timeout(waited)) = endpoint.send(Frame::Text("two".to_string())).await
        else {
            panic!("expected a timeout");
        };
        assert_eq!(waited, Duration::from_millis(20));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (endpoint, _rx) = handle(4);
        endpoint.close();
        endpoint.close();
        assert!(endpoint.is_closed());
        let err = assert_err!(endpoint.send(Frame::Text("late".to_string())).await);
        assert_eq!(err, ChannelError::Closed);
    }

    #[tokio::test]
    async fn close_on_full_queue_still_closes() {
        let (endpoint, _rx) = handle(1);
        assert_ok!(endpoint.send(Frame::Text("fill".to_string())).await);

        let other = endpoint.clone();
        other.close();

        assert!(endpoint.is_closed());
        assert_ok!(
            tokio::time::timeout(Duration::from_millis(100), endpoint.closed()).await
        );
    }

    #[tokio::test]
    async fn close_interrupts_a_waiting_send() {
        let (endpoint, _rx) = handle(1);
        let endpoint = EndpointHandle {
            send_timeout: Duration::from_secs(30),
            ..endpoint
        };
        assert_ok!(endpoint.send(Frame::Text("fill".to_string())).await);

        let waiting = endpoint.clone();
        let pending =
            tokio::spawn(async move { waiting.send(Frame::Text("blocked".to_string())).await });
        tokio::task::yield_now().await;
        endpoint.close();

        let Ok(Ok(result)) = tokio::time::timeout(Duration::from_secs(1), pending).await else {
            panic!("send should return once the endpoint closes");
        };
        assert_eq!(result, Err(ChannelError::Closed));
    }
}
