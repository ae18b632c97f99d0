//! Socket.IO adapter for the push channel.
//!
//! The adapter owns reconnection. The session only sees an ordered stream of
//! [`TransportSignal`]s and a way to emit [`OutboundCommand`]s.

use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use rust_socketio::asynchronous::{Client, ClientBuilder};
use rust_socketio::{Event, Payload};
use serde_json::Value;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::error::ConnectuiError;
use crate::models::events::{Frame, InboundEvent, OutboundCommand, TransportSignal};

/// Server events forwarded to the session.
pub const PUSH_EVENTS: &[&str] = &[
    "connected",
    "new_post",
    "post_updated",
    "post_deleted",
    "user_online",
    "user_offline",
    "new_notification",
    "new_message",
    "message_notification",
    "user_typing",
];

/// One live push connection per authenticated session.
pub struct PushConnection {
    outbound: UnboundedSender<OutboundCommand>,
    signals: UnboundedReceiver<TransportSignal>,
    task: Option<JoinHandle<()>>,
}

impl PushConnection {
    /// Spawn the socket task against a Socket.IO origin. Must be called
    /// inside a tokio runtime.
    pub fn spawn(url: String, cookie: Option<String>, reconnect_delay: Duration) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_socket(url, cookie, reconnect_delay, outbound_rx, signal_tx));
        Self {
            outbound: outbound_tx,
            signals: signal_rx,
            task: Some(task),
        }
    }

    /// Wire a connection to caller-owned channels, with no socket task.
    pub fn from_channels(
        outbound: UnboundedSender<OutboundCommand>,
        signals: UnboundedReceiver<TransportSignal>,
    ) -> Self {
        Self { outbound, signals, task: None }
    }

    pub fn emit(&self, command: OutboundCommand) -> Result<(), ConnectuiError> {
        self.outbound
            .send(command)
            .map_err(|_| ConnectuiError::Transport("push connection is closed".to_string()))
    }

    /// Next pending signal without waiting.
    pub fn try_next(&mut self) -> Option<TransportSignal> {
        match self.signals.try_recv() {
            Ok(signal) => Some(signal),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Stop the socket task and drop anything still queued.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.signals.close();
        while self.signals.try_recv().is_ok() {}
    }
}

impl Drop for PushConnection {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// First argument of an event packet. Binary attachments are not used by the
/// server.
#[allow(deprecated)]
fn payload_value(payload: Payload) -> Option<Value> {
    match payload {
        Payload::Text(values) => Some(values.into_iter().next().unwrap_or(Value::Null)),
        Payload::String(raw) => serde_json::from_str(&raw).ok(),
        Payload::Binary(_) => None,
    }
}

/// Turn one received Socket.IO event into the signal the session sees.
pub fn signal_for(event: &str, payload: Payload) -> Option<TransportSignal> {
    let Some(data) = payload_value(payload) else {
        log::debug!("ignoring non-JSON payload for {}", event);
        return None;
    };
    match InboundEvent::from_frame(Frame { event: event.to_string(), data }) {
        Ok(Some(parsed)) => Some(TransportSignal::Event(parsed)),
        Ok(None) => {
            log::debug!("ignoring push event {}", event);
            None
        }
        Err(e) => {
            log::warn!("malformed {} payload: {}", event, e);
            None
        }
    }
}

/// The part of a connected client the send loop needs.
#[async_trait]
trait PushSocket: Send + Sync {
    async fn send_frame(&self, frame: Frame) -> Result<(), ConnectuiError>;

    async fn hang_up(&self);
}

#[async_trait]
impl PushSocket for Client {
    async fn send_frame(&self, frame: Frame) -> Result<(), ConnectuiError> {
        self.emit(Event::Custom(frame.event), frame.data).await?;
        Ok(())
    }

    async fn hang_up(&self) {
        if let Err(e) = self.disconnect().await {
            log::debug!("push disconnect: {}", e);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SocketExit {
    /// The session dropped its side; stop for good.
    Closed,
    /// Server or network ended the socket; try again.
    Lost,
}

async fn run_socket(
    url: String,
    cookie: Option<String>,
    reconnect_delay: Duration,
    mut outbound: UnboundedReceiver<OutboundCommand>,
    signals: UnboundedSender<TransportSignal>,
) {
    loop {
        let (lost_tx, mut lost_rx) = mpsc::unbounded_channel();
        match open(&url, cookie.as_deref(), &signals, lost_tx).await {
            Ok(client) => {
                log::info!("connected to {}", url);
                if signals.send(TransportSignal::Connected).is_err() {
                    client.hang_up().await;
                    return;
                }
                if serve(&client, &mut outbound, &mut lost_rx, &signals).await == SocketExit::Closed {
                    return;
                }
            }
            Err(e) => log::warn!("push connection to {} failed: {}", url, e),
        }

        if signals.is_closed() {
            return;
        }
        tokio::time::sleep(reconnect_delay).await;
        log::info!("reconnecting to {}", url);
    }
}

async fn open(
    url: &str,
    cookie: Option<&str>,
    signals: &UnboundedSender<TransportSignal>,
    lost: UnboundedSender<()>,
) -> Result<Client, ConnectuiError> {
    let mut builder = ClientBuilder::new(url);
    if let Some(cookie) = cookie {
        builder = builder.opening_header("Cookie", cookie.to_string());
    }

    for &name in PUSH_EVENTS {
        let signals = signals.clone();
        builder = builder.on(Event::Custom(name.to_string()), move |payload: Payload, _: Client| {
            if let Some(signal) = signal_for(name, payload) {
                let _ = signals.send(signal);
            }
            async {}.boxed()
        });
    }

    let client = builder
        .on(Event::Error, |payload: Payload, _: Client| {
            log::warn!("push socket error: {:?}", payload);
            async {}.boxed()
        })
        .on(Event::Close, move |_: Payload, _: Client| {
            let _ = lost.send(());
            async {}.boxed()
        })
        .connect()
        .await?;
    Ok(client)
}

/// Forward commands until the socket drops or the session lets go. Once
/// connected, every way out except `Closed` reports `Disconnected`.
async fn serve<S: PushSocket + ?Sized>(
    socket: &S,
    outbound: &mut UnboundedReceiver<OutboundCommand>,
    lost: &mut UnboundedReceiver<()>,
    signals: &UnboundedSender<TransportSignal>,
) -> SocketExit {
    let exit = loop {
        tokio::select! {
            _ = lost.recv() => break SocketExit::Lost,
            command = outbound.recv() => match command {
                Some(command) => {
                    let frame = match command.to_frame() {
                        Ok(frame) => frame,
                        Err(e) => {
                            log::warn!("cannot encode {:?}: {}", command, e);
                            continue;
                        }
                    };
                    if let Err(e) = socket.send_frame(frame).await {
                        log::warn!("failed to send {:?}: {}", command, e);
                        break SocketExit::Lost;
                    }
                }
                None => break SocketExit::Closed,
            },
        }
    };

    socket.hang_up().await;
    if exit == SocketExit::Lost {
        log::info!("push connection lost");
        if signals.send(TransportSignal::Disconnected).is_err() {
            return SocketExit::Closed;
        }
    }
    exit
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSocket {
        refuse: bool,
        sent: Mutex<Vec<Frame>>,
        hung_up: AtomicBool,
    }

    #[async_trait]
    impl PushSocket for FakeSocket {
        async fn send_frame(&self, frame: Frame) -> Result<(), ConnectuiError> {
            if self.refuse {
                return Err(ConnectuiError::Transport("socket closed".to_string()));
            }
            self.sent.lock().unwrap().push(frame);
            Ok(())
        }

        async fn hang_up(&self) {
            self.hung_up.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn socketio_event_becomes_signal() {
        let signal = signal_for("post_deleted", Payload::Text(vec![json!({"post_id": 42})]));
        assert_eq!(signal, Some(TransportSignal::Event(InboundEvent::PostDeleted(42))));
    }

    #[test]
    fn unknown_or_malformed_events_are_dropped() {
        assert_eq!(signal_for("user_status_changed", Payload::Text(vec![json!({})])), None);
        assert_eq!(signal_for("post_deleted", Payload::Text(vec![json!({})])), None);
    }

    #[test]
    fn every_forwarded_event_is_understood() {
        for &name in PUSH_EVENTS {
            let parsed = InboundEvent::from_frame(Frame {
                event: name.to_string(),
                data: json!({}),
            });
            assert!(!matches!(parsed, Ok(None)), "{name} is forwarded but not handled");
        }
    }

    #[test]
    fn signals_arrive_in_order() {
        let (out_tx, _out_rx) = mpsc::unbounded_channel();
        let (sig_tx, sig_rx) = mpsc::unbounded_channel();
        let mut conn = PushConnection::from_channels(out_tx, sig_rx);

        sig_tx.send(TransportSignal::Connected).unwrap();
        sig_tx.send(TransportSignal::Event(InboundEvent::PostDeleted(1))).unwrap();

        assert_eq!(conn.try_next(), Some(TransportSignal::Connected));
        assert_eq!(
            conn.try_next(),
            Some(TransportSignal::Event(InboundEvent::PostDeleted(1)))
        );
        assert_eq!(conn.try_next(), None);
    }

    #[test]
    fn emit_forwards_commands() {
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (_sig_tx, sig_rx) = mpsc::unbounded_channel();
        let conn = PushConnection::from_channels(out_tx, sig_rx);

        conn.emit(OutboundCommand::TypingStart { user_id: 4 }).unwrap();
        assert_eq!(out_rx.try_recv().unwrap(), OutboundCommand::TypingStart { user_id: 4 });
    }

    #[test]
    fn close_drops_pending_signals() {
        let (out_tx, _out_rx) = mpsc::unbounded_channel();
        let (sig_tx, sig_rx) = mpsc::unbounded_channel();
        let conn = PushConnection::from_channels(out_tx, sig_rx);

        sig_tx.send(TransportSignal::Connected).unwrap();
        conn.close();
        assert!(sig_tx.send(TransportSignal::Disconnected).is_err());
    }

    #[tokio::test]
    async fn commands_are_emitted_by_name() {
        let socket = FakeSocket::default();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (_lost_tx, mut lost_rx) = mpsc::unbounded_channel();
        let (sig_tx, mut sig_rx) = mpsc::unbounded_channel();

        out_tx.send(OutboundCommand::TypingStop { user_id: 2 }).unwrap();
        drop(out_tx);

        let exit = serve(&socket, &mut out_rx, &mut lost_rx, &sig_tx).await;
        assert_eq!(exit, SocketExit::Closed);
        assert_eq!(
            *socket.sent.lock().unwrap(),
            vec![Frame { event: "typing_stop".to_string(), data: json!({"user_id": 2}) }]
        );
        assert!(socket.hung_up.load(Ordering::SeqCst));
        // the session let go, so no disconnect is reported
        assert!(sig_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_send_reports_disconnect() {
        let socket = FakeSocket { refuse: true, ..FakeSocket::default() };
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (_lost_tx, mut lost_rx) = mpsc::unbounded_channel();
        let (sig_tx, mut sig_rx) = mpsc::unbounded_channel();

        out_tx.send(OutboundCommand::TypingStart { user_id: 2 }).unwrap();

        let exit = serve(&socket, &mut out_rx, &mut lost_rx, &sig_tx).await;
        assert_eq!(exit, SocketExit::Lost);
        assert_eq!(sig_rx.try_recv().unwrap(), TransportSignal::Disconnected);
    }

    #[tokio::test]
    async fn server_close_reports_disconnect() {
        let socket = FakeSocket::default();
        let (_out_tx, mut out_rx) = mpsc::unbounded_channel::<OutboundCommand>();
        let (lost_tx, mut lost_rx) = mpsc::unbounded_channel();
        let (sig_tx, mut sig_rx) = mpsc::unbounded_channel();

        lost_tx.send(()).unwrap();

        let exit = serve(&socket, &mut out_rx, &mut lost_rx, &sig_tx).await;
        assert_eq!(exit, SocketExit::Lost);
        assert_eq!(sig_rx.try_recv().unwrap(), TransportSignal::Disconnected);
        assert!(socket.hung_up.load(Ordering::SeqCst));
    }
}
