//! WebSocket connection manager for the streaming chat endpoint.
//!
//! Owns one live socket at a time: lifecycle transitions, bounded
//! automatic reconnection on a fixed interval, and teardown that
//! suppresses every late async completion. Inbound text frames are
//! decoded with `ragchat-core` and fanned out to the app over an mpsc
//! channel; malformed frames are logged and dropped without touching
//! connection state.
//!
//! Deployments that protect the socket configure a [`TokenProvider`];
//! the credential is fetched (with the provider's own retry budget)
//! before the transport connect and attached as `?token=...`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use ragchat_auth::TokenProvider;
use ragchat_core::{decode_frame, encode_request, InboundFrame, OutboundRequest};

/// Type alias for the write half of a WebSocket connection.
type WsWriter = futures::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

/// Type alias for the read half of a WebSocket connection.
type WsReader =
    futures::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Default pause before an automatic reconnect.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(2);

/// Default automatic reconnect budget.
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 3;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No socket open, no attempt in flight.
    #[default]
    Disconnected,
    /// An attempt (credential fetch or transport connect) is in flight.
    Connecting,
    /// The socket is open.
    Connected,
}

impl ConnectionState {
    /// Human-readable display string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

/// Events delivered to the owner of the socket.
#[derive(Debug)]
pub enum SocketEvent {
    /// The socket opened.
    Opened,
    /// A decoded inbound frame.
    Frame(InboundFrame),
    /// The socket closed (the manager may already be scheduling a
    /// reconnect).
    Closed,
}

/// Configuration for the connection manager.
#[derive(Clone)]
pub struct SocketConfig {
    /// Socket URL (ws:// or wss://), without the token query.
    pub url: String,
    /// Pause between automatic reconnect attempts.
    pub reconnect_interval: Duration,
    /// Automatic reconnect budget; exhausted means manual reconnect only.
    pub reconnect_attempts: u32,
    /// Credential source for protected deployments.
    pub token_provider: Option<Arc<dyn TokenProvider>>,
}

impl SocketConfig {
    /// Config with the default reconnect policy and no credential.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            token_provider: None,
        }
    }

    /// Attach a credential source.
    #[must_use]
    pub fn with_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }
}

/// State guarded by the shared mutex.
struct Shared {
    state: ConnectionState,
    /// User-visible error slot.
    error: Option<String>,
    /// Automatic reconnects used since the last successful open.
    reconnects: u32,
    /// Pending reconnect timer, aborted on teardown or manual connect.
    reconnect_timer: Option<tokio::task::JoinHandle<()>>,
    /// Writer channel for the active connection.
    outgoing: Option<mpsc::Sender<String>>,
    /// Bumped on every connect attempt; a stale connection's epilogue
    /// must not clobber the state of its successor.
    generation: u64,
}

struct Inner {
    config: SocketConfig,
    shared: Mutex<Shared>,
    /// Guard ensuring a single attempt in flight.
    connecting: AtomicBool,
    /// Owner-teardown flag, checked before acting on async completions.
    shutdown: AtomicBool,
    events: mpsc::Sender<SocketEvent>,
}

/// Handle to the connection manager. Cheap to clone.
#[derive(Clone)]
pub struct ChatSocket {
    inner: Arc<Inner>,
}

impl ChatSocket {
    /// Create a manager. No connection is attempted until
    /// [`Self::connect`] is called.
    #[must_use]
    pub fn new(config: SocketConfig, events: mpsc::Sender<SocketEvent>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                shared: Mutex::new(Shared {
                    state: ConnectionState::Disconnected,
                    error: None,
                    reconnects: 0,
                    reconnect_timer: None,
                    outgoing: None,
                    generation: 0,
                }),
                connecting: AtomicBool::new(false),
                shutdown: AtomicBool::new(false),
                events,
            }),
        }
    }

    /// Start a connection attempt. No-op while another attempt is in
    /// flight or after [`Self::shutdown`].
    pub fn connect(&self) {
        Inner::spawn_connect(&self.inner);
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.shared.lock().state
    }

    /// Current user-visible error, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.inner.shared.lock().error.clone()
    }

    /// Clear the error slot (e.g. when the user dismisses the banner).
    pub fn clear_error(&self) {
        self.inner.shared.lock().error = None;
    }

    /// Transmit a request. Only sends when connected; otherwise records
    /// the failure in the error slot and transmits nothing.
    ///
    /// Returns whether the frame was handed to the transport.
    pub async fn send(&self, request: &OutboundRequest) -> bool {
        let tx = {
            let sh = self.inner.shared.lock();
            if sh.state == ConnectionState::Connected {
                sh.outgoing.clone()
            } else {
                None
            }
        };

        let Some(tx) = tx else {
            self.record_error("Cannot send message, socket is not connected");
            return false;
        };

        let text = match encode_request(request) {
            Ok(text) => text,
            Err(e) => {
                self.record_error(format!("Failed to encode request: {e}"));
                return false;
            }
        };

        if tx.send(text).await.is_err() {
            self.record_error("Cannot send message, socket is not connected");
            return false;
        }
        true
    }

    /// Owner teardown: close the active socket, abort any pending
    /// reconnect timer, and suppress every further transition.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        let mut sh = self.inner.shared.lock();
        if let Some(timer) = sh.reconnect_timer.take() {
            timer.abort();
        }
        sh.generation += 1;
        // Dropping the writer channel makes the writer task send a Close
        // frame and release the socket.
        sh.outgoing = None;
        sh.state = ConnectionState::Disconnected;
    }

    fn record_error(&self, message: impl Into<String>) {
        self.inner.shared.lock().error = Some(message.into());
    }
}

impl Inner {
    fn spawn_connect(inner: &Arc<Self>) {
        if inner.shutdown.load(Ordering::SeqCst) {
            return;
        }
        if inner.connecting.swap(true, Ordering::SeqCst) {
            return;
        }

        let generation = {
            let mut sh = inner.shared.lock();
            if let Some(timer) = sh.reconnect_timer.take() {
                timer.abort();
            }
            // Supersede any connection still draining: its epilogue sees
            // a newer generation and stands down.
            sh.generation += 1;
            sh.outgoing = None;
            sh.state = ConnectionState::Connecting;
            sh.generation
        };

        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            Self::run_connection(inner, generation).await;
        });
    }

    async fn run_connection(inner: Arc<Self>, generation: u64) {
        let Some(url) = Self::resolve_url(&inner).await else {
            return;
        };

        if inner.shutdown.load(Ordering::SeqCst) {
            Self::abandon(&inner, generation);
            return;
        }

        tracing::debug!(url = %inner.config.url, "connecting to chat socket");
        let ws_stream = match connect_async(&url).await {
            Ok((ws, _response)) => ws,
            Err(e) => {
                tracing::warn!(err = %e, "chat socket connect failed");
                {
                    let mut sh = inner.shared.lock();
                    if sh.generation == generation {
                        sh.error = Some("WebSocket connection error".to_string());
                        sh.state = ConnectionState::Disconnected;
                    }
                }
                inner.connecting.store(false, Ordering::SeqCst);
                Self::schedule_reconnect(&inner);
                return;
            }
        };

        if inner.shutdown.load(Ordering::SeqCst) {
            // Teardown raced the open; release the socket quietly.
            let mut ws_stream = ws_stream;
            let _ = ws_stream.close(None).await;
            Self::abandon(&inner, generation);
            return;
        }

        let (writer, reader) = ws_stream.split();
        let (out_tx, out_rx) = mpsc::channel::<String>(32);

        {
            let mut sh = inner.shared.lock();
            sh.state = ConnectionState::Connected;
            sh.error = None;
            sh.reconnects = 0;
            sh.outgoing = Some(out_tx);
        }
        inner.connecting.store(false, Ordering::SeqCst);
        tracing::info!("chat socket connected");
        let _ = inner.events.send(SocketEvent::Opened).await;

        tokio::spawn(write_loop(writer, out_rx));
        Self::read_loop(&inner, reader, generation).await;

        {
            let mut sh = inner.shared.lock();
            if sh.generation != generation {
                return; // superseded; a newer connection owns the state
            }
            sh.state = ConnectionState::Disconnected;
            sh.outgoing = None;
        }

        if !inner.shutdown.load(Ordering::SeqCst) {
            let _ = inner.events.send(SocketEvent::Closed).await;
            Self::schedule_reconnect(&inner);
        }
    }

    /// Resolve the connection URL, fetching the bearer credential first
    /// when one is configured. A credential failure records an
    /// authentication error and ends the attempt without any transport
    /// reconnect scheduling.
    async fn resolve_url(inner: &Arc<Self>) -> Option<String> {
        let Some(provider) = &inner.config.token_provider else {
            return Some(inner.config.url.clone());
        };

        match provider.fetch_token().await {
            Ok(token) => Some(format!("{}?token={token}", inner.config.url)),
            Err(e) => {
                tracing::warn!(err = %e, "socket credential unavailable");
                {
                    let mut sh = inner.shared.lock();
                    sh.error = Some(format!("Authentication failed: {e}"));
                    sh.state = ConnectionState::Disconnected;
                }
                inner.connecting.store(false, Ordering::SeqCst);
                None
            }
        }
    }

    /// Roll back a torn-down attempt without surfacing events.
    fn abandon(inner: &Arc<Self>, generation: u64) {
        let mut sh = inner.shared.lock();
        if sh.generation == generation {
            sh.state = ConnectionState::Disconnected;
        }
        inner.connecting.store(false, Ordering::SeqCst);
    }

    fn schedule_reconnect(inner: &Arc<Self>) {
        if inner.shutdown.load(Ordering::SeqCst) {
            return;
        }

        let mut sh = inner.shared.lock();
        // A newer attempt (or live connection) owns the lifecycle now.
        if sh.state != ConnectionState::Disconnected {
            return;
        }
        if sh.reconnects >= inner.config.reconnect_attempts {
            tracing::info!(
                attempts = sh.reconnects,
                "reconnect budget exhausted, waiting for manual reconnect"
            );
            return;
        }
        sh.reconnects += 1;
        let attempt = sh.reconnects;
        let max = inner.config.reconnect_attempts;
        let interval = inner.config.reconnect_interval;

        let timer_inner = Arc::clone(inner);
        sh.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            if timer_inner.shutdown.load(Ordering::SeqCst)
                || timer_inner.shared.lock().state != ConnectionState::Disconnected
            {
                return;
            }
            tracing::info!(attempt, max, "attempting reconnect");
            Self::spawn_connect(&timer_inner);
        }));
    }

    async fn read_loop(inner: &Arc<Self>, mut reader: WsReader, generation: u64) {
        while let Some(result) = reader.next().await {
            if inner.shutdown.load(Ordering::SeqCst)
                || inner.shared.lock().generation != generation
            {
                break;
            }

            match result {
                Ok(Message::Text(text)) => match decode_frame(&text) {
                    Ok(frame) => {
                        if inner.events.send(SocketEvent::Frame(frame)).await.is_err() {
                            break; // receiver dropped, owner is gone
                        }
                    }
                    Err(e) => {
                        tracing::warn!(err = %e, raw = %text, "dropping malformed frame");
                    }
                },
                Ok(Message::Close(_)) => {
                    tracing::info!("chat socket closed by server");
                    break;
                }
                // Ignore control frames and binary messages.
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_)) => {}
                Err(e) => {
                    tracing::warn!(err = %e, "chat socket read error");
                    let mut sh = inner.shared.lock();
                    if sh.generation == generation {
                        sh.error = Some("WebSocket connection error".to_string());
                    }
                    break;
                }
            }
        }
    }
}

/// Task that writes outgoing frames, closing the socket when the channel
/// drains.
async fn write_loop(mut writer: WsWriter, mut rx: mpsc::Receiver<String>) {
    while let Some(text) = rx.recv().await {
        if writer.send(Message::Text(text)).await.is_err() {
            break;
        }
    }
    let _ = writer.send(Message::Close(None)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use futures::future::BoxFuture;
    use tokio::net::TcpListener;

    /// Provider that always hands out the same token.
    struct StaticTokenProvider(String);

    impl TokenProvider for StaticTokenProvider {
        fn fetch_token(&self) -> BoxFuture<'_, ragchat_auth::Result<String>> {
            let token = self.0.clone();
            Box::pin(async move { Ok(token) })
        }
    }

    /// Provider whose budget is already exhausted.
    struct FailingTokenProvider;

    impl TokenProvider for FailingTokenProvider {
        fn fetch_token(&self) -> BoxFuture<'_, ragchat_auth::Result<String>> {
            Box::pin(async move {
                Err(ragchat_auth::AuthError::TokenAttemptsExhausted {
                    attempts: 3,
                    last_error: "HTTP 503".to_string(),
                })
            })
        }
    }

    fn config_for(url: &str) -> SocketConfig {
        SocketConfig {
            url: url.to_string(),
            reconnect_interval: Duration::from_millis(50),
            reconnect_attempts: 3,
            token_provider: None,
        }
    }

    async fn bind() -> (String, TcpListener) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        (url, listener)
    }

    /// Server that accepts one connection, answers the first request
    /// with a two-chunk stream, then keeps the connection open.
    async fn start_streaming_server() -> String {
        let (url, listener) = bind().await;
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            if let Some(Ok(Message::Text(raw))) = ws.next().await {
                let request: serde_json::Value = serde_json::from_str(&raw).unwrap();
                assert!(request.get("message").is_some());
                assert!(request.get("history").is_some());

                let _ = ws
                    .send(Message::Text(r#"{"chunk":"He","done":false}"#.into()))
                    .await;
                let _ = ws
                    .send(Message::Text(r#"{"chunk":"llo","done":true}"#.into()))
                    .await;
            }

            // Hold the connection until the client goes away.
            while ws.next().await.is_some() {}
        });
        url
    }

    /// Server that sends one malformed frame followed by a valid one.
    async fn start_malformed_server() -> String {
        let (url, listener) = bind().await;
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            let _ = ws.send(Message::Text("not json".into())).await;
            let _ = ws
                .send(Message::Text(r#"{"error":"boom","code":"stream_error"}"#.into()))
                .await;
            let _ = ws
                .send(Message::Text(r#"{"chunk":"ok","done":true}"#.into()))
                .await;

            while ws.next().await.is_some() {}
        });
        url
    }

    /// Server that drops every TCP connection before the WebSocket
    /// handshake, counting attempts. The client never sees a successful
    /// open, so its reconnect counter is never reset.
    async fn start_refusing_server() -> (String, Arc<AtomicUsize>) {
        let (url, listener) = bind().await;
        let count = Arc::new(AtomicUsize::new(0));
        let server_count = Arc::clone(&count);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                server_count.fetch_add(1, Ordering::SeqCst);
                drop(stream);
            }
        });
        (url, count)
    }

    /// Server that completes the handshake, then closes, counting
    /// connections.
    async fn start_handshake_close_server() -> (String, Arc<AtomicUsize>) {
        let (url, listener) = bind().await;
        let count = Arc::new(AtomicUsize::new(0));
        let server_count = Arc::clone(&count);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                server_count.fetch_add(1, Ordering::SeqCst);
                if let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await {
                    let _ = ws.close(None).await;
                }
            }
        });
        (url, count)
    }

    async fn wait_for(mut check: impl FnMut() -> bool, deadline: Duration) -> bool {
        let end = tokio::time::Instant::now() + deadline;
        while tokio::time::Instant::now() < end {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        check()
    }

    #[tokio::test]
    async fn connect_send_and_stream_round_trip() {
        let url = start_streaming_server().await;
        let (tx, mut rx) = mpsc::channel(32);
        let socket = ChatSocket::new(config_for(&url), tx);

        socket.connect();
        assert!(matches!(rx.recv().await, Some(SocketEvent::Opened)));
        assert_eq!(socket.state(), ConnectionState::Connected);
        assert!(socket.last_error().is_none());

        let sent = socket.send(&OutboundRequest::new("hi", &[])).await;
        assert!(sent);

        match rx.recv().await {
            Some(SocketEvent::Frame(InboundFrame::Chunk { chunk, done })) => {
                assert_eq!(chunk, "He");
                assert!(!done);
            }
            other => panic!("expected first chunk, got {other:?}"),
        }
        match rx.recv().await {
            Some(SocketEvent::Frame(InboundFrame::Chunk { chunk, done })) => {
                assert_eq!(chunk, "llo");
                assert!(done);
            }
            other => panic!("expected final chunk, got {other:?}"),
        }

        socket.shutdown();
    }

    #[tokio::test]
    async fn send_while_disconnected_records_error_and_sends_nothing() {
        let (tx, mut rx) = mpsc::channel(8);
        let socket = ChatSocket::new(config_for("ws://127.0.0.1:1"), tx);

        let sent = socket.send(&OutboundRequest::new("hi", &[])).await;
        assert!(!sent);
        assert_eq!(socket.state(), ConnectionState::Disconnected);
        let error = socket.last_error().unwrap();
        assert!(error.contains("not connected"), "unexpected error: {error}");
        assert!(rx.try_recv().is_err(), "no events expected");
    }

    #[tokio::test]
    async fn malformed_frames_are_dropped_without_closing() {
        let url = start_malformed_server().await;
        let (tx, mut rx) = mpsc::channel(32);
        let socket = ChatSocket::new(config_for(&url), tx);

        socket.connect();
        assert!(matches!(rx.recv().await, Some(SocketEvent::Opened)));

        // Only the valid frame comes through; the connection stays up
        // and the error slot stays clean.
        match rx.recv().await {
            Some(SocketEvent::Frame(InboundFrame::Chunk { chunk, done })) => {
                assert_eq!(chunk, "ok");
                assert!(done);
            }
            other => panic!("expected the valid chunk, got {other:?}"),
        }
        assert_eq!(socket.state(), ConnectionState::Connected);
        assert!(socket.last_error().is_none());

        socket.shutdown();
    }

    #[tokio::test]
    async fn reconnects_are_bounded_and_resume_on_manual_connect() {
        let (url, count) = start_refusing_server().await;
        let (tx, mut rx) = mpsc::channel(64);
        let socket = ChatSocket::new(config_for(&url), tx);

        socket.connect();

        // 1 initial attempt + 3 automatic reconnects, none of which
        // reach a successful open.
        let reached = wait_for(|| count.load(Ordering::SeqCst) >= 4, Duration::from_secs(5)).await;
        assert!(reached, "expected 4 attempts, saw {}", count.load(Ordering::SeqCst));

        // Budget exhausted: no fourth automatic reconnect.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);
        assert_eq!(socket.state(), ConnectionState::Disconnected);
        assert!(socket.last_error().is_some());

        // Manual connect re-enters the lifecycle.
        socket.connect();
        let reached = wait_for(|| count.load(Ordering::SeqCst) >= 5, Duration::from_secs(5)).await;
        assert!(reached, "manual connect should make a fifth attempt");

        assert!(rx.try_recv().is_err(), "no open ever happened");
        socket.shutdown();
    }

    #[tokio::test]
    async fn shutdown_suppresses_reconnect() {
        let (url, count) = start_handshake_close_server().await;
        let (tx, mut rx) = mpsc::channel(64);
        let socket = ChatSocket::new(config_for(&url), tx);

        socket.connect();
        assert!(matches!(rx.recv().await, Some(SocketEvent::Opened)));
        socket.shutdown();

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1, "no reconnect after shutdown");
        assert_eq!(socket.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn reentrant_connect_is_a_no_op() {
        let url = start_streaming_server().await;
        let (tx, mut rx) = mpsc::channel(32);
        let socket = ChatSocket::new(config_for(&url), tx);

        socket.connect();
        socket.connect();
        socket.connect();

        assert!(matches!(rx.recv().await, Some(SocketEvent::Opened)));
        // A second Opened would mean a second attempt went through.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());

        socket.shutdown();
    }

    #[tokio::test]
    async fn token_provider_appends_credential_to_url() {
        let (url, listener) = bind().await;
        let (seen_tx, seen_rx) = tokio::sync::oneshot::channel::<String>();

        tokio::spawn(async move {
            use tokio_tungstenite::tungstenite::handshake::server::{
                ErrorResponse, Request, Response,
            };

            let (stream, _) = listener.accept().await.unwrap();
            let mut seen_tx = Some(seen_tx);
            let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                if let Some(tx) = seen_tx.take() {
                    let _ = tx.send(req.uri().to_string());
                }
                Ok(resp)
            };
            let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback)
                .await
                .unwrap();
            while ws.next().await.is_some() {}
        });

        let (tx, mut rx) = mpsc::channel(8);
        // `bind()` yields a path-less URL; the socket path is what carries
        // the `?token=` query in production, so give the fixture one too.
        let config = config_for(&format!("{url}/"))
            .with_token_provider(Arc::new(StaticTokenProvider("tok-test".to_string())));
        let socket = ChatSocket::new(config, tx);
        socket.connect();

        assert!(matches!(rx.recv().await, Some(SocketEvent::Opened)));
        let uri = seen_rx.await.unwrap();
        assert!(uri.contains("token=tok-test"), "uri was {uri}");

        socket.shutdown();
    }

    #[tokio::test]
    async fn credential_failure_blocks_the_attempt() {
        let (url, count) = start_refusing_server().await;
        let (tx, mut rx) = mpsc::channel(8);
        let config = config_for(&url).with_token_provider(Arc::new(FailingTokenProvider));
        let socket = ChatSocket::new(config, tx);

        socket.connect();

        let settled = wait_for(
            || socket.state() == ConnectionState::Disconnected && socket.last_error().is_some(),
            Duration::from_secs(2),
        )
        .await;
        assert!(settled);

        let error = socket.last_error().unwrap();
        assert!(
            error.contains("Authentication failed"),
            "unexpected error: {error}"
        );
        // The transport was never touched and no reconnect was scheduled.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_err());
    }
}
