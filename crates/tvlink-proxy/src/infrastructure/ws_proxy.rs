//! WebSocket relay server: accept loop and per-session lifecycle.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting client connections and completing the WebSocket upgrade,
//!    capturing the request URI for the `?ip=&port=` target parameters.
//! 3. Opening the primary device connection for each session.
//! 4. Running the bidirectional relay: device traffic is forwarded verbatim
//!    in both directions, except for the one client message class the proxy
//!    intercepts — the `button` shorthand, which rides the secondary input
//!    channel.
//! 5. Tearing the session down symmetrically: when either side closes, the
//!    other side is closed and the session's store entries are removed.
//!
//! Each session runs in its own Tokio task; the accept loop never blocks on
//! session I/O.  Shutdown is a shared `AtomicBool` cleared by the Ctrl+C
//! handler in `main.rs`, checked between accepts.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::handshake::server::{ErrorResponse, Request, Response},
    tungstenite::Message as WsMessage,
    WebSocketStream,
};
use tracing::{debug, error, info, warn};
use url::Url;

use tvlink_core::protocol::ssap::{encode_button, new_correlation_id};
use tvlink_core::protocol::{ClientCommand, ProxyFrame, SsapMessage};

use crate::domain::ProxyConfig;
use crate::infrastructure::session_store::{session_key, SessionStore};
use crate::infrastructure::tv_conn::{
    connect_tv, control_url, resolve_input_socket_url, TvStream,
};

/// Shared handle to the write half of a device-side connection.
///
/// Both the session loop and the shutdown path need to reach these sinks,
/// so they live behind an async mutex in the [`SessionStore`].
pub type SharedTvSink = Arc<tokio::sync::Mutex<SplitSink<TvStream, WsMessage>>>;

type ClientSink = SplitSink<WebSocketStream<TcpStream>, WsMessage>;
type ClientStream = SplitStream<WebSocketStream<TcpStream>>;

// ── Public API ────────────────────────────────────────────────────────────────

/// Runs the relay accept loop until `running` is cleared.
///
/// # Errors
///
/// Returns an error only if the listener cannot be bound; everything after
/// that is per-session and never takes the server down.
pub async fn run_proxy(
    config: ProxyConfig,
    store: Arc<SessionStore<SharedTvSink>>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.ws_bind_addr)
        .await
        .with_context(|| format!("failed to bind relay listener on {}", config.ws_bind_addr))?;

    info!("TV relay listening on {}", config.ws_bind_addr);
    info!(
        "relay endpoint: ws://{}/?ip=<tv-ip>&port=<port>",
        config.ws_bind_addr
    );
    run_proxy_with_listener(listener, config, store, running).await
}

/// Accept loop over an already-bound listener.
///
/// Split out from [`run_proxy`] so callers that need the OS-assigned port
/// (and the integration tests) can bind first.
pub async fn run_proxy_with_listener(
    listener: TcpListener,
    config: ProxyConfig,
    store: Arc<SessionStore<SharedTvSink>>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let config = Arc::new(config);

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Short timeout on accept so the loop can re-check the shutdown flag
        // even when no clients are connecting.
        match timeout(Duration::from_millis(200), listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                info!("new client connection from {peer_addr}");
                let cfg = Arc::clone(&config);
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    handle_client_session(stream, peer_addr, cfg, store).await;
                });
            }
            Ok(Err(e)) => {
                // Transient accept error; keep the server up.
                error!("accept error: {e}");
            }
            Err(_) => {
                // No connection within the window; loop back to the flag check.
            }
        }
    }

    Ok(())
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Entry point of each per-session task.  Wraps [`run_session`] and logs the
/// outcome, so `run_session` itself can use `?` freely.
async fn handle_client_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<ProxyConfig>,
    store: Arc<SessionStore<SharedTvSink>>,
) {
    match run_session(raw_stream, peer_addr, config, store).await {
        Ok(()) => info!("session {peer_addr} closed normally"),
        Err(e) => warn!("session {peer_addr} closed with error: {e:#}"),
    }
}

/// Full lifecycle of one client session.
async fn run_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<ProxyConfig>,
    store: Arc<SessionStore<SharedTvSink>>,
) -> anyhow::Result<()> {
    // The target parameters ride the upgrade request's URI, so the handshake
    // callback captures it before the connection speaks WebSocket.
    let mut request_uri = String::from("/");
    let capture_uri = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        request_uri = req.uri().to_string();
        Ok(resp)
    };
    let ws_stream = accept_hdr_async(raw_stream, capture_uri)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let (mut client_tx, mut client_rx) = ws_stream.split();

    // Parameter problems are reported over the established WebSocket, then
    // the session ends; there is nothing to retry.
    let (ip, port) = match parse_target(&request_uri, config.tv_port) {
        Ok(target) => target,
        Err(e) => {
            warn!("session {peer_addr}: {e}");
            send_frame(&mut client_tx, ProxyFrame::session_error(e.to_string())).await;
            let _ = client_tx.close().await;
            return Ok(());
        }
    };

    info!("session {peer_addr}: target TV {ip}:{port}");

    // One connection attempt; failure is terminal for the session.
    let tv_stream = match connect_tv(&control_url(ip, port)).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("session {peer_addr}: device connection failed: {e:#}");
            send_frame(
                &mut client_tx,
                ProxyFrame::session_error(format!("Failed to connect to TV: {e}")),
            )
            .await;
            let _ = client_tx.close().await;
            return Ok(());
        }
    };

    let (tv_tx, mut tv_rx) = tv_stream.split();
    let tv_sink: SharedTvSink = Arc::new(tokio::sync::Mutex::new(tv_tx));

    let key = session_key(ip, port);
    store.insert_primary(&key, Arc::clone(&tv_sink));

    // Status frame goes out before any relayed traffic.
    send_frame(&mut client_tx, ProxyFrame::connected()).await;

    let result = relay_loop(
        &config,
        &store,
        &key,
        ip,
        port,
        &mut client_tx,
        &mut client_rx,
        &mut tv_rx,
        &tv_sink,
    )
    .await;

    // Symmetric teardown: both device-side handles are removed and closed no
    // matter which side ended the session.
    let (primary, input) = store.remove(&key);
    if let Some(sink) = primary {
        let _ = sink.lock().await.close().await;
    }
    if let Some(sink) = input {
        let _ = sink.lock().await.close().await;
    }
    let _ = client_tx.close().await;

    result
}

/// The session's single event loop: relays traffic in both directions and
/// intercepts button commands.
#[allow(clippy::too_many_arguments)]
async fn relay_loop(
    config: &ProxyConfig,
    store: &SessionStore<SharedTvSink>,
    key: &str,
    ip: Ipv4Addr,
    port: u16,
    client_tx: &mut ClientSink,
    client_rx: &mut ClientStream,
    tv_rx: &mut SplitStream<TvStream>,
    tv_sink: &SharedTvSink,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            client_msg = client_rx.next() => match client_msg {
                Some(Ok(WsMessage::Text(text))) => {
                    match serde_json::from_str::<ClientCommand>(&text) {
                        Ok(ClientCommand::Button { name }) => {
                            debug!("session {key}: button {name}");
                            match deliver_button(
                                config, store, key, ip, port, &name, client_tx, tv_rx, tv_sink,
                            )
                            .await
                            {
                                Ok(()) => {
                                    send_frame(client_tx, ProxyFrame::button_delivered(&name))
                                        .await;
                                }
                                Err(e) => {
                                    // Command-level failure; the session and the
                                    // primary connection stay up.
                                    warn!("session {key}: button delivery failed: {e:#}");
                                    send_frame(
                                        client_tx,
                                        ProxyFrame::command_error(format!(
                                            "Failed to send button: {e}"
                                        )),
                                    )
                                    .await;
                                }
                            }
                        }
                        // Opaque device traffic; relay verbatim.
                        Err(_) => {
                            if tv_sink.lock().await.send(WsMessage::Text(text)).await.is_err() {
                                send_frame(client_tx, ProxyFrame::session_error("TV not connected"))
                                    .await;
                                return Ok(());
                            }
                        }
                    }
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    if tv_sink.lock().await.send(WsMessage::Binary(data)).await.is_err() {
                        send_frame(client_tx, ProxyFrame::session_error("TV not connected"))
                            .await;
                        return Ok(());
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    debug!("session {key}: client closed");
                    return Ok(());
                }
                Some(Ok(_)) => {
                    // Ping/pong are handled by the protocol layer.
                }
                Some(Err(e)) => {
                    debug!("session {key}: client error: {e}");
                    return Ok(());
                }
            },

            tv_msg = tv_rx.next() => match tv_msg {
                Some(Ok(msg @ (WsMessage::Text(_) | WsMessage::Binary(_)))) => {
                    if client_tx.send(msg).await.is_err() {
                        debug!("session {key}: client send failed");
                        return Ok(());
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    // A device-initiated close ends the session silently; the
                    // client channel is closed during teardown, no frame sent.
                    debug!("session {key}: device closed");
                    return Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    send_frame(
                        client_tx,
                        ProxyFrame::session_error(format!("TV connection error: {e}")),
                    )
                    .await;
                    return Ok(());
                }
            },
        }
    }
}

// ── Button delivery ───────────────────────────────────────────────────────────

/// Delivers one button press over the secondary input channel.
///
/// The cached input socket is tried first.  Without one (or when the cached
/// socket turns out to be dead) the channel is negotiated: an input-socket
/// request goes out on the primary connection, and the loop below waits for
/// the matching reply while relaying everything else to the client unchanged.
#[allow(clippy::too_many_arguments)]
async fn deliver_button(
    config: &ProxyConfig,
    store: &SessionStore<SharedTvSink>,
    key: &str,
    ip: Ipv4Addr,
    port: u16,
    name: &str,
    client_tx: &mut ClientSink,
    tv_rx: &mut SplitStream<TvStream>,
    tv_sink: &SharedTvSink,
) -> anyhow::Result<()> {
    let wire = encode_button(name);

    if let Some(cached) = store.input_socket(key) {
        match cached.lock().await.send(WsMessage::Text(wire.clone())).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                debug!("session {key}: cached input socket dead ({e}); renegotiating");
                store.remove_input(key);
            }
        }
    }

    let input_sink = negotiate_input_socket(config, key, ip, port, client_tx, tv_rx, tv_sink)
        .await?;
    input_sink
        .lock()
        .await
        .send(WsMessage::Text(wire))
        .await
        .map_err(|e| anyhow!("input socket write failed: {e}"))?;
    store.insert_input(key, input_sink);
    Ok(())
}

/// Negotiates and opens the secondary input channel.
async fn negotiate_input_socket(
    config: &ProxyConfig,
    key: &str,
    ip: Ipv4Addr,
    port: u16,
    client_tx: &mut ClientSink,
    tv_rx: &mut SplitStream<TvStream>,
    tv_sink: &SharedTvSink,
) -> anyhow::Result<SharedTvSink> {
    let request_id = new_correlation_id("input_socket");
    let request = SsapMessage::input_socket_request(&request_id);
    let request_json =
        serde_json::to_string(&request).context("failed to encode input socket request")?;

    tv_sink
        .lock()
        .await
        .send(WsMessage::Text(request_json))
        .await
        .map_err(|e| anyhow!("failed to send input socket request: {e}"))?;

    // Bounded wait for the matching reply.  Unrelated device frames keep
    // flowing to the client while we wait; only this session blocks.
    let deadline = tokio::time::Instant::now() + config.negotiation_timeout;
    let path = loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let tv_msg = timeout(remaining, tv_rx.next())
            .await
            .map_err(|_| anyhow!("input socket request timeout"))?;

        match tv_msg {
            Some(Ok(WsMessage::Text(text))) => {
                if let Ok(reply) = serde_json::from_str::<SsapMessage>(&text) {
                    if let Some(path) = reply.socket_path_for(&request_id) {
                        break path.to_string();
                    }
                }
                if client_tx.send(WsMessage::Text(text)).await.is_err() {
                    bail!("client disconnected during input socket negotiation");
                }
            }
            Some(Ok(WsMessage::Binary(data))) => {
                if client_tx.send(WsMessage::Binary(data)).await.is_err() {
                    bail!("client disconnected during input socket negotiation");
                }
            }
            Some(Ok(WsMessage::Close(_))) | None => {
                bail!("TV connection closed during input socket negotiation");
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => bail!("TV connection error during input socket negotiation: {e}"),
        }
    };

    debug!("session {key}: input socket path {path}");
    let url = resolve_input_socket_url(&path, ip, port);
    let input_stream = connect_tv(&url)
        .await
        .with_context(|| format!("failed to open input socket at {url}"))?;

    let (input_tx, mut input_rx) = input_stream.split();

    // The input channel is write-only from our side, but its read half must
    // still be pumped so protocol-level frames are processed.
    let drain_key = key.to_string();
    tokio::spawn(async move {
        while let Some(msg) = input_rx.next().await {
            if msg.is_err() {
                break;
            }
        }
        debug!("session {drain_key}: input socket reader ended");
    });

    Ok(Arc::new(tokio::sync::Mutex::new(input_tx)))
}

// ── Target parameters ─────────────────────────────────────────────────────────

/// Problems with the session's target parameters.
///
/// The `Display` text is sent verbatim to the client in the `proxy-error`
/// frame.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("TV IP is required")]
    MissingIp,
    #[error("Invalid TV IP address: {0}")]
    InvalidIp(String),
    #[error("Invalid TV port: {0}")]
    InvalidPort(String),
}

/// Extracts the `ip` and `port` query parameters from the upgrade URI.
fn parse_target(request_uri: &str, default_port: u16) -> Result<(Ipv4Addr, u16), TargetError> {
    let url = Url::parse(&format!("ws://proxy{request_uri}"))
        .map_err(|_| TargetError::MissingIp)?;

    let mut ip = None;
    let mut port = default_port;
    for (name, value) in url.query_pairs() {
        match name.as_ref() {
            "ip" => {
                ip = Some(
                    value
                        .parse::<Ipv4Addr>()
                        .map_err(|_| TargetError::InvalidIp(value.to_string()))?,
                );
            }
            "port" => {
                port = value
                    .parse::<u16>()
                    .map_err(|_| TargetError::InvalidPort(value.to_string()))?;
            }
            _ => {}
        }
    }

    let ip = ip.ok_or(TargetError::MissingIp)?;
    Ok((ip, port))
}

/// Sends a structured frame to the client, ignoring delivery failure (the
/// session is ending or the loop will notice on its next send).
async fn send_frame(client_tx: &mut ClientSink, frame: ProxyFrame) {
    let _ = client_tx.send(WsMessage::Text(frame.to_json())).await;
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target_with_ip_and_port() {
        let (ip, port) = parse_target("/?ip=192.168.1.50&port=9345", 3001).unwrap();
        assert_eq!(ip, "192.168.1.50".parse::<Ipv4Addr>().unwrap());
        assert_eq!(port, 9345);
    }

    #[test]
    fn test_parse_target_defaults_port() {
        let (ip, port) = parse_target("/?ip=10.0.0.7", 3001).unwrap();
        assert_eq!(ip, "10.0.0.7".parse::<Ipv4Addr>().unwrap());
        assert_eq!(port, 3001);
    }

    #[test]
    fn test_parse_target_missing_ip_is_an_error() {
        let err = parse_target("/", 3001).unwrap_err();
        assert_eq!(err, TargetError::MissingIp);
        assert_eq!(err.to_string(), "TV IP is required");

        let err = parse_target("/?port=3001", 3001).unwrap_err();
        assert_eq!(err, TargetError::MissingIp);
    }

    #[test]
    fn test_parse_target_rejects_malformed_ip() {
        let err = parse_target("/?ip=not-an-ip", 3001).unwrap_err();
        assert_eq!(err, TargetError::InvalidIp("not-an-ip".to_string()));
        assert_eq!(err.to_string(), "Invalid TV IP address: not-an-ip");
    }

    #[test]
    fn test_parse_target_rejects_malformed_port() {
        let err = parse_target("/?ip=10.0.0.7&port=seventy", 3001).unwrap_err();
        assert_eq!(err, TargetError::InvalidPort("seventy".to_string()));
        assert_eq!(err.to_string(), "Invalid TV port: seventy");
    }

    #[test]
    fn test_parse_target_ignores_unknown_parameters() {
        let (ip, port) = parse_target("/?ip=10.0.0.7&theme=dark", 3001).unwrap();
        assert_eq!(ip, "10.0.0.7".parse::<Ipv4Addr>().unwrap());
        assert_eq!(port, 3001);
    }
}
