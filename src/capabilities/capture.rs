// ABOUTME: WebSocket collaborators for browser-side element capture
// ABOUTME: A background listener accumulating pushed element descriptors, plus a one-shot fetch client

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::engine::error::{ExecutionError, Result};

pub const DEFAULT_CAPTURE_HOST: &str = "localhost";
pub const DEFAULT_CAPTURE_PORT: u16 = 8765;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

struct RunningListener {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Listener that accepts element descriptors pushed by a browser extension.
///
/// Every text frame holding valid JSON is appended to an in-memory buffer;
/// malformed frames are skipped. Readers take snapshots of the buffer and
/// never wait on the listener.
pub struct ElementCaptureServer {
    host: String,
    port: u16,
    elements: Arc<Mutex<Vec<Value>>>,
    running: Option<RunningListener>,
}

impl ElementCaptureServer {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            elements: Arc::new(Mutex::new(Vec::new())),
            running: None,
        }
    }

    /// Bind the listener and start accepting connections in the background.
    ///
    /// Starting a server that is already running returns its current address.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let Some(running) = &self.running {
            return Ok(running.local_addr);
        }

        let listener = TcpListener::bind((self.host.as_str(), self.port)).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(accept_loop(listener, Arc::clone(&self.elements), shutdown_rx));

        info!("Element capture server listening on ws://{}", local_addr);
        self.running = Some(RunningListener {
            local_addr,
            shutdown,
            handle,
        });
        Ok(local_addr)
    }

    /// Stop accepting connections and wait for the listener task to finish.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        // The receiver is gone only if the listener already exited.
        let _ = running.shutdown.send(());
        running
            .handle
            .await
            .map_err(|e| ExecutionError::capability_failed("element capture", e))?;
        info!("Element capture server on {} stopped", running.local_addr);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// Everything captured so far, in arrival order.
    pub fn snapshot(&self) -> Vec<Value> {
        lock(&self.elements).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.elements).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ElementCaptureServer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPTURE_HOST, DEFAULT_CAPTURE_PORT)
    }
}

impl Drop for ElementCaptureServer {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown.send(());
        }
    }
}

fn lock(elements: &Mutex<Vec<Value>>) -> MutexGuard<'_, Vec<Value>> {
    elements.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn accept_loop(
    listener: TcpListener,
    elements: Arc<Mutex<Vec<Value>>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("Accepted capture connection from {}", peer);
                    connections.spawn(handle_connection(stream, peer, Arc::clone(&elements)));
                }
                Err(e) => {
                    // Errors such as EMFILE persist until a connection closes.
                    warn!("Failed to accept capture connection: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    connections.shutdown().await;
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, elements: Arc<Mutex<Vec<Value>>>) {
    let mut socket = match tokio_tungstenite::accept_async(stream).await {
        Ok(socket) => socket,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", peer, e);
            return;
        }
    };

    while let Some(frame) = socket.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<Value>(&text) {
                Ok(element) => {
                    lock(&elements).push(element);
                }
                Err(e) => debug!("Ignoring malformed element from {}: {}", peer, e),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Capture connection from {} ended: {}", peer, e);
                break;
            }
        }
    }
}

/// Ask a browser extension at `ws_url` for the element matching `selector`.
///
/// Sends `{"selector": ...}` and returns the first JSON text frame received.
pub async fn fetch_web_element(selector: &str, ws_url: &str) -> Result<Value> {
    let (mut socket, _) = tokio_tungstenite::connect_async(ws_url)
        .await
        .map_err(|e| ExecutionError::CapabilityUnavailable {
            capability: "web element lookup",
            reason: format!("cannot connect to {}: {}", ws_url, e),
        })?;

    let request = json!({ "selector": selector }).to_string();
    socket
        .send(Message::Text(request))
        .await
        .map_err(|e| ExecutionError::capability_failed("web element lookup", e))?;

    while let Some(frame) = socket.next().await {
        match frame.map_err(|e| ExecutionError::capability_failed("web element lookup", e))? {
            Message::Text(text) => {
                let element = serde_json::from_str(&text).map_err(|e| {
                    ExecutionError::capability_failed("web element lookup", format!("invalid reply: {}", e))
                })?;
                let _ = socket.close(None).await;
                return Ok(element);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    Err(ExecutionError::capability_failed(
        "web element lookup",
        "connection closed before a reply arrived",
    ))
}
