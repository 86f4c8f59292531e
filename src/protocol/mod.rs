pub mod liveness;
pub mod message_handler;
pub mod messages;
pub mod routing_table;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use log::{error, info, warn};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{Address, SharedRouterState};
use message_handler::Outbound;
use messages::Message;

pub const PROTOCOL_PORT: u16 = 55151;

const RECV_BUFFER_SIZE: usize = 2048;

/// Owns the protocol socket and drives the two background duties: the
/// receive-and-dispatch loop and the periodic sweep + update broadcast.
pub struct ProtocolEngine {
    state: SharedRouterState,
    socket: Arc<UdpSocket>,
    shutdown: watch::Receiver<bool>,
}

impl ProtocolEngine {
    /// Bind the protocol socket on the local address. A bind failure here is
    /// fatal: nothing else starts without a socket.
    pub async fn bind(
        state: SharedRouterState,
        local: Address,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(SocketAddr::new(local, PROTOCOL_PORT)).await?;
        Ok(Self {
            state,
            socket: Arc::new(socket),
            shutdown,
        })
    }

    pub fn socket(&self) -> Arc<UdpSocket> {
        self.socket.clone()
    }

    /// Spawn both protocol duties. They run until the shutdown channel flips.
    pub fn start(self) -> (JoinHandle<()>, JoinHandle<()>) {
        let receive_task = tokio::spawn(receive_loop(
            self.state.clone(),
            self.socket.clone(),
            self.shutdown.clone(),
        ));
        let periodic_task = tokio::spawn(periodic_loop(self.state, self.socket, self.shutdown));
        (receive_task, periodic_task)
    }
}

/// Receive datagrams, decode, dispatch, and send whatever the handler
/// produced. A malformed datagram is logged and skipped; the loop only exits
/// on shutdown.
async fn receive_loop(
    state: SharedRouterState,
    socket: Arc<UdpSocket>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buf = [0u8; RECV_BUFFER_SIZE];
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            result = socket.recv_from(&mut buf) => match result {
                Ok((len, from)) => {
                    let message = match Message::deserialize(&buf[..len]) {
                        Ok(message) => message,
                        Err(e) => {
                            warn!("discarding malformed datagram from {from}: {e}");
                            continue;
                        }
                    };
                    let outbound = {
                        let mut guard = state.write().await;
                        message_handler::handle_message(&mut guard, message)
                    };
                    send_all(&socket, outbound).await;
                }
                Err(e) => error!("failed to receive datagram: {e}"),
            }
        }
    }
    info!("receive loop stopped");
}

/// Every period: expire dead destinations, then broadcast split-horizon
/// updates to all neighbors. The table is only locked while the updates are
/// computed; sending happens afterwards.
async fn periodic_loop(
    state: SharedRouterState,
    socket: Arc<UdpSocket>,
    mut shutdown: watch::Receiver<bool>,
) {
    let period = state.read().await.period;
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(period) => {
                let outbound = {
                    let mut guard = state.write().await;
                    guard.sweep_dead_routes(Utc::now());
                    guard.build_updates()
                };
                send_all(&socket, outbound).await;
            }
        }
    }
    info!("periodic update loop stopped");
}

async fn send_all(socket: &UdpSocket, outbound: Vec<Outbound>) {
    for (target, message) in outbound {
        send_message(socket, target, &message).await;
    }
}

/// Fire-and-forget UDP send. Failures are logged and the message dropped;
/// there is no retry and no backpressure.
pub async fn send_message(socket: &UdpSocket, target: Address, message: &Message) {
    let data = match message.serialize() {
        Ok(data) => data,
        Err(e) => {
            error!("failed to encode message for {target}: {e}");
            return;
        }
    };
    if let Err(e) = socket
        .send_to(&data, SocketAddr::new(target, PROTOCOL_PORT))
        .await
    {
        warn!("failed to send message to {target}: {e}");
    }
}
