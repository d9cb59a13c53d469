//! # Messaging adapter
//!
//! The pub/sub bridge between the truck and the mine broker. Two concerns:
//!
//! - **Inbound**: a background thread subscribed to this truck's command and
//!   route topics, translating JSON payloads into [`TruckCmd`] records on the
//!   command queue. Undecodable payloads and unknown command types are
//!   warned about and dropped.
//! - **Outbound**: a periodic task publishing state and position packets at
//!   10 Hz. While the broker is unreachable outbound packets are silently
//!   dropped; the socket reconnects by itself with a bounded backoff.
//!
//! Messages are two-frame: topic, then JSON payload.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, error, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use comms_if::net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions};
use comms_if::tc::TruckCmd;
use comms_if::tm::RoutePacket;
use comms_if::topics;
use util::module::Task;
use util::time::unix_timestamp_s;

use crate::state::StateStore;
use crate::sync::cmd_queue::{submit, CommandQueue};

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Socket error: {0}")]
    SocketError(#[from] MonitoredSocketError),

    #[error("Could not set the topic subscription: {0}")]
    SubscribeError(zmq::Error),

    #[error("Could not send a packet: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialise a packet: {0}")]
    SerializeError(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// OUTBOUND
// ---------------------------------------------------------------------------

/// Outbound half of the adapter: periodic state/position publisher.
pub struct OutboundBus {
    socket: MonitoredSocket,
    store: Arc<StateStore>,

    state_topic: String,
    position_topic: String,

    period: Duration,
}

impl OutboundBus {
    pub fn new(
        ctx: &zmq::Context,
        net_params: &NetParams,
        store: Arc<StateStore>,
        period: Duration,
    ) -> Result<Self, BusError> {
        let socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            SocketOptions::default(),
            &net_params.pub_endpoint,
        )?;

        let truck_id = store.snapshot().truck_id;

        Ok(Self {
            socket,
            store,
            state_topic: topics::state(truck_id),
            position_topic: topics::position(truck_id),
            period,
        })
    }

    fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        let send = |frame: &[u8], flags| match self.socket.send(frame, flags) {
            // EAGAIN while disconnected: the packet is dropped, no backlog
            Err(zmq::Error::EAGAIN) => Ok(()),
            other => other,
        };

        send(topic.as_bytes(), zmq::SNDMORE).map_err(BusError::SendError)?;
        send(payload.as_bytes(), 0).map_err(BusError::SendError)
    }
}

impl Task for OutboundBus {
    type TickError = BusError;

    fn name(&self) -> &'static str {
        "bus_out"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn tick(&mut self) -> Result<(), Self::TickError> {
        let snap = self.store.snapshot();
        let timestamp = unix_timestamp_s();

        let state_json = serde_json::to_string(&snap.state_packet(timestamp))?;
        self.publish(&self.state_topic, &state_json)?;

        let position_json = serde_json::to_string(&snap.position_packet())?;
        self.publish(&self.position_topic, &position_json)?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// INBOUND
// ---------------------------------------------------------------------------

/// Spawn the inbound half of the adapter on its own thread.
///
/// The thread subscribes to the truck's command and route topics and runs
/// until the shutdown flag is raised; its receive timeout bounds how long
/// shutdown detection takes.
pub fn spawn_inbound(
    ctx: &zmq::Context,
    net_params: &NetParams,
    truck_id: u32,
    queue: CommandQueue,
    store: Arc<StateStore>,
    shutdown: Arc<AtomicBool>,
) -> Result<JoinHandle<()>, BusError> {
    let socket = MonitoredSocket::new(
        ctx,
        zmq::SUB,
        SocketOptions::default(),
        &net_params.sub_endpoint,
    )?;

    let command_topic = topics::command(truck_id);
    let route_topic = topics::route(truck_id);

    socket
        .set_subscribe(command_topic.as_bytes())
        .map_err(BusError::SubscribeError)?;
    socket
        .set_subscribe(route_topic.as_bytes())
        .map_err(BusError::SubscribeError)?;

    let handle = thread::Builder::new()
        .name(String::from("bus_in"))
        .spawn(move || {
            inbound_loop(socket, command_topic, route_topic, queue, store, shutdown)
        })
        .expect("Could not spawn the inbound bus thread");

    Ok(handle)
}

fn inbound_loop(
    socket: MonitoredSocket,
    command_topic: String,
    route_topic: String,
    queue: CommandQueue,
    store: Arc<StateStore>,
    shutdown: Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        // Topic frame
        let topic = match socket.recv_string(0) {
            Ok(Ok(topic)) => topic,
            Ok(Err(_)) => {
                warn!("Non UTF-8 topic frame from the broker");
                continue;
            }
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => {
                error!("Error receiving from the broker: {}", e);
                break;
            }
        };

        // Payload frame
        let payload = match socket.get_rcvmore() {
            Ok(true) => match socket.recv_string(0) {
                Ok(Ok(payload)) => payload,
                _ => {
                    warn!("Could not read the payload frame on {}", topic);
                    continue;
                }
            },
            _ => {
                warn!("Message on {} carried no payload frame", topic);
                continue;
            }
        };

        if topic == command_topic {
            match TruckCmd::from_json(&payload) {
                Ok(cmd) => {
                    debug!("Command received: {:?}", cmd);
                    submit(&queue, &store, cmd);
                }
                Err(e) => warn!("Dropping invalid command: {}", e),
            }
        } else if topic == route_topic {
            match serde_json::from_str::<RoutePacket>(&payload) {
                Ok(packet) => {
                    debug!("Route received: {} waypoints", packet.waypoints.len());
                    submit(&queue, &store, packet.into());
                }
                Err(e) => warn!("Dropping invalid route: {}", e),
            }
        } else {
            debug!("Message on unexpected topic {}", topic);
        }
    }
}
