//! # Network Module
//!
//! This module provides the pub/sub networking abstractions over ZMQ, the
//! messaging library chosen for the software. Each truck connects a PUB and a
//! SUB socket to the central broker; reconnection after a broker outage is
//! handled by the socket itself with a bounded exponential backoff.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
};
use zmq::{Context, Socket, SocketEvent, SocketType};

// Export zmq
pub use zmq;

// ------------------------------------------------------------------------------------------------
// MACROS
// ------------------------------------------------------------------------------------------------

macro_rules! set_sockopts {
    ($socket:expr, $(($opt:ident, $val:expr)),+) => {
        $(
            $socket.$opt($val)
                .map_err(|e| MonitoredSocketError::SocketOptionError(stringify!($opt).into(), e))?;
        )+
    };
}

// ------------------------------------------------------------------------------------------------
// STATICS
// ------------------------------------------------------------------------------------------------

/// Number of monitors that are registered. Used to provide unique IDs for each monitor endpoint.
static NUM_MONITORS: AtomicUsize = AtomicUsize::new(0);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network parameters for a truck, loaded from `net.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetParams {
    /// Endpoint the truck's PUB socket connects to (the broker's inbound
    /// side), e.g. `"tcp://localhost:5550"`.
    pub pub_endpoint: String,

    /// Endpoint the truck's SUB socket connects to (the broker's outbound
    /// side), e.g. `"tcp://localhost:5551"`.
    pub sub_endpoint: String,
}

impl Default for NetParams {
    fn default() -> Self {
        Self {
            pub_endpoint: String::from("tcp://localhost:5550"),
            sub_endpoint: String::from("tcp://localhost:5551"),
        }
    }
}

/// A zmq socket with a background monitor thread tracking connection state.
///
/// The monitor allows callers to ask whether the socket is currently
/// connected to its peer, which plain zmq sockets do not expose.
pub struct MonitoredSocket {
    socket: Socket,

    join_handle: Option<thread::JoinHandle<()>>,

    shutdown: Arc<AtomicBool>,

    connected: Arc<AtomicBool>,
}

/// Options which can be set on a monitored socket.
///
/// Most options correspond to those found in the
/// [`zmq_setsockopt`](http://api.zeromq.org/master:zmq-setsockopt) documentation.
pub struct SocketOptions {
    /// Indicates if the socket should bind itself to the endpoint rather than
    /// connect. Servers should set this to `true`.
    ///
    /// The default value is `false`.
    pub bind: bool,

    /// If true `MonitoredSocket::new()` will block until the socket is
    /// connected. Clients talking to a broker that may not be up yet should
    /// leave this `false`.
    ///
    /// The default value is `false`.
    pub block_on_first_connect: bool,

    /// `ZMQ_LINGER`: Set linger period for socket shutdown
    pub linger: i32,

    /// `ZMQ_RECONNECT_IVL`: Set initial reconnection interval
    pub reconnect_ivl: i32,

    /// `ZMQ_RECONNECT_IVL_MAX`: Set maximum reconnection interval
    pub reconnect_ivl_max: i32,

    /// `ZMQ_CONNECT_TIMEOUT`: Set `connect()` timeout
    pub connect_timeout: i32,

    /// `ZMQ_RCVTIMEO`: Maximum time before a recv operation returns with `EAGAIN`
    pub recv_timeout: i32,

    /// `ZMQ_SNDTIMEO`: Maximum time before a send operation returns with `EAGAIN`
    pub send_timeout: i32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum MonitoredSocketError {
    #[error("Error creating the socket: {0}")]
    CreateSocketError(zmq::Error),

    #[error("Error enabling monitoring for the socket: {0}")]
    MonitoringEnableError(zmq::Error),

    #[error("Could not connect the socket: {0:?}")]
    CouldNotConnect(Option<zmq::Error>),

    #[error("Could not read event from monitor socket: {0}")]
    EventReadError(zmq::Error),

    #[error("Could not set the {0} socket option: {1}")]
    SocketOptionError(String, zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MonitoredSocket {
    /// Create a new monitored socket.
    ///
    /// ## Arguments
    /// - `ctx`: the zmq context which will be used to create the socket
    /// - `socket_type`: the type of zmq socket to create
    /// - `socket_options`: a [`SocketOptions`] struct specifying how to configure the socket
    /// - `endpoint`: a zmq endpoint string, such as `"tcp://localhost:5550"`
    pub fn new(
        ctx: &Context,
        socket_type: SocketType,
        socket_options: SocketOptions,
        endpoint: &str,
    ) -> Result<Self, MonitoredSocketError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let connected = Arc::new(AtomicBool::new(false));

        let socket = ctx
            .socket(socket_type)
            .map_err(MonitoredSocketError::CreateSocketError)?;

        // Create monitor endpoint
        let monitor_endpoint = format!(
            "inproc://monitor_{}",
            NUM_MONITORS.fetch_add(1, Ordering::Relaxed)
        );

        // Enable, create, and connect monitor
        socket
            .monitor(&monitor_endpoint, SocketEvent::ALL as i32)
            .map_err(MonitoredSocketError::MonitoringEnableError)?;
        let monitor = ctx
            .socket(zmq::PAIR)
            .map_err(MonitoredSocketError::CreateSocketError)?;
        monitor
            .set_rcvtimeo(100)
            .map_err(|e| MonitoredSocketError::SocketOptionError("set_rcvtimeo".into(), e))?;
        monitor
            .connect(&monitor_endpoint)
            .map_err(|e| MonitoredSocketError::CouldNotConnect(Some(e)))?;

        // Set the options on the socket
        socket_options.set(&socket)?;

        // Connect or bind the socket to its endpoint
        match socket_options.bind {
            false => socket.connect(endpoint),
            true => socket.bind(endpoint),
        }
        .map_err(|e| MonitoredSocketError::CouldNotConnect(Some(e)))?;

        // If requested wait for the monitor to signal connection
        if socket_options.block_on_first_connect {
            loop {
                let event = match read_event(&monitor) {
                    Ok(Some(e)) => e,
                    Ok(None) => continue,
                    Err(e) => return Err(MonitoredSocketError::EventReadError(e)),
                };

                match event {
                    SocketEvent::CONNECTED => break,
                    SocketEvent::CONNECT_DELAYED | SocketEvent::CONNECT_RETRIED => continue,
                    _ => return Err(MonitoredSocketError::CouldNotConnect(None)),
                }
            }

            connected.store(true, Ordering::Relaxed);
        }

        // Spawn the monitor thread
        let shutdown_clone = shutdown.clone();
        let connected_clone = connected.clone();

        let join_handle =
            thread::spawn(move || monitor_socket(monitor, shutdown_clone, connected_clone));

        Ok(Self {
            socket,
            join_handle: Some(join_handle),
            shutdown,
            connected,
        })
    }

    /// Return if the socket is connected or not.
    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

impl Drop for MonitoredSocket {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The monitor reads with a timeout, so it will observe the flag
        if let Some(jh) = self.join_handle.take() {
            jh.join().ok();
        }
    }
}

impl std::ops::Deref for MonitoredSocket {
    type Target = Socket;

    fn deref(&self) -> &Self::Target {
        &self.socket
    }
}

impl SocketOptions {
    /// Set these options on the given socket.
    pub fn set(&self, socket: &Socket) -> Result<(), MonitoredSocketError> {
        set_sockopts!(
            socket,
            (set_connect_timeout, self.connect_timeout),
            (set_linger, self.linger),
            (set_reconnect_ivl, self.reconnect_ivl),
            (set_reconnect_ivl_max, self.reconnect_ivl_max),
            (set_rcvtimeo, self.recv_timeout),
            (set_sndtimeo, self.send_timeout)
        );

        Ok(())
    }
}

impl Default for SocketOptions {
    fn default() -> Self {
        // The reconnect interval starts at 100 ms and backs off to 5 s
        Self {
            bind: false,
            block_on_first_connect: false,
            connect_timeout: 1000,
            linger: 1,
            reconnect_ivl: 100,
            reconnect_ivl_max: 5000,
            recv_timeout: 100,
            send_timeout: 10,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read an event from a monitor socket.
///
/// Returns `Ok(None)` if no event arrived within the socket's recv timeout.
fn read_event(socket: &Socket) -> Result<Option<SocketEvent>, zmq::Error> {
    let msg = match socket.recv_msg(0) {
        Ok(m) => m,
        Err(zmq::Error::EAGAIN) => return Ok(None),
        Err(e) => return Err(e),
    };

    let event = u16::from_ne_bytes([msg[0], msg[1]]);

    assert!(
        socket.get_rcvmore()?,
        "Monitor socket should have two messages per event"
    );

    // the address, we'll ignore it
    let _ = socket.recv_msg(0)?;

    Ok(Some(SocketEvent::from_raw(event)))
}

fn monitor_socket(monitor: Socket, shutdown: Arc<AtomicBool>, connected: Arc<AtomicBool>) {
    while !shutdown.load(Ordering::Relaxed) {
        let event = match read_event(&monitor) {
            Ok(Some(e)) => e,
            Ok(None) => continue,
            // The peer socket has been closed, nothing more to monitor
            Err(_) => break,
        };

        match event {
            SocketEvent::CONNECTED => connected.store(true, Ordering::Relaxed),
            SocketEvent::DISCONNECTED => connected.store(false, Ordering::Relaxed),
            _ => (),
        }
    }
}
