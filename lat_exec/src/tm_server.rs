//! # TM Server
//!
//! Publishes steering records on a ZMQ PUB socket. Sending never blocks: if the message can't be
//! queued it is dropped.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    net::{MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions, zmq},
    tm::SteerRecord,
};

use crate::lat_ctrl::{TelemetryError, TelemetrySink};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry server
pub struct TmServer {
    socket: MonitoredSocket,

    /// Number of records which could not be sent
    num_dropped: u64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TmServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmServer {
    /// Create a new instance of the TM Server, bound to the telemetry endpoint.
    ///
    /// This function will not block until a subscriber connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, TmServerError> {
        let socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            linger: 1,
            send_timeout: 0,
            send_hwm: 100,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            socket_options,
            &params.tm_endpoint
        ).map_err(TmServerError::SocketError)?;

        Ok(Self {
            socket,
            num_dropped: 0,
        })
    }

    /// Number of subscribers currently connected.
    pub fn num_subscribers(&self) -> usize {
        self.socket.num_peers()
    }

    pub fn num_dropped(&self) -> u64 {
        self.num_dropped
    }
}

impl TelemetrySink for TmServer {
    fn publish(&mut self, record: &SteerRecord) -> Result<(), TelemetryError> {
        match self.socket.send(&record.to_string(), zmq::DONTWAIT) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.num_dropped += 1;
                Err(TelemetryError::Dropped(e.to_string()))
            }
        }
    }
}
