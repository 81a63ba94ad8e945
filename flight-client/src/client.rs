//! Caller-facing flight booking operations.
//!
//! A [`FlightClient`] owns one transport for the whole session.  Every
//! operation except seat monitoring is a retrying exchange through the
//! [`crate::dispatcher`]; monitoring goes through [`crate::monitor`].
//!
//! Operations take `&mut self`: one request is in flight at a time, and a
//! running [`Watch`] borrows the client until it is dropped.

use std::time::Duration;

use log::{debug, warn};

use crate::codec::{Request, ResponseMessage};
use crate::config::ClientConfig;
use crate::dispatcher::{self, RetryPolicy};
use crate::error::ClientError;
use crate::monitor::{self, Watch};
use crate::transport::{Transport, UdpTransport};

/// Per-session counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClientMetrics {
    pub exchanges: u64,          // retrying exchanges started
    pub exchange_failures: u64,  // exchanges that ended in an error
    pub input_rejections: u64,   // requests refused before sending
    pub monitor_sessions: u64,   // monitoring windows opened
}

pub struct FlightClient<T: Transport = UdpTransport> {
    transport: T,
    policy: RetryPolicy,
    poll_interval: Duration,
    metrics: ClientMetrics,
}

impl FlightClient<UdpTransport> {
    /// Validate `config`, resolve the server and bind the session socket.
    pub fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let transport = UdpTransport::connect(&config.server, config.loss_simulator())?;
        debug!("session bound to {:?}", transport.local_addr());
        Ok(Self::with_transport(transport, config))
    }
}

impl<T: Transport> FlightClient<T> {
    pub fn with_transport(transport: T, config: &ClientConfig) -> Self {
        Self {
            transport,
            policy: config.retry_policy(),
            poll_interval: config.poll_interval,
            metrics: ClientMetrics::default(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn metrics(&self) -> &ClientMetrics {
        &self.metrics
    }

    /// Flights between `source` and `destination` (opcode 1).
    pub fn query_flights(
        &mut self,
        source: &str,
        destination: &str,
    ) -> Result<ResponseMessage, ClientError> {
        self.exchange(Request::QueryFlights {
            source: source.to_string(),
            destination: destination.to_string(),
        })
    }

    /// Details of flight `id` (opcode 2).
    pub fn flight_details(&mut self, id: u32) -> Result<ResponseMessage, ClientError> {
        self.exchange(Request::FlightDetails { id })
    }

    /// Reserve `seats` on flight `id` (opcode 3).
    pub fn reserve_seats(&mut self, id: u32, seats: u32) -> Result<ResponseMessage, ClientError> {
        self.exchange(Request::Reserve { id, seats })
    }

    /// Subscribe to seat updates of flight `id` for `duration_secs` (opcode 4).
    ///
    /// The request is sent once, before this returns; the updates are
    /// received lazily while the returned [`Watch`] is iterated.
    pub fn monitor_seats(
        &mut self,
        id: u32,
        duration_secs: u32,
    ) -> Result<Watch<'_, T>, ClientError> {
        let bytes = self.encode(&Request::Monitor { id, duration_secs })?;
        self.metrics.monitor_sessions += 1;
        monitor::watch(
            &mut self.transport,
            &bytes,
            Duration::from_secs(u64::from(duration_secs)),
            self.poll_interval,
        )
    }

    /// Loyalty points of this client, keyed by its address (opcode 5).
    pub fn query_points(&mut self) -> Result<ResponseMessage, ClientError> {
        self.exchange(Request::QueryPoints)
    }

    /// Reserve `seats` on flight `id`, paying with points (opcode 6).
    pub fn reserve_seats_with_points(
        &mut self,
        id: u32,
        seats: u32,
    ) -> Result<ResponseMessage, ClientError> {
        self.exchange(Request::ReserveWithPoints { id, seats })
    }

    fn exchange(&mut self, request: Request) -> Result<ResponseMessage, ClientError> {
        let bytes = self.encode(&request)?;
        self.metrics.exchanges += 1;
        debug!("{} request, {} bytes", request.opcode(), bytes.len());

        let result = dispatcher::execute(&mut self.transport, &bytes, &self.policy);
        if let Err(e) = &result {
            self.metrics.exchange_failures += 1;
            warn!("{} failed: {e}", request.opcode());
        }
        result
    }

    fn encode(&mut self, request: &Request) -> Result<Vec<u8>, ClientError> {
        request.encode().map_err(|e| {
            self.metrics.input_rejections += 1;
            ClientError::from(e)
        })
    }
}
