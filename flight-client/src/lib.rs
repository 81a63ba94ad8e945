//! `flight-client` — client side of the flight booking protocol over UDP.
//!
//! # Architecture
//!
//! ```text
//!   FlightClient  (six caller-facing operations)
//!      │ Request (sum type)
//!      ▼
//!   ┌───────┐  bytes  ┌────────────┐  retry on timeout
//!   │ codec │────────▶│ dispatcher │──────────────────┐
//!   └───────┘         └────────────┘                  │
//!      ▲              ┌────────────┐  send once, poll │
//!      │ decode       │  monitor   │─────────────────┐│
//!      │              └────────────┘                 ▼▼
//!      │                                   ┌──────────────────┐
//!      └───────────── raw datagrams ───────│    transport     │
//!                                          │ + loss simulator │
//!                                          └──────────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`codec`]      — wire format (serialise / deserialise), no I/O
//! - [`transport`]  — blocking UDP endpoint with receive timeouts
//! - [`simulator`]  — seedable outbound datagram loss
//! - [`dispatcher`] — bounded-retry request/response exchange
//! - [`monitor`]    — one-shot subscribe plus fixed observation window
//! - [`client`]     — typed operations over one session socket
//! - [`config`]     — session parameters and defaults
//! - [`error`]      — crate-level error taxonomy
//!
//! A session supports one outstanding operation at a time.

pub mod client;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod monitor;
pub mod simulator;
pub mod transport;

pub use client::{ClientMetrics, FlightClient};
pub use codec::{CodecError, Opcode, Request, RequestPayload, ResponseMessage};
pub use config::ClientConfig;
pub use dispatcher::RetryPolicy;
pub use error::ClientError;
pub use monitor::Watch;
pub use simulator::LossSimulator;
pub use transport::{SendOutcome, Transport, TransportError, UdpTransport};
