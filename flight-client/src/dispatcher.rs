//! Retrying request/response exchange.
//!
//! [`execute`] sends one request and waits for exactly one response.  On a
//! receive timeout the request is sent again in full, up to
//! [`RetryPolicy::max_attempts`] sends in total.  The first datagram that
//! arrives ends the exchange; late duplicates are not filtered.
//!
//! Delivery is at-least-once: the loss simulator is consulted on every
//! attempt, so the server may see the request zero, one or several times.

use std::time::Duration;

use log::{debug, warn};

use crate::codec::{self, ResponseMessage};
use crate::config::{DEFAULT_EXCHANGE_TIMEOUT, DEFAULT_MAX_ATTEMPTS};
use crate::error::ClientError;
use crate::transport::{SendOutcome, Transport, TransportError};

/// Bound and per-attempt timeout of a retrying exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: DEFAULT_EXCHANGE_TIMEOUT,
        }
    }
}

/// Send `request` and return the first response, retrying on timeout.
///
/// Only [`TransportError::Timeout`] is retried.  Send and receive failures
/// end the exchange immediately, as does a response that fails to decode or
/// exceeds [`codec::MAX_DATAGRAM`].
pub fn execute<T: Transport + ?Sized>(
    transport: &mut T,
    request: &[u8],
    policy: &RetryPolicy,
) -> Result<ResponseMessage, ClientError> {
    let mut attempts = 0;
    while attempts < policy.max_attempts {
        if transport.send(request)? == SendOutcome::Dropped {
            debug!("attempt {} lost before transmission", attempts + 1);
        }

        match transport.recv_timeout(policy.timeout) {
            Ok(bytes) => {
                return codec::decode(&bytes).map_err(|e| {
                    warn!("discarding malformed response: {e}");
                    e.into()
                });
            }
            Err(TransportError::Timeout) => {
                attempts += 1;
                if attempts < policy.max_attempts {
                    warn!("no response received, retrying (attempt {attempts})");
                }
            }
            Err(e) => return Err(e.into()),
        }
    }

    warn!("no response after {attempts} attempts, giving up");
    Err(ClientError::ExchangeFailed { attempts })
}
