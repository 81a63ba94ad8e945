//! Long-poll observation window.
//!
//! [`watch`] sends a subscribe request exactly once and returns a [`Watch`]
//! iterator that yields every update datagram arriving before the window
//! closes.  The window is measured in wall-clock time from the send; each
//! poll waits at most `poll_interval` and never past the deadline.
//!
//! There is no retry: if the subscribe request is lost the window simply
//! yields nothing.  Updates lost in transit are not detected.

use std::iter::FusedIterator;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::codec::{self, ResponseMessage};
use crate::error::ClientError;
use crate::transport::{SendOutcome, Transport, TransportError};

/// Send `request` once and observe updates for `window`.
///
/// Fails only if the send itself fails.  The returned iterator borrows the
/// transport until it is dropped.
pub fn watch<'t, T: Transport + ?Sized>(
    transport: &'t mut T,
    request: &[u8],
    window: Duration,
    poll_interval: Duration,
) -> Result<Watch<'t, T>, ClientError> {
    let started = Instant::now();
    if transport.send(request)? == SendOutcome::Dropped {
        info!("monitor request lost, window will stay empty");
    }
    info!("monitoring for {window:?}");

    Ok(Watch {
        transport,
        deadline: started + window,
        poll_interval,
        received: 0,
        malformed: 0,
        finished: false,
    })
}

/// Lazy, finite sequence of updates within one monitoring window.
///
/// Yields `Err` at most once, for a fatal receive failure, after which the
/// sequence ends.  Malformed datagrams are logged and skipped.
pub struct Watch<'t, T: Transport + ?Sized> {
    transport: &'t mut T,
    deadline: Instant,
    poll_interval: Duration,
    received: usize,
    malformed: usize,
    finished: bool,
}

impl<T: Transport + ?Sized> Watch<'_, T> {
    pub fn updates_received(&self) -> usize {
        self.received
    }

    /// Datagrams discarded because they failed to decode or were too long.
    pub fn malformed(&self) -> usize {
        self.malformed
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn close(&mut self) {
        self.finished = true;
        if self.received == 0 {
            info!("no updates received during monitoring window");
        }
        info!(
            "monitoring window closed after {} update(s)",
            self.received
        );
    }
}

impl<T: Transport + ?Sized> Iterator for Watch<'_, T> {
    type Item = Result<ResponseMessage, ClientError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            let remaining = self.remaining();
            if remaining.is_zero() {
                self.close();
                return None;
            }

            match self.transport.recv_timeout(remaining.min(self.poll_interval)) {
                Ok(bytes) => match codec::decode(&bytes) {
                    Ok(update) => {
                        self.received += 1;
                        return Some(Ok(update));
                    }
                    Err(e) => {
                        warn!("discarding malformed update: {e}");
                        self.malformed += 1;
                    }
                },
                Err(TransportError::Timeout) => {}
                Err(TransportError::Oversized) => {
                    warn!("discarding over-long update");
                    self.malformed += 1;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

impl<T: Transport + ?Sized> FusedIterator for Watch<'_, T> {}
