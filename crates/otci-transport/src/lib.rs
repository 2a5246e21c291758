//! Line transports for OpenThread CLI consoles.
//!
//! The command executor only ever sees whole text lines. A [`Transport`]
//! hides how those lines travel: over a TCP-bridged serial console
//! ([`TcpTransport`]) or through a deterministic in-memory device model
//! driven by a virtual clock ([`ScriptedTransport`]).
//!
//! Blocking is expressed in transport time. A simulated transport advances
//! its [`VirtualClock`] instead of sleeping, so several simulated devices
//! sharing one clock move in lockstep.

use std::time::Duration;

mod clock;
mod sim;
mod tcp;

pub use clock::*;
pub use otci_protocol::{TransportError, TransportResult};
pub use sim::*;
pub use tcp::*;

/// Outcome of a single [`Transport::receive`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A complete output line.
    Line(String),
    /// No line arrived before the timeout elapsed.
    Timeout,
}

/// A bidirectional line channel to one device console.
pub trait Transport {
    /// Send one command line. The transport adds its own terminator.
    fn send(&mut self, line: &str) -> TransportResult<()>;

    /// Wait up to `timeout` for the next output line.
    fn receive(&mut self, timeout: Duration) -> TransportResult<Received>;

    /// Let `duration` of transport time pass without reading.
    ///
    /// Lines arriving meanwhile stay queued for later `receive` calls.
    fn advance(&mut self, duration: Duration) -> TransportResult<()>;

    /// Current transport time.
    fn now(&self) -> Duration;

    /// Release the underlying channel.
    fn close(&mut self) -> TransportResult<()> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, line: &str) -> TransportResult<()> {
        (**self).send(line)
    }

    fn receive(&mut self, timeout: Duration) -> TransportResult<Received> {
        (**self).receive(timeout)
    }

    fn advance(&mut self, duration: Duration) -> TransportResult<()> {
        (**self).advance(duration)
    }

    fn now(&self) -> Duration {
        (**self).now()
    }

    fn close(&mut self) -> TransportResult<()> {
        (**self).close()
    }
}
