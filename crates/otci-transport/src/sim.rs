//! Scripted device console running on virtual time.
//!
//! Replies are registered per command text. One-shot replies are consumed
//! in FIFO order; once they run out a standing reply (if any) answers every
//! further send. Commands with neither get `Error 35: InvalidCommand`, just
//! like a real console.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

use crate::clock::{Clock, VirtualClock};
use crate::{Received, Transport, TransportError, TransportResult};

/// The console's answer to an unrecognized command.
pub const INVALID_COMMAND: &str = "Error 35: InvalidCommand";

/// Lines a scripted device prints in answer to one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// Delay between the send and the first line.
    pub delay: Duration,
    /// Output lines, terminal line included.
    pub lines: Vec<String>,
}

impl Reply {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Reply {
            delay: Duration::ZERO,
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// A bare `Done`.
    pub fn done() -> Self {
        Reply::new(["Done"])
    }

    /// No output at all, so the command times out.
    pub fn silence() -> Self {
        Reply::default()
    }

    /// Delay the reply.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl<const N: usize> From<[&str; N]> for Reply {
    fn from(lines: [&str; N]) -> Self {
        Reply::new(lines)
    }
}

impl From<Vec<String>> for Reply {
    fn from(lines: Vec<String>) -> Self {
        Reply::new(lines)
    }
}

/// In-memory transport driven by a [`VirtualClock`].
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    clock: VirtualClock,
    one_shot: HashMap<String, VecDeque<Reply>>,
    standing: HashMap<String, Reply>,
    /// Lines keyed by (arrival time, sequence number).
    pending: BTreeMap<(Duration, u64), String>,
    seq: u64,
    sent: Vec<String>,
    send_failures: usize,
    closed: bool,
}

impl ScriptedTransport {
    /// Create a transport with its own clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport on a shared clock.
    pub fn with_clock(clock: VirtualClock) -> Self {
        ScriptedTransport {
            clock,
            ..Self::default()
        }
    }

    /// The clock this transport runs on.
    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    /// Queue a one-shot reply for `command`.
    pub fn expect(&mut self, command: &str, reply: impl Into<Reply>) -> &mut Self {
        self.one_shot
            .entry(command.to_string())
            .or_default()
            .push_back(reply.into());
        self
    }

    /// Answer every send of `command` with `reply` once one-shot replies run out.
    pub fn respond(&mut self, command: &str, reply: impl Into<Reply>) -> &mut Self {
        self.standing.insert(command.to_string(), reply.into());
        self
    }

    /// Print an unsolicited line at virtual time `at`.
    pub fn emit_at(&mut self, at: Duration, line: &str) -> &mut Self {
        self.enqueue(at, line.to_string());
        self
    }

    /// Make the next `count` sends fail with [`TransportError::Disconnected`].
    pub fn fail_next_sends(&mut self, count: usize) -> &mut Self {
        self.send_failures = count;
        self
    }

    /// Every command sent so far, in order.
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    /// How many times `command` was sent.
    pub fn sent_count(&self, command: &str) -> usize {
        self.sent.iter().filter(|c| *c == command).count()
    }

    fn enqueue(&mut self, at: Duration, line: String) {
        self.pending.insert((at, self.seq), line);
        self.seq += 1;
    }

    fn reply_for(&mut self, command: &str) -> Reply {
        if let Some(reply) = self.one_shot.get_mut(command).and_then(VecDeque::pop_front) {
            return reply;
        }
        self.standing
            .get(command)
            .cloned()
            .unwrap_or_else(|| Reply::new([INVALID_COMMAND]))
    }

    fn check_open(&self) -> TransportResult<()> {
        if self.closed {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Transport for ScriptedTransport {
    fn send(&mut self, line: &str) -> TransportResult<()> {
        self.check_open()?;
        if self.send_failures > 0 {
            self.send_failures -= 1;
            log::debug!("ScriptedTransport: injected send failure for `{}`", line);
            return Err(TransportError::Disconnected);
        }

        log::trace!("ScriptedTransport: > {}", line);
        self.sent.push(line.to_string());

        let reply = self.reply_for(line);
        let at = self.clock.now() + reply.delay;
        for l in reply.lines {
            self.enqueue(at, l);
        }
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> TransportResult<Received> {
        self.check_open()?;
        let now = self.clock.now();
        let deadline = now + timeout;

        let next = self.pending.first_key_value().map(|(&(at, _), _)| at);
        match next {
            Some(at) if at <= deadline => {
                if at > now {
                    self.clock.advance(at - now);
                }
                match self.pending.pop_first() {
                    Some((_, line)) => Ok(Received::Line(line)),
                    None => Ok(Received::Timeout),
                }
            }
            _ => {
                self.clock.advance(timeout);
                Ok(Received::Timeout)
            }
        }
    }

    fn advance(&mut self, duration: Duration) -> TransportResult<()> {
        self.check_open()?;
        self.clock.advance(duration);
        Ok(())
    }

    fn now(&self) -> Duration {
        self.clock.now()
    }

    fn close(&mut self) -> TransportResult<()> {
        self.closed = true;
        Ok(())
    }
}
