//! OpenThread CLI controller.
//!
//! Drives one device console at a time:
//!
//! - [`Executor`]: sends a command, collects lines until the terminal
//!   marker, classifies the reply and re-issues failures within a bounded
//!   [`RetryBudget`]
//! - [`Capability`]: picks the command keyword matching the device's API
//!   version
//! - [`Otci`]: typed facade with one method per device operation
//!
//! # Example
//!
//! ```rust
//! use otci_controller::{Otci, ThreadState};
//! use otci_transport::ScriptedTransport;
//!
//! let mut console = ScriptedTransport::new();
//! console.expect("state", ["leader", "Done"]);
//!
//! let mut otci = Otci::new(console);
//! assert_eq!(otci.get_state().unwrap(), ThreadState::Leader);
//! ```

mod capability;
mod config;
mod executor;
mod facade;
mod telemetry;
mod types;

pub use capability::*;
pub use config::*;
pub use executor::*;
pub use facade::*;
pub use telemetry::*;
pub use types::*;

pub use otci_protocol::{CommandError, LinePattern, OtciError, OtciResult};
