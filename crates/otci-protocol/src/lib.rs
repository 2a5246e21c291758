//! OpenThread CLI Protocol
//!
//! This crate provides the text-level pieces needed to talk to an OpenThread
//! device over its line-oriented CLI console: framing, command construction,
//! reply classification and decoders for the many reply shapes. It does no
//! I/O of its own.
//!
//! # Protocol Overview
//!
//! - **Commands** (host → device): one ASCII line terminated with `\r`
//! - **Replies** (device → host): zero or more payload lines, then `Done` or
//!   `Error <code>: <message>`
//! - **Exempt commands**: `reset` and `factoryreset` print no terminal line
//! - **Echo**: typed characters are echoed, possibly after a `> ` prompt
//!
//! # Reply Shapes
//!
//! - **Scalars**: one line holding a string, integer, flag word or address
//! - **Tables**: `| A | B |` header, `+---+---+` divider, rows
//! - **Record blocks**: unindented label followed by indented `key: value`
//! - **Flat blocks**: `Key: value` per line
//!
//! # Example
//!
//! ```rust
//! use otci_protocol::{classify_output, Table};
//!
//! let output = vec![
//!     "| ID | RLOC16 |".to_string(),
//!     "+----+--------+".to_string(),
//!     "| 21 | 0x5400 |".to_string(),
//!     "Done".to_string(),
//! ];
//! let payload = classify_output("router table", output, true).unwrap();
//! let table = Table::parse(&payload).unwrap();
//! assert_eq!(table.rows().next().unwrap().get("RLOC16").unwrap(), "0x5400");
//! ```

mod codec;
mod commands;
mod error;
mod fields;
pub mod hex;
mod matcher;
mod records;
mod responses;
mod scalar;
mod table;

pub use codec::*;
pub use commands::*;
pub use error::*;
pub use fields::*;
pub use matcher::*;
pub use records::*;
pub use responses::*;
pub use scalar::*;
pub use table::*;
