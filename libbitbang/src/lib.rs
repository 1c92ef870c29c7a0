//! Bit-level JTAG/SWD signal driver on top of plain GPIO lines.
//!
//! The host's queue executor decides which bits to shift; this crate turns
//! every single clock edge into pin writes and reads. A [`session::Session`]
//! owns the pin assignment, the GPIO backend and the delay strategy, and
//! exposes the edge primitives once a transport has been activated.

pub mod command;
pub mod engine;
pub mod error;
pub mod feasibility;
pub mod interface;
pub mod pins;
pub mod session;

pub use crate::error::{Error, Result};
pub use crate::pins::{Pin, PinConfig, PinRole, Transport};
pub use crate::session::Session;
