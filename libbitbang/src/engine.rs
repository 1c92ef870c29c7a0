//! Per-edge signalling for the two transports.
//!
//! [`JtagSignaler`] drives the JTAG lines through one output bundle and samples
//! TDO through one input bundle. [`SwdSignaler`] sets SWCLK and SWDIO one pin
//! at a time, since SWDIO changes direction during a transfer.

use log::warn;

use crate::error::Result;
use crate::interface::{Direction, GpioInterface};
use crate::pins::Pin;

pub mod delay;
pub mod jtag;
pub mod swd;

pub use crate::engine::delay::{BusyWait, CountingDelay, Delay};
pub use crate::engine::jtag::JtagSignaler;
pub use crate::engine::swd::SwdSignaler;

/// Operations both transports provide.
pub trait Signaler<G: GpioInterface> {
    /// Drive the activity indicator. Does nothing when no indicator is wired.
    fn blink(&self, gpio: &mut G, on: bool) -> Result<()>;
    /// Give back whatever the signaler holds on `gpio`.
    fn release(self, gpio: &mut G) -> Result<()>;
}

/// Turns lines touched by a failed activation back into inputs, last first.
pub(crate) fn float_lines<G: GpioInterface>(gpio: &mut G, pins: &[Pin]) {
    for pin in pins.iter().rev() {
        if let Err(e) = gpio.set_direction(*pin, Direction::Input) {
            warn!("floating gpio {}: {}", pin, e);
        }
    }
}
