//! Checks run at activation to decide which transports the wiring allows.

use crate::interface::GpioInterface;
use crate::pins::{Pin, PinConfig};

fn valid<G: GpioInterface>(gpio: &G, pin: Option<Pin>) -> bool {
    pin.map_or(false, |p| gpio.is_valid_pin(p))
}

fn valid_output<G: GpioInterface>(gpio: &G, pin: Option<Pin>) -> bool {
    pin.map_or(false, |p| gpio.is_valid_output_pin(p))
}

/// TCK, TMS and TDO must be output capable, TDI only has to exist.
pub fn jtag_possible<G: GpioInterface>(gpio: &G, pins: &PinConfig) -> bool {
    valid_output(gpio, pins.tck)
        && valid_output(gpio, pins.tms)
        && valid(gpio, pins.tdi)
        && valid_output(gpio, pins.tdo)
}

/// SWDIO switches direction at runtime, so only existence is checked.
pub fn swd_possible<G: GpioInterface>(gpio: &G, pins: &PinConfig) -> bool {
    valid(gpio, pins.swclk) && valid(gpio, pins.swdio)
}

/// Optional lines (resets, indicator) have to be output capable when assigned.
pub fn optional_outputs_valid<G: GpioInterface>(gpio: &G, pins: &[Option<Pin>]) -> bool {
    pins.iter()
        .all(|pin| pin.map_or(true, |p| gpio.is_valid_output_pin(p)))
}
