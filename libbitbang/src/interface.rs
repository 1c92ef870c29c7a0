use crate::pins::Pin;

#[cfg(feature = "ftdi")]
pub mod ftdi_gpio;
pub mod sim_gpio;

#[cfg(feature = "ftdi")]
pub use crate::interface::ftdi_gpio::FtdiGpio;
pub use crate::interface::sim_gpio::SimGpio;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
    InputOutput,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BundleDirection {
    In,
    Out,
}

/// Slots a bundle can hold, one per bit of a `u32` mask.
pub const MAX_BUNDLE_SLOTS: usize = 32;

/// Line controller primitives of a GPIO bank.
///
/// A bundle is a group of pins that is read or written in a single
/// operation. Bit `n` of a bundle mask or value is slot `n` of the array the
/// bundle was created from; `None` slots are inert.
pub trait GpioInterface {
    type Bundle;
    type Error: std::error::Error + Send + Sync + 'static;

    fn is_valid_pin(&self, pin: Pin) -> bool;
    fn is_valid_output_pin(&self, pin: Pin) -> bool;

    fn set_direction(&mut self, pin: Pin, direction: Direction) -> Result<(), Self::Error>;
    fn set_level(&mut self, pin: Pin, level: bool) -> Result<(), Self::Error>;
    fn get_level(&mut self, pin: Pin) -> Result<bool, Self::Error>;

    fn new_bundle(
        &mut self,
        pins: &[Option<Pin>],
        direction: BundleDirection,
    ) -> Result<Self::Bundle, Self::Error>;
    /// Only slots below [`MAX_BUNDLE_SLOTS`] exist.
    fn bundle_write(&mut self, bundle: &Self::Bundle, mask: u32, value: u32)
        -> Result<(), Self::Error>;
    fn bundle_read(&mut self, bundle: &Self::Bundle) -> Result<u32, Self::Error>;
    fn delete_bundle(&mut self, bundle: Self::Bundle) -> Result<(), Self::Error>;

    fn set_high(&mut self, pin: Pin) -> Result<(), Self::Error> {
        self.set_level(pin, true)
    }
    fn set_low(&mut self, pin: Pin) -> Result<(), Self::Error> {
        self.set_level(pin, false)
    }
}
