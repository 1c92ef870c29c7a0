use log::debug;

use super::{float_lines, Delay, Signaler};
use crate::error::{Error, Result};
use crate::interface::{Direction, GpioInterface};
use crate::pins::{Pin, PinConfig, Transport};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwdSignaler {
    swclk: Pin,
    swdio: Pin,
    blink: Option<Pin>,
}

impl SwdSignaler {
    /// Drives SWCLK and SWDIO low and turns both into outputs. The indicator,
    /// when wired, starts off.
    pub fn activate<G: GpioInterface>(gpio: &mut G, pins: &PinConfig) -> Result<Self> {
        let (swclk, swdio) = match (pins.swclk, pins.swdio) {
            (Some(swclk), Some(swdio)) => (swclk, swdio),
            _ => return Err(Error::Configuration(Transport::Swd)),
        };

        let mut touched = Vec::new();
        let res = Self::configure(gpio, [swclk, swdio], pins.blink, &mut touched);
        if res.is_err() {
            float_lines(gpio, &touched);
        }
        res?;
        debug!("swd lines ready: swclk = {}, swdio = {}", swclk, swdio);

        Ok(SwdSignaler {
            swclk,
            swdio,
            blink: pins.blink,
        })
    }

    fn configure<G: GpioInterface>(
        gpio: &mut G,
        [swclk, swdio]: [Pin; 2],
        blink: Option<Pin>,
        touched: &mut Vec<Pin>,
    ) -> Result<()> {
        for pin in [swdio, swclk] {
            gpio.set_low(pin).map_err(Error::gpio)?;
            touched.push(pin);
        }
        for pin in [swdio, swclk] {
            gpio.set_direction(pin, Direction::Output)
                .map_err(Error::gpio)?;
        }
        if let Some(pin) = blink {
            gpio.set_low(pin).map_err(Error::gpio)?;
            touched.push(pin);
            gpio.set_direction(pin, Direction::Output)
                .map_err(Error::gpio)?;
        }
        Ok(())
    }

    /// SWCLK is always set before SWDIO.
    pub fn write<G: GpioInterface, D: Delay>(
        &self,
        gpio: &mut G,
        swclk: bool,
        swdio: bool,
        delay: &mut D,
        cycles: u32,
    ) -> Result<()> {
        gpio.set_level(self.swclk, swclk).map_err(Error::gpio)?;
        gpio.set_level(self.swdio, swdio).map_err(Error::gpio)?;
        delay.spin(cycles);
        Ok(())
    }

    /// Turnaround of the shared data line. The caller owns the sequencing.
    pub fn drive<G: GpioInterface>(&self, gpio: &mut G, is_output: bool) -> Result<()> {
        let direction = if is_output {
            Direction::Output
        } else {
            Direction::Input
        };
        gpio.set_direction(self.swdio, direction)
            .map_err(Error::gpio)
    }

    pub fn read<G: GpioInterface>(&self, gpio: &mut G) -> Result<bool> {
        gpio.get_level(self.swdio).map_err(Error::gpio)
    }
}

impl<G: GpioInterface> Signaler<G> for SwdSignaler {
    fn blink(&self, gpio: &mut G, on: bool) -> Result<()> {
        match self.blink {
            Some(pin) => gpio.set_level(pin, on).map_err(Error::gpio),
            None => Ok(()),
        }
    }

    fn release(self, _gpio: &mut G) -> Result<()> {
        Ok(())
    }
}
