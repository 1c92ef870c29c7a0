use bitflags::bitflags;
use log::{debug, warn};

use super::{float_lines, Delay, Signaler};
use crate::error::{Error, Result};
use crate::interface::{BundleDirection, Direction, GpioInterface};
use crate::pins::{Pin, PinConfig, Transport};

bitflags! {
    /// Slots of the output bundle.
    #[derive(Default)]
    pub struct OutSlot: u32 {
        const TCK = 1 << 0;
        const TDI = 1 << 1;
        const TMS = 1 << 2;
        const TRST = 1 << 3;
        const SRST = 1 << 4;
        const BLINK = 1 << 5;
    }
}

bitflags! {
    /// Slots of the input bundle.
    #[derive(Default)]
    pub struct InSlot: u32 {
        const TDO = 1 << 0;
    }
}

pub struct JtagSignaler<G: GpioInterface> {
    out: G::Bundle,
    input: G::Bundle,
    wired: OutSlot,
}

impl<G: GpioInterface> JtagSignaler<G> {
    /// Puts the JTAG lines in their idle state and groups them into bundles.
    ///
    /// Levels are written before the direction is switched to output so the
    /// target never sees a glitch. TMS idles high, TCK and TDI low, both reset
    /// lines high (deasserted) and the indicator low.
    pub fn activate(gpio: &mut G, pins: &PinConfig) -> Result<Self> {
        let (tck, tms, tdi, tdo) = match (pins.tck, pins.tms, pins.tdi, pins.tdo) {
            (Some(tck), Some(tms), Some(tdi), Some(tdo)) => (tck, tms, tdi, tdo),
            _ => return Err(Error::Configuration(Transport::Jtag)),
        };

        let mut touched = Vec::new();
        let res = Self::configure(gpio, pins, [tck, tms, tdi, tdo], &mut touched);
        if res.is_err() {
            float_lines(gpio, &touched);
        }
        res
    }

    fn configure(
        gpio: &mut G,
        pins: &PinConfig,
        [tck, tms, tdi, tdo]: [Pin; 4],
        touched: &mut Vec<Pin>,
    ) -> Result<Self> {
        for (pin, level) in [(tdi, false), (tck, false), (tms, true)] {
            gpio.set_level(pin, level).map_err(Error::gpio)?;
            touched.push(pin);
        }
        gpio.set_direction(tdo, Direction::Input)
            .map_err(Error::gpio)?;
        for pin in [tdi, tck, tms] {
            gpio.set_direction(pin, Direction::Output)
                .map_err(Error::gpio)?;
        }

        let mut wired = OutSlot::TCK | OutSlot::TDI | OutSlot::TMS;
        let extras = [
            (pins.trst, OutSlot::TRST, true),
            (pins.srst, OutSlot::SRST, true),
            (pins.blink, OutSlot::BLINK, false),
        ];
        for (pin, slot, idle) in extras {
            if let Some(pin) = pin {
                gpio.set_level(pin, idle).map_err(Error::gpio)?;
                touched.push(pin);
                gpio.set_direction(pin, Direction::Output)
                    .map_err(Error::gpio)?;
                wired |= slot;
            }
        }

        let out_pins = [
            Some(tck),
            Some(tdi),
            Some(tms),
            pins.trst,
            pins.srst,
            pins.blink,
        ];
        let out = gpio
            .new_bundle(&out_pins, BundleDirection::Out)
            .map_err(Error::gpio)?;
        let input = match gpio.new_bundle(&[Some(tdo)], BundleDirection::In) {
            Ok(bundle) => bundle,
            Err(e) => {
                if let Err(cleanup) = gpio.delete_bundle(out) {
                    warn!("releasing JTAG output bundle: {}", cleanup);
                }
                return Err(Error::gpio(e));
            }
        };
        debug!("jtag bundles ready, wired slots {:?}", wired);

        Ok(JtagSignaler { out, input, wired })
    }

    pub fn wired(&self) -> OutSlot {
        self.wired
    }

    /// One edge: TCK, TMS and TDI land in a single bundle write.
    pub fn write<D: Delay>(
        &self,
        gpio: &mut G,
        tck: bool,
        tms: bool,
        tdi: bool,
        delay: &mut D,
        cycles: u32,
    ) -> Result<()> {
        let mut value = OutSlot::empty();
        value.set(OutSlot::TCK, tck);
        value.set(OutSlot::TMS, tms);
        value.set(OutSlot::TDI, tdi);
        let mask = OutSlot::TCK | OutSlot::TMS | OutSlot::TDI;
        gpio.bundle_write(&self.out, mask.bits(), value.bits())
            .map_err(Error::gpio)?;
        delay.spin(cycles);
        Ok(())
    }

    /// Samples TDO. No settle delay, the caller times it against its edge.
    pub fn read(&self, gpio: &mut G) -> Result<bool> {
        let value = gpio.bundle_read(&self.input).map_err(Error::gpio)?;
        Ok(InSlot::from_bits_truncate(value).contains(InSlot::TDO))
    }

    /// Writes the reset lines that are wired; the others are left alone.
    pub fn reset(&self, gpio: &mut G, trst: bool, srst: bool) -> Result<()> {
        let mask = self.wired & (OutSlot::TRST | OutSlot::SRST);
        if mask.is_empty() {
            return Ok(());
        }
        let mut value = OutSlot::empty();
        value.set(OutSlot::TRST, trst);
        value.set(OutSlot::SRST, srst);
        gpio.bundle_write(&self.out, mask.bits(), (value & mask).bits())
            .map_err(Error::gpio)
    }
}

impl<G: GpioInterface> Signaler<G> for JtagSignaler<G> {
    fn blink(&self, gpio: &mut G, on: bool) -> Result<()> {
        if !self.wired.contains(OutSlot::BLINK) {
            return Ok(());
        }
        let value = if on { OutSlot::BLINK } else { OutSlot::empty() };
        gpio.bundle_write(&self.out, OutSlot::BLINK.bits(), value.bits())
            .map_err(Error::gpio)
    }

    fn release(self, gpio: &mut G) -> Result<()> {
        let out = gpio.delete_bundle(self.out).map_err(Error::gpio);
        let input = gpio.delete_bundle(self.input).map_err(Error::gpio);
        out.and(input)
    }
}
