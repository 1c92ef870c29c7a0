use anyhow::{Context, Result};
use log::{debug, info};
use safe_ftdi;

use super::{BundleDirection, Direction, GpioInterface, MAX_BUNDLE_SLOTS};
use crate::pins::Pin;

const PIN_COUNT: Pin = 8;

#[derive(Debug, thiserror::Error)]
#[error("ftdi: {0}")]
pub struct FtdiError(String);

fn ftdi_err<E: std::fmt::Display>(e: E) -> FtdiError {
    FtdiError(e.to_string())
}

#[derive(Debug)]
pub struct FtdiBundle {
    pins: Vec<Option<Pin>>,
}

impl FtdiBundle {
    fn to_port(&self, slots: u32) -> u8 {
        self.pins
            .iter()
            .enumerate()
            .filter_map(|(slot, pin)| pin.map(|p| (slot, p)))
            .filter(|(slot, _)| slots & (1 << slot) != 0)
            .fold(0, |acc, (_, pin)| acc | (1 << pin))
    }

    fn from_port(&self, port: u8) -> u32 {
        self.pins
            .iter()
            .enumerate()
            .filter_map(|(slot, pin)| pin.map(|p| (slot, p)))
            .filter(|(_, pin)| port & (1 << pin) != 0)
            .fold(0, |acc, (slot, _)| acc | (1 << slot))
    }
}

/// The eight ADBUS lines of an FTDI chip in synchronous bit-bang mode.
///
/// Every byte written is put on the port and answered by one byte of
/// sampled pin levels, so a single write or read is one transfer.
pub struct FtdiGpio {
    device: safe_ftdi::Context,
    outputs: u8,
    latch: u8,
}

impl FtdiGpio {
    pub fn open(vid: u16, pid: u16) -> Result<Self> {
        let mut device = safe_ftdi::Context::new().context("failed to create ftdi context")?;
        device
            .open(vid, pid)
            .with_context(|| format!("failed to open {:#04x}:{:#04x}", vid, pid))?;
        device
            .set_baudrate(10000)
            .context("failed to set baudrate")?;
        // every line starts as an input
        device
            .set_bitmode(0, safe_ftdi::mpsse::MpsseMode::BITMODE_SYNCBB)
            .context("failed to enter sync bit-bang mode")?;
        info!("opened ftdi {:#04x}:{:#04x}", vid, pid);

        Ok(FtdiGpio {
            device,
            outputs: 0,
            latch: 0,
        })
    }

    fn transfer(&mut self) -> Result<u8, FtdiError> {
        let mut sampled = [0u8; 1];
        self.device.write_data(&[self.latch]).map_err(ftdi_err)?;
        self.device.read_data(&mut sampled).map_err(ftdi_err)?;
        Ok(sampled[0])
    }
}

impl GpioInterface for FtdiGpio {
    type Bundle = FtdiBundle;
    type Error = FtdiError;

    fn is_valid_pin(&self, pin: Pin) -> bool {
        pin < PIN_COUNT
    }

    fn is_valid_output_pin(&self, pin: Pin) -> bool {
        pin < PIN_COUNT
    }

    fn set_direction(&mut self, pin: Pin, direction: Direction) -> Result<(), FtdiError> {
        if !self.is_valid_pin(pin) {
            return Err(FtdiError(format!("no such pin {}", pin)));
        }
        match direction {
            Direction::Input => self.outputs &= !(1 << pin),
            Direction::Output | Direction::InputOutput => self.outputs |= 1 << pin,
        }
        debug!("ftdi direction mask {:#010b}", self.outputs);
        self.device
            .set_bitmode(self.outputs, safe_ftdi::mpsse::MpsseMode::BITMODE_SYNCBB)
            .map_err(ftdi_err)?;
        Ok(())
    }

    fn set_level(&mut self, pin: Pin, level: bool) -> Result<(), FtdiError> {
        if !self.is_valid_pin(pin) {
            return Err(FtdiError(format!("no such pin {}", pin)));
        }
        if level {
            self.latch |= 1 << pin;
        } else {
            self.latch &= !(1 << pin);
        }
        self.transfer()?;
        Ok(())
    }

    fn get_level(&mut self, pin: Pin) -> Result<bool, FtdiError> {
        if !self.is_valid_pin(pin) {
            return Err(FtdiError(format!("no such pin {}", pin)));
        }
        Ok(self.transfer()? & (1 << pin) != 0)
    }

    fn new_bundle(
        &mut self,
        pins: &[Option<Pin>],
        _direction: BundleDirection,
    ) -> Result<FtdiBundle, FtdiError> {
        if pins.len() > MAX_BUNDLE_SLOTS {
            return Err(FtdiError(format!("bundle of {} slots", pins.len())));
        }
        if let Some(pin) = pins.iter().flatten().find(|p| !self.is_valid_pin(**p)) {
            return Err(FtdiError(format!("no such pin {}", pin)));
        }
        Ok(FtdiBundle {
            pins: pins.to_vec(),
        })
    }

    fn bundle_write(&mut self, bundle: &FtdiBundle, mask: u32, value: u32) -> Result<(), FtdiError> {
        let mask = bundle.to_port(mask);
        let value = bundle.to_port(value);
        self.latch = (self.latch & !mask) | (value & mask);
        self.transfer()?;
        Ok(())
    }

    fn bundle_read(&mut self, bundle: &FtdiBundle) -> Result<u32, FtdiError> {
        let port = self.transfer()?;
        Ok(bundle.from_port(port))
    }

    fn delete_bundle(&mut self, _bundle: FtdiBundle) -> Result<(), FtdiError> {
        Ok(())
    }
}
