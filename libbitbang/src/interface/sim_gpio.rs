use log::trace;

use super::{BundleDirection, Direction, GpioInterface, MAX_BUNDLE_SLOTS};
use crate::pins::Pin;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SimError {
    #[error("gpio {0} does not exist")]
    InvalidPin(Pin),
    #[error("gpio {0} cannot drive an output")]
    NotOutputCapable(Pin),
    #[error("bundle {0} is not alive")]
    DeadBundle(usize),
    #[error("bundle {0} has the wrong direction")]
    WrongDirection(usize),
    #[error("bundle of {0} slots exceeds {}", MAX_BUNDLE_SLOTS)]
    TooManySlots(usize),
}

/// Everything the simulated bank was asked to do, in call order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GpioEvent {
    SetDirection(Pin, Direction),
    SetLevel(Pin, bool),
    GetLevel(Pin),
    NewBundle(BundleDirection, Vec<Option<Pin>>),
    /// Physical pins touched by one atomic write, with their new levels.
    BundleWrite(Vec<(Pin, bool)>),
    BundleRead(usize),
    DeleteBundle(usize),
}

#[derive(Clone, Copy, Debug, Default)]
struct SimPin {
    direction: Option<Direction>,
    latch: bool,
    external: bool,
}

#[derive(Debug)]
pub struct SimBundle {
    id: usize,
    direction: BundleDirection,
    pins: Vec<Option<Pin>>,
}

/// In-memory GPIO bank with a capability table and an event log.
#[derive(Debug)]
pub struct SimGpio {
    valid: u64,
    output: u64,
    pins: Vec<SimPin>,
    events: Vec<GpioEvent>,
    live_bundles: Vec<usize>,
    next_bundle: usize,
}

impl SimGpio {
    /// `pin_count` pins, all of them output capable. At most 64.
    pub fn new(pin_count: u32) -> Self {
        let pin_count = pin_count.min(64);
        let mask = if pin_count == 64 {
            u64::MAX
        } else {
            (1u64 << pin_count) - 1
        };
        SimGpio {
            valid: mask,
            output: mask,
            pins: vec![SimPin::default(); pin_count as usize],
            events: Vec::new(),
            live_bundles: Vec::new(),
            next_bundle: 0,
        }
    }

    /// ESP32 pad table: 0..=39 without 20, 24 and 28..=31; 34..=39 are input only.
    pub fn esp32() -> Self {
        let mut gpio = SimGpio::new(40);
        for pin in [20, 24, 28, 29, 30, 31] {
            gpio = gpio.without_pin(pin);
        }
        for pin in 34..40 {
            gpio = gpio.with_input_only(pin);
        }
        gpio
    }

    pub fn without_pin(mut self, pin: Pin) -> Self {
        if pin < 64 {
            self.valid &= !(1 << pin);
            self.output &= !(1 << pin);
        }
        self
    }

    pub fn with_input_only(mut self, pin: Pin) -> Self {
        if pin < 64 {
            self.output &= !(1 << pin);
        }
        self
    }

    /// Level driven onto `pin` from outside, seen while it is an input.
    pub fn drive(&mut self, pin: Pin, level: bool) {
        if let Some(p) = self.pins.get_mut(pin as usize) {
            p.external = level;
        }
    }

    /// Output latch of `pin`.
    pub fn level(&self, pin: Pin) -> Option<bool> {
        self.pins.get(pin as usize).map(|p| p.latch)
    }

    pub fn direction(&self, pin: Pin) -> Option<Direction> {
        self.pins.get(pin as usize).and_then(|p| p.direction)
    }

    pub fn events(&self) -> &[GpioEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn live_bundles(&self) -> usize {
        self.live_bundles.len()
    }

    fn pin_mut(&mut self, pin: Pin) -> Result<&mut SimPin, SimError> {
        if !self.is_valid_pin(pin) {
            return Err(SimError::InvalidPin(pin));
        }
        self.pins
            .get_mut(pin as usize)
            .ok_or(SimError::InvalidPin(pin))
    }

    fn sample(&self, pin: Pin) -> bool {
        match self.pins.get(pin as usize) {
            Some(p) => match p.direction {
                Some(Direction::Output) | Some(Direction::InputOutput) => p.latch,
                _ => p.external,
            },
            None => false,
        }
    }

    fn check_bundle(&self, bundle: &SimBundle, direction: BundleDirection) -> Result<(), SimError> {
        if !self.live_bundles.contains(&bundle.id) {
            return Err(SimError::DeadBundle(bundle.id));
        }
        if bundle.direction != direction {
            return Err(SimError::WrongDirection(bundle.id));
        }
        Ok(())
    }
}

impl GpioInterface for SimGpio {
    type Bundle = SimBundle;
    type Error = SimError;

    fn is_valid_pin(&self, pin: Pin) -> bool {
        pin < 64 && self.valid & (1 << pin) != 0
    }

    fn is_valid_output_pin(&self, pin: Pin) -> bool {
        pin < 64 && self.output & (1 << pin) != 0
    }

    fn set_direction(&mut self, pin: Pin, direction: Direction) -> Result<(), SimError> {
        if direction != Direction::Input && !self.is_valid_output_pin(pin) {
            return Err(SimError::NotOutputCapable(pin));
        }
        trace!("gpio {} direction {:?}", pin, direction);
        self.pin_mut(pin)?.direction = Some(direction);
        self.events.push(GpioEvent::SetDirection(pin, direction));
        Ok(())
    }

    fn set_level(&mut self, pin: Pin, level: bool) -> Result<(), SimError> {
        trace!("gpio {} level {}", pin, level as u8);
        self.pin_mut(pin)?.latch = level;
        self.events.push(GpioEvent::SetLevel(pin, level));
        Ok(())
    }

    fn get_level(&mut self, pin: Pin) -> Result<bool, SimError> {
        self.pin_mut(pin)?;
        self.events.push(GpioEvent::GetLevel(pin));
        Ok(self.sample(pin))
    }

    fn new_bundle(
        &mut self,
        pins: &[Option<Pin>],
        direction: BundleDirection,
    ) -> Result<SimBundle, SimError> {
        if pins.len() > MAX_BUNDLE_SLOTS {
            return Err(SimError::TooManySlots(pins.len()));
        }
        for pin in pins.iter().flatten() {
            if !self.is_valid_pin(*pin) {
                return Err(SimError::InvalidPin(*pin));
            }
        }
        let id = self.next_bundle;
        self.next_bundle += 1;
        self.live_bundles.push(id);
        self.events
            .push(GpioEvent::NewBundle(direction, pins.to_vec()));
        Ok(SimBundle {
            id,
            direction,
            pins: pins.to_vec(),
        })
    }

    fn bundle_write(&mut self, bundle: &SimBundle, mask: u32, value: u32) -> Result<(), SimError> {
        self.check_bundle(bundle, BundleDirection::Out)?;
        let mut written = Vec::new();
        for (slot, pin) in bundle.pins.iter().enumerate() {
            if let Some(pin) = pin {
                if mask & (1 << slot) != 0 {
                    let level = value & (1 << slot) != 0;
                    self.pin_mut(*pin)?.latch = level;
                    written.push((*pin, level));
                }
            }
        }
        trace!("bundle {} write {:?}", bundle.id, written);
        self.events.push(GpioEvent::BundleWrite(written));
        Ok(())
    }

    fn bundle_read(&mut self, bundle: &SimBundle) -> Result<u32, SimError> {
        self.check_bundle(bundle, BundleDirection::In)?;
        let value = bundle
            .pins
            .iter()
            .enumerate()
            .filter_map(|(slot, pin)| pin.map(|p| (slot, p)))
            .fold(0, |acc, (slot, pin)| {
                acc | ((self.sample(pin) as u32) << slot)
            });
        self.events.push(GpioEvent::BundleRead(bundle.id));
        Ok(value)
    }

    fn delete_bundle(&mut self, bundle: SimBundle) -> Result<(), SimError> {
        if !self.live_bundles.contains(&bundle.id) {
            return Err(SimError::DeadBundle(bundle.id));
        }
        self.live_bundles.retain(|id| *id != bundle.id);
        self.events.push(GpioEvent::DeleteBundle(bundle.id));
        Ok(())
    }
}
