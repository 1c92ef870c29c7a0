use log::{debug, error, info, warn};
use rust_fsm::StateMachine;

use crate::command;
use crate::engine::{BusyWait, Delay, JtagSignaler, Signaler, SwdSignaler};
use crate::error::{Error, Result};
use crate::feasibility;
use crate::interface::GpioInterface;
use crate::pins::{PinConfig, Transport};

pub mod lifecycle;

pub use crate::session::lifecycle::{SessionInput, SessionLifecycle, SessionState};

/// Rate reported before the host asks for another one.
pub const DEFAULT_SPEED_KHZ: u32 = 5000;

/// One driver instance: pin assignment, GPIO backend and the signalers of
/// the active transports.
///
/// Pins can only be reassigned while the session is inactive. Calls are not
/// synchronised; the owner serialises them.
pub struct Session<G: GpioInterface, D: Delay = BusyWait> {
    gpio: G,
    delay: D,
    pins: PinConfig,
    delay_cycles: u32,
    speed_khz: u32,
    lifecycle: StateMachine<SessionLifecycle>,
    jtag: Option<JtagSignaler<G>>,
    swd: Option<SwdSignaler>,
}

fn active<T>(signaler: &Option<T>, transport: Transport) -> Result<&T> {
    signaler.as_ref().ok_or(match transport {
        Transport::Jtag => Error::InvalidState("JTAG is not active"),
        _ => Error::InvalidState("SWD is not active"),
    })
}

impl<G: GpioInterface> Session<G, BusyWait> {
    pub fn new(gpio: G, pins: PinConfig) -> Self {
        Session::with_delay(gpio, pins, BusyWait)
    }
}

impl<G: GpioInterface, D: Delay> Session<G, D> {
    pub fn with_delay(gpio: G, pins: PinConfig, delay: D) -> Self {
        Session {
            gpio,
            delay,
            pins,
            delay_cycles: 0,
            speed_khz: DEFAULT_SPEED_KHZ,
            lifecycle: StateMachine::new(),
            jtag: None,
            swd: None,
        }
    }

    /// Number of delay cycles spent after every edge.
    pub fn with_delay_cycles(mut self, cycles: u32) -> Self {
        self.delay_cycles = cycles;
        self
    }

    pub fn delay_cycles(&self) -> u32 {
        self.delay_cycles
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    pub fn gpio(&self) -> &G {
        &self.gpio
    }

    /// Direct access to the backend, e.g. for a test harness driving inputs.
    /// Writing the session's own pins through it while active breaks the
    /// edge primitives' assumptions.
    pub fn gpio_mut(&mut self) -> &mut G {
        &mut self.gpio
    }

    pub fn pins(&self) -> &PinConfig {
        &self.pins
    }

    pub fn pins_mut(&mut self) -> Result<&mut PinConfig> {
        if self.state() != SessionState::Inactive {
            return Err(Error::InvalidState("pins cannot change while the session is active"));
        }
        Ok(&mut self.pins)
    }

    /// Runs one configuration command. Queries are always allowed, setters
    /// only while inactive.
    pub fn execute(&mut self, line: &str) -> Result<Option<String>> {
        let locked = self.state() != SessionState::Inactive;
        command::execute(&mut self.pins, line, locked)
    }

    pub fn state(&self) -> SessionState {
        *self.lifecycle.state()
    }

    pub fn active_transport(&self) -> Transport {
        Transport::from_parts(self.jtag.is_some(), self.swd.is_some())
    }

    /// Brings up the requested transports.
    ///
    /// Each transport is checked and configured on its own. The returned
    /// value is the set that actually came up; only when none did is the
    /// session left inactive and the error returned.
    pub fn activate(&mut self, transport: Transport) -> Result<Transport> {
        if transport == Transport::None {
            return Err(Error::NoTransport);
        }
        self.lifecycle
            .consume(&SessionInput::Activate)
            .map_err(|_| Error::InvalidState("session is already active"))?;

        info!("GPIO JTAG/SWD bitbang driver");
        info!("requested transport: {}", transport);

        let mut failure = None;
        if transport.is_jtag() {
            match self.activate_jtag() {
                Ok(jtag) => self.jtag = Some(jtag),
                Err(e) => {
                    error!("{}", e);
                    failure = Some(e);
                }
            }
        }
        if transport.is_swd() {
            match self.activate_swd() {
                Ok(swd) => self.swd = Some(swd),
                Err(e) => {
                    error!("{}", e);
                    failure = Some(e);
                }
            }
        }

        let activated = self.active_transport();
        if activated == Transport::None {
            let _ = self.lifecycle.consume(&SessionInput::Failed);
            return Err(failure.unwrap_or(Error::Configuration(transport)));
        }
        self.lifecycle
            .consume(&SessionInput::Activated)
            .map_err(|_| Error::InvalidState("activation interrupted"))?;
        if activated != transport {
            warn!("only {} could be activated", activated);
        }
        info!("active transport: {}, {} kHz", activated, self.speed_khz);
        Ok(activated)
    }

    fn activate_jtag(&mut self) -> Result<JtagSignaler<G>> {
        let optional = [self.pins.trst, self.pins.srst, self.pins.blink];
        if !feasibility::jtag_possible(&self.gpio, &self.pins)
            || !feasibility::optional_outputs_valid(&self.gpio, &optional)
        {
            return Err(Error::Configuration(Transport::Jtag));
        }
        JtagSignaler::activate(&mut self.gpio, &self.pins)
    }

    fn activate_swd(&mut self) -> Result<SwdSignaler> {
        if !feasibility::swd_possible(&self.gpio, &self.pins)
            || !feasibility::optional_outputs_valid(&self.gpio, &[self.pins.blink])
        {
            return Err(Error::Configuration(Transport::Swd));
        }
        SwdSignaler::activate(&mut self.gpio, &self.pins)
    }

    /// Releases the bundles and returns to inactive. Never fails; release
    /// errors from the backend are logged.
    pub fn deactivate(&mut self) {
        if let Some(jtag) = self.jtag.take() {
            if let Err(e) = jtag.release(&mut self.gpio) {
                warn!("releasing JTAG bundles: {}", e);
            }
        }
        if let Some(swd) = self.swd.take() {
            if let Err(e) = Signaler::<G>::release(swd, &mut self.gpio) {
                warn!("releasing SWD lines: {}", e);
            }
        }
        if self.lifecycle.consume(&SessionInput::Deactivate).is_err() {
            warn!("deactivate in state {:?}", self.state());
        }
        debug!("session inactive");
    }

    /// JTAG edge: TCK, TMS and TDI in one write, then the settle delay.
    pub fn write(&mut self, tck: bool, tms: bool, tdi: bool) -> Result<()> {
        let jtag = active(&self.jtag, Transport::Jtag)?;
        jtag.write(&mut self.gpio, tck, tms, tdi, &mut self.delay, self.delay_cycles)
    }

    /// Samples TDO.
    pub fn read(&mut self) -> Result<bool> {
        let jtag = active(&self.jtag, Transport::Jtag)?;
        jtag.read(&mut self.gpio)
    }

    /// Drives the wired reset lines; unwired ones are skipped.
    pub fn reset(&mut self, trst: bool, srst: bool) -> Result<()> {
        let jtag = active(&self.jtag, Transport::Jtag)?;
        jtag.reset(&mut self.gpio, trst, srst)
    }

    /// Activity indicator. A no-op when no indicator is wired or nothing is
    /// active. With both transports up the SWD path drives it.
    pub fn blink(&mut self, on: bool) -> Result<()> {
        if let Some(swd) = &self.swd {
            return Signaler::<G>::blink(swd, &mut self.gpio, on);
        }
        if let Some(jtag) = &self.jtag {
            return jtag.blink(&mut self.gpio, on);
        }
        Ok(())
    }

    /// SWD edge: SWCLK then SWDIO, then the settle delay.
    pub fn swd_write(&mut self, swclk: bool, swdio: bool) -> Result<()> {
        let swd = active(&self.swd, Transport::Swd)?;
        swd.write(&mut self.gpio, swclk, swdio, &mut self.delay, self.delay_cycles)
    }

    pub fn swdio_drive(&mut self, is_output: bool) -> Result<()> {
        let swd = active(&self.swd, Transport::Swd)?;
        swd.drive(&mut self.gpio, is_output)
    }

    pub fn swdio_read(&mut self) -> Result<bool> {
        let swd = active(&self.swd, Transport::Swd)?;
        swd.read(&mut self.gpio)
    }

    /// Records the requested clock. The delay counter is not derived from
    /// it; see [`Session::with_delay_cycles`].
    pub fn set_rate(&mut self, khz: u32) -> Result<()> {
        if khz == 0 {
            debug!("RCLK not supported");
            return Err(Error::UnsupportedRate);
        }
        self.speed_khz = khz;
        Ok(())
    }

    pub fn rate(&self) -> u32 {
        self.speed_khz
    }
}

impl<G: GpioInterface, D: Delay> Drop for Session<G, D> {
    fn drop(&mut self) {
        if self.state() != SessionState::Inactive {
            self.deactivate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CountingDelay;
    use crate::interface::sim_gpio::{GpioEvent, SimGpio};
    use crate::interface::{BundleDirection, Direction};

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn jtag_pins() -> PinConfig {
        PinConfig {
            tck: Some(1),
            tms: Some(2),
            tdi: Some(3),
            tdo: Some(4),
            ..PinConfig::default()
        }
    }

    fn swd_pins() -> PinConfig {
        PinConfig {
            swclk: Some(12),
            swdio: Some(13),
            ..PinConfig::default()
        }
    }

    fn session(pins: PinConfig) -> Session<SimGpio, CountingDelay> {
        init();
        Session::with_delay(SimGpio::esp32(), pins, CountingDelay::default())
    }

    #[test]
    fn jtag_activation_idle_levels() {
        let mut s = session(jtag_pins());
        assert_eq!(Transport::Jtag, s.activate(Transport::Jtag).unwrap());
        assert_eq!(SessionState::Active, s.state());

        let gpio = s.gpio();
        assert_eq!(Some(true), gpio.level(2), "tms");
        assert_eq!(Some(false), gpio.level(1), "tck");
        assert_eq!(Some(false), gpio.level(3), "tdi");
        assert_eq!(Some(Direction::Input), gpio.direction(4), "tdo");
    }

    #[test]
    fn jtag_activation_fails_on_bad_pins() {
        let mut pins = jtag_pins();
        pins.tms = Some(35);
        let mut s = session(pins);
        match s.activate(Transport::Jtag) {
            Err(Error::Configuration(Transport::Jtag)) => (),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(SessionState::Inactive, s.state());
        assert!(s.gpio().events().is_empty(), "no pin may be touched");
    }

    #[test]
    fn jtag_activation_fails_on_bad_optional_pins() {
        let cases = [
            PinConfig { trst: Some(24), ..jtag_pins() },
            PinConfig { srst: Some(36), ..jtag_pins() },
            PinConfig { blink: Some(37), ..jtag_pins() },
        ];
        for pins in cases {
            let mut s = session(pins);
            match s.activate(Transport::Jtag) {
                Err(Error::Configuration(Transport::Jtag)) => (),
                other => panic!("{:?}: unexpected {:?}", pins, other),
            }
            assert_eq!(SessionState::Inactive, s.state());
            assert!(s.gpio().events().is_empty(), "{:?}: no pin may be touched", pins);
        }
    }

    #[test]
    fn swd_activation_fails_on_input_only_indicator() {
        let mut s = session(PinConfig { blink: Some(38), ..swd_pins() });
        match s.activate(Transport::Swd) {
            Err(Error::Configuration(Transport::Swd)) => (),
            other => panic!("unexpected {:?}", other),
        }
        assert!(s.gpio().events().is_empty());
    }

    #[test]
    fn failed_swd_activation_floats_swdio() {
        let mut s = session(PinConfig {
            swclk: Some(34),
            swdio: Some(13),
            ..PinConfig::default()
        });
        match s.activate(Transport::Swd) {
            Err(Error::Gpio(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(SessionState::Inactive, s.state());
        assert_eq!(Some(Direction::Input), s.gpio().direction(13));
    }

    #[test]
    fn both_requested_swd_fails_midway() {
        let mut s = session(PinConfig {
            swclk: Some(34),
            swdio: Some(13),
            ..jtag_pins()
        });
        assert_eq!(Transport::Jtag, s.activate(Transport::Both).unwrap());
        assert_eq!(Transport::Jtag, s.active_transport());
        assert_eq!(Some(Direction::Input), s.gpio().direction(13), "swdio left floating");
        assert_eq!(Some(Direction::Output), s.gpio().direction(1), "tck still driven");
    }

    #[test]
    fn write_then_read_independent() {
        let mut s = session(jtag_pins());
        s.activate(Transport::Jtag).unwrap();

        s.gpio_mut().drive(4, true);
        s.write(true, false, true).unwrap();
        assert!(s.read().unwrap());

        s.gpio_mut().drive(4, false);
        s.write(true, false, true).unwrap();
        assert!(!s.read().unwrap());

        assert_eq!(Some(true), s.gpio().level(1));
        assert_eq!(Some(true), s.gpio().level(3));
        assert_eq!(Some(false), s.gpio().level(2));
    }

    #[test]
    fn edges_spend_delay_cycles() {
        init();
        let pins = PinConfig {
            swclk: Some(12),
            swdio: Some(13),
            ..jtag_pins()
        };
        let mut s = Session::with_delay(SimGpio::esp32(), pins, CountingDelay::default())
            .with_delay_cycles(5);
        assert_eq!(Transport::Both, s.activate(Transport::Both).unwrap());

        s.write(false, true, false).unwrap();
        s.swd_write(true, false).unwrap();
        s.read().unwrap();
        s.swdio_read().unwrap();
        assert_eq!(CountingDelay { calls: 2, cycles: 10 }, *s.delay());
    }

    #[test]
    fn reset_only_target_wired() {
        let pins = PinConfig {
            trst: Some(5),
            ..jtag_pins()
        };
        let mut s = session(pins);
        s.activate(Transport::Jtag).unwrap();
        s.gpio_mut().clear_events();

        s.reset(false, true).unwrap();
        assert_eq!(&[GpioEvent::BundleWrite(vec![(5, false)])], s.gpio().events());
        assert_eq!(Some(false), s.gpio().level(5));
    }

    #[test]
    fn reset_both_wired() {
        let pins = PinConfig {
            trst: Some(5),
            srst: Some(6),
            ..jtag_pins()
        };
        let mut s = session(pins);
        s.activate(Transport::Jtag).unwrap();
        assert_eq!(Some(true), s.gpio().level(5));
        assert_eq!(Some(true), s.gpio().level(6));

        s.reset(true, false).unwrap();
        assert_eq!(Some(true), s.gpio().level(5));
        assert_eq!(Some(false), s.gpio().level(6));
    }

    #[test]
    fn blink_without_indicator() {
        let mut s = session(jtag_pins());
        s.blink(true).unwrap();
        s.activate(Transport::Jtag).unwrap();
        s.gpio_mut().clear_events();
        s.blink(true).unwrap();
        s.blink(false).unwrap();
        assert!(s.gpio().events().is_empty());
    }

    #[test]
    fn blink_with_indicator() {
        let pins = PinConfig {
            blink: Some(7),
            ..jtag_pins()
        };
        let mut s = session(pins);
        s.activate(Transport::Jtag).unwrap();
        for on in [true, false, true] {
            s.blink(on).unwrap();
            assert_eq!(Some(on), s.gpio().level(7));
        }
    }

    #[test]
    fn blink_routed_through_swd_when_both_active() {
        let pins = PinConfig {
            blink: Some(7),
            swclk: Some(12),
            swdio: Some(13),
            ..jtag_pins()
        };
        let mut s = session(pins);
        s.activate(Transport::Both).unwrap();
        s.gpio_mut().clear_events();
        s.blink(true).unwrap();
        assert_eq!(&[GpioEvent::SetLevel(7, true)], s.gpio().events());
    }

    #[test]
    fn swd_session() {
        let mut s = session(swd_pins());
        assert_eq!(Transport::Swd, s.activate(Transport::Swd).unwrap());

        s.gpio_mut().clear_events();
        s.swd_write(true, true).unwrap();
        assert_eq!(
            &[GpioEvent::SetLevel(12, true), GpioEvent::SetLevel(13, true)],
            s.gpio().events()
        );

        s.swdio_drive(false).unwrap();
        s.gpio_mut().drive(13, false);
        assert!(!s.swdio_read().unwrap());
        s.gpio_mut().drive(13, true);
        assert!(s.swdio_read().unwrap());

        match s.write(true, true, true) {
            Err(Error::InvalidState(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn both_requested_one_feasible() {
        let mut s = session(swd_pins());
        assert_eq!(Transport::Swd, s.activate(Transport::Both).unwrap());
        assert_eq!(SessionState::Active, s.state());
        assert_eq!(0, s.gpio().live_bundles());
    }

    #[test]
    fn both_requested_none_feasible() {
        let mut s = session(PinConfig::default());
        match s.activate(Transport::Both) {
            Err(Error::Configuration(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(SessionState::Inactive, s.state());
    }

    #[test]
    fn no_transport() {
        let mut s = session(jtag_pins());
        match s.activate(Transport::None) {
            Err(Error::NoTransport) => (),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(SessionState::Inactive, s.state());
    }

    #[test]
    fn double_activation_rejected() {
        let mut s = session(jtag_pins());
        s.activate(Transport::Jtag).unwrap();
        match s.activate(Transport::Jtag) {
            Err(Error::InvalidState(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
        let out_bundles = s
            .gpio()
            .events()
            .iter()
            .filter(|e| matches!(e, GpioEvent::NewBundle(BundleDirection::Out, _)))
            .count();
        assert_eq!(1, out_bundles);
        assert_eq!(SessionState::Active, s.state());
    }

    #[test]
    fn deactivate_releases_and_allows_reconfiguration() {
        let mut s = session(jtag_pins());
        s.activate(Transport::Jtag).unwrap();
        assert!(s.pins_mut().is_err());
        match s.execute("gpio_tck_num 9") {
            Err(Error::InvalidState(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            Some("gpio config: tck = 1".to_string()),
            s.execute("gpio_tck_num").unwrap()
        );

        s.deactivate();
        assert_eq!(SessionState::Inactive, s.state());
        assert_eq!(0, s.gpio().live_bundles());
        assert_eq!(Transport::None, s.active_transport());

        s.execute("gpio_tck_num 9").unwrap();
        assert_eq!(Some(9), s.pins().tck);
        s.deactivate();
    }

    #[test]
    fn rate() {
        let mut s = session(jtag_pins());
        assert_eq!(DEFAULT_SPEED_KHZ, s.rate());
        s.set_rate(1000).unwrap();
        assert_eq!(1000, s.rate());
        match s.set_rate(0) {
            Err(Error::UnsupportedRate) => (),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(1000, s.rate());
        assert_eq!(0, s.delay_cycles(), "rate does not change the delay");
    }

    #[test]
    fn edge_primitives_need_activation() {
        let mut s = session(jtag_pins());
        assert!(s.write(false, false, false).is_err());
        assert!(s.read().is_err());
        assert!(s.reset(false, false).is_err());
        assert!(s.swd_write(false, false).is_err());
        assert!(s.swdio_drive(true).is_err());
        assert!(s.swdio_read().is_err());
    }
}
