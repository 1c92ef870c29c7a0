use core::fmt;

/// Physical GPIO number.
pub type Pin = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PinRole {
    Tck,
    Tms,
    Tdi,
    Tdo,
    Trst,
    Srst,
    Blink,
    Swclk,
    Swdio,
}

impl PinRole {
    pub const ALL: [PinRole; 9] = [
        PinRole::Tck,
        PinRole::Tms,
        PinRole::Tdi,
        PinRole::Tdo,
        PinRole::Trst,
        PinRole::Srst,
        PinRole::Blink,
        PinRole::Swclk,
        PinRole::Swdio,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PinRole::Tck => "tck",
            PinRole::Tms => "tms",
            PinRole::Tdi => "tdi",
            PinRole::Tdo => "tdo",
            PinRole::Trst => "trst",
            PinRole::Srst => "srst",
            PinRole::Blink => "blink",
            PinRole::Swclk => "swclk",
            PinRole::Swdio => "swdio",
        }
    }
}

impl fmt::Display for PinRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Logical to physical pin assignment. `None` means "not connected".
///
/// Nothing is validated here, and two roles may share a pin; the checks in
/// [`crate::feasibility`] run at activation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PinConfig {
    pub tck: Option<Pin>,
    pub tms: Option<Pin>,
    pub tdi: Option<Pin>,
    pub tdo: Option<Pin>,
    pub trst: Option<Pin>,
    pub srst: Option<Pin>,
    pub blink: Option<Pin>,
    pub swclk: Option<Pin>,
    pub swdio: Option<Pin>,
}

impl PinConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, role: PinRole, pin: Option<Pin>) {
        *self.slot_mut(role) = pin;
    }

    pub fn get(&self, role: PinRole) -> Option<Pin> {
        match role {
            PinRole::Tck => self.tck,
            PinRole::Tms => self.tms,
            PinRole::Tdi => self.tdi,
            PinRole::Tdo => self.tdo,
            PinRole::Trst => self.trst,
            PinRole::Srst => self.srst,
            PinRole::Blink => self.blink,
            PinRole::Swclk => self.swclk,
            PinRole::Swdio => self.swdio,
        }
    }

    fn slot_mut(&mut self, role: PinRole) -> &mut Option<Pin> {
        match role {
            PinRole::Tck => &mut self.tck,
            PinRole::Tms => &mut self.tms,
            PinRole::Tdi => &mut self.tdi,
            PinRole::Tdo => &mut self.tdo,
            PinRole::Trst => &mut self.trst,
            PinRole::Srst => &mut self.srst,
            PinRole::Blink => &mut self.blink,
            PinRole::Swclk => &mut self.swclk,
            PinRole::Swdio => &mut self.swdio,
        }
    }
}

/// Formats an assignment the way the configuration commands print it.
pub struct DisplayPin(pub Option<Pin>);

impl fmt::Display for DisplayPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(pin) => write!(f, "{}", pin),
            None => f.write_str("-1"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    None,
    Jtag,
    Swd,
    Both,
}

impl Transport {
    pub fn from_parts(jtag: bool, swd: bool) -> Self {
        match (jtag, swd) {
            (false, false) => Transport::None,
            (true, false) => Transport::Jtag,
            (false, true) => Transport::Swd,
            (true, true) => Transport::Both,
        }
    }

    pub fn is_jtag(&self) -> bool {
        matches!(self, Transport::Jtag | Transport::Both)
    }

    pub fn is_swd(&self) -> bool {
        matches!(self, Transport::Swd | Transport::Both)
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Transport::None => "none",
            Transport::Jtag => "JTAG",
            Transport::Swd => "SWD",
            Transport::Both => "JTAG+SWD",
        })
    }
}
