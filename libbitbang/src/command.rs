//! Textual pin configuration.
//!
//! Each command takes either no argument, which only reports the current
//! assignment, or exactly one number per pin it sets. A negative number
//! leaves the role unassigned.

use crate::error::{Error, Result};
use crate::pins::{DisplayPin, Pin, PinConfig, PinRole};

pub struct Command {
    pub name: &'static str,
    pub help: &'static str,
    pub usage: &'static str,
    roles: &'static [PinRole],
}

pub const COMMANDS: &[Command] = &[
    Command {
        name: "gpio_jtag_nums",
        help: "gpio numbers for tck, tms, tdi, tdo. (in that order)",
        usage: "[tck tms tdi tdo]",
        roles: &[PinRole::Tck, PinRole::Tms, PinRole::Tdi, PinRole::Tdo],
    },
    Command {
        name: "gpio_tck_num",
        help: "gpio number for tck.",
        usage: "[tck]",
        roles: &[PinRole::Tck],
    },
    Command {
        name: "gpio_tms_num",
        help: "gpio number for tms.",
        usage: "[tms]",
        roles: &[PinRole::Tms],
    },
    Command {
        name: "gpio_tdo_num",
        help: "gpio number for tdo.",
        usage: "[tdo]",
        roles: &[PinRole::Tdo],
    },
    Command {
        name: "gpio_tdi_num",
        help: "gpio number for tdi.",
        usage: "[tdi]",
        roles: &[PinRole::Tdi],
    },
    Command {
        name: "gpio_srst_num",
        help: "gpio number for srst.",
        usage: "[srst]",
        roles: &[PinRole::Srst],
    },
    Command {
        name: "gpio_trst_num",
        help: "gpio number for trst.",
        usage: "[trst]",
        roles: &[PinRole::Trst],
    },
    Command {
        name: "gpio_blink_num",
        help: "gpio number for blink.",
        usage: "[blink]",
        roles: &[PinRole::Blink],
    },
    Command {
        name: "gpio_swd_nums",
        help: "gpio numbers for swclk, swdio. (in that order)",
        usage: "[swclk swdio]",
        roles: &[PinRole::Swclk, PinRole::Swdio],
    },
    Command {
        name: "gpio_swclk_num",
        help: "gpio number for swclk.",
        usage: "[swclk]",
        roles: &[PinRole::Swclk],
    },
    Command {
        name: "gpio_swdio_num",
        help: "gpio number for swdio.",
        usage: "[swdio]",
        roles: &[PinRole::Swdio],
    },
];

pub fn find(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|c| c.name == name)
}

/// One line per command: name, usage and help.
pub fn help() -> String {
    COMMANDS
        .iter()
        .map(|c| format!("{} {}\n    {}", c.name, c.usage, c.help))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Splits a script line into command name and arguments. Blank lines and
/// `#` comments give `None`.
pub fn split(line: &str) -> Option<(&str, Vec<&str>)> {
    let line = match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    };
    let mut words = line.split_whitespace();
    let name = words.next()?;
    Some((name, words.collect()))
}

/// Runs one script line against `pins`. While `locked`, setters are refused
/// and only queries run.
pub fn execute(pins: &mut PinConfig, line: &str, locked: bool) -> Result<Option<String>> {
    let (name, args) = match split(line) {
        Some(parts) => parts,
        None => return Ok(None),
    };
    let command = find(name).ok_or_else(|| Error::UnknownCommand(name.to_string()))?;
    if locked && !command.is_query(&args) {
        return Err(Error::InvalidState("pins cannot change while the session is active"));
    }
    command.run(pins, &args).map(Some)
}

impl Command {
    pub fn is_query(&self, args: &[&str]) -> bool {
        args.is_empty()
    }

    /// Applies `args` and returns the confirmation line. Nothing is
    /// assigned unless every argument parses.
    pub fn run(&self, pins: &mut PinConfig, args: &[&str]) -> Result<String> {
        if !self.is_query(args) {
            if args.len() != self.roles.len() {
                return Err(Error::Usage {
                    command: self.name,
                    usage: self.usage,
                });
            }
            let parsed = args
                .iter()
                .map(|arg| parse_pin(self.name, arg))
                .collect::<Result<Vec<_>>>()?;
            for (role, pin) in self.roles.iter().zip(parsed) {
                pins.assign(*role, pin);
            }
        }
        Ok(self.report(pins))
    }

    fn report(&self, pins: &PinConfig) -> String {
        let fields = self
            .roles
            .iter()
            .map(|role| format!("{} = {}", role, DisplayPin(pins.get(*role))))
            .collect::<Vec<_>>()
            .join(", ");
        format!("gpio config: {}", fields)
    }
}

fn parse_pin(command: &'static str, arg: &str) -> Result<Option<Pin>> {
    let invalid = || Error::InvalidNumber {
        command,
        arg: arg.to_string(),
    };
    let (negative, digits) = match arg.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, arg),
    };
    let value = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => digits.parse::<u64>(),
    }
    .map_err(|_| invalid())?;

    if negative {
        return Ok(None);
    }
    if value > Pin::MAX as u64 {
        return Err(invalid());
    }
    Ok(Some(value as Pin))
}
