use crate::pins::Transport;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Some pins required by the transport are unassigned or not usable.
    #[error("some {0} pins are not set")]
    Configuration(Transport),
    #[error("no transport selected")]
    NoTransport,
    #[error("wrong number of arguments to {command}, usage: {command} {usage}")]
    Usage {
        command: &'static str,
        usage: &'static str,
    },
    #[error("{command}: invalid pin number {arg:?}")]
    InvalidNumber { command: &'static str, arg: String },
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    /// Returned for 0 kHz, there is no adaptive (RCLK) clocking.
    #[error("RCLK not supported")]
    UnsupportedRate,
    #[error("{0}")]
    InvalidState(&'static str),
    #[error("gpio access failed")]
    Gpio(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub(crate) fn gpio<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Gpio(Box::new(e))
    }
}
