use thiserror::Error;

/// A register write that was not acknowledged by the hardware
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Register write not acknowledged (register {register}, value {value})")]
pub struct RegisterWriteError {
    pub register: u16,
    pub value: u16,
}

/// Capability for the single hardware register write the configuration
/// store has to confirm: dropping the EVSE out of always-active mode.
///
/// The store never talks to the Modbus transport itself; whoever owns the
/// control loop injects an implementation of this trait.
pub trait RegisterWriter {
    /// Write `value` to `register` and wait for the acknowledgement
    fn write_register(&mut self, register: u16, value: u16) -> Result<(), RegisterWriteError>;
}
