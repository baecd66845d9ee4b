//! Arduino-controlled heating stage driver
//!
//! Protocol Overview:
//! - Format: `>{verb} {args}\n` (ASCII), answered by the ack/success
//!   handshake described in [`crate::protocol`]
//! - Verbs: `set Ts` (setpoint), `set T` (ramp to target and wait),
//!   `pidon`, `pidoff`, `pr pid`, `pr T`
//! - Queries answer with a `key=value` payload: `success pid=ON`,
//!   `success T=26.3`
//!
//! Ramping to a target temperature can take minutes, so [`HeatingStage::set_temp`]
//! waits for completion with a separate, long `heating_timeout`.
//!
//! # Example Usage
//!
//! ```no_run
//! use lab_commands::instrument::{Device, HeatingStage};
//!
//! let mut stage = HeatingStage::on_port("hs1", "/dev/ttyACM0", 9600);
//! stage.connect()?;
//! stage.initialize()?;
//! stage.set_temp(60.0)?;
//! println!("Temperature: {:.1} C", stage.temperature()?);
//! # Ok::<(), lab_commands::error::DeviceError>(())
//! ```

use super::{Device, SerialDevice};
use crate::adapters::{SerialPortTransport, SerialTransport};
use crate::config::HeatingStageConfig;
use crate::error::{DeviceError, DeviceResult};
use crate::protocol::{format_number, parse_equal_sign};
use std::time::Duration;
use tracing::{info, warn};

/// Default completion timeout for ramping to a target temperature.
pub const DEFAULT_HEATING_TIMEOUT: Duration = Duration::from_secs(600);

/// Setpoint written during initialization, in C.
const INIT_SETPOINT: f64 = 26.0;
/// Setpoint written during deinitialization, in C.
const DEINIT_SETPOINT: f64 = 24.0;

/// Driver for a PID-controlled heating stage behind an Arduino.
#[derive(Debug)]
pub struct HeatingStage {
    serial: SerialDevice,
    heating_timeout: Duration,
}

impl HeatingStage {
    /// Create a heating stage on an arbitrary transport with default timeouts.
    pub fn new(name: &str, transport: Box<dyn SerialTransport>) -> Self {
        Self {
            serial: SerialDevice::new(name, transport),
            heating_timeout: DEFAULT_HEATING_TIMEOUT,
        }
    }

    /// Create a heating stage on a (not yet opened) serial port.
    ///
    /// # Arguments
    /// * `name` - Unique device name
    /// * `port` - Serial port path (e.g., "/dev/ttyACM0" on Linux, "COM3" on Windows)
    /// * `baud_rate` - Communication speed
    pub fn on_port(name: &str, port: &str, baud_rate: u32) -> Self {
        Self::new(name, Box::new(SerialPortTransport::new(port, baud_rate)))
    }

    /// Create a heating stage from its configuration entry.
    pub fn from_config(config: &HeatingStageConfig) -> Self {
        Self::on_port(&config.name, &config.port, config.baud_rate)
            .with_timeout(config.timeout)
            .with_heating_timeout(config.heating_timeout)
    }

    /// Set the generic acknowledgment / quick-operation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.serial.set_timeout(timeout);
        self
    }

    /// Set the completion timeout used when ramping to a target.
    pub fn with_heating_timeout(mut self, heating_timeout: Duration) -> Self {
        self.heating_timeout = heating_timeout;
        self
    }

    /// Completion timeout used when ramping to a target.
    pub fn heating_timeout(&self) -> Duration {
        self.heating_timeout
    }

    /// Generic timeout.
    pub fn timeout(&self) -> Duration {
        self.serial.timeout()
    }

    fn ensure_ready(&self) -> DeviceResult<()> {
        self.serial.ensure_open()?;
        if !self.serial.is_initialized() {
            return Err(DeviceError::NotInitialized(Self::KIND));
        }
        Ok(())
    }

    /// Write the PID setpoint without waiting for the stage to reach it.
    pub fn set_settemp(&mut self, temp: f64) -> DeviceResult<String> {
        self.ensure_ready()?;
        self.serial
            .confirm(&format!(">set Ts {}", format_number(temp)))
    }

    /// Ramp to `temp` and block until the stage reports it was reached.
    pub fn set_temp(&mut self, temp: f64) -> DeviceResult<String> {
        self.ensure_ready()?;
        let ack_timeout = self.serial.timeout();
        self.serial.confirm_with(
            &format!(">set T {}", format_number(temp)),
            ack_timeout,
            self.heating_timeout,
        )
    }

    /// Enable the PID loop.
    pub fn pid_on(&mut self) -> DeviceResult<String> {
        self.ensure_ready()?;
        self.serial.confirm(">pidon")
    }

    /// Disable the PID loop. Permitted in any state so heating can always be
    /// shut off.
    pub fn pid_off(&mut self) -> DeviceResult<String> {
        self.serial.ensure_open()?;
        self.serial.confirm(">pidoff")
    }

    /// Query whether the PID loop is enabled.
    pub fn is_pid_on(&mut self) -> DeviceResult<bool> {
        self.serial.ensure_open()?;
        let payload = self.serial.confirm(">pr pid")?;
        let state = parse_equal_sign(&payload).ok_or(DeviceError::MissingField {
            field: "PID state",
        })?;
        Ok(state.eq_ignore_ascii_case("ON"))
    }

    /// Query the current stage temperature in C.
    pub fn temperature(&mut self) -> DeviceResult<f64> {
        self.serial.ensure_open()?;
        let payload = self.serial.confirm(">pr T")?;
        let value = parse_equal_sign(&payload).ok_or(DeviceError::MissingField {
            field: "temperature",
        })?;
        value.parse::<f64>().map_err(|_| DeviceError::InvalidField {
            field: "temperature",
            value: value.to_string(),
        })
    }

    /// Write a fixed setpoint, then run `second` with the flag forced on.
    ///
    /// Any failure rolls the flag back to false.
    fn setpoint_then<F>(&mut self, setpoint: f64, second: F) -> DeviceResult<()>
    where
        F: FnOnce(&mut Self) -> DeviceResult<String>,
    {
        self.serial.set_initialized(true);
        let result = self.set_settemp(setpoint).and_then(|_| second(self));
        if let Err(e) = result {
            self.serial.set_initialized(false);
            warn!(device = %self.serial.name(), error = %e, "setup sequence aborted");
            return Err(e);
        }
        Ok(())
    }

    /// Set the stage to 24 C and turn the PID loop off.
    ///
    /// With `reset_init_flag == false` the stage stays flagged as initialized
    /// after a successful teardown, for callers that keep issuing commands
    /// to a stage they consider parked. On failure the flag is always cleared.
    pub fn deinitialize_with(&mut self, reset_init_flag: bool) -> DeviceResult<String> {
        self.setpoint_then(DEINIT_SETPOINT, Self::pid_off)?;
        if reset_init_flag {
            self.serial.set_initialized(false);
        }
        info!(device = %self.serial.name(), reset_init_flag, "heating stage deinitialized");
        Ok(
            "Heating stage successfully deinitialized by setting to 24 C and turning PID OFF."
                .to_string(),
        )
    }
}

impl Device for HeatingStage {
    const KIND: &'static str = "Heating stage";

    fn serial(&self) -> &SerialDevice {
        &self.serial
    }

    fn serial_mut(&mut self) -> &mut SerialDevice {
        &mut self.serial
    }

    /// Set the stage to 26 C and turn the PID loop on.
    fn initialize(&mut self) -> DeviceResult<String> {
        self.setpoint_then(INIT_SETPOINT, Self::pid_on)?;
        info!(device = %self.serial.name(), "heating stage initialized");
        Ok("Heating stage successfully initialized by setting to 26 C and turning PID ON.".to_string())
    }

    fn deinitialize(&mut self) -> DeviceResult<String> {
        self.deinitialize_with(true)
    }
}
