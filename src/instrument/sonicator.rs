//! Arduino-controlled sonicator driver
//!
//! Unlike the heating stage, the sonicator firmware answers every request
//! with a single three-letter status code instead of the ack/success
//! handshake:
//!
//! | Code | Meaning                                         |
//! |------|-------------------------------------------------|
//! | SIW  | sonicating                                      |
//! | SNW  | not sonicating                                  |
//! | BIP  | button pressed                                  |
//! | PIO  | connected to the power supply                   |
//! | PNO  | not connected to the power supply               |
//! | SAN  | turned on, was already running                  |
//! | STN  | turned on                                       |
//! | SAF  | turned off, was already stopped                 |
//! | STF  | turned off                                      |
//! | INV  | invalid command                                 |
//! | ERR  | response error                                  |

use super::{Device, SerialDevice};
use crate::adapters::{SerialPortTransport, SerialTransport};
use crate::config::SonicatorConfig;
use crate::error::{DeviceError, DeviceResult};
use std::time::Duration;
use tracing::info;

/// Default upper bound a recipe runner allows for one sonication step.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Message for a known status code.
pub fn status_message(code: &str) -> Option<&'static str> {
    let message = match code {
        "SIW" => "Sonicator is currently sonicating.",
        "SNW" => "Sonicator is currently not sonicating.",
        "BIP" => "Pressed sonicator button.",
        "PIO" => "Sonicator is connected to the power supply.",
        "PNO" => "Sonicator is not connected to the power supply.",
        "SAN" => "Turned on the sonicator. It was already in motion.",
        "STN" => "Turned on the sonicator.",
        "SAF" => "Turned off the sonicator. It was already not in motion.",
        "STF" => "Turned off the sonicator.",
        "INV" => "Invalid command. Please check the command.",
        "ERR" => "Response error. Please check.",
        _ => return None,
    };
    Some(message)
}

/// Codes accepted as success for one request.
struct Expected<'a> {
    ok: &'a [&'a str],
    not_ok: Option<&'a str>,
}

/// Driver for an Arduino-relayed ultrasonic bath.
#[derive(Debug)]
pub struct Sonicator {
    serial: SerialDevice,
    operation_timeout: Duration,
    powered: bool,
}

impl Sonicator {
    /// Create a sonicator on an arbitrary transport with default timeouts.
    pub fn new(name: &str, transport: Box<dyn SerialTransport>) -> Self {
        Self {
            serial: SerialDevice::new(name, transport),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            powered: false,
        }
    }

    /// Create a sonicator on a (not yet opened) serial port.
    pub fn on_port(name: &str, port: &str, baud_rate: u32) -> Self {
        Self::new(name, Box::new(SerialPortTransport::new(port, baud_rate)))
    }

    /// Create a sonicator from its configuration entry.
    pub fn from_config(config: &SonicatorConfig) -> Self {
        let mut sonicator = Self::on_port(&config.name, &config.port, config.baud_rate)
            .with_operation_timeout(config.operation_timeout);
        sonicator.serial.set_timeout(config.timeout);
        sonicator
    }

    /// Set the upper bound for one sonication step.
    pub fn with_operation_timeout(mut self, operation_timeout: Duration) -> Self {
        self.operation_timeout = operation_timeout;
        self
    }

    /// Upper bound for one sonication step. Status replies are bounded by
    /// the generic timeout instead.
    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    /// Whether the last power check found the supply connected.
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Check that the unit is connected to the power supply.
    pub fn check_power(&mut self) -> DeviceResult<String> {
        self.serial.ensure_open()?;
        let result = self.request(
            ">power",
            Expected {
                ok: &["PIO"],
                not_ok: Some("PNO"),
            },
        );
        self.powered = result.is_ok();
        result
    }

    /// Query whether the bath is currently running.
    pub fn check_status(&mut self) -> DeviceResult<String> {
        self.ensure_ready()?;
        self.request(
            ">status",
            Expected {
                ok: &["SIW", "SNW"],
                not_ok: Some("ERR"),
            },
        )
    }

    /// Start sonicating.
    pub fn start_sonicating(&mut self) -> DeviceResult<String> {
        self.ensure_ready()?;
        self.request(
            ">turnon",
            Expected {
                ok: &["SAN", "STN"],
                not_ok: Some("ERR"),
            },
        )
    }

    /// Stop sonicating.
    pub fn stop_sonicating(&mut self) -> DeviceResult<String> {
        self.ensure_ready()?;
        self.turn_off()
    }

    /// Press the front-panel button.
    pub fn press_button(&mut self) -> DeviceResult<String> {
        self.ensure_ready()?;
        self.request(
            ">button",
            Expected {
                ok: &["BIP"],
                not_ok: None,
            },
        )
    }

    fn turn_off(&mut self) -> DeviceResult<String> {
        self.request(
            ">turnoff",
            Expected {
                ok: &["SAF", "STF"],
                not_ok: Some("ERR"),
            },
        )
    }

    fn ensure_ready(&self) -> DeviceResult<()> {
        self.serial.ensure_open()?;
        if !self.powered {
            return Err(DeviceError::NotPowered(Self::KIND));
        }
        if !self.serial.is_initialized() {
            return Err(DeviceError::NotInitialized(Self::KIND));
        }
        Ok(())
    }

    fn request(&mut self, line: &str, expected: Expected<'_>) -> DeviceResult<String> {
        let timeout = self.serial.timeout();
        let code = self.serial.status_code(line, timeout)?;
        let message = status_message(&code);

        if expected.ok.contains(&code.as_str()) {
            return Ok(message.unwrap_or_default().to_string());
        }
        let reason = match message {
            Some(message) if expected.not_ok == Some(code.as_str()) => {
                format!("Sonicator failure: {message}")
            }
            Some(message) => format!(
                "Did not receive the expected response {}. Instead received {code}: {message}",
                expected.ok.join("/")
            ),
            None => format!("Received unknown message code {code}"),
        };
        Err(DeviceError::DeviceFailure {
            command: line.to_string(),
            reason,
        })
    }
}

impl Device for Sonicator {
    const KIND: &'static str = "Sonicator";

    fn serial(&self) -> &SerialDevice {
        &self.serial
    }

    fn serial_mut(&mut self) -> &mut SerialDevice {
        &mut self.serial
    }

    /// Check power, then make sure the bath is stopped.
    fn initialize(&mut self) -> DeviceResult<String> {
        self.check_power()?;
        self.turn_off()?;
        self.serial.set_initialized(true);
        info!(device = %self.serial.name(), "sonicator initialized");
        Ok("Sonicator is on and is ready.".to_string())
    }

    /// Check power, then stop sonicating.
    fn deinitialize(&mut self) -> DeviceResult<String> {
        self.check_power()?;
        self.stop_sonicating()?;
        self.serial.set_initialized(false);
        info!(device = %self.serial.name(), "sonicator deinitialized");
        Ok("Sonicator is successfully deinitialized.".to_string())
    }
}
