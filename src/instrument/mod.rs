//! Device drivers
//!
//! Every receiver a command can act on implements [`Device`]: a named
//! hardware endpoint with a connection and an initialization flag. Drivers
//! keep all domain logic (precondition checks, wire formatting, reply
//! interpretation) so that commands stay thin.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized --initialize()--> Initialized --deinitialize()--> Uninitialized
//! ```
//!
//! The flag gates which operations a driver permits. `connect()` and
//! `disconnect()` open and close the underlying transport; closing also
//! clears the flag, since the firmware state is unknown once the port drops.
//!
//! Serial drivers share [`SerialDevice`], which owns the transport and
//! implements the precondition check and the handshake call used by every
//! operation.

pub mod heating_stage;
pub mod sonicator;

pub use heating_stage::HeatingStage;
pub use sonicator::Sonicator;

use crate::adapters::SerialTransport;
use crate::error::{DeviceError, DeviceResult};
use crate::protocol;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

/// Default generic timeout used for acknowledgment and quick operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// A device shared by every command bound to it.
pub type SharedDevice<D> = Arc<Mutex<D>>;

/// Wrap a device so several commands can refer to it.
pub fn shared<D: Device>(device: D) -> SharedDevice<D> {
    Arc::new(Mutex::new(device))
}

/// Capability of an initializable hardware endpoint.
///
/// Implementors provide access to their [`SerialDevice`] core plus the
/// device-specific setup and teardown sequences; connection handling and
/// introspection come for free.
pub trait Device: Send {
    /// Human-readable kind used in messages ("Heating stage").
    const KIND: &'static str;

    /// Shared serial core.
    fn serial(&self) -> &SerialDevice;

    /// Shared serial core, mutably.
    fn serial_mut(&mut self) -> &mut SerialDevice;

    /// Run the device-specific setup sequence and set the initialized flag.
    fn initialize(&mut self) -> DeviceResult<String>;

    /// Run the device-specific teardown sequence and clear the flag.
    fn deinitialize(&mut self) -> DeviceResult<String>;

    /// Unique device name, used as `receiver_name` in command names.
    fn name(&self) -> &str {
        self.serial().name()
    }

    /// Port identifier of the underlying transport.
    fn port(&self) -> &str {
        self.serial().port()
    }

    /// Whether the underlying connection is open.
    fn is_connected(&self) -> bool {
        self.serial().is_open()
    }

    /// Whether operational commands are currently permitted.
    fn is_initialized(&self) -> bool {
        self.serial().is_initialized()
    }

    /// Open the connection to the device.
    fn connect(&mut self) -> DeviceResult<String> {
        let serial = self.serial_mut();
        serial.open()?;
        Ok(format!(
            "{} {} connected on serial port {}.",
            Self::KIND,
            serial.name(),
            serial.port()
        ))
    }

    /// Close the connection and clear the initialized flag.
    fn disconnect(&mut self) -> DeviceResult<String> {
        let serial = self.serial_mut();
        serial.close();
        Ok(format!(
            "{} {} disconnected from serial port {}.",
            Self::KIND,
            serial.name(),
            serial.port()
        ))
    }
}

/// Common state of a device driven over a serial line.
pub struct SerialDevice {
    name: String,
    timeout: Duration,
    transport: Box<dyn SerialTransport>,
    initialized: bool,
}

impl SerialDevice {
    /// Create a serial core around an already constructed transport.
    pub fn new(name: &str, transport: Box<dyn SerialTransport>) -> Self {
        Self {
            name: name.to_string(),
            timeout: DEFAULT_TIMEOUT,
            transport,
            initialized: false,
        }
    }

    /// Device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Port identifier of the transport.
    pub fn port(&self) -> &str {
        self.transport.port_name()
    }

    /// Generic timeout for acknowledgments and quick operations.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Replace the generic timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Whether the transport is open.
    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Whether the device is initialized.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Set or clear the initialized flag.
    pub fn set_initialized(&mut self, initialized: bool) {
        self.initialized = initialized;
    }

    /// Open the transport.
    pub fn open(&mut self) -> DeviceResult<()> {
        self.transport.open()?;
        info!(device = %self.name, port = self.transport.port_name(), "connected");
        Ok(())
    }

    /// Close the transport and clear the initialized flag.
    pub fn close(&mut self) {
        self.transport.close();
        self.initialized = false;
        info!(device = %self.name, port = self.transport.port_name(), "disconnected");
    }

    /// Fail with [`DeviceError::ConnectionNotOpen`] unless the port is open.
    pub fn ensure_open(&self) -> DeviceResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(DeviceError::ConnectionNotOpen {
                port: self.port().to_string(),
            })
        }
    }

    /// Handshake using the generic timeout for both phases.
    pub fn confirm(&mut self, line: &str) -> DeviceResult<String> {
        let timeout = self.timeout;
        self.confirm_with(line, timeout, timeout)
    }

    /// Handshake with explicit acknowledgment and completion timeouts.
    pub fn confirm_with(
        &mut self,
        line: &str,
        ack_timeout: Duration,
        succ_timeout: Duration,
    ) -> DeviceResult<String> {
        protocol::send_and_confirm(&mut *self.transport, line, ack_timeout, succ_timeout)
    }

    /// Single-reply status code exchange.
    pub fn status_code(&mut self, line: &str, timeout: Duration) -> DeviceResult<String> {
        protocol::query_status_code(&mut *self.transport, line, timeout)
    }
}

impl std::fmt::Debug for SerialDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialDevice")
            .field("name", &self.name)
            .field("port", &self.port())
            .field("timeout", &self.timeout)
            .field("open", &self.is_open())
            .field("initialized", &self.initialized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockTransport;

    #[test]
    fn test_new_serial_device_defaults() {
        let serial = SerialDevice::new("hs1", Box::new(MockTransport::new("/dev/ttyACM0")));
        assert_eq!(serial.name(), "hs1");
        assert_eq!(serial.port(), "/dev/ttyACM0");
        assert_eq!(serial.timeout(), DEFAULT_TIMEOUT);
        assert!(serial.is_open());
        assert!(!serial.is_initialized());
    }

    #[test]
    fn test_close_clears_initialized_flag() {
        let transport = MockTransport::new("mock0");
        let mut serial = SerialDevice::new("hs1", Box::new(transport.clone()));
        serial.set_initialized(true);
        serial.close();
        assert!(!serial.is_initialized());
        assert!(!transport.is_open());
        assert!(matches!(
            serial.ensure_open(),
            Err(DeviceError::ConnectionNotOpen { .. })
        ));
    }
}
