//! Line-oriented transports
//!
//! A device driver never touches the operating system directly; it talks to
//! a [`SerialTransport`], which writes raw bytes and hands back complete
//! response lines. Two implementations ship with the crate:
//!
//! - [`SerialPortTransport`] - a real RS-232/USB-CDC port via the
//!   `serialport` crate (feature `instrument_serial`)
//! - [`MockTransport`] - scripted replies and a write log, for tests

pub mod mock_adapter;
pub mod serial_adapter;

pub use mock_adapter::MockTransport;
pub use serial_adapter::SerialPortTransport;

use crate::error::DeviceResult;
use std::time::Duration;

/// Blocking, line-oriented byte transport.
///
/// Implementations own the underlying handle and must release it when
/// dropped, so a device going out of scope never leaks an open port.
pub trait SerialTransport: Send {
    /// Identifier of the underlying port (e.g. "/dev/ttyACM0", "COM3").
    fn port_name(&self) -> &str;

    /// Open the underlying connection. Opening an open transport is a no-op.
    fn open(&mut self) -> DeviceResult<()>;

    /// Close the underlying connection, discarding any buffered input.
    fn close(&mut self);

    /// Whether the connection is currently open.
    fn is_open(&self) -> bool;

    /// Write all bytes to the connection.
    fn write(&mut self, bytes: &[u8]) -> DeviceResult<()>;

    /// Discard input received but not yet read, so a late reply to an
    /// abandoned request cannot be taken for the answer to the next one.
    fn clear_input(&mut self) -> DeviceResult<()>;

    /// Block until one complete line arrives or `timeout` elapses.
    ///
    /// Returns the line without its terminator, or `Ok(None)` on timeout.
    fn read_line(&mut self, timeout: Duration) -> DeviceResult<Option<String>>;
}
