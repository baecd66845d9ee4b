//! Serial port transport for RS-232 / USB-CDC devices.

use super::SerialTransport;
use crate::error::{DeviceError, DeviceResult};
use std::time::Duration;
use tracing::debug;

#[cfg(feature = "instrument_serial")]
use anyhow::Context;
#[cfg(feature = "instrument_serial")]
use serialport::{ClearBuffer, SerialPort};

/// Internal poll interval of the OS read call. Overall deadlines are enforced
/// by [`SerialTransport::read_line`], so this only bounds reaction latency.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Serial transport for RS-232 communication
///
/// Wraps the serialport crate with blocking, newline-delimited reads. Bytes
/// received after a line terminator, or before a read timed out mid-line,
/// are kept and prepended to the next line, so a reply split across two
/// reads is never lost.
pub struct SerialPortTransport {
    /// Port name (e.g., "/dev/ttyACM0", "COM3")
    port_name: String,

    /// Baud rate (e.g., 9600, 115200)
    baud_rate: u32,

    /// Bytes received but not yet returned as a line
    pending: Vec<u8>,

    /// The open port, `None` while closed
    #[cfg(feature = "instrument_serial")]
    port: Option<Box<dyn SerialPort>>,
}

impl SerialPortTransport {
    /// Create an unopened serial transport
    ///
    /// # Arguments
    /// * `port_name` - Serial port path (e.g., "/dev/ttyACM0", "COM3")
    /// * `baud_rate` - Communication speed (e.g., 9600, 115200)
    pub fn new(port_name: &str, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.to_string(),
            baud_rate,
            pending: Vec::new(),
            #[cfg(feature = "instrument_serial")]
            port: None,
        }
    }

    /// Configured baud rate.
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Split the first complete line off the pending buffer.
    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let rest = self.pending.split_off(end + 1);
        let line = std::mem::replace(&mut self.pending, rest);
        let text = String::from_utf8_lossy(&line).trim_end().to_string();
        Some(text)
    }
}

impl SerialTransport for SerialPortTransport {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    #[cfg(feature = "instrument_serial")]
    fn open(&mut self) -> DeviceResult<()> {
        if self.port.is_some() {
            return Ok(());
        }
        let port = serialport::new(&self.port_name, self.baud_rate)
            .timeout(POLL_INTERVAL)
            .open()
            .with_context(|| {
                format!(
                    "Failed to open serial port '{}' at {} baud",
                    self.port_name, self.baud_rate
                )
            })
            .map_err(|e| DeviceError::Transport(format!("{e:#}")))?;

        self.pending.clear();
        self.port = Some(port);
        debug!(
            "Serial port '{}' opened at {} baud",
            self.port_name, self.baud_rate
        );
        Ok(())
    }

    #[cfg(not(feature = "instrument_serial"))]
    fn open(&mut self) -> DeviceResult<()> {
        Err(DeviceError::Transport(
            "Serial support not enabled. Rebuild with --features instrument_serial".to_string(),
        ))
    }

    fn close(&mut self) {
        #[cfg(feature = "instrument_serial")]
        {
            if self.port.take().is_some() {
                debug!("Serial port '{}' closed", self.port_name);
            }
        }
        self.pending.clear();
    }

    fn is_open(&self) -> bool {
        #[cfg(feature = "instrument_serial")]
        {
            self.port.is_some()
        }
        #[cfg(not(feature = "instrument_serial"))]
        {
            false
        }
    }

    #[cfg(feature = "instrument_serial")]
    fn write(&mut self, bytes: &[u8]) -> DeviceResult<()> {
        use std::io::Write;

        let port = self.port.as_mut().ok_or_else(|| DeviceError::ConnectionNotOpen {
            port: self.port_name.clone(),
        })?;
        port.write_all(bytes)?;
        port.flush()?;
        debug!(
            "Sent serial command: {}",
            String::from_utf8_lossy(bytes).trim()
        );
        Ok(())
    }

    #[cfg(not(feature = "instrument_serial"))]
    fn write(&mut self, _bytes: &[u8]) -> DeviceResult<()> {
        Err(DeviceError::ConnectionNotOpen {
            port: self.port_name.clone(),
        })
    }

    fn clear_input(&mut self) -> DeviceResult<()> {
        self.pending.clear();
        #[cfg(feature = "instrument_serial")]
        {
            if let Some(port) = self.port.as_mut() {
                port.clear(ClearBuffer::Input)
                    .with_context(|| format!("Failed to clear input of '{}'", self.port_name))
                    .map_err(|e| DeviceError::Transport(format!("{e:#}")))?;
            }
        }
        Ok(())
    }

    #[cfg(feature = "instrument_serial")]
    fn read_line(&mut self, timeout: Duration) -> DeviceResult<Option<String>> {
        use std::io::Read;
        use std::time::Instant;

        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }

        let start = Instant::now();
        let mut buffer = [0u8; 64];
        loop {
            if start.elapsed() > timeout {
                return Ok(None);
            }

            let port = self.port.as_mut().ok_or_else(|| DeviceError::ConnectionNotOpen {
                port: self.port_name.clone(),
            })?;

            match port.read(&mut buffer) {
                Ok(0) => {
                    // EOF - shouldn't happen with serial ports
                    return Err(DeviceError::Transport(format!(
                        "Unexpected EOF from serial port '{}'",
                        self.port_name
                    )));
                }
                Ok(n) => {
                    self.pending.extend_from_slice(&buffer[..n]);
                    if let Some(line) = self.take_line() {
                        debug!("Received serial response: {}", line);
                        return Ok(Some(line));
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    // Port timeout is shorter than our overall timeout
                    continue;
                }
                Err(e) => return Err(DeviceError::Io(e)),
            }
        }
    }

    #[cfg(not(feature = "instrument_serial"))]
    fn read_line(&mut self, _timeout: Duration) -> DeviceResult<Option<String>> {
        Err(DeviceError::ConnectionNotOpen {
            port: self.port_name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_transport_creation() {
        let transport = SerialPortTransport::new("/dev/ttyACM0", 9600);
        assert_eq!(transport.port_name(), "/dev/ttyACM0");
        assert_eq!(transport.baud_rate(), 9600);
        assert!(!transport.is_open());
    }

    #[test]
    fn test_unopened_write_is_connection_error() {
        let mut transport = SerialPortTransport::new("COM3", 115200);
        let err = transport.write(b">pidon\n").unwrap_err();
        assert!(matches!(err, DeviceError::ConnectionNotOpen { .. }));
    }

    #[test]
    fn test_pending_bytes_split_into_lines() {
        let mut transport = SerialPortTransport::new("COM3", 115200);
        transport.pending.extend_from_slice(b"ack\r\nsucc");
        assert_eq!(transport.take_line().as_deref(), Some("ack"));
        assert_eq!(transport.take_line(), None);
        transport.pending.extend_from_slice(b"ess T=26.3\n");
        assert_eq!(transport.take_line().as_deref(), Some("success T=26.3"));
        assert!(transport.pending.is_empty());
    }

    #[test]
    fn test_clear_input_drops_partial_line() {
        let mut transport = SerialPortTransport::new("COM3", 115200);
        transport.pending.extend_from_slice(b"success\nsucc");
        transport.clear_input().unwrap();
        assert!(transport.pending.is_empty());
        assert_eq!(transport.take_line(), None);
    }
}
