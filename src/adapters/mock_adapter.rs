//! Mock transport for testing
//!
//! Provides a scripted stand-in for a serial port so drivers and commands
//! can be exercised without hardware. It provides:
//! - A queue of scripted reply lines (or silences that read as timeouts)
//! - Controllable failure injection on the next write
//! - A log of every line written, for test verification
//! - A log of the timeout passed to every read
//! - Stale input left over from an earlier exchange
//!
//! All state lives behind `Arc`, so a test can keep a clone of the
//! transport after moving the original into a device.

use super::SerialTransport;
use crate::error::{DeviceError, DeviceResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::trace;

/// Mock transport for testing
///
/// # Example
///
/// ```
/// use lab_commands::adapters::{MockTransport, SerialTransport};
/// use std::time::Duration;
///
/// let mut transport = MockTransport::new("mock0");
/// transport.push_reply("ack");
/// transport.write(b">pidon\n").unwrap();
/// assert_eq!(transport.read_line(Duration::from_secs(1)).unwrap().as_deref(), Some("ack"));
/// assert_eq!(transport.written_lines(), vec![">pidon".to_string()]);
/// ```
#[derive(Clone)]
pub struct MockTransport {
    port_name: String,
    open: Arc<AtomicBool>,
    should_fail_next: Arc<AtomicBool>,
    replies: Arc<Mutex<VecDeque<Option<String>>>>,
    stale: Arc<Mutex<VecDeque<String>>>,
    written: Arc<Mutex<Vec<u8>>>,
    read_timeouts: Arc<Mutex<Vec<Duration>>>,
}

impl MockTransport {
    /// Create an open mock transport with no scripted replies.
    pub fn new(port_name: &str) -> Self {
        Self {
            port_name: port_name.to_string(),
            open: Arc::new(AtomicBool::new(true)),
            should_fail_next: Arc::new(AtomicBool::new(false)),
            replies: Arc::new(Mutex::new(VecDeque::new())),
            stale: Arc::new(Mutex::new(VecDeque::new())),
            written: Arc::new(Mutex::new(Vec::new())),
            read_timeouts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock transport whose connection is closed.
    pub fn closed(port_name: &str) -> Self {
        let transport = Self::new(port_name);
        transport.set_open(false);
        transport
    }

    /// Set the connection state manually
    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    /// Queue one reply line.
    pub fn push_reply(&self, line: &str) {
        lock(&self.replies).push_back(Some(line.to_string()));
    }

    /// Queue a silence: the next read times out.
    pub fn push_silence(&self) {
        lock(&self.replies).push_back(None);
    }

    /// Leave a line in the input buffer as if it arrived after the previous
    /// exchange gave up. It is read before scripted replies unless the input
    /// is cleared first.
    pub fn push_stale(&self, line: &str) {
        lock(&self.stale).push_back(line.to_string());
    }

    /// Stale lines still buffered.
    pub fn stale_lines(&self) -> usize {
        lock(&self.stale).len()
    }

    /// Queue the `ack` / `success <payload>` pair of a completed handshake.
    pub fn push_ack_success(&self, payload: &str) {
        self.push_reply("ack");
        if payload.is_empty() {
            self.push_reply("success");
        } else {
            self.push_reply(&format!("success {payload}"));
        }
    }

    /// Queue the `ack` / `fail <reason>` pair of a rejected handshake.
    pub fn push_ack_fail(&self, reason: &str) {
        self.push_reply("ack");
        self.push_reply(&format!("fail {reason}"));
    }

    /// Inject a failure for the next write
    pub fn inject_next_failure(&self) {
        self.should_fail_next.store(true, Ordering::SeqCst);
    }

    /// Number of scripted replies not yet consumed.
    pub fn pending_replies(&self) -> usize {
        lock(&self.replies).len()
    }

    /// Raw bytes written so far.
    pub fn written_bytes(&self) -> Vec<u8> {
        lock(&self.written).clone()
    }

    /// Lines written so far, without terminators.
    pub fn written_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&lock(&self.written))
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Timeouts passed to `read_line`, in call order.
    pub fn read_timeouts(&self) -> Vec<Duration> {
        lock(&self.read_timeouts).clone()
    }

    /// Clear the write and read-timeout logs
    pub fn clear_written(&self) {
        lock(&self.written).clear();
        lock(&self.read_timeouts).clear();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SerialTransport for MockTransport {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn open(&mut self) -> DeviceResult<()> {
        self.set_open(true);
        Ok(())
    }

    fn close(&mut self) {
        self.set_open(false);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn write(&mut self, bytes: &[u8]) -> DeviceResult<()> {
        if !self.is_open() {
            return Err(DeviceError::ConnectionNotOpen {
                port: self.port_name.clone(),
            });
        }
        if self.should_fail_next.swap(false, Ordering::SeqCst) {
            return Err(DeviceError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "injected mock failure",
            )));
        }
        trace!(port = %self.port_name, bytes = bytes.len(), "mock write");
        lock(&self.written).extend_from_slice(bytes);
        Ok(())
    }

    fn clear_input(&mut self) -> DeviceResult<()> {
        lock(&self.stale).clear();
        Ok(())
    }

    fn read_line(&mut self, timeout: Duration) -> DeviceResult<Option<String>> {
        lock(&self.read_timeouts).push(timeout);
        if let Some(line) = lock(&self.stale).pop_front() {
            return Ok(Some(line));
        }
        // An exhausted script reads as silence.
        Ok(lock(&self.replies).pop_front().flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replies_in_order_then_silence() {
        let mut transport = MockTransport::new("mock0");
        transport.push_reply("ack");
        transport.push_silence();
        transport.push_reply("success");

        let timeout = Duration::from_millis(10);
        assert_eq!(transport.read_line(timeout).unwrap().as_deref(), Some("ack"));
        assert_eq!(transport.read_line(timeout).unwrap(), None);
        assert_eq!(transport.read_line(timeout).unwrap().as_deref(), Some("success"));
        assert_eq!(transport.read_line(timeout).unwrap(), None);
    }

    #[test]
    fn test_read_timeouts_logged_in_order() {
        let mut transport = MockTransport::new("mock0");
        transport.read_line(Duration::from_millis(10)).unwrap();
        transport.read_line(Duration::from_secs(5)).unwrap();
        assert_eq!(
            transport.read_timeouts(),
            vec![Duration::from_millis(10), Duration::from_secs(5)]
        );
    }

    #[test]
    fn test_stale_input_read_first_unless_cleared() {
        let mut transport = MockTransport::new("mock0");
        transport.push_stale("success");
        transport.push_reply("ack");
        let timeout = Duration::from_millis(10);
        assert_eq!(transport.read_line(timeout).unwrap().as_deref(), Some("success"));

        transport.push_stale("success");
        transport.clear_input().unwrap();
        assert_eq!(transport.stale_lines(), 0);
        assert_eq!(transport.read_line(timeout).unwrap().as_deref(), Some("ack"));
    }

    #[test]
    fn test_clone_shares_write_log() {
        let observer = MockTransport::new("mock0");
        let mut boxed: Box<dyn SerialTransport> = Box::new(observer.clone());
        boxed.write(b">pr T\n").unwrap();
        assert_eq!(observer.written_lines(), vec![">pr T".to_string()]);
    }

    #[test]
    fn test_closed_transport_rejects_writes() {
        let mut transport = MockTransport::closed("mock0");
        assert!(!transport.is_open());
        assert!(transport.write(b">pidoff\n").is_err());
        assert!(transport.written_bytes().is_empty());
    }

    #[test]
    fn test_injected_failure_is_one_shot() {
        let mut transport = MockTransport::new("mock0");
        transport.inject_next_failure();
        assert!(matches!(transport.write(b"x\n"), Err(DeviceError::Io(_))));
        assert!(transport.write(b"y\n").is_ok());
        assert_eq!(transport.written_lines(), vec!["y".to_string()]);
    }
}
