//! Ack/success handshake over a line transport
//!
//! Requests are single ASCII lines of the form `>{verb} {args...}\n`. The
//! firmware answers in two phases, each bounded by its own timeout:
//!
//! 1. an acknowledgment line, `ack`, as soon as the command is accepted
//! 2. a completion line once the work is done: `success` optionally
//!    followed by a payload (`success T=26.3`), or `fail` followed by the
//!    reason the device gives (`fail overheat`)
//!
//! Acknowledgment is expected near-instantly while completion may take
//! minutes (ramping a heating stage), which is why the phases are timed
//! independently.
//!
//! Tokens are matched case-insensitively and surrounding whitespace,
//! including a trailing `\r`, is ignored.
//!
//! Some firmware (the sonicator controller) instead answers with a single
//! status code; [`query_status_code`] covers that exchange.

use crate::adapters::SerialTransport;
use crate::error::{DeviceError, DeviceResult};
use std::time::Duration;
use tracing::{debug, warn};

/// Acknowledgment token.
pub const ACK_TOKEN: &str = "ack";
/// Completion token for a successful command.
pub const SUCCESS_TOKEN: &str = "success";
/// Completion token for a rejected or failed command.
pub const FAIL_TOKEN: &str = "fail";

/// Send `line` and wait for the two-phase ack/completion handshake.
///
/// Unread input is discarded before writing, so a completion line that
/// arrived after an earlier timeout is never read as this request's ack.
///
/// Returns the payload following the success marker (possibly empty).
///
/// # Errors
/// - [`DeviceError::ConnectionNotOpen`] if the transport is closed (nothing
///   is written)
/// - [`DeviceError::AckTimeout`] / [`DeviceError::InvalidAck`] if the first
///   reply is missing or is not an acknowledgment
/// - [`DeviceError::CompletionTimeout`] / [`DeviceError::DeviceFailure`] /
///   [`DeviceError::UnexpectedResponse`] for the completion phase
pub fn send_and_confirm<T>(
    transport: &mut T,
    line: &str,
    ack_timeout: Duration,
    succ_timeout: Duration,
) -> DeviceResult<String>
where
    T: SerialTransport + ?Sized,
{
    write_line(transport, line)?;
    let command = line.to_string();

    let ack = transport
        .read_line(ack_timeout)?
        .ok_or_else(|| DeviceError::AckTimeout {
            command: command.clone(),
            timeout: ack_timeout,
        })?;
    if split_token(&ack).0 != ACK_TOKEN {
        warn!(command = %command, received = %ack.trim(), "invalid acknowledgment");
        return Err(DeviceError::InvalidAck {
            command,
            received: ack.trim().to_string(),
        });
    }

    let completion = transport
        .read_line(succ_timeout)?
        .ok_or_else(|| DeviceError::CompletionTimeout {
            command: command.clone(),
            timeout: succ_timeout,
        })?;
    let (token, payload) = split_token(&completion);
    match token.as_str() {
        SUCCESS_TOKEN => {
            debug!(command = %command, payload, "handshake complete");
            Ok(payload.to_string())
        }
        FAIL_TOKEN => {
            let reason = if payload.is_empty() {
                "no reason given".to_string()
            } else {
                payload.to_string()
            };
            Err(DeviceError::DeviceFailure { command, reason })
        }
        _ => Err(DeviceError::UnexpectedResponse {
            command,
            received: completion.trim().to_string(),
        }),
    }
}

/// Send `line` and return the single status code the device replies with.
///
/// # Errors
/// [`DeviceError::ResponseTimeout`] if nothing arrives within `timeout`.
pub fn query_status_code<T>(transport: &mut T, line: &str, timeout: Duration) -> DeviceResult<String>
where
    T: SerialTransport + ?Sized,
{
    write_line(transport, line)?;
    let reply = transport.read_line(timeout)?.unwrap_or_default();
    let code = reply.trim();
    if code.is_empty() {
        return Err(DeviceError::ResponseTimeout {
            command: line.to_string(),
        });
    }
    debug!(command = %line, code, "status reply");
    Ok(code.to_string())
}

/// Extract the value of a single `key=value` fragment.
///
/// Returns `None` when the text holds no `=`.
///
/// ```
/// use lab_commands::protocol::parse_equal_sign;
///
/// assert_eq!(parse_equal_sign("T=26.3"), Some("26.3"));
/// assert_eq!(parse_equal_sign("ON"), None);
/// ```
pub fn parse_equal_sign(text: &str) -> Option<&str> {
    text.split_once('=').map(|(_, value)| value.trim())
}

/// Render a number the way the firmware and recipe logs expect: integral
/// values keep one decimal digit (`26.0`), others use the shortest form.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

fn write_line<T>(transport: &mut T, line: &str) -> DeviceResult<()>
where
    T: SerialTransport + ?Sized,
{
    if !transport.is_open() {
        return Err(DeviceError::ConnectionNotOpen {
            port: transport.port_name().to_string(),
        });
    }
    if !line.is_ascii() {
        return Err(DeviceError::NonAsciiCommand(line.to_string()));
    }
    transport.clear_input()?;
    debug!(port = transport.port_name(), command = %line, "sending");
    let mut bytes = Vec::with_capacity(line.len() + 1);
    bytes.extend_from_slice(line.as_bytes());
    bytes.push(b'\n');
    transport.write(&bytes)
}

/// Split a reply into its lower-cased leading token and the trimmed rest.
fn split_token(reply: &str) -> (String, &str) {
    let reply = reply.trim();
    match reply.split_once(char::is_whitespace) {
        Some((token, rest)) => (token.to_ascii_lowercase(), rest.trim()),
        None => (reply.to_ascii_lowercase(), ""),
    }
}
