//! Thin command shim over a single device operation.

use super::{format_name, Command, Delay, Outcome};
use crate::error::{DeviceError, DeviceResult};
use crate::instrument::{Device, SharedDevice};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One operation a device supports, with its typed parameters.
///
/// Implemented by a closed enum per device kind; the enum variant decides
/// the class name, description, parameters and which driver method runs.
pub trait DeviceAction: Send {
    /// Device the action runs against.
    type Receiver: Device;

    /// Class identifier rendered first in command names.
    fn class_name(&self) -> &'static str;

    /// What the action does.
    fn description(&self) -> &'static str;

    /// Parameters rendered after `receiver_name`, in order.
    fn parameters(&self) -> Vec<(&'static str, String)>;

    /// Call the driver operation. Domain logic belongs in the driver.
    fn apply(&self, receiver: &mut Self::Receiver) -> DeviceResult<String>;
}

/// A command that performs one [`DeviceAction`] on a shared device.
pub struct DeviceCommand<A: DeviceAction> {
    receiver: SharedDevice<A::Receiver>,
    receiver_name: String,
    action: A,
    delay: Delay,
    outcome: Option<Outcome>,
}

impl<A: DeviceAction> DeviceCommand<A> {
    /// Bind `action` to `receiver` with no delay.
    ///
    /// The receiver's name is captured now; device names do not change.
    pub fn new(receiver: &SharedDevice<A::Receiver>, action: A) -> Self {
        let receiver_name = match receiver.lock() {
            Ok(device) => device.name().to_string(),
            Err(poisoned) => poisoned.into_inner().name().to_string(),
        };
        Self {
            receiver: Arc::clone(receiver),
            receiver_name,
            action,
            delay: Delay::default(),
            outcome: None,
        }
    }

    /// Attach a delay.
    pub fn with_delay(mut self, delay: impl Into<Delay>) -> Self {
        self.delay = delay.into();
        self
    }

    /// The bound action.
    pub fn action(&self) -> &A {
        &self.action
    }

    /// Name of the receiver device.
    pub fn receiver_name(&self) -> &str {
        &self.receiver_name
    }

    /// Parameters in display order, starting with `receiver_name`.
    pub fn parameters(&self) -> Vec<(&'static str, String)> {
        let mut parameters = vec![("receiver_name", self.receiver_name.clone())];
        parameters.extend(self.action.parameters());
        parameters
    }
}

impl<A: DeviceAction> Command for DeviceCommand<A> {
    #[instrument(level = "debug", skip(self), fields(command = %self.name()))]
    fn execute(&mut self) {
        debug!("executing");
        let result = match self.receiver.lock() {
            Ok(mut device) => self.action.apply(&mut device),
            Err(_) => Err(DeviceError::LockPoisoned(self.receiver_name.clone())),
        };
        let outcome = Outcome::from(result);
        if outcome.success {
            info!(message = %outcome.message, "command succeeded");
        } else {
            warn!(message = %outcome.message, "command failed");
        }
        self.outcome = Some(outcome);
    }

    fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    fn name(&self) -> String {
        format_name(self.action.class_name(), &self.parameters(), &self.delay)
    }

    fn description(&self) -> &'static str {
        self.action.description()
    }

    fn delay(&self) -> &Delay {
        &self.delay
    }
}
