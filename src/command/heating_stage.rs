//! Heating stage commands.

use super::device_command::{DeviceAction, DeviceCommand};
use crate::error::DeviceResult;
use crate::instrument::{Device, HeatingStage, SharedDevice};
use crate::protocol::format_number;

/// Operations a recipe can run against a [`HeatingStage`].
#[derive(Debug, Clone, PartialEq)]
pub enum HeatingStageAction {
    /// Open the serial port
    Connect,
    /// Set to 26 C and turn the PID loop on
    Initialize,
    /// Set to 24 C and turn the PID loop off
    Deinitialize {
        /// Clear the initialized flag after a successful teardown
        reset_init_flag: bool,
    },
    /// Write the PID setpoint without waiting
    SetSetTemp {
        /// Setpoint in C
        temperature: f64,
    },
    /// Ramp to a target and wait until reached
    SetTemp {
        /// Target in C
        temperature: f64,
    },
    /// Turn the PID loop on
    PidOn,
    /// Turn the PID loop off
    PidOff,
    /// Query the PID loop state
    IsPidOn,
    /// Query the stage temperature
    Temperature,
}

/// A command acting on a heating stage.
pub type HeatingStageCommand = DeviceCommand<HeatingStageAction>;

impl DeviceAction for HeatingStageAction {
    type Receiver = HeatingStage;

    fn class_name(&self) -> &'static str {
        match self {
            Self::Connect => "HeatingStageConnect",
            Self::Initialize => "HeatingStageInitialize",
            Self::Deinitialize { .. } => "HeatingStageDeinitialize",
            Self::SetSetTemp { .. } => "HeatingStageSetSetTemp",
            Self::SetTemp { .. } => "HeatingStageSetTemp",
            Self::PidOn => "HeatingStagePidOn",
            Self::PidOff => "HeatingStagePidOff",
            Self::IsPidOn => "HeatingStageIsPidOn",
            Self::Temperature => "HeatingStageTemperature",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Connect => "Open the serial port of the heating stage.",
            Self::Initialize => {
                "Initialize the heating stage by setting it to 26 C and turning the PID loop on."
            }
            Self::Deinitialize { .. } => {
                "Deinitialize the heating stage by setting it to 24 C and turning the PID loop off."
            }
            Self::SetSetTemp { .. } => {
                "Set the PID setpoint of the heating stage without waiting for it to be reached."
            }
            Self::SetTemp { .. } => {
                "Ramp the heating stage to a target temperature and wait until it is reached."
            }
            Self::PidOn => "Turn the heating stage PID loop on.",
            Self::PidOff => "Turn the heating stage PID loop off.",
            Self::IsPidOn => "Report whether the heating stage PID loop is on.",
            Self::Temperature => "Report the current heating stage temperature.",
        }
    }

    fn parameters(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Deinitialize { reset_init_flag } => {
                vec![("reset_init_flag", reset_init_flag.to_string())]
            }
            Self::SetSetTemp { temperature } | Self::SetTemp { temperature } => {
                vec![("temperature", format_number(*temperature))]
            }
            _ => Vec::new(),
        }
    }

    fn apply(&self, stage: &mut HeatingStage) -> DeviceResult<String> {
        match self {
            Self::Connect => stage.connect(),
            Self::Initialize => stage.initialize(),
            Self::Deinitialize { reset_init_flag } => stage.deinitialize_with(*reset_init_flag),
            Self::SetSetTemp { temperature } => stage.set_settemp(*temperature),
            Self::SetTemp { temperature } => stage.set_temp(*temperature),
            Self::PidOn => stage.pid_on(),
            Self::PidOff => stage.pid_off(),
            Self::IsPidOn => stage
                .is_pid_on()
                .map(|on| format!("PID is {}.", if on { "ON" } else { "OFF" })),
            Self::Temperature => stage
                .temperature()
                .map(|t| format!("Temperature is {} C.", format_number(t))),
        }
    }
}

impl HeatingStageCommand {
    /// Open the serial port.
    pub fn connect(stage: &SharedDevice<HeatingStage>) -> Self {
        Self::new(stage, HeatingStageAction::Connect)
    }

    /// Initialize the stage.
    pub fn initialize(stage: &SharedDevice<HeatingStage>) -> Self {
        Self::new(stage, HeatingStageAction::Initialize)
    }

    /// Deinitialize the stage and clear its initialized flag.
    pub fn deinitialize(stage: &SharedDevice<HeatingStage>) -> Self {
        Self::new(
            stage,
            HeatingStageAction::Deinitialize {
                reset_init_flag: true,
            },
        )
    }

    /// Write the setpoint.
    pub fn set_settemp(stage: &SharedDevice<HeatingStage>, temperature: f64) -> Self {
        Self::new(stage, HeatingStageAction::SetSetTemp { temperature })
    }

    /// Ramp to `temperature` and wait.
    pub fn set_temp(stage: &SharedDevice<HeatingStage>, temperature: f64) -> Self {
        Self::new(stage, HeatingStageAction::SetTemp { temperature })
    }

    /// Turn the PID loop on.
    pub fn pid_on(stage: &SharedDevice<HeatingStage>) -> Self {
        Self::new(stage, HeatingStageAction::PidOn)
    }

    /// Turn the PID loop off.
    pub fn pid_off(stage: &SharedDevice<HeatingStage>) -> Self {
        Self::new(stage, HeatingStageAction::PidOff)
    }

    /// Query the PID loop state.
    pub fn is_pid_on(stage: &SharedDevice<HeatingStage>) -> Self {
        Self::new(stage, HeatingStageAction::IsPidOn)
    }

    /// Query the temperature.
    pub fn temperature(stage: &SharedDevice<HeatingStage>) -> Self {
        Self::new(stage, HeatingStageAction::Temperature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockTransport;
    use crate::command::{Command, Delay};
    use crate::instrument::shared;
    use tracing_test::traced_test;

    fn shared_stage() -> (SharedDevice<HeatingStage>, MockTransport) {
        let transport = MockTransport::new("/dev/ttyACM0");
        let stage = HeatingStage::new("hs1", Box::new(transport.clone()));
        (shared(stage), transport)
    }

    #[test]
    fn test_outcome_unknown_before_execute() {
        let (stage, _) = shared_stage();
        let command = HeatingStageCommand::pid_off(&stage);
        assert_eq!(command.was_successful(), None);
        assert_eq!(command.result_message(), None);
    }

    #[test]
    fn test_names() {
        let (stage, _) = shared_stage();
        assert_eq!(
            HeatingStageCommand::initialize(&stage).name(),
            "HeatingStageInitialize receiver_name=hs1"
        );
        assert_eq!(
            HeatingStageCommand::set_temp(&stage, 60.0).with_delay(2.5).name(),
            "HeatingStageSetTemp receiver_name=hs1 temperature=60.0 delay=2.5"
        );
        assert_eq!(
            HeatingStageCommand::new(&stage, HeatingStageAction::Deinitialize { reset_init_flag: false })
                .with_delay(Delay::from("$cooldown"))
                .name(),
            "HeatingStageDeinitialize receiver_name=hs1 reset_init_flag=false delay=$cooldown"
        );
    }

    #[test]
    fn test_set_temp_before_initialize() {
        let (stage, transport) = shared_stage();
        let mut command = HeatingStageCommand::set_temp(&stage, 60.0);

        command.execute();
        assert_eq!(command.was_successful(), Some(false));
        assert_eq!(command.result_message(), Some("Heating stage is not initialized."));
        assert!(transport.written_bytes().is_empty());
    }

    #[test]
    fn test_query_messages() {
        let (stage, transport) = shared_stage();
        transport.push_ack_success("T=26.3");
        transport.push_ack_success("pid=ON");

        let mut temperature = HeatingStageCommand::temperature(&stage);
        temperature.execute();
        assert_eq!(temperature.result_message(), Some("Temperature is 26.3 C."));

        let mut pid = HeatingStageCommand::is_pid_on(&stage);
        pid.execute();
        assert_eq!(pid.outcome().map(|o| o.success), Some(true));
        assert_eq!(pid.result_message(), Some("PID is ON."));
    }

    #[test]
    fn test_reexecution_overwrites_outcome() {
        let (stage, transport) = shared_stage();
        transport.push_ack_fail("busy");
        transport.push_ack_success("");

        let mut command = HeatingStageCommand::pid_off(&stage);
        command.execute();
        assert_eq!(command.was_successful(), Some(false));
        command.execute();
        assert_eq!(command.was_successful(), Some(true));
        assert_eq!(command.result_message(), Some(""));
    }

    #[test]
    fn test_report_serializes() {
        let (stage, _) = shared_stage();
        let mut command = HeatingStageCommand::set_settemp(&stage, 30.0);
        command.execute();

        let report = serde_json::to_value(command.report()).unwrap();
        assert_eq!(report["name"], "HeatingStageSetSetTemp receiver_name=hs1 temperature=30.0");
        assert_eq!(report["was_successful"], false);
    }

    #[test]
    #[traced_test]
    fn test_failure_is_logged() {
        let (stage, _) = shared_stage();
        let mut command = HeatingStageCommand::pid_on(&stage);
        command.execute();
        assert!(logs_contain("command failed"));
    }
}
