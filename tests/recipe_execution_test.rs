//! Integration tests for recipe-style command execution
//!
//! Drives heating stage and sonicator commands through composites against
//! scripted mock transports.

use lab_commands::adapters::MockTransport;
use lab_commands::command::{
    Command, CompositeCommand, HeatingStageCommand, SonicatorAction, SonicatorCommand,
};
use lab_commands::instrument::{shared, Device, HeatingStage, SharedDevice, Sonicator};

fn heating_stage() -> (SharedDevice<HeatingStage>, MockTransport) {
    let transport = MockTransport::new("/dev/ttyACM0");
    let stage = HeatingStage::new("hs1", Box::new(transport.clone()));
    (shared(stage), transport)
}

#[test]
fn test_full_heating_recipe() {
    let (stage, transport) = heating_stage();
    // initialize: set Ts + pidon, set_temp, temperature, deinitialize: set Ts + pidoff
    transport.push_ack_success("");
    transport.push_ack_success("");
    transport.push_ack_success("");
    transport.push_ack_success("T=60.1");
    transport.push_ack_success("");
    transport.push_ack_success("");

    let mut recipe = CompositeCommand::new()
        .then(HeatingStageCommand::initialize(&stage))
        .then(HeatingStageCommand::set_temp(&stage, 60.0).with_delay(30.0))
        .then(HeatingStageCommand::temperature(&stage))
        .then(HeatingStageCommand::deinitialize(&stage));

    recipe.execute();

    assert_eq!(recipe.was_successful(), Some(true));
    assert!(recipe.result_message().unwrap_or_default().contains("deinitialized"));
    assert_eq!(
        transport.written_lines(),
        vec![
            ">set Ts 26.0",
            ">pidon",
            ">set T 60.0",
            ">pr T",
            ">set Ts 24.0",
            ">pidoff",
        ]
    );
    assert!(!stage.lock().unwrap().is_initialized());
    assert_eq!(transport.pending_replies(), 0);
}

#[test]
fn test_initialize_fails_when_pid_on_fails() {
    let (stage, transport) = heating_stage();
    transport.push_ack_success("");
    transport.push_ack_fail("relay fault");

    let mut initialize = HeatingStageCommand::initialize(&stage);
    initialize.execute();

    assert_eq!(initialize.was_successful(), Some(false));
    assert!(initialize
        .result_message()
        .unwrap_or_default()
        .contains("relay fault"));
    assert!(!stage.lock().unwrap().is_initialized());
}

#[test]
fn test_failed_ramp_skips_remaining_steps() {
    let (stage, transport) = heating_stage();
    transport.push_ack_success("");
    transport.push_ack_success("");
    transport.push_ack_fail("overheat");

    let mut recipe = CompositeCommand::new()
        .then(HeatingStageCommand::initialize(&stage))
        .then(HeatingStageCommand::set_temp(&stage, 120.0))
        .then(HeatingStageCommand::deinitialize(&stage));

    recipe.execute();

    assert_eq!(recipe.was_successful(), Some(false));
    assert!(recipe.result_message().unwrap_or_default().ends_with("overheat"));
    assert_eq!(transport.written_lines().last().map(String::as_str), Some(">set T 120.0"));
    assert!(stage.lock().unwrap().is_initialized());
}

#[test]
fn test_composite_of_two_devices() {
    let (stage, stage_port) = heating_stage();
    let sonic_port = MockTransport::new("/dev/ttyUSB1");
    let sonicator = shared(Sonicator::new("sonic", Box::new(sonic_port.clone())));

    stage_port.push_ack_success("");
    stage_port.push_ack_success("");
    sonic_port.push_reply("PIO");
    sonic_port.push_reply("STF");
    sonic_port.push_reply("STN");

    let setup = CompositeCommand::new()
        .then(HeatingStageCommand::initialize(&stage))
        .then(SonicatorCommand::of(&sonicator, SonicatorAction::Initialize));
    let mut recipe = CompositeCommand::new()
        .then(setup)
        .then(SonicatorCommand::of(&sonicator, SonicatorAction::StartSonicating).with_delay("$bath"));

    assert_eq!(
        recipe.name(),
        "CompositeCommand: CompositeCommand: HeatingStageInitialize receiver_name=hs1; \
SonicatorInitialize receiver_name=sonic;; SonicatorStartSonicating receiver_name=sonic delay=$bath;"
    );

    recipe.execute();
    assert_eq!(recipe.was_successful(), Some(true));
    assert_eq!(recipe.result_message(), Some("Turned on the sonicator."));
}

#[test]
fn test_closed_port_reports_failure() {
    let transport = MockTransport::closed("/dev/ttyACM0");
    let stage = shared(HeatingStage::new("hs1", Box::new(transport.clone())));

    let mut command = HeatingStageCommand::pid_off(&stage);
    command.execute();

    assert_eq!(command.was_successful(), Some(false));
    assert!(command
        .result_message()
        .unwrap_or_default()
        .contains("connection not open"));
    assert!(transport.written_bytes().is_empty());

    let mut connect = HeatingStageCommand::connect(&stage);
    connect.execute();
    assert_eq!(connect.was_successful(), Some(true));
    assert!(stage.lock().unwrap().is_connected());
}
