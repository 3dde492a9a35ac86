//! Alert-policy flows observed from outside the service.

use growbox::alerts::{AlertColor, AlertState};
use growbox::app::service::Regulator;
use growbox::config::GreenhouseConfig;
use growbox::devices::DeviceId;
use growbox::quantity::Quantity;

use crate::mock_hw::{MockHardware, RecordingSink};

fn test_config() -> GreenhouseConfig {
    let mut cfg = GreenhouseConfig::default();
    cfg.temperature.smoothing_window = 0;
    cfg.humidity.smoothing_window = 0;
    cfg.co2.smoothing_window = 0;
    cfg
}

#[test]
fn ambient_heat_does_not_trigger_venting() {
    let mut reg = Regulator::new(test_config());
    let mut hw = MockHardware::comfortable();
    let mut sink = RecordingSink::new();

    // Hotter inside than the threshold, but it's just as hot outside —
    // venting would pull in equally hot air.
    hw.temp_in = 30.0;
    hw.temp_out = 30.2;
    reg.tick(0, &mut hw, &mut sink);

    assert_eq!(reg.alert_state(Quantity::Temperature), AlertState::Idle);
    assert!(!reg.device_running(DeviceId::FanMain));

    // A cool evening: now venting helps.
    hw.temp_out = 18.0;
    reg.tick(2000, &mut hw, &mut sink);
    assert_eq!(reg.alert_state(Quantity::Temperature), AlertState::High);
    assert!(reg.device_running(DeviceId::FanMain));
}

#[test]
fn co2_alarm_waits_for_sensor_warmup() {
    let mut reg = Regulator::new(test_config());
    let mut hw = MockHardware::comfortable();
    let mut sink = RecordingSink::new();

    // CO2 is sky-high from the first read, but the sensor is still
    // warming up: its samples are discarded, no alarm.
    hw.co2_in = 4000.0;
    reg.tick(0, &mut hw, &mut sink);
    assert_eq!(reg.alert_state(Quantity::Co2), AlertState::Idle);
    assert_eq!(reg.current_value(Quantity::Co2), 0.0);

    reg.tick(60_000, &mut hw, &mut sink);
    assert_eq!(reg.alert_state(Quantity::Co2), AlertState::Idle);

    // Past the 3-minute warm-up: the alarm fires.
    reg.tick(200_000, &mut hw, &mut sink);
    assert_eq!(reg.alert_state(Quantity::Co2), AlertState::High);
    assert!(reg.device_running(DeviceId::FanMain));
}

#[test]
fn wetting_yields_to_active_venting() {
    let mut reg = Regulator::new(test_config());
    let mut hw = MockHardware::comfortable();
    let mut sink = RecordingSink::new();

    // Hot *and* dry. Venting wins; wetting would fight it.
    hw.temp_in = 32.0;
    hw.hum_in = 70.0;
    reg.tick(0, &mut hw, &mut sink);

    assert_eq!(reg.alert_state(Quantity::Temperature), AlertState::High);
    assert_eq!(reg.alert_state(Quantity::Humidity), AlertState::Idle);
    assert!(!reg.device_running(DeviceId::Humidifier));

    // Temperature recovers: the wetting alarm may now fire.
    hw.temp_in = 23.0;
    reg.tick(2000, &mut hw, &mut sink);
    assert_eq!(reg.alert_state(Quantity::Humidity), AlertState::Low);
    assert!(reg.device_running(DeviceId::Humidifier));
}

#[test]
fn alert_colors_track_states() {
    let mut reg = Regulator::new(test_config());
    let mut hw = MockHardware::comfortable();
    let mut sink = RecordingSink::new();

    reg.tick(0, &mut hw, &mut sink);
    assert_eq!(reg.alert_color(Quantity::Temperature), AlertColor::LightGray);

    hw.temp_in = 10.0;
    reg.tick(2000, &mut hw, &mut sink);
    assert_eq!(reg.alert_color(Quantity::Temperature), AlertColor::Blue);

    // Overshoot: Low clears at the midpoint first, then the high-side
    // alarm fires on the following scan.
    hw.temp_in = 35.0;
    hw.temp_out = 15.0;
    reg.tick(4000, &mut hw, &mut sink);
    assert_eq!(reg.alert_color(Quantity::Temperature), AlertColor::LightGray);
    reg.tick(6000, &mut hw, &mut sink);
    assert_eq!(reg.alert_color(Quantity::Temperature), AlertColor::Red);
}

#[test]
fn scan_interval_gates_reevaluation() {
    let mut reg = Regulator::new(test_config());
    let mut hw = MockHardware::comfortable();
    let mut sink = RecordingSink::new();

    reg.tick(0, &mut hw, &mut sink);
    assert_eq!(reg.alert_state(Quantity::Temperature), AlertState::Idle);

    // The box goes cold immediately, but the next scan is 2 s away.
    hw.temp_in = 10.0;
    reg.tick(500, &mut hw, &mut sink);
    assert_eq!(reg.alert_state(Quantity::Temperature), AlertState::Idle);

    reg.tick(2000, &mut hw, &mut sink);
    assert_eq!(reg.alert_state(Quantity::Temperature), AlertState::Low);
}
