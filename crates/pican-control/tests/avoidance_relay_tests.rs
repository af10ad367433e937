//! 避障钩子接入中继的端到端测试（虚拟总线）

use pican_can::{CanAdapter, VirtualCanAdapter};
use pican_control::{
    AvoidanceConfig, AvoidanceController, ChairModel, CycleOutcome, Vector2D, rect,
    reference_course,
};
use pican_driver::{BusRelay, RelayConfig};
use pican_protocol::{AxisCommand, Frame, command_to_joystick, movement_frame};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn relay_config() -> RelayConfig {
    RelayConfig {
        conduit_capacity: 16,
        poll_interval_ms: 5,
    }
}

#[test]
fn test_avoidance_hook_in_relay() {
    let (mut controller, _joystick, _chair) =
        AvoidanceController::with_conduits(&AvoidanceConfig::default());

    // 右前方有墙
    let obstacles = vec![rect(20.0, -50.0, 10.0, 100.0)];
    let snapshot = ChairModel::default().snapshot();
    assert_eq!(controller.update(&snapshot, &obstacles).unwrap(), CycleOutcome::Idle);

    let (joy_relay, mut joy) = VirtualCanAdapter::pair("joy");
    let (bus_relay, mut bus) = VirtualCanAdapter::pair("bus");
    let relay =
        BusRelay::start(joy_relay, bus_relay, Arc::new(controller.hook()), relay_config()).unwrap();

    let movement = movement_frame(1, AxisCommand::new(0, 100)).unwrap();
    let status = Frame::from_log_line("181C0100#0260").unwrap();

    let sender = thread::spawn(move || {
        joy.send(movement).unwrap();
        joy.send(status).unwrap();
        joy
    });

    let corrected = bus.receive_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(corrected.id, movement.id);
    let (forward, side) = command_to_joystick(corrected.data[0], corrected.data[1]);
    assert!(side < 0.0, "expected a push to the left, got side = {}", side);
    assert!(forward > 0.0);

    // 非运动帧原样通过
    assert_eq!(bus.receive_timeout(RECV_TIMEOUT).unwrap(), status);

    // 禁用后下一帧不再修正
    controller.set_disabled(true);
    let mut joy = sender.join().unwrap();
    let sender = thread::spawn(move || {
        joy.send(movement).unwrap();
        joy
    });
    assert_eq!(bus.receive_timeout(RECV_TIMEOUT).unwrap(), movement);

    let joy = sender.join().unwrap();
    drop(joy);
    drop(bus);
    let stats = relay.shutdown();
    assert_eq!(stats.joy_to_bus_frames, 3);
    assert_eq!(stats.intercepted, 1);
}

#[test]
fn test_headless_drive_through_reference_course() {
    let config = AvoidanceConfig::default();
    let (mut controller, joystick, chair_bus) = AvoidanceController::with_conduits(&config);
    let obstacles = reference_course();
    let mut chair = ChairModel::new(Vector2D::ZERO);

    let forward = movement_frame(1, AxisCommand::new(0, 100)).unwrap();
    for _ in 0..200 {
        let _ = joystick.try_send(forward);
        controller.update(&chair.snapshot(), &obstacles).unwrap();
        chair.step(chair_bus.try_recv().ok(), &obstacles, config.containment);
    }

    let end = chair.snapshot();
    // 一直前进，位置只会增加
    assert!(end.position.y > 0.0);
    assert!(end.bearing_deg >= 0.0 && end.bearing_deg < 360.0);
}
