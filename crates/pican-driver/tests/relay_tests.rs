//! 中继集成测试（虚拟总线）

use crossbeam_channel::{Receiver, Sender, unbounded};
use pican_can::{
    CanAdapter, CanError, RxAdapter, SplittableAdapter, TxAdapter, VirtualCanAdapter,
};
use pican_driver::{BusRelay, FixedPayloadHook, InterceptHook, PassThrough, RelayConfig};
use pican_protocol::{Frame, is_movement_frame};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn test_config() -> RelayConfig {
    RelayConfig {
        conduit_capacity: 64,
        poll_interval_ms: 5,
    }
}

/// 返回 (中继, 摇杆侧对端, 驱动侧对端)
fn start_relay(
    hook: Arc<dyn InterceptHook>,
) -> (BusRelay, VirtualCanAdapter, VirtualCanAdapter) {
    let (joy_relay, joy_peer) = VirtualCanAdapter::pair("joy");
    let (bus_relay, bus_peer) = VirtualCanAdapter::pair("bus");
    let relay = BusRelay::start(joy_relay, bus_relay, hook, test_config()).unwrap();
    (relay, joy_peer, bus_peer)
}

fn wait_until_stopped(relay: &BusRelay) {
    let deadline = Instant::now() + RECV_TIMEOUT;
    while relay.is_running() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_relay_forwards_both_directions_in_order() {
    let (relay, mut joy, mut bus) = start_relay(Arc::new(PassThrough));

    let lines = ["02000100#0064", "02000100#9C00", "00C#00", "7B3#0102030405060708"];
    let sender = thread::spawn(move || {
        for line in lines {
            joy.send(Frame::from_log_line(line).unwrap()).unwrap();
        }
        joy
    });
    for line in lines {
        let frame = bus.receive_timeout(RECV_TIMEOUT).unwrap();
        assert_eq!(frame, Frame::from_log_line(line).unwrap());
    }
    let mut joy = sender.join().unwrap();

    let reply = Frame::from_log_line("0C140300#01").unwrap();
    let sender = thread::spawn(move || {
        bus.send(reply).unwrap();
        bus
    });
    assert_eq!(joy.receive_timeout(RECV_TIMEOUT).unwrap(), reply);
    let bus = sender.join().unwrap();

    drop(joy);
    drop(bus);
    wait_until_stopped(&relay);

    let stats = relay.shutdown();
    assert_eq!(stats.joy_to_bus_frames, 4);
    assert_eq!(stats.bus_to_joy_frames, 1);
    assert_eq!(stats.intercepted, 0);
}

#[test]
fn test_relay_applies_fixed_payload_to_movement_frames() {
    let hook = FixedPayloadHook::from_hex("BEEF").unwrap();
    let (relay, mut joy, mut bus) = start_relay(Arc::new(hook));

    let sender = thread::spawn(move || {
        joy.send(Frame::from_log_line("02000300#9C64").unwrap()).unwrap();
        joy.send(Frame::from_log_line("123#9C64").unwrap()).unwrap();
        joy
    });

    let rewritten = bus.receive_timeout(RECV_TIMEOUT).unwrap();
    assert!(is_movement_frame(rewritten.id));
    assert_eq!(rewritten.payload(), &[0xBE, 0xEF]);

    let untouched = bus.receive_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(untouched.payload(), &[0x9C, 0x64]);

    let joy = sender.join().unwrap();
    drop(joy);
    drop(bus);
    wait_until_stopped(&relay);

    let stats = relay.shutdown();
    assert_eq!(stats.joy_to_bus_frames, 2);
    assert_eq!(stats.intercepted, 1);
}

#[test]
fn test_relay_hook_can_suppress_frames() {
    let hook = |frame: Frame| -> Option<Frame> {
        if is_movement_frame(frame.id) { None } else { Some(frame) }
    };
    let (relay, mut joy, mut bus) = start_relay(Arc::new(hook));

    let sender = thread::spawn(move || {
        joy.send(Frame::from_log_line("02000100#0064").unwrap()).unwrap();
        joy.send(Frame::from_log_line("181C0100#0260").unwrap()).unwrap();
        joy
    });

    let frame = bus.receive_timeout(RECV_TIMEOUT).unwrap();
    assert_eq!(frame, Frame::from_log_line("181C0100#0260").unwrap());

    let joy = sender.join().unwrap();
    drop(joy);
    drop(bus);
    wait_until_stopped(&relay);

    let stats = relay.shutdown();
    assert_eq!(stats.suppressed, 1);
    assert_eq!(stats.joy_to_bus_frames, 1);
}

#[test]
fn test_relay_stops_when_both_sides_disconnect() {
    let (relay, joy, bus) = start_relay(Arc::new(PassThrough));
    assert!(relay.is_running());

    drop(joy);
    drop(bus);
    wait_until_stopped(&relay);
    assert!(!relay.is_running());

    let stats = relay.shutdown();
    assert_eq!(stats.total_forwarded(), 0);
    assert_eq!(stats.rx_errors, 2);
}

#[test]
fn test_relay_shutdown_with_idle_peers() {
    let (relay, _joy, _bus) = start_relay(Arc::new(PassThrough));
    thread::sleep(Duration::from_millis(20));
    let stats = relay.shutdown();
    assert_eq!(stats.total_forwarded(), 0);
}

/// 按脚本返回结果的读端；脚本读完后报告对端断开
struct ScriptedRx {
    script: VecDeque<Result<Frame, CanError>>,
}

impl RxAdapter for ScriptedRx {
    fn receive(&mut self) -> Result<Frame, CanError> {
        self.script.pop_front().unwrap_or(Err(CanError::Disconnected))
    }
}

/// 前 `failures` 次发送失败，之后把帧交给测试线程
struct ScriptedTx {
    failures: usize,
    sent: Sender<Frame>,
}

impl TxAdapter for ScriptedTx {
    fn send(&mut self, frame: Frame) -> Result<(), CanError> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(CanError::Io(std::io::Error::other("tx queue full")));
        }
        self.sent.send(frame).map_err(|_| CanError::Disconnected)
    }
}

struct ScriptedAdapter {
    rx: ScriptedRx,
    tx: ScriptedTx,
}

impl ScriptedAdapter {
    fn new(script: Vec<Result<Frame, CanError>>, failures: usize) -> (Self, Receiver<Frame>) {
        let (sent, observed) = unbounded();
        let adapter = Self {
            rx: ScriptedRx {
                script: script.into(),
            },
            tx: ScriptedTx { failures, sent },
        };
        (adapter, observed)
    }
}

impl CanAdapter for ScriptedAdapter {
    fn send(&mut self, frame: Frame) -> Result<(), CanError> {
        self.tx.send(frame)
    }

    fn receive(&mut self) -> Result<Frame, CanError> {
        self.rx.receive()
    }
}

impl SplittableAdapter for ScriptedAdapter {
    type RxAdapter = ScriptedRx;
    type TxAdapter = ScriptedTx;

    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError> {
        Ok((self.rx, self.tx))
    }
}

#[test]
fn test_relay_keeps_forwarding_after_transient_errors() {
    let frames: Vec<Frame> = ["02000100#0064", "181C0100#0260", "02000100#9C00"]
        .iter()
        .map(|line| Frame::from_log_line(line).unwrap())
        .collect();
    let reply = Frame::from_log_line("0C140300#01").unwrap();

    // 摇杆侧：先读失败一次，再读到三帧
    let mut joy_script = vec![Err(CanError::Io(std::io::Error::other("rx glitch")))];
    joy_script.extend(frames.iter().copied().map(Ok));
    let (joy, to_joy) = ScriptedAdapter::new(joy_script, 0);
    // 驱动侧：第一次发送失败
    let (bus, to_bus) = ScriptedAdapter::new(vec![Ok(reply)], 1);

    let relay = BusRelay::start(joy, bus, Arc::new(PassThrough), test_config()).unwrap();
    wait_until_stopped(&relay);
    let stats = relay.shutdown();

    // 第一帧在发送时丢失，其余帧按顺序到达
    let delivered: Vec<Frame> = to_bus.try_iter().collect();
    assert_eq!(delivered, frames[1..].to_vec());
    assert_eq!(to_joy.try_iter().collect::<Vec<_>>(), vec![reply]);

    assert_eq!(stats.joy_to_bus_frames, 3);
    assert_eq!(stats.bus_to_joy_frames, 1);
    assert_eq!(stats.tx_errors, 1);
    // 一次普通读错误 + 两端脚本结束时的断开
    assert_eq!(stats.rx_errors, 3);
}
