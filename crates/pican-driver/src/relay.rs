//! 双总线中继
//!
//! 摇杆侧（A）与驱动侧（B）各有一个 RX 读线程和一个 TX 写线程，
//! 中间由一个转发线程通过 crossbeam 通道连接：
//!
//! - 读线程只做 `receive()` 并投递到各自的通道（`try_send`，永不阻塞另一方向）
//! - 转发线程对 A→B 的帧调用 `InterceptHook`，B→A 的帧原样转发
//! - 写线程只做 `send()`
//!
//! 一个方向的 IO 错误只影响该方向：普通错误记录日志后继续，
//! 只有致命错误（总线关闭、对端断开）才会结束对应的读线程。

use crate::{DriverError, InterceptHook, MetricsSnapshot, RelayMetrics};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, never, select, unbounded};
use pican_can::{CanError, Frame, RxAdapter, SplittableAdapter, TxAdapter};
use pican_protocol::FrameKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// 转发方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// 摇杆侧 → 驱动侧（经过钩子）
    JoyToBus,
    /// 驱动侧 → 摇杆侧（原样转发）
    BusToJoy,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::JoyToBus => write!(f, "joy->bus"),
            Direction::BusToJoy => write!(f, "bus->joy"),
        }
    }
}

/// 中继配置
///
/// # Example
///
/// ```
/// use pican_driver::RelayConfig;
///
/// let config: RelayConfig = toml::from_str("poll_interval_ms = 10").unwrap();
/// assert_eq!(config.poll_interval_ms, 10);
/// assert_eq!(config.conduit_capacity, RelayConfig::default().conduit_capacity);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// 读线程 → 转发线程 通道容量（满时丢帧）
    pub conduit_capacity: usize,
    /// 转发线程空闲时检查运行标志的间隔（毫秒）
    pub poll_interval_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            conduit_capacity: 1024,
            poll_interval_ms: 50,
        }
    }
}

impl RelayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// 运行中的中继
///
/// `shutdown()` 停止转发并回收线程；直接 drop 只会发出停止信号。
///
/// # 示例
///
/// ```no_run
/// use pican_can::bind;
/// use pican_driver::{BusRelay, PassThrough, RelayConfig};
/// use std::sync::Arc;
///
/// let joy = bind("vcan0").unwrap();
/// let bus = bind("vcan1").unwrap();
/// let relay = BusRelay::start(joy, bus, Arc::new(PassThrough), RelayConfig::default()).unwrap();
/// // ...
/// let stats = relay.shutdown();
/// println!("forwarded {} frames", stats.total_forwarded());
/// ```
pub struct BusRelay {
    is_running: Arc<AtomicBool>,
    metrics: Arc<RelayMetrics>,
    forward: Option<JoinHandle<()>>,
    writers: Vec<JoinHandle<()>>,
    pumps: Vec<JoinHandle<()>>,
}

fn spawn_named<F>(name: &str, f: F) -> Result<JoinHandle<()>, DriverError>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(|e| DriverError::IoThread(format!("failed to spawn '{}': {}", name, e)))
}

impl BusRelay {
    /// 启动中继
    ///
    /// # 参数
    /// - `joy`: 摇杆侧适配器（A）
    /// - `bus`: 驱动侧适配器（B）
    /// - `hook`: A→B 方向的拦截钩子
    ///
    /// # 错误
    /// - `DriverError::Can`: 适配器分离失败
    /// - `DriverError::IoThread`: 线程创建失败
    pub fn start<A, B>(
        joy: A,
        bus: B,
        hook: Arc<dyn InterceptHook>,
        config: RelayConfig,
    ) -> Result<Self, DriverError>
    where
        A: SplittableAdapter,
        A::RxAdapter: Send + 'static,
        A::TxAdapter: Send + 'static,
        B: SplittableAdapter,
        B::RxAdapter: Send + 'static,
        B::TxAdapter: Send + 'static,
    {
        let (joy_rx, joy_tx) = joy.split()?;
        let (bus_rx, bus_tx) = bus.split()?;

        let is_running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(RelayMetrics::new());
        let capacity = config.conduit_capacity.max(1);

        let (from_joy_tx, from_joy_rx) = bounded(capacity);
        let (from_bus_tx, from_bus_rx) = bounded(capacity);
        let (to_joy_tx, to_joy_rx) = unbounded();
        let (to_bus_tx, to_bus_rx) = unbounded();

        let mut relay = Self {
            is_running: is_running.clone(),
            metrics: metrics.clone(),
            forward: None,
            writers: Vec::with_capacity(2),
            pumps: Vec::with_capacity(2),
        };

        // 任一线程创建失败时，relay 在返回前被 drop，已启动的线程会收到停止信号
        relay.pumps.push(spawn_named("relay-rx-joy", {
            let is_running = is_running.clone();
            let metrics = metrics.clone();
            move || rx_pump(joy_rx, from_joy_tx, "joy", is_running, metrics)
        })?);
        relay.pumps.push(spawn_named("relay-rx-bus", {
            let is_running = is_running.clone();
            let metrics = metrics.clone();
            move || rx_pump(bus_rx, from_bus_tx, "bus", is_running, metrics)
        })?);

        relay.writers.push(spawn_named("relay-tx-bus", {
            let metrics = metrics.clone();
            move || tx_writer(bus_tx, to_bus_rx, "bus", metrics)
        })?);
        relay.writers.push(spawn_named("relay-tx-joy", {
            let metrics = metrics.clone();
            move || tx_writer(joy_tx, to_joy_rx, "joy", metrics)
        })?);

        let poll_interval = config.poll_interval();
        relay.forward = Some(spawn_named("relay-forward", move || {
            forward_loop(
                from_joy_rx,
                from_bus_rx,
                to_bus_tx,
                to_joy_tx,
                hook,
                is_running,
                metrics,
                poll_interval,
            )
        })?);

        info!("Bus relay started");
        Ok(relay)
    }

    /// 转发线程是否仍在运行
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// 共享的指标
    pub fn metrics(&self) -> Arc<RelayMetrics> {
        self.metrics.clone()
    }

    /// 停止中继并回收线程，返回最终指标
    ///
    /// 读线程如果仍阻塞在没有超时的 `receive()` 上（虚拟总线），会被分离而不是等待。
    pub fn shutdown(mut self) -> MetricsSnapshot {
        self.is_running.store(false, Ordering::Release);

        if let Some(handle) = self.forward.take()
            && handle.join().is_err()
        {
            error!("Relay forward thread panicked");
        }

        // 转发线程退出后写通道断开，写线程随之退出
        for handle in self.writers.drain(..) {
            if handle.join().is_err() {
                error!("Relay writer thread panicked");
            }
        }

        for handle in self.pumps.drain(..) {
            if handle.is_finished() {
                if handle.join().is_err() {
                    error!("Relay RX pump panicked");
                }
            } else {
                debug!("Relay RX pump still blocked in receive, detaching");
            }
        }

        let snapshot = self.metrics.snapshot();
        info!(
            "Bus relay stopped: joy->bus={}, bus->joy={}, intercepted={}, dropped={}",
            snapshot.joy_to_bus_frames,
            snapshot.bus_to_joy_frames,
            snapshot.intercepted,
            snapshot.dropped
        );
        snapshot
    }
}

impl Drop for BusRelay {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::Release);
    }
}

/// RX 读线程
///
/// 超时与普通错误后继续循环；致命错误或转发线程退出时结束。
fn rx_pump(
    mut rx: impl RxAdapter,
    conduit: Sender<Frame>,
    side: &'static str,
    is_running: Arc<AtomicBool>,
    metrics: Arc<RelayMetrics>,
) {
    loop {
        if !is_running.load(Ordering::Acquire) {
            trace!("[{}] RX pump: is_running flag is false, exiting", side);
            break;
        }

        let frame = match rx.receive() {
            Ok(frame) => frame,
            Err(CanError::Timeout) => {
                metrics.rx_timeouts.fetch_add(1, Ordering::Relaxed);
                continue;
            },
            Err(e) if e.is_fatal() => {
                metrics.rx_errors.fetch_add(1, Ordering::Relaxed);
                error!("[{}] RX pump: fatal error: {}, exiting", side, e);
                break;
            },
            Err(e) => {
                metrics.rx_errors.fetch_add(1, Ordering::Relaxed);
                warn!("[{}] read error: {}", side, e);
                continue;
            },
        };

        trace!("[{}] RX {} ({:?})", side, frame, FrameKind::classify(frame.id));
        match conduit.try_send(frame) {
            Ok(()) => {},
            Err(TrySendError::Full(frame)) => {
                metrics.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("[{}] relay conduit full, dropping {}", side, frame);
            },
            Err(TrySendError::Disconnected(_)) => {
                trace!("[{}] RX pump: forward loop gone, exiting", side);
                break;
            },
        }
    }

    trace!("[{}] RX pump: loop exited", side);
}

/// TX 写线程
///
/// 转发线程丢弃发送端后通道断开，循环自然结束。
fn tx_writer(
    mut tx: impl TxAdapter,
    conduit: Receiver<Frame>,
    side: &'static str,
    metrics: Arc<RelayMetrics>,
) {
    for frame in conduit.iter() {
        match tx.send(frame) {
            Ok(()) => trace!("[{}] TX {}", side, frame),
            Err(e) if e.is_fatal() => {
                metrics.tx_errors.fetch_add(1, Ordering::Relaxed);
                error!("[{}] TX writer: fatal error: {}, exiting", side, e);
                break;
            },
            Err(e) => {
                metrics.tx_errors.fetch_add(1, Ordering::Relaxed);
                warn!("[{}] send error: {}", side, e);
            },
        }
    }

    trace!("[{}] TX writer: loop exited", side);
}

/// 转发线程
#[allow(clippy::too_many_arguments)]
fn forward_loop(
    from_joy: Receiver<Frame>,
    from_bus: Receiver<Frame>,
    to_bus: Sender<Frame>,
    to_joy: Sender<Frame>,
    hook: Arc<dyn InterceptHook>,
    is_running: Arc<AtomicBool>,
    metrics: Arc<RelayMetrics>,
    poll_interval: Duration,
) {
    let mut from_joy = from_joy;
    let mut from_bus = from_bus;
    let mut open_pumps = 2;

    while is_running.load(Ordering::Acquire) {
        let mut closed = None;

        select! {
            recv(from_joy) -> msg => match msg {
                Ok(frame) => match hook.intercept(frame) {
                    Some(out) => {
                        if out != frame {
                            metrics.intercepted.fetch_add(1, Ordering::Relaxed);
                            trace!("[{}] intercepted {} -> {}", Direction::JoyToBus, frame, out);
                        }
                        forward(&to_bus, out, Direction::JoyToBus, &metrics);
                    },
                    None => {
                        metrics.suppressed.fetch_add(1, Ordering::Relaxed);
                        trace!("[{}] suppressed {}", Direction::JoyToBus, frame);
                    },
                },
                Err(_) => closed = Some(Direction::JoyToBus),
            },
            recv(from_bus) -> msg => match msg {
                Ok(frame) => forward(&to_joy, frame, Direction::BusToJoy, &metrics),
                Err(_) => closed = Some(Direction::BusToJoy),
            },
            default(poll_interval) => {},
        }

        // 已断开的通道换成 never()，避免 select! 反复命中
        match closed {
            Some(Direction::JoyToBus) => {
                debug!("joy RX pump ended");
                from_joy = never();
                open_pumps -= 1;
            },
            Some(Direction::BusToJoy) => {
                debug!("bus RX pump ended");
                from_bus = never();
                open_pumps -= 1;
            },
            None => {},
        }

        if open_pumps == 0 {
            info!("Both RX pumps ended, relay stopping");
            is_running.store(false, Ordering::Release);
            break;
        }
    }

    trace!("Relay forward loop exited");
}

fn forward(writer: &Sender<Frame>, frame: Frame, direction: Direction, metrics: &RelayMetrics) {
    if writer.send(frame).is_err() {
        metrics.dropped.fetch_add(1, Ordering::Relaxed);
        trace!("[{}] writer gone, dropping {}", direction, frame);
        return;
    }
    match direction {
        Direction::JoyToBus => metrics.joy_to_bus_frames.fetch_add(1, Ordering::Relaxed),
        Direction::BusToJoy => metrics.bus_to_joy_frames.fetch_add(1, Ordering::Relaxed),
    };
}
