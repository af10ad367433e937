//! 避障控制器
//!
//! 每个控制周期：
//!
//! 1. 所有传感器重新测量，读数通过 `ArcSwap` 发布（无锁）
//! 2. 非阻塞地从入站通道取出至多一帧（`try_recv`）
//! 3. 运动帧按最近的已触发传感器修正方向，保持输入强度不变
//! 4. 非阻塞地写入单槽出站通道（`try_send`，满则丢帧）
//!
//! 中继线程上的 `AvoidanceHook` 共享同一份读数与禁用标志，
//! 可以直接作为 `BusRelay` 的拦截钩子。

use crate::{
    AvoidanceConfig, ChairSnapshot, ContainmentMode, ControlError, Obstacle, Sensor, Vector2D,
};
use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use pican_driver::InterceptHook;
use pican_protocol::rnet::{INPUT_SCALE_FWD, INPUT_SCALE_SIDE};
use pican_protocol::{Frame, command_to_joystick, is_movement_frame, try_joystick_to_command};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace, warn};

/// 一个控制周期的传感器读数
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SensorReadings {
    /// 测量时的轮椅朝向（度）
    pub bearing_deg: f64,
    pub sensors: Vec<Sensor>,
}

impl SensorReadings {
    /// 距离最近的已触发传感器
    ///
    /// 距离相同时取列表中靠前的一个。
    pub fn closest_triggered(&self) -> Option<&Sensor> {
        self.sensors
            .iter()
            .filter(|s| s.triggered())
            .fold(None, |closest: Option<&Sensor>, s| match closest {
                Some(c) if c.observed() <= s.observed() => Some(c),
                _ => Some(s),
            })
    }

    pub fn any_triggered(&self) -> bool {
        self.sensors.iter().any(Sensor::triggered)
    }
}

/// 按读数修正一帧
///
/// - 非运动帧、没有触发的传感器：原样返回
/// - 否则 `(side, forward) + pushback`，缩放回输入强度后重新编码字节 0-1，
///   ID、长度和其余字节保持不变
///
/// # 错误
/// - `ControlError::Protocol`: 修正后的向量不是有限值
pub fn correct_frame(frame: Frame, readings: &SensorReadings) -> Result<Frame, ControlError> {
    if !is_movement_frame(frame.id) {
        return Ok(frame);
    }
    let Some(closest) = readings.closest_triggered() else {
        return Ok(frame);
    };

    let (forward, side) = command_to_joystick(frame.data[0], frame.data[1]);
    let input = Vector2D::new(side, forward);

    let corrected = blend(input, closest.pushback(readings.bearing_deg));

    let command =
        try_joystick_to_command(corrected.x * INPUT_SCALE_SIDE, corrected.y * INPUT_SCALE_FWD)?;
    trace!(
        "[{}] {} -> {} (observed {:.2})",
        closest.location(),
        input,
        corrected,
        closest.observed()
    );
    Ok(command.write_into(frame))
}

/// 把推离向量叠加到输入上，再缩放回输入的强度
///
/// 输入为零时返回纯推离向量；叠加结果为零时返回未缩放的结果。
pub fn blend(input: Vector2D, pushback: Vector2D) -> Vector2D {
    let pushed = input + pushback;
    let magnitude = input.mag();
    if magnitude > 0.0 {
        pushed.with_mag(magnitude).unwrap_or(pushed)
    } else {
        pushed
    }
}

/// 修正失败时记录日志并放行原始帧
fn apply(frame: Frame, readings: &SensorReadings) -> Frame {
    match correct_frame(frame, readings) {
        Ok(out) => out,
        Err(e) => {
            warn!("Failed to re-encode corrected frame {}: {}, forwarding original", frame, e);
            frame
        },
    }
}

/// 单个控制周期的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// 本周期没有待处理的帧
    Idle,
    /// 已转发（`corrected` 表示帧被修改过）
    Forwarded { corrected: bool },
    /// 出站槽位已满，帧被丢弃
    Dropped,
}

/// 避障控制器
pub struct AvoidanceController {
    sensors: Vec<Sensor>,
    containment: ContainmentMode,
    disabled: Arc<AtomicBool>,
    readings: Arc<ArcSwap<SensorReadings>>,
    inbound: Receiver<Frame>,
    outbound: Sender<Frame>,
}

impl AvoidanceController {
    /// 使用外部提供的通道创建控制器
    ///
    /// - `inbound`: 摇杆侧发来的帧
    /// - `outbound`: 发往驱动侧的帧（建议容量为 1）
    pub fn new(config: &AvoidanceConfig, inbound: Receiver<Frame>, outbound: Sender<Frame>) -> Self {
        let sensors = config.build_sensors();
        let readings = SensorReadings {
            bearing_deg: 0.0,
            sensors: sensors.clone(),
        };
        Self {
            sensors,
            containment: config.containment,
            disabled: Arc::new(AtomicBool::new(false)),
            readings: Arc::new(ArcSwap::from_pointee(readings)),
            inbound,
            outbound,
        }
    }

    /// 创建控制器及其两条单槽通道
    ///
    /// 返回 `(控制器, 入站发送端, 出站接收端)`。
    ///
    /// # 示例
    ///
    /// ```
    /// use pican_control::{AvoidanceConfig, AvoidanceController, ChairModel, CycleOutcome};
    /// use pican_protocol::{AxisCommand, movement_frame};
    ///
    /// let (mut controller, joystick, chair_bus) =
    ///     AvoidanceController::with_conduits(&AvoidanceConfig::default());
    ///
    /// let frame = movement_frame(1, AxisCommand::new(0, 100)).unwrap();
    /// joystick.try_send(frame).unwrap();
    ///
    /// let snapshot = ChairModel::default().snapshot();
    /// let outcome = controller.update(&snapshot, &[]).unwrap();
    /// assert_eq!(outcome, CycleOutcome::Forwarded { corrected: false });
    /// assert_eq!(chair_bus.try_recv().unwrap(), frame);
    /// ```
    pub fn with_conduits(config: &AvoidanceConfig) -> (Self, Sender<Frame>, Receiver<Frame>) {
        let (inbound_tx, inbound_rx) = bounded(1);
        let (outbound_tx, outbound_rx) = bounded(1);
        (Self::new(config, inbound_rx, outbound_tx), inbound_tx, outbound_rx)
    }

    /// 执行一个控制周期（不阻塞）
    ///
    /// # 错误
    /// - `ControlError::ConduitClosed`: 入站发送端或出站接收端已全部释放
    pub fn update(
        &mut self,
        snapshot: &ChairSnapshot,
        obstacles: &[Obstacle],
    ) -> Result<CycleOutcome, ControlError> {
        let origin = snapshot.sensor_origin();
        for sensor in &mut self.sensors {
            sensor.measure(origin, obstacles, self.containment);
        }

        let readings = SensorReadings {
            bearing_deg: snapshot.bearing_deg,
            sensors: self.sensors.clone(),
        };
        if readings.any_triggered() {
            debug!(
                "Avoidance readings at {}: {}",
                origin,
                readings
                    .sensors
                    .iter()
                    .map(|s| format!("{}={:.1}", s.location(), s.observed()))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        self.readings.store(Arc::new(readings));

        let frame = match self.inbound.try_recv() {
            Ok(frame) => frame,
            Err(TryRecvError::Empty) => return Ok(CycleOutcome::Idle),
            Err(TryRecvError::Disconnected) => return Err(ControlError::ConduitClosed),
        };

        let out = self.intercept(frame);
        let corrected = out != frame;
        match self.outbound.try_send(out) {
            Ok(()) => Ok(CycleOutcome::Forwarded { corrected }),
            Err(TrySendError::Full(dropped)) => {
                trace!("Outbound slot full, dropping {}", dropped);
                Ok(CycleOutcome::Dropped)
            },
            Err(TrySendError::Disconnected(_)) => Err(ControlError::ConduitClosed),
        }
    }

    /// 对单帧应用避障（使用最近一次发布的读数）
    pub fn intercept(&self, frame: Frame) -> Frame {
        if self.is_disabled() {
            return frame;
        }
        apply(frame, &self.readings.load())
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Release);
        debug!("Avoidance {}", if disabled { "disabled" } else { "enabled" });
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    /// 最近一次发布的读数
    pub fn readings(&self) -> Arc<SensorReadings> {
        self.readings.load_full()
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    /// 共享读数与禁用标志的中继钩子
    pub fn hook(&self) -> AvoidanceHook {
        AvoidanceHook {
            readings: self.readings.clone(),
            disabled: self.disabled.clone(),
        }
    }
}

/// 中继线程上的避障钩子
///
/// 只读取控制器发布的读数，不做测量，满足钩子的非阻塞要求。
#[derive(Clone)]
pub struct AvoidanceHook {
    readings: Arc<ArcSwap<SensorReadings>>,
    disabled: Arc<AtomicBool>,
}

impl InterceptHook for AvoidanceHook {
    fn intercept(&self, frame: Frame) -> Option<Frame> {
        if self.disabled.load(Ordering::Acquire) {
            return Some(frame);
        }
        Some(apply(frame, &self.readings.load()))
    }
}
