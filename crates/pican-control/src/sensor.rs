//! 距离传感器模型
//!
//! 每个传感器从参考点沿固定瞄准角发射一条射线，按固定步长逐点测试
//! 是否落入障碍物，记录阈值内最近的命中距离。

use crate::{ContainmentMode, Obstacle, Vector2D};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// 默认射线步长
pub const DEFAULT_RAY_STEP: f64 = 0.1;

/// 单条射线的最大步数
pub const MAX_RAY_STEPS: u32 = 1_000_000;

/// 传感器安装位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SensorLocation {
    FrontLeft,
    FrontCenter,
    FrontRight,
}

impl SensorLocation {
    /// 射线瞄准角（度）
    pub fn aim_deg(self) -> f64 {
        match self {
            SensorLocation::FrontLeft => 135.0,
            SensorLocation::FrontCenter => 90.0,
            SensorLocation::FrontRight => 45.0,
        }
    }

    /// 推离方向（度，相对轮椅朝向）
    ///
    /// - 正前方 → 后退
    /// - 左前方 → 向右
    /// - 右前方 → 向左
    pub fn escape_deg(self) -> f64 {
        match self {
            SensorLocation::FrontLeft => 0.0,
            SensorLocation::FrontCenter => -90.0,
            SensorLocation::FrontRight => 180.0,
        }
    }
}

impl fmt::Display for SensorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorLocation::FrontLeft => write!(f, "front-left"),
            SensorLocation::FrontCenter => write!(f, "front-center"),
            SensorLocation::FrontRight => write!(f, "front-right"),
        }
    }
}

/// 单个距离传感器
///
/// `observed` 每个控制周期由 `measure()` 重新计算，始终不超过 `threshold`。
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    location: SensorLocation,
    threshold: f64,
    pushback: f64,
    step: f64,
    observed: f64,
}

impl Sensor {
    /// 创建传感器（尚未测量时 `observed == threshold`）
    pub fn new(location: SensorLocation, threshold: f64, pushback: f64) -> Self {
        Self {
            location,
            threshold,
            pushback,
            step: DEFAULT_RAY_STEP,
            observed: threshold,
        }
    }

    /// 修改射线步长
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    pub fn location(&self) -> SensorLocation {
        self.location
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn observed(&self) -> f64 {
        self.observed
    }

    pub fn pushback_magnitude(&self) -> f64 {
        self.pushback
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// 测量到最近障碍物的距离
    ///
    /// 测试点从 `origin` 出发，每步前进 `step`，直到（不含）`threshold`，
    /// 最多 [`MAX_RAY_STEPS`] 步。
    /// 每一步都对所有障碍物做包含测试；命中距离小于当前值时更新。
    pub fn measure(&mut self, origin: Vector2D, obstacles: &[Obstacle], mode: ContainmentMode) {
        self.observed = self.threshold;
        if self.step <= 0.0 || !self.step.is_finite() {
            return;
        }

        let direction = Vector2D::from_angle_deg(self.location.aim_deg());
        // 用乘法而不是累加，避免浮点误差积累
        for k in 1..=MAX_RAY_STEPS {
            let distance = f64::from(k) * self.step;
            if distance >= self.threshold {
                break;
            }

            let point = origin + direction * distance;
            for obstacle in obstacles {
                if obstacle.contains(point, mode) && distance < self.observed {
                    trace!(
                        "[{}] hit at {} ({:.2})",
                        self.location, point, distance
                    );
                    self.observed = distance;
                }
            }
        }
    }

    /// `observed < threshold`
    pub fn triggered(&self) -> bool {
        self.observed < self.threshold
    }

    /// 接近程度：阈值处为 0，接触时为 1
    pub fn proximity(&self) -> f64 {
        if self.threshold <= 0.0 {
            return 0.0;
        }
        (1.0 - self.observed / self.threshold).clamp(0.0, 1.0)
    }

    /// 推离向量
    ///
    /// 未触发时为零向量；否则为 `escape_deg + bearing` 方向的单位向量，
    /// 乘以 `pushback * proximity()`。
    pub fn pushback(&self, bearing_deg: f64) -> Vector2D {
        if !self.triggered() {
            return Vector2D::ZERO;
        }
        Vector2D::from_angle_deg(self.location.escape_deg() + bearing_deg)
            * (self.pushback * self.proximity())
    }
}
