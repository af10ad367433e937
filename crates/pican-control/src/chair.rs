//! 轮椅运动学模型（无界面仿真）
//!
//! 尺寸与速度档位取自 Permobil M300 Corpus HD 用户手册（第 37 页）。
//! 控制核心只读取 `ChairSnapshot`；`ChairModel` 供 `simulate` 命令和测试使用。

use crate::geometry::wrap_degrees;
use crate::world::WORLD_UNITS_PER_METER;
use crate::{ContainmentMode, Obstacle, Vector2D};
use pican_protocol::{Frame, command_to_joystick, is_movement_frame};
use tracing::{debug, trace};

/// 1 mph 对应的米/秒
pub const MILES_PER_HOUR: f64 = 0.44704;

/// 室内档位速度（mph）
pub const INDOOR_SPEEDS_MPH: [f64; 5] = [0.8, 1.3, 1.7, 2.2, 2.7];

pub const CHAIR_WIDTH_METERS: f64 = 0.860;
pub const CHAIR_LENGTH_METERS: f64 = 1.190;
pub const CHAIR_MIN_TURN_RADIUS_METERS: f64 = 0.560;

/// 某档位的速度（米/周期）
pub fn tier_speed(tier: usize) -> f64 {
    INDOOR_SPEEDS_MPH[tier % INDOOR_SPEEDS_MPH.len()] * MILES_PER_HOUR
}

/// 轮椅状态的不可变快照
///
/// `position` 是车身左侧边缘的中点（世界单位）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChairSnapshot {
    pub position: Vector2D,
    /// 朝向（度，`[0, 360)`），0° 朝 +Y
    pub bearing_deg: f64,
    pub speed_tier: usize,
}

impl ChairSnapshot {
    /// 传感器参考点：车身中心
    pub fn sensor_origin(&self) -> Vector2D {
        self.position + Vector2D::new(chair_width_units() / 2.0, 0.0)
    }

    /// 朝向单位向量
    pub fn heading(&self) -> Vector2D {
        let (sin, cos) = self.bearing_deg.to_radians().sin_cos();
        Vector2D::new(-sin, cos)
    }

    /// 碰撞检测用的四个角点（各向内收 1 个单位）
    pub fn footprint(&self) -> [Vector2D; 4] {
        let Vector2D { x, y } = self.position;
        let w = chair_width_units();
        let half_l = chair_length_units() / 2.0;
        [
            Vector2D::new(x + 1.0, y + 1.0 - half_l),
            Vector2D::new(x + w - 1.0, y + 1.0 - half_l),
            Vector2D::new(x + w - 1.0, y - 1.0 + half_l),
            Vector2D::new(x + 1.0, y - 1.0 + half_l),
        ]
    }
}

fn chair_width_units() -> f64 {
    CHAIR_WIDTH_METERS * WORLD_UNITS_PER_METER
}

fn chair_length_units() -> f64 {
    CHAIR_LENGTH_METERS * WORLD_UNITS_PER_METER
}

/// 轮椅运动学模型
///
/// 每个周期读取至多一个运动帧：前向分量按当前档位速度前进，
/// 侧向分量在最小转弯半径约束下改变朝向。撞墙时回退到上一位置。
#[derive(Debug, Clone)]
pub struct ChairModel {
    position: Vector2D,
    bearing_deg: f64,
    speed_tier: usize,
    joy_forward: f64,
    joy_side: f64,
    collisions: u64,
}

impl ChairModel {
    pub fn new(position: Vector2D) -> Self {
        Self {
            position,
            bearing_deg: 0.0,
            speed_tier: 0,
            joy_forward: 0.0,
            joy_side: 0.0,
            collisions: 0,
        }
    }

    pub fn snapshot(&self) -> ChairSnapshot {
        ChairSnapshot {
            position: self.position,
            bearing_deg: self.bearing_deg,
            speed_tier: self.speed_tier,
        }
    }

    pub fn set_position(&mut self, position: Vector2D) {
        self.position = position;
    }

    pub fn set_bearing(&mut self, degrees: f64) {
        self.bearing_deg = wrap_degrees(degrees);
    }

    /// 设置速度档位（超出范围时取模）
    pub fn set_speed_tier(&mut self, tier: usize) {
        self.speed_tier = tier % INDOOR_SPEEDS_MPH.len();
    }

    /// 最近一个周期的 `(forward, side)` 输入
    pub fn last_input(&self) -> (f64, f64) {
        (self.joy_forward, self.joy_side)
    }

    /// 累计碰撞次数
    pub fn collisions(&self) -> u64 {
        self.collisions
    }

    /// 推进一个周期
    pub fn step(
        &mut self,
        frame: Option<Frame>,
        obstacles: &[Obstacle],
        mode: ContainmentMode,
    ) -> ChairSnapshot {
        self.joy_forward = 0.0;
        self.joy_side = 0.0;

        if let Some(frame) = frame
            && is_movement_frame(frame.id)
        {
            (self.joy_forward, self.joy_side) = command_to_joystick(frame.data[0], frame.data[1]);
        }

        let forward_len = self.joy_forward * tier_speed(self.speed_tier);
        // 弧长 = 半径 × 角度，转角上限由最小转弯半径决定
        let max_turn_rad = forward_len / CHAIR_MIN_TURN_RADIUS_METERS;
        self.bearing_deg = wrap_degrees(self.bearing_deg + (self.joy_side * max_turn_rad).to_degrees());

        let last = self.position;
        let heading = self.snapshot().heading();
        self.position += heading * (forward_len * WORLD_UNITS_PER_METER);

        let footprint = self.snapshot().footprint();
        let collided = obstacles
            .iter()
            .any(|o| footprint.iter().any(|&p| o.contains(p, mode)));
        if collided {
            debug!("Chair collided at {}, rolling back to {}", self.position, last);
            self.position = last;
            self.collisions += 1;
        }

        trace!(
            "Chair at {} bearing {:.1}° (fwd {:.2}, side {:.2})",
            self.position, self.bearing_deg, self.joy_forward, self.joy_side
        );
        self.snapshot()
    }
}

impl Default for ChairModel {
    fn default() -> Self {
        Self::new(Vector2D::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::rect;
    use approx::assert_relative_eq;
    use pican_protocol::{AxisCommand, movement_frame};

    fn forward_frame(first: i8, second: i8) -> Frame {
        movement_frame(1, AxisCommand::new(first, second)).unwrap()
    }

    #[test]
    fn test_tier_speeds() {
        assert_relative_eq!(tier_speed(0), 0.8 * 0.44704, epsilon = 1e-12);
        assert_relative_eq!(tier_speed(4), 2.7 * 0.44704, epsilon = 1e-12);
        assert_eq!(tier_speed(5), tier_speed(0));
    }

    #[test]
    fn test_idle_without_frame() {
        let mut chair = ChairModel::default();
        let snapshot = chair.step(None, &[], ContainmentMode::Polygon);
        assert_eq!(snapshot.position, Vector2D::ZERO);
        assert_eq!(snapshot.bearing_deg, 0.0);
        assert_eq!(chair.last_input(), (0.0, 0.0));
    }

    #[test]
    fn test_forward_moves_along_heading() {
        let mut chair = ChairModel::default();
        let snapshot = chair.step(Some(forward_frame(0, 100)), &[], ContainmentMode::Polygon);

        assert_relative_eq!(snapshot.position.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(
            snapshot.position.y,
            tier_speed(0) * WORLD_UNITS_PER_METER,
            epsilon = 1e-9
        );
        assert_eq!(chair.last_input(), (1.0, 0.0));
    }

    #[test]
    fn test_non_movement_frame_is_ignored() {
        let mut chair = ChairModel::default();
        let frame = Frame::new_standard(0x123, &[0x00, 0x64]);
        let snapshot = chair.step(Some(frame), &[], ContainmentMode::Polygon);
        assert_eq!(snapshot.position, Vector2D::ZERO);
    }

    #[test]
    fn test_turn_limited_by_radius() {
        let mut chair = ChairModel::default();
        // 字节 0 = -40 → side = +0.4
        let snapshot = chair.step(Some(forward_frame(-40, 100)), &[], ContainmentMode::Polygon);
        let expected = (0.4 * tier_speed(0) / CHAIR_MIN_TURN_RADIUS_METERS).to_degrees();
        assert_relative_eq!(snapshot.bearing_deg, expected, epsilon = 1e-9);

        // 反向转弯越过 0° 后回绕
        let mut chair = ChairModel::default();
        let snapshot = chair.step(Some(forward_frame(40, 100)), &[], ContainmentMode::Polygon);
        assert_relative_eq!(snapshot.bearing_deg, 360.0 - expected, epsilon = 1e-9);
    }

    #[test]
    fn test_turning_in_place_is_impossible() {
        let mut chair = ChairModel::default();
        let snapshot = chair.step(Some(forward_frame(40, 0)), &[], ContainmentMode::Polygon);
        assert_eq!(snapshot.bearing_deg, 0.0);
    }

    #[test]
    fn test_wall_collision_rolls_back() {
        let mut chair = ChairModel::default();
        chair.set_speed_tier(4);
        // 一步前进约 30 个单位，前角点进入墙内
        let wall = [rect(-50.0, 20.0, 100.0, 100.0)];
        let snapshot = chair.step(Some(forward_frame(0, 100)), &wall, ContainmentMode::Polygon);

        assert_eq!(snapshot.position, Vector2D::ZERO);
        assert_eq!(chair.collisions(), 1);
    }

    #[test]
    fn test_setters() {
        let mut chair = ChairModel::default();
        chair.set_bearing(-90.0);
        chair.set_speed_tier(7);
        chair.set_position(Vector2D::new(1.0, 2.0));

        let snapshot = chair.snapshot();
        assert_eq!(snapshot.bearing_deg, 270.0);
        assert_eq!(snapshot.speed_tier, 2);
        assert_eq!(snapshot.position, Vector2D::new(1.0, 2.0));
        assert!(snapshot.heading().approx_eq(Vector2D::new(1.0, 0.0)));
        assert_relative_eq!(snapshot.sensor_origin().x, 1.0 + 0.43 * 25.0, epsilon = 1e-9);
    }
}
