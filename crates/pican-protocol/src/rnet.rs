//! R-Net 摇杆命令转换
//!
//! 摇杆轴值（`[-1.0, 1.0]`）与运动帧前两个数据字节（有符号 8 位）之间的双向转换。
//!
//! 通道约定：
//! - 字节 0（`first`）：限幅 `[-40, 40]`，解码后为侧向分量（取反）
//! - 字节 1（`second`）：限幅 `[-100, 100]`，解码后为前向分量

use crate::frame::Frame;
use crate::ids::movement_frame_id;
use crate::ProtocolError;

/// 输出范围上限
pub const MAX_XY_DATA: i8 = 100;
/// 输出范围下限
pub const MIN_XY_DATA: i8 = -100;
/// 摇杆输入上限
pub const MAX_XY_JOY: f32 = 1.0;
/// 摇杆输入下限
pub const MIN_XY_JOY: f32 = -1.0;

/// 字节 0 的限幅（实测摇杆在 0x28 停止）
pub const LIMIT_FIRST: i8 = 40;
/// 字节 1 的限幅
pub const LIMIT_SECOND: i8 = 100;

/// 死区半径的平方
pub const DEAD_ZONE_SQ: f32 = 0.01;

/// 解码时侧向分量的比例（取反）
pub const INPUT_SCALE_SIDE: f64 = -1.0;
/// 解码时前向分量的比例
pub const INPUT_SCALE_FWD: f64 = 1.0;

/// 运动帧数据长度
pub const MOVEMENT_FRAME_LEN: u8 = 2;

/// 运动帧中的一对轴命令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisCommand {
    /// 字节 0（±40）
    pub first: i8,
    /// 字节 1（±100）
    pub second: i8,
}

impl AxisCommand {
    pub fn new(first: i8, second: i8) -> Self {
        Self { first, second }
    }

    /// 转换为线上字节（补码）
    pub fn to_bytes(self) -> [u8; 2] {
        [self.first as u8, self.second as u8]
    }

    /// 从帧的前两个数据字节读取
    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            first: frame.data[0] as i8,
            second: frame.data[1] as i8,
        }
    }

    /// 只改写帧的字节 0-1，其余字段保持不变
    ///
    /// 长度不足 2 时提升为 2。
    pub fn write_into(self, mut frame: Frame) -> Frame {
        let [b0, b1] = self.to_bytes();
        frame.data[0] = b0;
        frame.data[1] = b1;
        frame.len = frame.len.max(MOVEMENT_FRAME_LEN);
        frame
    }
}

/// 单轴处理：死区 → 限幅到 `[-1, 1]` → 缩放 → 向零截断
fn scale_axis(value: f32) -> i8 {
    let value = if value * value <= DEAD_ZONE_SQ {
        0.0
    } else {
        value.clamp(MIN_XY_JOY, MAX_XY_JOY)
    };

    let factor = (f32::from(MAX_XY_DATA) - f32::from(MIN_XY_DATA)) / (MAX_XY_JOY - MIN_XY_JOY);
    // `as` 向零截断；NaN 变为 0
    (value * factor) as i8
}

/// 摇杆轴值 → 命令字节
///
/// # 示例
///
/// ```
/// use pican_protocol::{AxisCommand, joystick_to_command};
///
/// assert_eq!(joystick_to_command(0.05, -0.08), AxisCommand::new(0, 0));
/// assert_eq!(joystick_to_command(1.2, 1.2), AxisCommand::new(40, 100));
/// assert_eq!(joystick_to_command(-0.3, 0.5), AxisCommand::new(-30, 50));
/// ```
pub fn joystick_to_command(x: f32, y: f32) -> AxisCommand {
    AxisCommand {
        first: scale_axis(x).clamp(-LIMIT_FIRST, LIMIT_FIRST),
        second: scale_axis(y).clamp(-LIMIT_SECOND, LIMIT_SECOND),
    }
}

/// 带校验的 `joystick_to_command`（用于计算得到的向量）
///
/// NaN 或无穷大会被 `as` 静默转换，这里改为返回错误。
pub fn try_joystick_to_command(x: f64, y: f64) -> Result<AxisCommand, ProtocolError> {
    if !x.is_finite() || !y.is_finite() {
        return Err(ProtocolError::NonFiniteAxis { x, y });
    }
    Ok(joystick_to_command(x as f32, y as f32))
}

/// 命令字节 → `(forward, side)`
///
/// 字节按补码解释；零字节精确映射为 `0.0`。
pub fn command_to_joystick(b0: u8, b1: u8) -> (f64, f64) {
    let (first, second) = (b0 as i8, b1 as i8);

    let side = if first != 0 {
        INPUT_SCALE_SIDE * f64::from(first) / 100.0
    } else {
        0.0
    };
    let forward = if second != 0 {
        INPUT_SCALE_FWD * f64::from(second) / 100.0
    } else {
        0.0
    };

    (forward, side)
}

/// 构造指定实例号的运动帧（长度 2）
pub fn movement_frame(instance: u8, command: AxisCommand) -> Result<Frame, ProtocolError> {
    let id = movement_frame_id(instance)?;
    let frame = Frame {
        id,
        len: MOVEMENT_FRAME_LEN,
        ..Default::default()
    };
    Ok(command.write_into(frame))
}
