//! CAN ID 常量与 R-Net 帧识别
//!
//! R-Net 运动帧使用 29-bit 扩展 ID `0x0200_0N00`，其中 `N` 为摇杆模块（JSM）的设备实例号。

use crate::ProtocolError;

/// 扩展帧标志（bit 31）
pub const CAN_EFF_FLAG: u32 = 0x8000_0000;

/// 远程帧请求标志（bit 30）
pub const CAN_RTR_FLAG: u32 = 0x4000_0000;

/// 错误帧标志（bit 29）
pub const CAN_ERR_FLAG: u32 = 0x2000_0000;

/// 标准帧 ID 掩码（11-bit）
pub const CAN_SFF_MASK: u32 = 0x0000_07FF;

/// 扩展帧 ID 掩码（29-bit）
pub const CAN_EFF_MASK: u32 = 0x1FFF_FFFF;

/// JSM 设备实例号所在的 4 bit
pub const JSM_ID_MASK: u32 = 0x0000_0F00;

/// 运动帧匹配模式（EFF 标志 + 0x0200_0F00）
pub const MOVEMENT_ARB_PATTERN: u32 = 0x8200_0F00;

/// 运动帧 ID 基址（不含 EFF 标志与实例号）
pub const MOVEMENT_BASE_ID: u32 = 0x0200_0000;

/// 设备实例号的最大值
pub const MAX_DEVICE_INSTANCE: u8 = 0x0F;

/// 判断是否为 R-Net 运动帧
///
/// 将实例号位强制置 1 后与模式做异或，结果为 0 即匹配。
/// 因此只有恰好 `0x0200_0N00 | EFF` 形式的 ID 会被识别。
pub fn is_movement_frame(id: u32) -> bool {
    (id | JSM_ID_MASK) ^ MOVEMENT_ARB_PATTERN == 0
}

/// 提取 JSM 设备实例号（0-15）
pub fn device_instance(id: u32) -> u8 {
    ((id & JSM_ID_MASK) >> 8) as u8
}

/// 构造指定实例号的运动帧 ID（含 EFF 标志）
pub fn movement_frame_id(instance: u8) -> Result<u32, ProtocolError> {
    if instance > MAX_DEVICE_INSTANCE {
        return Err(ProtocolError::InvalidDeviceInstance { instance });
    }
    Ok(CAN_EFF_FLAG | MOVEMENT_BASE_ID | (u32::from(instance) << 8))
}

/// 帧类型（用于日志与统计）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// R-Net 运动命令
    Movement { instance: u8 },
    /// 错误帧
    Error,
    /// 远程帧请求
    Remote,
    /// 其他数据帧
    Other,
}

impl FrameKind {
    pub fn classify(id: u32) -> Self {
        if id & CAN_ERR_FLAG != 0 {
            FrameKind::Error
        } else if id & CAN_RTR_FLAG != 0 {
            FrameKind::Remote
        } else if is_movement_frame(id) {
            FrameKind::Movement {
                instance: device_instance(id),
            }
        } else {
            FrameKind::Other
        }
    }
}
