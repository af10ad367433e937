//! # PiCAN Protocol
//!
//! 轮椅 CAN 总线协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `frame`: CAN 帧结构、16 字节二进制编解码、candump 日志行解析
//! - `ids`: CAN ID 标志位常量与 R-Net 运动帧识别
//! - `rnet`: 摇杆轴值 ⇄ R-Net 命令字节转换
//!
//! ## 字节序
//!
//! 二进制帧布局与 Linux `struct can_frame` 一致，ID 字段为小端字节序。
//! 日志行中的 ID 按大端书写（与 `cansend`/`candump` 一致）。

pub mod frame;
pub mod ids;
pub mod rnet;

// 重新导出常用类型
pub use frame::{FRAME_SIZE, Frame, MAX_DLC};
pub use ids::*;
pub use rnet::{
    AxisCommand, command_to_joystick, joystick_to_command, movement_frame, try_joystick_to_command,
};

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// 日志行包含 `R`（远程帧请求不支持）
    #[error("invalid input: 'R' not supported")]
    RemoteFrameUnsupported,

    /// 缺少 `#` 分隔符，或出现多个 `#`
    #[error("invalid input: expected single # separator")]
    InvalidSeparator,

    /// ID 字段宽度不是 3 或 8 个十六进制字符
    #[error("invalid input: id expected to be 3 or 8 hex chars, got {width}")]
    InvalidIdWidth { width: usize },

    /// 数据字段长度为奇数
    #[error("invalid input: data expected to be even-numbered hex chars, got {len}")]
    OddDataLength { len: usize },

    /// 数据字段超过 16 个十六进制字符
    #[error("invalid input: max data length is 16 hex chars, got {len}")]
    DataTooLong { len: usize },

    /// 数据字段为空
    #[error("invalid input: missing data")]
    MissingData,

    /// 十六进制解码失败
    #[error("invalid input: {field} not hex-encoded: {reason}")]
    InvalidHex { field: &'static str, reason: String },

    /// 帧超过 16 字节（DLC > 8）
    #[error("frame too large: dlc {dlc} exceeds 8 bytes, 16-byte maximum")]
    FrameTooLarge { dlc: u8 },

    /// 二进制缓冲区长度不足
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// R-Net 设备实例号超出 4 bit 范围
    #[error("device instance {instance} does not fit the JSM nibble (0-15)")]
    InvalidDeviceInstance { instance: u8 },

    /// 摇杆向量不是有限值（NaN 或无穷大）
    #[error("axis value is not finite: ({x}, {y})")]
    NonFiniteAxis { x: f64, y: f64 },
}
