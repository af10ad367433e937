//! 拦截钩子（Intercept Hook）
//!
//! 中继在把摇杆侧（A）的帧转发到驱动侧（B）之前调用钩子，
//! 钩子可以原样放行、替换帧内容，或者返回 `None` 丢弃该帧。
//!
//! # 性能要求
//!
//! 钩子在转发线程上同步执行，必须非阻塞：禁止 I/O、锁等待与阻塞的通道操作。
//!
//! # 使用示例
//!
//! ```rust
//! use pican_driver::hooks::{FixedPayloadHook, InterceptHook};
//! use pican_protocol::Frame;
//!
//! let hook = FixedPayloadHook::new(&[0xBE, 0xEF]).unwrap();
//! let frame = Frame::from_log_line("02000100#0064").unwrap();
//! let out = hook.intercept(frame).unwrap();
//! assert_eq!(out.payload(), &[0xBE, 0xEF]);
//! ```

use crate::DriverError;
use pican_protocol::{Frame, MAX_DLC, is_movement_frame};

/// 帧拦截 Trait
pub trait InterceptHook: Send + Sync {
    /// 处理一帧
    ///
    /// - `Some(frame)`: 转发（可以是修改后的帧）
    /// - `None`: 丢弃
    fn intercept(&self, frame: Frame) -> Option<Frame>;
}

/// 闭包也可以作为钩子
impl<F> InterceptHook for F
where
    F: Fn(Frame) -> Option<Frame> + Send + Sync,
{
    fn intercept(&self, frame: Frame) -> Option<Frame> {
        self(frame)
    }
}

/// 恒等钩子：所有帧原样放行
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl InterceptHook for PassThrough {
    fn intercept(&self, frame: Frame) -> Option<Frame> {
        Some(frame)
    }
}

/// 固定数据钩子
///
/// 把运动帧的前若干字节替换为固定内容（联调时用来确认中继确实在路径上），
/// 其他帧原样放行。
#[derive(Debug, Clone, Copy)]
pub struct FixedPayloadHook {
    payload: [u8; 8],
    len: u8,
}

impl FixedPayloadHook {
    /// 创建钩子
    ///
    /// # 错误
    /// - `DriverError::InvalidInput`: 数据为空或超过 8 字节
    pub fn new(payload: &[u8]) -> Result<Self, DriverError> {
        if payload.is_empty() || payload.len() > usize::from(MAX_DLC) {
            return Err(DriverError::InvalidInput(format!(
                "fixed payload must be 1-8 bytes, got {}",
                payload.len()
            )));
        }
        let mut fixed = [0u8; 8];
        fixed[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            payload: fixed,
            len: payload.len() as u8,
        })
    }

    /// 从十六进制字符串创建（如 `"BEEF"`）
    pub fn from_hex(text: &str) -> Result<Self, DriverError> {
        let bytes = hex::decode(text)
            .map_err(|e| DriverError::InvalidInput(format!("payload '{}' is not hex: {}", text, e)))?;
        Self::new(&bytes)
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload[..usize::from(self.len)]
    }
}

impl InterceptHook for FixedPayloadHook {
    fn intercept(&self, mut frame: Frame) -> Option<Frame> {
        if is_movement_frame(frame.id) {
            let len = usize::from(self.len);
            frame.data[..len].copy_from_slice(&self.payload[..len]);
            frame.len = frame.len.max(self.len);
        }
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_through() {
        let frame = Frame::from_log_line("02000100#0064").unwrap();
        assert_eq!(PassThrough.intercept(frame), Some(frame));
    }

    #[test]
    fn test_fixed_payload_rewrites_movement_frames_only() {
        let hook = FixedPayloadHook::new(&[0xBE, 0xEF]).unwrap();

        let movement = Frame::from_log_line("02000300#9C64").unwrap();
        let out = hook.intercept(movement).unwrap();
        assert_eq!(out.id, movement.id);
        assert_eq!(out.payload(), &[0xBE, 0xEF]);

        let other = Frame::from_log_line("123#01020304050607").unwrap();
        assert_eq!(hook.intercept(other), Some(other));
    }

    #[test]
    fn test_fixed_payload_keeps_trailing_bytes() {
        let hook = FixedPayloadHook::new(&[0xBE, 0xEF]).unwrap();
        let frame = Frame::from_log_line("02000100#00000000AA").unwrap();
        let out = hook.intercept(frame).unwrap();
        assert_eq!(out.payload(), &[0xBE, 0xEF, 0, 0, 0xAA]);
    }

    #[test]
    fn test_fixed_payload_invalid() {
        assert!(FixedPayloadHook::new(&[]).is_err());
        assert!(FixedPayloadHook::new(&[0; 9]).is_err());
        assert!(FixedPayloadHook::from_hex("BEE").is_err());
    }

    #[test]
    fn test_fixed_payload_from_hex() {
        let hook = FixedPayloadHook::from_hex("beef").unwrap();
        assert_eq!(hook.payload(), &[0xBE, 0xEF]);
    }

    #[test]
    fn test_closure_hook() {
        let drop_all = |_frame: Frame| -> Option<Frame> { None };
        let frame = Frame::new_standard(0x1, &[1]);
        assert_eq!(drop_all.intercept(frame), None);
    }
}
