//! # PiCAN CAN Adapter Layer
//!
//! CAN 总线抽象层，提供统一的收发接口。
//!
//! - Linux：`SocketCanAdapter`（内核 SocketCAN，16 字节原始帧读写）
//! - 所有平台：`VirtualCanAdapter`（进程内会合通道，无需内核模块）
//!
//! `bind()` 按平台选择后端：Linux 上绑定真实接口，其他平台退化为虚拟总线。

use std::time::Duration;
use thiserror::Error;

// 重新导出 pican-protocol 中的 Frame
pub use pican_protocol::{Frame, ProtocolError};

#[cfg(target_os = "linux")]
pub mod socketcan;

#[cfg(target_os = "linux")]
pub use socketcan::SocketCanAdapter;

#[cfg(target_os = "linux")]
pub use socketcan::split::{SocketCanRxAdapter, SocketCanTxAdapter};

pub mod virtual_bus;

pub use virtual_bus::{VirtualCanAdapter, VirtualRxAdapter, VirtualTxAdapter};

pub mod transport;

pub use transport::{BusAdapter, BusRxAdapter, BusTxAdapter, bind};

/// CAN 适配层统一错误类型
#[derive(Error, Debug)]
pub enum CanError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] CanDeviceError),
    #[error("Protocol Error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Read timeout")]
    Timeout,
    #[error("Buffer overflow")]
    BufferOverflow,
    #[error("Bus off")]
    BusOff,
    #[error("Device not started")]
    NotStarted,
    #[error("Peer disconnected")]
    Disconnected,
}

impl CanError {
    /// 是否为不可恢复的错误（收发线程应当退出）
    ///
    /// `Timeout` 与普通 IO 错误可以重试；总线关闭、对端断开和致命设备错误不行。
    pub fn is_fatal(&self) -> bool {
        match self {
            CanError::BusOff | CanError::Disconnected | CanError::NotStarted => true,
            CanError::Device(e) => e.is_fatal(),
            _ => false,
        }
    }
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanDeviceErrorKind {
    Unknown,
    NotFound,
    NoDevice,
    AccessDenied,
    Busy,
    UnsupportedConfig,
    InvalidFrame,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct CanDeviceError {
    pub kind: CanDeviceErrorKind,
    pub message: String,
}

impl CanDeviceError {
    pub fn new(kind: CanDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            CanDeviceErrorKind::NoDevice
                | CanDeviceErrorKind::AccessDenied
                | CanDeviceErrorKind::NotFound
        )
    }
}

impl From<String> for CanDeviceError {
    fn from(message: String) -> Self {
        Self::new(CanDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for CanDeviceError {
    fn from(message: &str) -> Self {
        Self::new(CanDeviceErrorKind::Unknown, message)
    }
}

pub trait CanAdapter {
    fn send(&mut self, frame: Frame) -> Result<(), CanError>;
    fn receive(&mut self) -> Result<Frame, CanError>;
    fn set_receive_timeout(&mut self, _timeout: Duration) {}
    fn receive_timeout(&mut self, timeout: Duration) -> Result<Frame, CanError> {
        self.set_receive_timeout(timeout);
        self.receive()
    }
    fn try_receive(&mut self) -> Result<Option<Frame>, CanError> {
        match self.receive_timeout(Duration::ZERO) {
            Ok(frame) => Ok(Some(frame)),
            Err(CanError::Timeout) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

pub trait RxAdapter {
    fn receive(&mut self) -> Result<Frame, CanError>;
}

pub trait TxAdapter {
    fn send(&mut self, frame: Frame) -> Result<(), CanError>;
}

pub trait SplittableAdapter: CanAdapter {
    type RxAdapter: RxAdapter;
    type TxAdapter: TxAdapter;
    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError>;
}
