//! 驱动层错误类型定义

use pican_can::CanError;
use pican_protocol::ProtocolError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// CAN 驱动错误
    #[error("CAN driver error: {0}")]
    Can(#[from] CanError),

    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 通道已关闭（对端线程退出）
    #[error("Channel closed")]
    ChannelClosed,

    /// 线程创建或回收失败
    #[error("IO thread error: {0}")]
    IoThread(String),

    /// 无效输入（如空的替换数据）
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
