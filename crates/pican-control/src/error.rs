//! 控制层错误类型定义

use pican_protocol::ProtocolError;
use thiserror::Error;

/// 控制层错误类型
#[derive(Error, Debug)]
pub enum ControlError {
    /// 协议错误（重新编码运动帧失败）
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 多边形顶点不足
    #[error("Polygon needs at least 3 vertices, got {vertices}")]
    DegeneratePolygon { vertices: usize },

    /// 配置值无效
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// 配置文件读取失败
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件解析失败
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// 帧通道已关闭（对端已退出）
    #[error("Frame conduit closed")]
    ConduitClosed,
}
