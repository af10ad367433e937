//! SocketCAN 适配器分离实现
//!
//! 提供独立的 RX 和 TX 适配器，支持双线程并发访问。
//! 基于 `CanSocket::try_clone()` 实现，利用 Linux 的 `dup()` 系统调用。
//!
//! # ⚠️ `try_clone()` 的共享状态
//!
//! 复制出来的 FD 共享同一个"打开文件描述"，`O_NONBLOCK` 等标志对两端同时生效。
//! 因此读超时完全由 `poll` 实现，分离后的适配器不修改文件状态标志。

use super::{read_frame, write_frame};
use crate::{CanError, Frame, RxAdapter, TxAdapter};
use socketcan::CanSocket;
use std::os::fd::AsFd;
use std::os::unix::io::AsRawFd;
use std::time::Duration;
use tracing::trace;

/// 克隆 socket（使用 dup() 系统调用）
fn clone_socket(socket: &CanSocket, role: &str) -> Result<CanSocket, CanError> {
    socket.as_fd().try_clone_to_owned().map(CanSocket::from).map_err(|e| {
        CanError::Io(std::io::Error::other(format!(
            "Failed to clone SocketCAN socket for {}: {}",
            role, e
        )))
    })
}

/// 只读适配器（用于 RX 线程）
#[derive(Debug)]
pub struct SocketCanRxAdapter {
    socket: CanSocket,
    interface: String,
    read_timeout: Duration,
}

impl SocketCanRxAdapter {
    /// 创建新的 RX 适配器
    ///
    /// # 错误
    /// - `CanError::Io`: 克隆 socket 失败
    pub(crate) fn new(
        socket: &CanSocket,
        interface: &str,
        read_timeout: Duration,
    ) -> Result<Self, CanError> {
        Ok(Self {
            socket: clone_socket(socket, "RX")?,
            interface: interface.to_string(),
            read_timeout,
        })
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }
}

impl RxAdapter for SocketCanRxAdapter {
    fn receive(&mut self) -> Result<Frame, CanError> {
        read_frame(self.socket.as_raw_fd(), self.read_timeout)
    }
}

impl Drop for SocketCanRxAdapter {
    fn drop(&mut self) {
        trace!("[Auto-Drop] SocketCAN RX '{}' closed", self.interface);
    }
}

/// 只写适配器（用于 TX 线程）
#[derive(Debug)]
pub struct SocketCanTxAdapter {
    socket: CanSocket,
    interface: String,
}

impl SocketCanTxAdapter {
    /// 创建新的 TX 适配器
    ///
    /// # 错误
    /// - `CanError::Io`: 克隆 socket 失败
    pub(crate) fn new(socket: &CanSocket, interface: &str) -> Result<Self, CanError> {
        Ok(Self {
            socket: clone_socket(socket, "TX")?,
            interface: interface.to_string(),
        })
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

impl TxAdapter for SocketCanTxAdapter {
    fn send(&mut self, frame: Frame) -> Result<(), CanError> {
        write_frame(self.socket.as_raw_fd(), &frame)
    }
}

impl Drop for SocketCanTxAdapter {
    fn drop(&mut self) {
        trace!("[Auto-Drop] SocketCAN TX '{}' closed", self.interface);
    }
}
