//! SocketCAN CAN 适配器实现
//!
//! 支持 Linux 平台下的 SocketCAN，使用内核级的 CAN 通讯接口。
//!
//! ## 特性
//!
//! - 直接读写 16 字节 `struct can_frame`（由 `Frame::encode` / `Frame::decode` 完成编解码）
//! - 支持标准帧和扩展帧
//! - `poll` 实现读超时，收发线程可以及时观察退出信号
//! - 自动过滤错误帧与远程帧
//!
//! ## 依赖
//!
//! - `socketcan` crate (版本 3.5)：打开并绑定 socket
//! - Linux 内核 SocketCAN 支持
//! - CAN 接口必须已配置（通过 `ip link` 命令）
//!
//! ## 限制
//!
//! - **仅限 Linux 平台**：SocketCAN 是 Linux 内核特性
//! - **接口配置**：波特率等配置由系统工具（`ip link`）完成，不在应用层设置
//! - **权限要求**：可能需要 `sudo`

use crate::{CanAdapter, CanError, Frame};
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use pican_protocol::{CAN_ERR_FLAG, CAN_RTR_FLAG, FRAME_SIZE};
use socketcan::{CanSocket, Socket};
use std::os::fd::{BorrowedFd, RawFd};
use std::os::unix::io::AsRawFd;
use std::time::Duration;
use tracing::{error, trace, warn};

mod interface_check;
pub mod split;

use interface_check::check_interface_status;
pub use split::{SocketCanRxAdapter, SocketCanTxAdapter};

/// 默认读超时
///
/// 收发线程在每次超时后检查运行标志，因此这个值决定了关闭的响应延迟。
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(50);

// include/uapi/linux/can/error.h
const CAN_ERR_CRTL: u32 = 0x0000_0004;
const CAN_ERR_BUSOFF: u32 = 0x0000_0040;
const CAN_ERR_CRTL_RX_OVERFLOW: u8 = 0x01;
const CAN_ERR_CRTL_TX_OVERFLOW: u8 = 0x02;

/// SocketCAN 适配器
///
/// 实现 `CanAdapter` trait，提供 Linux 平台下的 SocketCAN 支持。
///
/// # 示例
///
/// ```no_run
/// use pican_can::{CanAdapter, Frame, SocketCanAdapter};
///
/// // 打开 CAN 接口
/// let mut adapter = SocketCanAdapter::new("can0").unwrap();
///
/// // 发送帧
/// let frame = Frame::from_log_line("02000100#0064").unwrap();
/// adapter.send(frame).unwrap();
///
/// // 接收帧
/// let rx_frame = adapter.receive().unwrap();
/// ```
#[derive(Debug)]
pub struct SocketCanAdapter {
    /// SocketCAN socket
    socket: CanSocket,
    /// 接口名称（如 "can0"）
    interface: String,
    /// 是否已启动（SocketCAN 打开即启动）
    started: bool,
    /// 读超时时间（用于 receive 方法）
    read_timeout: Duration,
}

impl SocketCanAdapter {
    /// 绑定到指定 CAN 接口
    ///
    /// 在打开 socket 之前，会检查接口是否存在且已启动（UP 状态）。
    ///
    /// # 错误
    /// - `CanError::Device`:
    ///   - 接口不存在（`NotFound`，会提示创建命令）
    ///   - 接口存在但未启动（会提示启动命令）
    ///   - 无法打开或绑定接口（`Backend`）
    /// - `CanError::Io`: IO 错误（如权限不足、系统调用失败）
    pub fn new(interface: impl Into<String>) -> Result<Self, CanError> {
        let interface = interface.into();

        // 1. 检查接口状态（仅检查，不自动配置）
        match check_interface_status(&interface) {
            Ok(true) => {
                trace!(
                    "CAN interface '{}' is UP, proceeding with initialization",
                    interface
                );
            },
            Ok(false) => {
                return Err(CanError::Device(crate::CanDeviceError::new(
                    crate::CanDeviceErrorKind::Backend,
                    format!(
                        "CAN interface '{}' exists but is not UP. Please start it first:\n  sudo ip link set up {}",
                        interface, interface
                    ),
                )));
            },
            Err(e) => {
                return Err(e);
            },
        }

        // 2. 打开并绑定 SocketCAN 接口
        let socket = CanSocket::open(&interface).map_err(|e| {
            CanError::Device(crate::CanDeviceError::new(
                crate::CanDeviceErrorKind::Backend,
                format!("Failed to open CAN interface '{}': {}", interface, e),
            ))
        })?;

        // 3. 不接收本 socket 发出的帧
        //
        // 中继在两条总线上各开一个 socket，如果收到自己发出的帧会造成无限转发。
        // 保持 CAN_RAW_LOOPBACK 开启，同一主机上的其他 socket（candump 等）仍能看到这些帧。
        let recv_own: libc::c_int = 0;
        let ret = unsafe {
            libc::setsockopt(
                socket.as_raw_fd(),
                libc::SOL_CAN_RAW,
                libc::CAN_RAW_RECV_OWN_MSGS,
                &recv_own as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if ret < 0 {
            warn!(
                "Failed to disable CAN_RAW_RECV_OWN_MSGS on '{}': {}",
                interface,
                std::io::Error::last_os_error()
            );
        }

        let read_timeout = DEFAULT_READ_TIMEOUT;
        socket.set_read_timeout(read_timeout).map_err(CanError::Io)?;

        trace!("SocketCAN interface '{}' opened", interface);

        Ok(Self {
            socket,
            interface,
            started: true,
            read_timeout,
        })
    }

    /// 获取接口名称
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// 获取读超时时间
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// 检查是否已启动
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// 设置读超时
    ///
    /// # 错误
    /// - `CanError::Io`: 设置超时失败
    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<(), CanError> {
        if !timeout.is_zero() {
            self.socket.set_read_timeout(timeout).map_err(CanError::Io)?;
        }
        self.read_timeout = timeout;
        Ok(())
    }
}

/// 将帧编码为 16 字节并写入 socket
pub(crate) fn write_frame(fd: RawFd, frame: &Frame) -> Result<(), CanError> {
    let bytes = frame.encode()?;

    // SAFETY: bytes 在调用期间有效，长度为 FRAME_SIZE
    let written = unsafe { libc::write(fd, bytes.as_ptr() as *const libc::c_void, FRAME_SIZE) };
    if written < 0 {
        return Err(CanError::Io(std::io::Error::last_os_error()));
    }
    if written as usize != FRAME_SIZE {
        return Err(CanError::Io(std::io::Error::other(format!(
            "Short CAN write: {} bytes (expected {})",
            written, FRAME_SIZE
        ))));
    }

    trace!("Sent CAN frame: {}", frame);
    Ok(())
}

/// 等待并读取一个数据帧
///
/// 错误帧与远程帧会被跳过（记录日志），直到收到数据帧或超时。
pub(crate) fn read_frame(fd: RawFd, timeout: Duration) -> Result<Frame, CanError> {
    // 将 Duration 转换为毫秒数（u16，最大 65535ms）
    let timeout_ms = timeout.as_millis().min(65535) as u16;

    loop {
        // SAFETY: fd 由调用方持有，在本函数返回前保持有效
        let pollfd = PollFd::new(unsafe { BorrowedFd::borrow_raw(fd) }, PollFlags::POLLIN);
        match poll(&mut [pollfd], PollTimeout::from(timeout_ms)) {
            Ok(0) => return Err(CanError::Timeout),
            Ok(_) => {},
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => {
                return Err(CanError::Io(std::io::Error::other(format!(
                    "poll failed: {}",
                    e
                ))));
            },
        }

        let mut buf = [0u8; FRAME_SIZE];
        // SAFETY: buf 在调用期间有效，长度为 FRAME_SIZE
        let received = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, FRAME_SIZE) };
        if received < 0 {
            let err = std::io::Error::last_os_error();
            return match err.kind() {
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => {
                    Err(CanError::Timeout)
                },
                std::io::ErrorKind::Interrupted => continue,
                _ => Err(CanError::Io(err)),
            };
        }
        if (received as usize) < FRAME_SIZE {
            return Err(CanError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "Incomplete CAN frame: {} bytes (expected {})",
                    received, FRAME_SIZE
                ),
            )));
        }

        let frame = Frame::decode(&buf)?;

        if frame.id & CAN_ERR_FLAG != 0 {
            handle_error_frame(&frame)?;
            continue;
        }
        if frame.id & CAN_RTR_FLAG != 0 {
            warn!("CAN remote frame received (ID=0x{:X}), ignoring", frame.raw_id());
            continue;
        }

        trace!("Received CAN frame: {}", frame);
        return Ok(frame);
    }
}

/// 处理错误帧：总线关闭与缓冲区溢出上报，其余忽略
fn handle_error_frame(frame: &Frame) -> Result<(), CanError> {
    if frame.id & CAN_ERR_BUSOFF != 0 {
        error!("CAN Bus Off error detected");
        return Err(CanError::BusOff);
    }
    if frame.id & CAN_ERR_CRTL != 0
        && frame.data[1] & (CAN_ERR_CRTL_RX_OVERFLOW | CAN_ERR_CRTL_TX_OVERFLOW) != 0
    {
        error!("CAN Buffer Overflow detected (ctrl=0x{:02X})", frame.data[1]);
        return Err(CanError::BufferOverflow);
    }
    warn!("CAN Error Frame received (class=0x{:X}), ignoring", frame.id & !CAN_ERR_FLAG);
    Ok(())
}

impl Drop for SocketCanAdapter {
    fn drop(&mut self) {
        trace!(
            "[Auto-Drop] SocketCAN interface '{}' closed",
            self.interface
        );
    }
}

use crate::SplittableAdapter;

impl SplittableAdapter for SocketCanAdapter {
    type RxAdapter = SocketCanRxAdapter;
    type TxAdapter = SocketCanTxAdapter;

    /// 分离为独立的 RX 和 TX 适配器
    ///
    /// 两者通过 `dup()` 共享同一个打开文件描述，可以在不同线程中并发使用。
    /// 读超时由 `poll` 实现，不依赖 `O_NONBLOCK`（该标志会被两端共享）。
    ///
    /// # 错误
    /// - `CanError::NotStarted`: 适配器未启动
    /// - `CanError::Io`: 复制文件描述符失败
    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError> {
        if !self.started {
            return Err(CanError::NotStarted);
        }

        let rx_adapter = SocketCanRxAdapter::new(&self.socket, &self.interface, self.read_timeout)?;
        let tx_adapter = SocketCanTxAdapter::new(&self.socket, &self.interface)?;

        trace!(
            "SocketCanAdapter split into RX and TX adapters (interface: {})",
            self.interface
        );

        // self 在此处 drop，原 fd 关闭；两个 dup 出来的 fd 继续有效
        Ok((rx_adapter, tx_adapter))
    }
}

impl CanAdapter for SocketCanAdapter {
    /// 发送帧
    ///
    /// # 错误
    /// - `CanError::NotStarted`: 适配器未启动
    /// - `CanError::Protocol`: 帧无法编码（`len > 8`）
    /// - `CanError::Io`: 写入失败（如发送队列已满）
    fn send(&mut self, frame: Frame) -> Result<(), CanError> {
        if !self.started {
            return Err(CanError::NotStarted);
        }
        write_frame(self.socket.as_raw_fd(), &frame)
    }

    /// 接收帧（阻塞直到收到有效数据帧或超时）
    ///
    /// # 错误
    /// - `CanError::Timeout`: 读取超时（可重试）
    /// - `CanError::BusOff` / `CanError::BufferOverflow`: 控制器错误帧
    /// - `CanError::Io`: IO 错误
    fn receive(&mut self) -> Result<Frame, CanError> {
        if !self.started {
            return Err(CanError::NotStarted);
        }
        read_frame(self.socket.as_raw_fd(), self.read_timeout)
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        if let Err(e) = self.set_read_timeout(timeout) {
            warn!("Failed to set receive timeout: {}", e);
        }
    }

    /// 带超时的接收（不改变适配器的默认超时）
    fn receive_timeout(&mut self, timeout: Duration) -> Result<Frame, CanError> {
        if !self.started {
            return Err(CanError::NotStarted);
        }
        read_frame(self.socket.as_raw_fd(), timeout)
    }
}
