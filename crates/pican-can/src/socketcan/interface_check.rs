//! CAN 接口状态检查
//!
//! 在打开 socket 之前确认接口存在且处于 UP 状态，失败时给出可操作的提示。

use crate::{CanDeviceError, CanDeviceErrorKind, CanError};
use std::ffi::CString;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use tracing::trace;

/// 检查接口状态
///
/// # 返回值
/// - `Ok(true)`: 接口存在且已启动
/// - `Ok(false)`: 接口存在但未启动
/// - `Err(CanError::Device)`: 接口不存在或名称非法
/// - `Err(CanError::Io)`: 系统调用失败
pub(crate) fn check_interface_status(interface: &str) -> Result<bool, CanError> {
    if interface.is_empty() || interface.len() >= libc::IFNAMSIZ {
        return Err(CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::UnsupportedConfig,
            format!(
                "Invalid CAN interface name '{}' (must be 1-{} bytes)",
                interface,
                libc::IFNAMSIZ - 1
            ),
        )));
    }

    let c_name = CString::new(interface).map_err(|_| {
        CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::UnsupportedConfig,
            format!("Invalid CAN interface name '{}' (contains NUL)", interface),
        ))
    })?;

    // SAFETY: c_name 是合法的 NUL 结尾字符串
    let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
    if index == 0 {
        return Err(CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::NotFound,
            format!(
                "CAN interface '{}' does not exist. Create it first, e.g.:\n  sudo ip link add dev {} type vcan\n  sudo ip link set up {}",
                interface, interface, interface
            ),
        )));
    }

    // SIOCGIFFLAGS 对任意 socket 类型都有效，使用最简单的 UDP socket
    // SAFETY: socket() 返回的 fd 立即交给 OwnedFd 管理
    let raw = unsafe { libc::socket(libc::AF_INET, libc::SOCK_DGRAM | libc::SOCK_CLOEXEC, 0) };
    if raw < 0 {
        return Err(CanError::Io(std::io::Error::last_os_error()));
    }
    let fd = unsafe { OwnedFd::from_raw_fd(raw) };

    // SAFETY: ifreq 是纯 C 结构体，全零是合法值
    let mut ifr: libc::ifreq = unsafe { std::mem::zeroed() };
    for (dst, src) in ifr.ifr_name.iter_mut().zip(interface.as_bytes()) {
        *dst = *src as libc::c_char;
    }

    // SAFETY: ifr 在调用期间有效，SIOCGIFFLAGS 只写 ifr_ifru.ifru_flags
    let ret = unsafe { libc::ioctl(fd.as_raw_fd(), libc::SIOCGIFFLAGS as _, &mut ifr as *mut libc::ifreq) };
    if ret < 0 {
        return Err(CanError::Io(std::io::Error::last_os_error()));
    }

    // ifru_flags 是 union 的第一个字段（c_short）
    // SAFETY: ioctl 成功后该字段已被内核填充
    let flags = unsafe { *(std::ptr::addr_of!(ifr.ifr_ifru) as *const libc::c_short) };
    let is_up = (flags as libc::c_int & libc::IFF_UP) != 0;

    trace!(
        "Interface '{}' status: {}",
        interface,
        if is_up { "UP" } else { "DOWN" }
    );
    Ok(is_up)
}
