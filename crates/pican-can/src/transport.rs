//! 按平台选择的总线后端
//!
//! `bind()` 在 Linux 上打开 SocketCAN 接口，在其他平台上返回虚拟总线。
//! 上层（中继、CLI）只面对 `BusAdapter`，不需要自己写 `cfg`。

use crate::{
    CanAdapter, CanError, Frame, RxAdapter, SplittableAdapter, TxAdapter, VirtualCanAdapter,
    VirtualRxAdapter, VirtualTxAdapter,
};
use std::time::Duration;
use tracing::info;

#[cfg(target_os = "linux")]
use crate::{SocketCanAdapter, SocketCanRxAdapter, SocketCanTxAdapter};

/// 绑定到指定接口
///
/// # 错误
/// - Linux：接口不存在（`CanDeviceErrorKind::NotFound`）或无法打开（`Backend`）
/// - 其他平台：不会失败
pub fn bind(interface: &str) -> Result<BusAdapter, CanError> {
    #[cfg(target_os = "linux")]
    {
        let adapter = SocketCanAdapter::new(interface)?;
        info!("Bound to SocketCAN interface '{}'", interface);
        Ok(BusAdapter::SocketCan(adapter))
    }

    #[cfg(not(target_os = "linux"))]
    {
        info!(
            "SocketCAN unavailable on this platform, using virtual bus for '{}'",
            interface
        );
        Ok(BusAdapter::Virtual(VirtualCanAdapter::new(interface)))
    }
}

/// 统一的总线适配器
#[derive(Debug)]
pub enum BusAdapter {
    #[cfg(target_os = "linux")]
    SocketCan(SocketCanAdapter),
    Virtual(VirtualCanAdapter),
}

impl From<VirtualCanAdapter> for BusAdapter {
    fn from(adapter: VirtualCanAdapter) -> Self {
        BusAdapter::Virtual(adapter)
    }
}

#[cfg(target_os = "linux")]
impl From<SocketCanAdapter> for BusAdapter {
    fn from(adapter: SocketCanAdapter) -> Self {
        BusAdapter::SocketCan(adapter)
    }
}

impl CanAdapter for BusAdapter {
    fn send(&mut self, frame: Frame) -> Result<(), CanError> {
        match self {
            #[cfg(target_os = "linux")]
            BusAdapter::SocketCan(adapter) => adapter.send(frame),
            BusAdapter::Virtual(adapter) => adapter.send(frame),
        }
    }

    fn receive(&mut self) -> Result<Frame, CanError> {
        match self {
            #[cfg(target_os = "linux")]
            BusAdapter::SocketCan(adapter) => adapter.receive(),
            BusAdapter::Virtual(adapter) => adapter.receive(),
        }
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        match self {
            #[cfg(target_os = "linux")]
            BusAdapter::SocketCan(adapter) => adapter.set_receive_timeout(timeout),
            BusAdapter::Virtual(adapter) => adapter.set_receive_timeout(timeout),
        }
    }

    fn receive_timeout(&mut self, timeout: Duration) -> Result<Frame, CanError> {
        match self {
            #[cfg(target_os = "linux")]
            BusAdapter::SocketCan(adapter) => adapter.receive_timeout(timeout),
            BusAdapter::Virtual(adapter) => adapter.receive_timeout(timeout),
        }
    }
}

impl SplittableAdapter for BusAdapter {
    type RxAdapter = BusRxAdapter;
    type TxAdapter = BusTxAdapter;

    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError> {
        match self {
            #[cfg(target_os = "linux")]
            BusAdapter::SocketCan(adapter) => {
                let (rx, tx) = adapter.split()?;
                Ok((BusRxAdapter::SocketCan(rx), BusTxAdapter::SocketCan(tx)))
            },
            BusAdapter::Virtual(adapter) => {
                let (rx, tx) = adapter.split()?;
                Ok((BusRxAdapter::Virtual(rx), BusTxAdapter::Virtual(tx)))
            },
        }
    }
}

/// 统一的只读端
#[derive(Debug)]
pub enum BusRxAdapter {
    #[cfg(target_os = "linux")]
    SocketCan(SocketCanRxAdapter),
    Virtual(VirtualRxAdapter),
}

impl RxAdapter for BusRxAdapter {
    fn receive(&mut self) -> Result<Frame, CanError> {
        match self {
            #[cfg(target_os = "linux")]
            BusRxAdapter::SocketCan(adapter) => adapter.receive(),
            BusRxAdapter::Virtual(adapter) => adapter.receive(),
        }
    }
}

/// 统一的只写端
#[derive(Debug)]
pub enum BusTxAdapter {
    #[cfg(target_os = "linux")]
    SocketCan(SocketCanTxAdapter),
    Virtual(VirtualTxAdapter),
}

impl TxAdapter for BusTxAdapter {
    fn send(&mut self, frame: Frame) -> Result<(), CanError> {
        match self {
            #[cfg(target_os = "linux")]
            BusTxAdapter::SocketCan(adapter) => adapter.send(frame),
            BusTxAdapter::Virtual(adapter) => adapter.send(frame),
        }
    }
}
