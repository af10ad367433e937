//! 进程内虚拟 CAN 总线
//!
//! 在没有 SocketCAN（非 Linux，或没有 vcan 内核模块）时替代真实接口。
//! 收发通过 crossbeam 会合通道（容量 0）完成，保持阻塞语义：
//! `send` 阻塞直到另一端 `receive`。
//!
//! - `VirtualCanAdapter::new`：单通道回环，本适配器发送的帧由本适配器接收（需先 `split`）
//! - `VirtualCanAdapter::pair`：两个适配器交叉连接，A 发送的帧由 B 接收，反之亦然

use crate::{CanAdapter, CanError, Frame, RxAdapter, SplittableAdapter, TxAdapter};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::time::Duration;
use tracing::trace;

/// 虚拟 CAN 适配器
///
/// # 示例
///
/// ```
/// use pican_can::{Frame, RxAdapter, SplittableAdapter, TxAdapter, VirtualCanAdapter};
///
/// let (a, b) = VirtualCanAdapter::pair("vbus");
/// let (_a_rx, mut a_tx) = a.split().unwrap();
/// let (mut b_rx, _b_tx) = b.split().unwrap();
///
/// let sender = std::thread::spawn(move || {
///     a_tx.send(Frame::from_log_line("123#0102").unwrap()).unwrap();
/// });
/// let frame = b_rx.receive().unwrap();
/// assert_eq!(frame.payload(), &[1, 2]);
/// sender.join().unwrap();
/// ```
#[derive(Debug)]
pub struct VirtualCanAdapter {
    name: String,
    tx: Sender<Frame>,
    rx: Receiver<Frame>,
    read_timeout: Option<Duration>,
}

impl VirtualCanAdapter {
    /// 创建单通道回环适配器（不校验接口名）
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, rx) = bounded(0);
        let name = name.into();
        trace!("Virtual CAN bus '{}' created", name);
        Self {
            name,
            tx,
            rx,
            read_timeout: None,
        }
    }

    /// 创建一对交叉连接的适配器
    pub fn pair(name: impl Into<String>) -> (Self, Self) {
        let name = name.into();
        let (a_to_b_tx, a_to_b_rx) = bounded(0);
        let (b_to_a_tx, b_to_a_rx) = bounded(0);
        trace!("Virtual CAN pair '{}' created", name);

        let a = Self {
            name: format!("{}.a", name),
            tx: a_to_b_tx,
            rx: b_to_a_rx,
            read_timeout: None,
        };
        let b = Self {
            name: format!("{}.b", name),
            tx: b_to_a_tx,
            rx: a_to_b_rx,
            read_timeout: None,
        };
        (a, b)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 设置读超时（`None` 表示一直阻塞）
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }
}

fn send_frame(tx: &Sender<Frame>, name: &str, frame: Frame) -> Result<(), CanError> {
    // 与真实接口一致：无法编码的帧直接拒绝
    frame.encode()?;
    tx.send(frame).map_err(|_| CanError::Disconnected)?;
    trace!("[{}] sent {}", name, frame);
    Ok(())
}

fn receive_frame(
    rx: &Receiver<Frame>,
    name: &str,
    timeout: Option<Duration>,
) -> Result<Frame, CanError> {
    let frame = match timeout {
        Some(timeout) => rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => CanError::Timeout,
            RecvTimeoutError::Disconnected => CanError::Disconnected,
        })?,
        None => rx.recv().map_err(|_| CanError::Disconnected)?,
    };
    trace!("[{}] received {}", name, frame);
    Ok(frame)
}

impl CanAdapter for VirtualCanAdapter {
    fn send(&mut self, frame: Frame) -> Result<(), CanError> {
        send_frame(&self.tx, &self.name, frame)
    }

    fn receive(&mut self) -> Result<Frame, CanError> {
        receive_frame(&self.rx, &self.name, self.read_timeout)
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        self.read_timeout = Some(timeout);
    }

    fn receive_timeout(&mut self, timeout: Duration) -> Result<Frame, CanError> {
        receive_frame(&self.rx, &self.name, Some(timeout))
    }
}

impl SplittableAdapter for VirtualCanAdapter {
    type RxAdapter = VirtualRxAdapter;
    type TxAdapter = VirtualTxAdapter;

    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError> {
        let rx = VirtualRxAdapter {
            name: self.name.clone(),
            rx: self.rx,
            read_timeout: self.read_timeout,
        };
        let tx = VirtualTxAdapter {
            name: self.name,
            tx: self.tx,
        };
        Ok((rx, tx))
    }
}

/// 虚拟总线只读端
#[derive(Debug)]
pub struct VirtualRxAdapter {
    name: String,
    rx: Receiver<Frame>,
    read_timeout: Option<Duration>,
}

impl VirtualRxAdapter {
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }
}

impl RxAdapter for VirtualRxAdapter {
    fn receive(&mut self) -> Result<Frame, CanError> {
        receive_frame(&self.rx, &self.name, self.read_timeout)
    }
}

/// 虚拟总线只写端
#[derive(Debug)]
pub struct VirtualTxAdapter {
    name: String,
    tx: Sender<Frame>,
}

impl TxAdapter for VirtualTxAdapter {
    fn send(&mut self, frame: Frame) -> Result<(), CanError> {
        send_frame(&self.tx, &self.name, frame)
    }
}
