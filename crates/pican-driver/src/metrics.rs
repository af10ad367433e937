//! 中继性能指标
//!
//! 所有计数器都使用原子操作，可以在任何线程安全地读取，不会引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 中继实时指标
///
/// # 使用示例
///
/// ```rust
/// use pican_driver::RelayMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = RelayMetrics::new();
/// metrics.joy_to_bus_frames.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.joy_to_bus_frames, 1);
/// ```
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// 摇杆侧 → 驱动侧 转发的帧数
    pub joy_to_bus_frames: AtomicU64,

    /// 驱动侧 → 摇杆侧 转发的帧数
    pub bus_to_joy_frames: AtomicU64,

    /// 被钩子修改的帧数
    pub intercepted: AtomicU64,

    /// 被钩子丢弃的帧数
    pub suppressed: AtomicU64,

    /// 因通道已满而丢弃的帧数
    ///
    /// 如果这个值持续增长，说明转发线程跟不上总线速率。
    pub dropped: AtomicU64,

    /// 接收错误次数（不含超时）
    pub rx_errors: AtomicU64,

    /// 发送错误次数
    pub tx_errors: AtomicU64,

    /// 接收超时次数（正常现象，总线空闲时会超时）
    pub rx_timeouts: AtomicU64,
}

impl RelayMetrics {
    /// 创建新的指标实例（所有计数器初始化为 0）
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            joy_to_bus_frames: self.joy_to_bus_frames.load(Ordering::Relaxed),
            bus_to_joy_frames: self.bus_to_joy_frames.load(Ordering::Relaxed),
            intercepted: self.intercepted.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            rx_errors: self.rx_errors.load(Ordering::Relaxed),
            tx_errors: self.tx_errors.load(Ordering::Relaxed),
            rx_timeouts: self.rx_timeouts.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.joy_to_bus_frames.store(0, Ordering::Relaxed);
        self.bus_to_joy_frames.store(0, Ordering::Relaxed);
        self.intercepted.store(0, Ordering::Relaxed);
        self.suppressed.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.rx_errors.store(0, Ordering::Relaxed);
        self.tx_errors.store(0, Ordering::Relaxed);
        self.rx_timeouts.store(0, Ordering::Relaxed);
    }
}

/// 指标快照（不可变，用于读取）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub joy_to_bus_frames: u64,
    pub bus_to_joy_frames: u64,
    pub intercepted: u64,
    pub suppressed: u64,
    pub dropped: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
    pub rx_timeouts: u64,
}

impl MetricsSnapshot {
    /// 两个方向转发的总帧数
    pub fn total_forwarded(&self) -> u64 {
        self.joy_to_bus_frames + self.bus_to_joy_frames
    }

    /// 被钩子修改的帧占 A→B 转发帧的百分比
    ///
    /// 返回 0.0 到 100.0 之间的值。如果没有转发过帧，返回 0.0。
    pub fn intercept_rate(&self) -> f64 {
        if self.joy_to_bus_frames == 0 {
            return 0.0;
        }
        (self.intercepted as f64 / self.joy_to_bus_frames as f64) * 100.0
    }
}
