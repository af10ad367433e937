//! # PiCAN Driver
//!
//! 两条 CAN 总线之间的中继（Relay）与帧拦截钩子。
//!
//! ```text
//!  摇杆侧 (A) ──rx pump──▶ ┌──────────┐ ──writer──▶ 驱动侧 (B)
//!                          │ forward  │
//!  摇杆侧 (A) ◀──writer─── │  loop    │ ◀──rx pump── 驱动侧 (B)
//!                          └──────────┘
//! ```
//!
//! A→B 方向的帧经过 `InterceptHook`，B→A 方向原样转发。

pub mod error;
pub mod hooks;
pub mod metrics;
pub mod relay;

pub use error::DriverError;
pub use hooks::{FixedPayloadHook, InterceptHook, PassThrough};
pub use metrics::{MetricsSnapshot, RelayMetrics};
pub use relay::{BusRelay, Direction, RelayConfig};
