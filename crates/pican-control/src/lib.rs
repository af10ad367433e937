//! # PiCAN Control
//!
//! 避障控制：距离传感器模型、障碍物几何、避障控制器与轮椅运动学模型。
//!
//! ## 模块
//!
//! - `geometry`: 二维向量与角度工具
//! - `polygon`: 多边形、包围盒与点包含测试
//! - `world`: 障碍物与参考场景
//! - `sensor`: 射线步进距离传感器
//! - `avoidance`: 避障控制器与中继钩子
//! - `chair`: 轮椅运动学模型（`simulate` 命令使用）
//! - `config`: TOML 配置
//!
//! ## 数据流
//!
//! ```text
//! 摇杆帧 ──inbound──▶ AvoidanceController::update ──outbound──▶ 驱动侧
//!                         │  measure() × N
//!                         ▼
//!                  ArcSwap<SensorReadings> ──▶ AvoidanceHook（中继线程）
//! ```

pub mod avoidance;
pub mod chair;
pub mod config;
pub mod error;
pub mod geometry;
pub mod polygon;
pub mod sensor;
pub mod world;

pub use avoidance::{
    AvoidanceController, AvoidanceHook, CycleOutcome, SensorReadings, blend, correct_frame,
};
pub use chair::{ChairModel, ChairSnapshot};
pub use config::AvoidanceConfig;
pub use error::ControlError;
pub use geometry::{Vector2D, wrap_degrees};
pub use polygon::{BoundingBox, ContainmentMode, Polygon};
pub use sensor::{Sensor, SensorLocation};
pub use world::{Obstacle, WORLD_UNITS_PER_METER, corridor, rect, reference_course};
