//! 障碍物与场景
//!
//! 世界坐标单位为"世界单位"，`WORLD_UNITS_PER_METER` 个单位为 1 米。

use crate::{BoundingBox, ContainmentMode, Polygon, Vector2D};

/// 世界单位 / 米
pub const WORLD_UNITS_PER_METER: f64 = 25.0;

/// 不可变障碍物
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    shape: Polygon,
}

impl Obstacle {
    pub fn new(shape: Polygon) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> &Polygon {
        &self.shape
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.shape.bounding_box()
    }

    #[inline]
    pub fn contains(&self, point: Vector2D, mode: ContainmentMode) -> bool {
        self.shape.contains(point, mode)
    }
}

/// 轴对齐矩形，`(x, y)` 为左下角
pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Obstacle {
    let corners = [
        Vector2D::new(x, y),
        Vector2D::new(x + width, y),
        Vector2D::new(x + width, y + height),
        Vector2D::new(x, y + height),
    ];
    Obstacle {
        // 四个顶点，不会退化
        shape: Polygon::from_corners(corners),
    }
}

/// 沿 +Y 方向的走廊：左右两面墙，中间留 `space` 宽的通道
pub fn corridor(x: f64, y: f64, space: f64, length: f64, thickness: f64) -> [Obstacle; 2] {
    [
        rect(x, y, thickness, length),
        rect(x + space + thickness, y, thickness, length),
    ]
}

/// 参考场景：起点附近一个方块，正前方一条走廊
pub fn reference_course() -> Vec<Obstacle> {
    let mut obstacles = vec![rect(100.0, -200.0, 100.0, 100.0)];
    obstacles.extend(corridor(
        -50.0,
        150.0,
        2.5 * WORLD_UNITS_PER_METER,
        700.0,
        1.0 * WORLD_UNITS_PER_METER,
    ));
    obstacles
}
