//! 多边形与点包含测试
//!
//! 点包含使用水平射线的边奇偶计数，先做包围盒预检查。
//! `ContainmentMode::BoundingBox` 只做预检查，把障碍物当作其包围盒。

use crate::{ControlError, Vector2D};
use serde::{Deserialize, Serialize};

/// 顶点与测试点同高时的偏移量
const VERTEX_NUDGE: f64 = 1e-6;

/// 点包含测试的精度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContainmentMode {
    /// 包围盒预检查 + 边奇偶射线测试
    #[default]
    Polygon,
    /// 只测试包围盒
    BoundingBox,
}

/// 轴对齐包围盒
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// 两个包围盒是否重叠（边界接触不算）
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }

    /// 点是否严格位于包围盒内部
    pub fn contains(&self, point: Vector2D) -> bool {
        self.overlaps(&BoundingBox {
            min_x: point.x,
            min_y: point.y,
            max_x: point.x,
            max_y: point.y,
        })
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// 闭合多边形（最后一个顶点隐式连回第一个）
///
/// 包围盒在构造时计算并缓存。
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Vector2D>,
    bbox: BoundingBox,
}

impl Polygon {
    /// 创建多边形
    ///
    /// # 错误
    /// - `ControlError::DegeneratePolygon`: 顶点少于 3 个
    pub fn new(vertices: Vec<Vector2D>) -> Result<Self, ControlError> {
        if vertices.len() < 3 {
            return Err(ControlError::DegeneratePolygon {
                vertices: vertices.len(),
            });
        }

        let bbox = bounding_box_of(&vertices);
        Ok(Self { vertices, bbox })
    }

    /// 四边形（矩形障碍物），不会失败
    pub(crate) fn from_corners(corners: [Vector2D; 4]) -> Self {
        let vertices = corners.to_vec();
        let bbox = bounding_box_of(&vertices);
        Self { vertices, bbox }
    }

    pub fn vertices(&self) -> &[Vector2D] {
        &self.vertices
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }

    /// 所有边（包括最后一个顶点到第一个顶点的闭合边）
    pub fn edges(&self) -> impl Iterator<Item = (Vector2D, Vector2D)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    pub fn bbox_overlaps(&self, other: &BoundingBox) -> bool {
        self.bbox.overlaps(other)
    }

    /// 点是否在多边形内
    pub fn contains(&self, point: Vector2D, mode: ContainmentMode) -> bool {
        if !self.bbox.contains(point) {
            return false;
        }
        match mode {
            ContainmentMode::BoundingBox => true,
            ContainmentMode::Polygon => self.edge_parity(point),
        }
    }

    /// 从测试点向 +X 方向发射射线，统计穿过的边数，奇数为内部
    fn edge_parity(&self, point: Vector2D) -> bool {
        let mut inside = false;

        for (mut a, mut b) in self.edges() {
            // a 在下，b 在上
            if a.y > b.y {
                std::mem::swap(&mut a, &mut b);
            }

            let mut q = point;
            if q.y == a.y || q.y == b.y {
                q.y += VERTEX_NUDGE;
            }

            if q.y > b.y || q.y < a.y || q.x > a.x.max(b.x) {
                continue;
            }

            if q.x < a.x.min(b.x) {
                inside = !inside;
                continue;
            }

            let (Some(edge_slope), Some(point_slope)) =
                (slope(b.y - a.y, b.x - a.x), slope(q.y - a.y, q.x - a.x))
            else {
                continue;
            };
            if point_slope >= edge_slope {
                inside = !inside;
            }
        }

        inside
    }
}

/// 调用方保证 `vertices` 非空
fn bounding_box_of(vertices: &[Vector2D]) -> BoundingBox {
    let first = vertices[0];
    vertices.iter().skip(1).fold(
        BoundingBox {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        },
        |bbox, v| BoundingBox {
            min_x: bbox.min_x.min(v.x),
            min_y: bbox.min_y.min(v.y),
            max_x: bbox.max_x.max(v.x),
            max_y: bbox.max_y.max(v.y),
        },
    )
}

/// 斜率；竖直线为正无穷，两点重合时无定义
fn slope(dy: f64, dx: f64) -> Option<f64> {
    if dx == 0.0 {
        if dy == 0.0 { None } else { Some(f64::INFINITY) }
    } else {
        Some(dy / dx)
    }
}
