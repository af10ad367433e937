//! 二维向量与角度工具
//!
//! 坐标系：Y 轴向上，0° 指向 +X（轮椅右侧），逆时针为正。

use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

/// 近似相等阈值
pub const EQ_THRESHOLD: f64 = 1e-9;

/// 二维向量
///
/// # 示例
///
/// ```
/// use pican_control::Vector2D;
///
/// let v = Vector2D::new(3.0, 4.0);
/// assert_eq!(v.mag(), 5.0);
/// assert!(Vector2D::from_angle_deg(90.0).approx_eq(Vector2D::new(0.0, 1.0)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2D {
    pub x: f64,
    pub y: f64,
}

impl Vector2D {
    /// 零向量
    pub const ZERO: Self = Vector2D { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Vector2D { x, y }
    }

    /// 指定角度（度）的单位向量
    #[inline]
    pub fn from_angle_deg(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Vector2D { x: cos, y: sin }
    }

    /// 长度
    #[inline]
    pub fn mag(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// 长度的平方（避免开方）
    #[inline]
    pub fn mag_sq(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// 单位向量；零向量或非有限值返回 `None`
    pub fn normalize(self) -> Option<Self> {
        let mag = self.mag();
        if mag > 0.0 && mag.is_finite() {
            Some(self / mag)
        } else {
            None
        }
    }

    /// 保持方向，缩放到指定长度
    pub fn with_mag(self, magnitude: f64) -> Option<Self> {
        self.normalize().map(|unit| unit * magnitude)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// 近似相等（差向量长度不超过 `EQ_THRESHOLD`）
    pub fn approx_eq(self, other: Self) -> bool {
        (self - other).mag() <= EQ_THRESHOLD
    }

    /// 点积
    #[inline]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }
}

impl fmt::Display for Vector2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3},{:.3})", self.x, self.y)
    }
}

impl Add for Vector2D {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Vector2D::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector2D {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector2D {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Vector2D::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector2D {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Vector2D::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Vector2D {
    type Output = Self;
    #[inline]
    fn div(self, rhs: f64) -> Self {
        Vector2D::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vector2D {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Vector2D::new(-self.x, -self.y)
    }
}

/// 把角度归一化到 `[0, 360)`
pub fn wrap_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid 对极小的负数可能返回 360.0
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vector_ops() {
        let a = Vector2D::new(1.0, 2.0);
        let b = Vector2D::new(3.0, -1.0);
        assert_eq!(a + b, Vector2D::new(4.0, 1.0));
        assert_eq!(a - b, Vector2D::new(-2.0, 3.0));
        assert_eq!(a * 2.0, Vector2D::new(2.0, 4.0));
        assert_eq!(b / 2.0, Vector2D::new(1.5, -0.5));
        assert_eq!(-a, Vector2D::new(-1.0, -2.0));
        assert_eq!(a.dot(b), 1.0);

        let mut c = a;
        c += b;
        assert_eq!(c, a + b);
    }

    #[test]
    fn test_magnitude_and_normalize() {
        let v = Vector2D::new(-3.0, 4.0);
        assert_eq!(v.mag(), 5.0);
        assert_eq!(v.mag_sq(), 25.0);

        let unit = v.normalize().unwrap();
        assert_relative_eq!(unit.mag(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(v.with_mag(10.0).unwrap().x, -6.0, epsilon = 1e-12);

        assert_eq!(Vector2D::ZERO.normalize(), None);
        assert_eq!(Vector2D::new(f64::NAN, 1.0).normalize(), None);
    }

    #[test]
    fn test_from_angle() {
        assert!(Vector2D::from_angle_deg(0.0).approx_eq(Vector2D::new(1.0, 0.0)));
        assert!(Vector2D::from_angle_deg(180.0).approx_eq(Vector2D::new(-1.0, 0.0)));
        assert!(Vector2D::from_angle_deg(-90.0).approx_eq(Vector2D::new(0.0, -1.0)));

        let diag = Vector2D::from_angle_deg(135.0);
        assert_relative_eq!(diag.x, -std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-12);
        assert_relative_eq!(diag.y, std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-12);
    }

    #[test]
    fn test_wrap_degrees() {
        assert_eq!(wrap_degrees(0.0), 0.0);
        assert_eq!(wrap_degrees(360.0), 0.0);
        assert_eq!(wrap_degrees(370.0), 10.0);
        assert_eq!(wrap_degrees(-10.0), 350.0);
        assert_eq!(wrap_degrees(-730.0), 350.0);
        assert!(wrap_degrees(-1e-20) < 360.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Vector2D::new(1.0, -0.5).to_string(), "(1.000,-0.500)");
    }
}
