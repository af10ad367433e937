//! 几何与传感器的属性测试

use pican_control::{
    ContainmentMode, Sensor, SensorLocation, Vector2D, blend, rect, wrap_degrees,
};
use proptest::prelude::*;

fn vector(range: f64) -> impl Strategy<Value = Vector2D> {
    (-range..range, -range..range).prop_map(|(x, y)| Vector2D::new(x, y))
}

proptest! {
    /// 修正后的向量保持输入强度
    #[test]
    fn blend_preserves_input_magnitude(input in vector(2.0), pushback in vector(3.0)) {
        prop_assume!(input.mag() > 1e-3);
        prop_assume!((input + pushback).mag() > 1e-6);

        let out = blend(input, pushback);
        prop_assert!((out.mag() - input.mag()).abs() < 1e-9 * input.mag().max(1.0));
    }

    /// 角度回绕总在 [0, 360)
    #[test]
    fn wrap_degrees_in_range(degrees in -1.0e6f64..1.0e6) {
        let wrapped = wrap_degrees(degrees);
        prop_assert!((0.0..360.0).contains(&wrapped));
    }

    /// 轴对齐矩形上两种包含模式一致（远离边界的点）
    #[test]
    fn rect_containment_modes_agree(
        x in -100.0f64..100.0,
        y in -100.0f64..100.0,
        w in 1.0f64..100.0,
        h in 1.0f64..100.0,
        point in vector(250.0),
    ) {
        let margin = 1e-3;
        prop_assume!((point.x - x).abs() > margin && (point.x - x - w).abs() > margin);
        prop_assume!((point.y - y).abs() > margin && (point.y - y - h).abs() > margin);

        let obstacle = rect(x, y, w, h);
        let inside = point.x > x && point.x < x + w && point.y > y && point.y < y + h;
        prop_assert_eq!(obstacle.contains(point, ContainmentMode::Polygon), inside);
        prop_assert_eq!(obstacle.contains(point, ContainmentMode::BoundingBox), inside);
    }

    /// 观测距离总在 (0, threshold] 内
    #[test]
    fn observed_distance_bounded(
        origin in vector(50.0),
        x in -60.0f64..60.0,
        y in -60.0f64..60.0,
    ) {
        let obstacles = [rect(x, y, 10.0, 10.0)];
        let mut sensor = Sensor::new(SensorLocation::FrontCenter, 25.0, 0.5).with_step(0.5);
        sensor.measure(origin, &obstacles, ContainmentMode::Polygon);

        prop_assert!(sensor.observed() > 0.0);
        prop_assert!(sensor.observed() <= sensor.threshold());
        prop_assert_eq!(sensor.triggered(), sensor.observed() < sensor.threshold());
    }
}
