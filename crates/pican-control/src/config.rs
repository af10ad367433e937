//! 避障配置
//!
//! TOML 格式，所有字段都有默认值：
//!
//! ```toml
//! threshold = 25.0
//! ray_step = 0.1
//! front_pushback = 0.5
//! side_pushback = 2.0
//! containment = "polygon"        # 或 "bounding-box"
//! sensors = ["front-center", "front-left", "front-right"]
//! ```

use crate::sensor::{DEFAULT_RAY_STEP, MAX_RAY_STEPS};
use crate::{ContainmentMode, ControlError, Sensor, SensorLocation};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 避障控制器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceConfig {
    /// 检测阈值（世界单位）
    pub threshold: f64,

    /// 射线步长
    pub ray_step: f64,

    /// 正前方传感器的推离强度
    pub front_pushback: f64,

    /// 左右两侧传感器的推离强度
    pub side_pushback: f64,

    /// 点包含测试精度
    pub containment: ContainmentMode,

    /// 启用的传感器（顺序决定距离相同时的优先级）
    pub sensors: Vec<SensorLocation>,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            threshold: 25.0,
            ray_step: DEFAULT_RAY_STEP,
            front_pushback: 0.5,
            side_pushback: 2.0,
            containment: ContainmentMode::Polygon,
            sensors: vec![
                SensorLocation::FrontCenter,
                SensorLocation::FrontLeft,
                SensorLocation::FrontRight,
            ],
        }
    }
}

impl AvoidanceConfig {
    /// 从文件加载并校验
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ControlError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ControlError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 检查数值范围
    pub fn validate(&self) -> Result<(), ControlError> {
        if !(self.threshold > 0.0 && self.threshold.is_finite()) {
            return Err(ControlError::InvalidConfig(format!(
                "threshold must be positive, got {}",
                self.threshold
            )));
        }
        if !(self.ray_step > 0.0 && self.ray_step < self.threshold) {
            return Err(ControlError::InvalidConfig(format!(
                "ray_step must be in (0, threshold), got {}",
                self.ray_step
            )));
        }
        if self.threshold / self.ray_step > f64::from(MAX_RAY_STEPS) {
            return Err(ControlError::InvalidConfig(format!(
                "threshold / ray_step must not exceed {}, got {} / {}",
                MAX_RAY_STEPS, self.threshold, self.ray_step
            )));
        }
        for (name, value) in [
            ("front_pushback", self.front_pushback),
            ("side_pushback", self.side_pushback),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(ControlError::InvalidConfig(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// 按配置创建传感器
    pub fn build_sensors(&self) -> Vec<Sensor> {
        self.sensors
            .iter()
            .map(|&location| {
                let pushback = match location {
                    SensorLocation::FrontCenter => self.front_pushback,
                    SensorLocation::FrontLeft | SensorLocation::FrontRight => self.side_pushback,
                };
                Sensor::new(location, self.threshold, pushback).with_step(self.ray_step)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AvoidanceConfig::default();
        assert!(config.validate().is_ok());

        let sensors = config.build_sensors();
        assert_eq!(sensors.len(), 3);
        assert_eq!(sensors[0].location(), SensorLocation::FrontCenter);
        assert_eq!(sensors[0].pushback_magnitude(), 0.5);
        assert_eq!(sensors[1].pushback_magnitude(), 2.0);
        assert_eq!(sensors[2].threshold(), 25.0);
        assert_eq!(sensors[2].step(), 0.1);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AvoidanceConfig::from_toml_str(
            "threshold = 10.0\ncontainment = \"bounding-box\"\nsensors = [\"front-left\"]",
        )
        .unwrap();
        assert_eq!(config.threshold, 10.0);
        assert_eq!(config.containment, ContainmentMode::BoundingBox);
        assert_eq!(config.sensors, vec![SensorLocation::FrontLeft]);
        assert_eq!(config.side_pushback, 2.0);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(
            AvoidanceConfig::from_toml_str("").unwrap(),
            AvoidanceConfig::default()
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            AvoidanceConfig::from_toml_str("threshold = 0.0"),
            Err(ControlError::InvalidConfig(_))
        ));
        assert!(matches!(
            AvoidanceConfig::from_toml_str("ray_step = -0.1"),
            Err(ControlError::InvalidConfig(_))
        ));
        assert!(matches!(
            AvoidanceConfig::from_toml_str("side_pushback = -1.0"),
            Err(ControlError::InvalidConfig(_))
        ));
        assert!(matches!(
            AvoidanceConfig::from_toml_str("sensors = [\"rear\"]"),
            Err(ControlError::Parse(_))
        ));
    }

    #[test]
    fn test_excessive_ray_steps_rejected() {
        assert!(matches!(
            AvoidanceConfig::from_toml_str("threshold = 1e12\nray_step = 1e-3"),
            Err(ControlError::InvalidConfig(_))
        ));
        // 恰好等于上限仍然允许
        let config = AvoidanceConfig::from_toml_str("threshold = 500000.0\nray_step = 0.5").unwrap();
        assert_eq!(config.threshold, 500000.0);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "front_pushback = 1.5").unwrap();

        let config = AvoidanceConfig::load(file.path()).unwrap();
        assert_eq!(config.front_pushback, 1.5);

        let missing = AvoidanceConfig::load("/nonexistent/pican/avoidance.toml");
        assert!(matches!(missing, Err(ControlError::Io(_))));
    }
}
