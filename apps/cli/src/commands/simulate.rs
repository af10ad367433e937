//! 无界面避障仿真
//!
//! 摇杆输入 → 避障控制器 → 轮椅模型，在参考场景（一个方块加一条走廊）中运行。
//!
//! 输入脚本每行一段：`<周期数> <X> <Y>`，X/Y 是手柄原始轴值（`[-1, 1]`），
//! `#` 开头为注释。不给脚本时用 `--ticks/--side/--forward` 组成单段输入。
//!
//! ```text
//! # 直行 100 个周期，然后右转 40 个周期
//! 100  0.0  1.0
//! 40   0.6  1.0
//! ```

use super::fakejsm::parse_instance;
use anyhow::{Context, Result, bail};
use clap::Args;
use pican_control::{
    AvoidanceConfig, AvoidanceController, ChairModel, CycleOutcome, Vector2D, reference_course,
};
use pican_protocol::{joystick_to_command, movement_frame};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// 脚本中的一段恒定输入
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptStep {
    pub ticks: u64,
    pub x: f32,
    pub y: f32,
}

/// 解析输入脚本
pub fn parse_script(content: &str) -> Result<Vec<ScriptStep>> {
    let mut steps = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [ticks, x, y] = fields.as_slice() else {
            bail!("line {}: expected '<ticks> <x> <y>', got {:?}", number + 1, line);
        };
        steps.push(ScriptStep {
            ticks: ticks
                .parse()
                .with_context(|| format!("line {}: bad tick count", number + 1))?,
            x: x.parse().with_context(|| format!("line {}: bad x", number + 1))?,
            y: y.parse().with_context(|| format!("line {}: bad y", number + 1))?,
        });
    }
    Ok(steps)
}

/// 仿真参数
#[derive(Args, Debug)]
pub struct SimulateCommand {
    /// 周期数（无脚本时）
    #[arg(long, default_value_t = 300)]
    pub ticks: u64,

    /// 手柄 X 轴（无脚本时）
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub side: f32,

    /// 手柄 Y 轴（无脚本时）
    #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
    pub forward: f32,

    /// 输入脚本文件
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// 避障配置文件（TOML）
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 关闭避障（帧原样交给轮椅）
    #[arg(long)]
    pub disable_avoidance: bool,

    /// 速度档位（0-4）
    #[arg(long, default_value_t = 0)]
    pub tier: usize,

    /// JSM 设备实例号（十六进制 0-F）
    #[arg(long, default_value = "1", value_parser = parse_instance)]
    pub jsm_id: u8,

    /// 周期间隔（毫秒），0 表示不限速
    #[arg(long, default_value_t = 0)]
    pub tick_ms: u64,

    /// 每隔多少周期输出一次状态
    #[arg(long, default_value_t = 10)]
    pub report_every: u64,
}

/// 仿真结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationSummary {
    pub ticks: u64,
    pub corrected: u64,
    pub dropped: u64,
    pub collisions: u64,
    pub position: Vector2D,
    pub bearing_deg: f64,
}

impl SimulateCommand {
    fn load_config(&self) -> Result<AvoidanceConfig> {
        match &self.config {
            Some(path) => AvoidanceConfig::load(path)
                .with_context(|| format!("failed to load avoidance config {}", path.display())),
            None => Ok(AvoidanceConfig::default()),
        }
    }

    fn load_script(&self) -> Result<Vec<ScriptStep>> {
        match &self.script {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read script {}", path.display()))?;
                parse_script(&content)
            },
            None => Ok(vec![ScriptStep {
                ticks: self.ticks,
                x: self.side,
                y: self.forward,
            }]),
        }
    }

    pub fn execute(&self, running: Arc<AtomicBool>) -> Result<()> {
        let config = self.load_config()?;
        let script = self.load_script()?;
        let summary = self.run(&config, &script, &running)?;

        info!(
            "Simulation finished after {} ticks: position {}, bearing {:.1}°, \
             {} corrected, {} dropped, {} collisions",
            summary.ticks,
            summary.position,
            summary.bearing_deg,
            summary.corrected,
            summary.dropped,
            summary.collisions
        );
        Ok(())
    }

    /// 运行脚本，返回汇总
    pub fn run(
        &self,
        config: &AvoidanceConfig,
        script: &[ScriptStep],
        running: &AtomicBool,
    ) -> Result<SimulationSummary> {
        let obstacles = reference_course();
        let (mut controller, joystick, chair_bus) = AvoidanceController::with_conduits(config);
        controller.set_disabled(self.disable_avoidance);

        let mut chair = ChairModel::default();
        chair.set_speed_tier(self.tier);

        let period = Duration::from_millis(self.tick_ms);
        let mut next_tick = Instant::now();
        let mut summary = SimulationSummary {
            ticks: 0,
            corrected: 0,
            dropped: 0,
            collisions: 0,
            position: chair.snapshot().position,
            bearing_deg: chair.snapshot().bearing_deg,
        };

        'script: for step in script {
            let frame = movement_frame(self.jsm_id, joystick_to_command(step.x, step.y))?;
            debug!("Script step {:?} -> {}", step, frame);

            for _ in 0..step.ticks {
                if !running.load(Ordering::Acquire) {
                    break 'script;
                }

                // 上一帧还没被取走时，本周期的输入被丢弃
                let _ = joystick.try_send(frame);

                match controller.update(&chair.snapshot(), &obstacles)? {
                    CycleOutcome::Forwarded { corrected: true } => summary.corrected += 1,
                    CycleOutcome::Dropped => summary.dropped += 1,
                    _ => {},
                }
                let snapshot = chair.step(chair_bus.try_recv().ok(), &obstacles, config.containment);
                summary.ticks += 1;

                if self.report_every > 0 && summary.ticks % self.report_every == 0 {
                    let readings = controller.readings();
                    match readings.closest_triggered() {
                        Some(sensor) => info!(
                            "tick {:>5}: pos {} bearing {:>6.1}° | {} at {:.1}",
                            summary.ticks,
                            snapshot.position,
                            snapshot.bearing_deg,
                            sensor.location(),
                            sensor.observed()
                        ),
                        None => info!(
                            "tick {:>5}: pos {} bearing {:>6.1}° | clear",
                            summary.ticks, snapshot.position, snapshot.bearing_deg
                        ),
                    }
                }

                if !period.is_zero() {
                    next_tick += period;
                    let now = Instant::now();
                    if next_tick > now {
                        spin_sleep::sleep(next_tick - now);
                    } else {
                        next_tick = now;
                    }
                }
            }
        }

        let snapshot = chair.snapshot();
        summary.position = snapshot.position;
        summary.bearing_deg = snapshot.bearing_deg;
        summary.collisions = chair.collisions();
        Ok(summary)
    }
}
