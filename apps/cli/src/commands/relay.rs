//! 中继命令
//!
//! 把摇杆总线（`--joy`）与驱动总线（`--bus`）桥接起来，直到 Ctrl+C。

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use pican_can::bind;
use pican_driver::{BusRelay, FixedPayloadHook, InterceptHook, PassThrough, RelayConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 摇杆 → 驱动方向使用的钩子
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HookKind {
    /// 原样转发
    Pass,
    /// 运动帧替换为 `--payload`
    Fixed,
}

/// 中继命令参数
#[derive(Args, Debug)]
pub struct RelayCommand {
    /// 摇杆（JSM）侧 CAN 接口
    #[arg(long)]
    pub joy: String,

    /// 驱动（电机控制器）侧 CAN 接口
    #[arg(long)]
    pub bus: String,

    /// 拦截钩子
    #[arg(long, value_enum, default_value_t = HookKind::Pass)]
    pub hook: HookKind,

    /// `fixed` 钩子写入的数据（十六进制）
    #[arg(long, default_value = "BEEF")]
    pub payload: String,

    /// 中继配置文件（TOML）
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 统计输出间隔（秒），0 表示只在退出时输出
    #[arg(long, default_value_t = 10)]
    pub stats_interval: u64,
}

impl RelayCommand {
    fn load_config(&self) -> Result<RelayConfig> {
        let Some(path) = &self.config else {
            return Ok(RelayConfig::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read relay config {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse relay config {}", path.display()))
    }

    fn build_hook(&self) -> Result<Arc<dyn InterceptHook>> {
        Ok(match self.hook {
            HookKind::Pass => Arc::new(PassThrough),
            HookKind::Fixed => Arc::new(
                FixedPayloadHook::from_hex(&self.payload).context("invalid --payload")?,
            ),
        })
    }

    /// 执行中继
    pub fn execute(&self, running: Arc<AtomicBool>) -> Result<()> {
        let config = self.load_config()?;
        let hook = self.build_hook()?;

        let joy = bind(&self.joy).with_context(|| format!("failed to bind to {}", self.joy))?;
        let bus = bind(&self.bus).with_context(|| format!("failed to bind to {}", self.bus))?;

        let poll = config.poll_interval().max(Duration::from_millis(10));
        let relay = BusRelay::start(joy, bus, hook, config)?;
        info!(
            "Relaying {} <-> {} ({:?} hook). Press Ctrl+C to stop.",
            self.joy, self.bus, self.hook
        );

        let stats_interval = Duration::from_secs(self.stats_interval);
        let mut last_report = Instant::now();
        while running.load(Ordering::Acquire) && relay.is_running() {
            std::thread::sleep(poll);

            if !stats_interval.is_zero() && last_report.elapsed() >= stats_interval {
                let stats = relay.metrics().snapshot();
                info!(
                    "joy->bus {} | bus->joy {} | intercepted {} | dropped {}",
                    stats.joy_to_bus_frames,
                    stats.bus_to_joy_frames,
                    stats.intercepted,
                    stats.dropped
                );
                last_report = Instant::now();
            }
        }

        if !relay.is_running() {
            warn!("Relay stopped on its own (both buses closed)");
        }

        let stats = relay.shutdown();
        info!(
            "Relay finished: {} frames forwarded ({} joy->bus, {} bus->joy), \
             {} intercepted ({:.1}%), {} suppressed, {} dropped, {} rx errors, {} tx errors",
            stats.total_forwarded(),
            stats.joy_to_bus_frames,
            stats.bus_to_joy_frames,
            stats.intercepted,
            stats.intercept_rate(),
            stats.suppressed,
            stats.dropped,
            stats.rx_errors,
            stats.tx_errors
        );
        Ok(())
    }
}
