//! 模拟 JSM 命令
//!
//! 以固定间隔读取 USB 手柄前两个轴，转换为 R-Net 运动帧后发送到总线。
//!
//! 手柄的轴方向：上为 -Y，左为 -X，原样送入转换函数。

use crate::joystick::Joystick;
use anyhow::{Context, Result, bail};
use clap::Args;
use pican_can::{CanAdapter, bind};
use pican_protocol::{MAX_DEVICE_INSTANCE, joystick_to_command, movement_frame};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 解析十六进制设备实例号（0-F）
pub(crate) fn parse_instance(text: &str) -> Result<u8, String> {
    let value = u8::from_str_radix(text, 16).map_err(|e| format!("'{}' is not hex: {}", text, e))?;
    if value > MAX_DEVICE_INSTANCE {
        return Err(format!("device instance must be 0-F, got {:X}", value));
    }
    Ok(value)
}

/// 模拟 JSM 命令参数
#[derive(Args, Debug)]
pub struct FakeJsmCommand {
    /// 发送运动帧的 CAN 接口
    #[arg(long, default_value = "vcan0")]
    pub iface: String,

    /// JSM 设备实例号（十六进制 0-F）
    #[arg(long, default_value = "1", value_parser = parse_instance)]
    pub jsm_id: u8,

    /// 手柄编号（`/dev/input/js<N>`）
    #[arg(long, default_value_t = 0)]
    pub joy_id: u32,

    /// 发送间隔（毫秒）
    #[arg(long, default_value_t = 1000)]
    pub interval_ms: u64,
}

impl FakeJsmCommand {
    /// 执行发送循环，直到 Ctrl+C
    pub fn execute(&self, running: Arc<AtomicBool>) -> Result<()> {
        let mut socket =
            bind(&self.iface).with_context(|| format!("failed to bind to {}", self.iface))?;
        let joystick = Joystick::open(self.joy_id)?;
        info!("Joystick: {}", joystick.path());

        let period = Duration::from_millis(self.interval_ms.max(1));
        let mut next_tick = Instant::now();
        let mut sent: u64 = 0;

        while running.load(Ordering::Acquire) {
            if !joystick.is_alive() {
                bail!("joystick {} stopped reporting", joystick.path());
            }

            let state = joystick.state();
            let (lx, ly) = (state.axis(0), state.axis(1));
            let command = joystick_to_command(lx, ly);
            let frame = movement_frame(self.jsm_id, command)?;
            debug!("axes ({:.3}, {:.3}) -> {:?}", lx, ly, command);
            info!("frame: {}", frame);

            match socket.send(frame) {
                Ok(()) => sent += 1,
                Err(e) => warn!("error sending frame: {}", e),
            }

            next_tick += period;
            let now = Instant::now();
            if next_tick > now {
                spin_sleep::sleep(next_tick - now);
            } else {
                next_tick = now;
            }
        }

        info!("Sent {} movement frames", sent);
        Ok(())
    }
}
