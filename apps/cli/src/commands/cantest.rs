//! 总线冒烟测试
//!
//! 打印摇杆转换表，然后向接口发送一组样例帧（可以用 `candump` 对照）。

use anyhow::{Context, Result};
use clap::Args;
use pican_can::{CanAdapter, bind};
use pican_protocol::{AxisCommand, Frame, FrameKind, joystick_to_command};
use tracing::info;

/// 转换表的输入（覆盖死区、线性区与超量程）
pub const SAMPLE_INPUTS: [f32; 9] = [0.05, 0.08, 0.1, 0.3, 0.5, 0.8, 0.9, 1.0, 1.2];

/// 样例日志行
pub const SAMPLE_LINES: [&str; 6] = [
    "123#01020304050607",
    "000#0000",
    "02000100#0064",
    "02000100#6400",
    "02000100#649C",
    "02000100#9C64",
];

/// 每个输入 `i` 按 `(-i, i)` 转换
pub fn translator_table() -> Vec<(f32, AxisCommand)> {
    SAMPLE_INPUTS
        .iter()
        .map(|&i| (i, joystick_to_command(-i, i)))
        .collect()
}

/// 冒烟测试参数
#[derive(Args, Debug)]
pub struct CantestCommand {
    /// 目标 CAN 接口
    #[arg(long, default_value = "vcan0")]
    pub iface: String,
}

impl CantestCommand {
    pub fn execute(&self) -> Result<()> {
        for (input, command) in translator_table() {
            let [first, second] = command.to_bytes();
            println!("in: {:.6}, out: {:02x}, {:02x}", input, first, second);
        }

        let mut socket =
            bind(&self.iface).with_context(|| format!("failed to bind to {}", self.iface))?;

        for line in SAMPLE_LINES {
            let frame = Frame::from_log_line(line)
                .with_context(|| format!("failed to build frame {:?}", line))?;
            socket
                .send(frame)
                .with_context(|| format!("failed to send {:?} frame", line))?;
            info!("sent {} ({:?})", frame, FrameKind::classify(frame.id));
        }
        Ok(())
    }
}
