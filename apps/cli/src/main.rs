//! # PiCAN CLI
//!
//! R-Net 拦截管线的命令行工具。
//!
//! ```bash
//! # 在摇杆总线和驱动总线之间中继（Ctrl+C 退出）
//! pican relay --joy can0 --bus can1
//!
//! # 用 USB 手柄模拟 JSM，向 vcan0 发送运动帧
//! pican fakejsm --iface vcan0 --jsm-id 1 --joy-id 0
//!
//! # 发送样例帧并打印转换表
//! pican cantest --iface vcan0
//!
//! # 无界面避障仿真
//! pican simulate --ticks 300 --forward 1.0
//! ```
//!
//! 日志级别由 `RUST_LOG` 控制，默认 `pican_cli=info`。

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::error;

mod commands;
mod joystick;

use commands::{CantestCommand, FakeJsmCommand, RelayCommand, SimulateCommand};

/// PiCAN - R-Net 轮椅 CAN 拦截工具
#[derive(Parser, Debug)]
#[command(name = "pican")]
#[command(about = "R-Net CAN interception and collision-avoidance tools", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 在两条总线之间中继帧
    Relay {
        #[command(flatten)]
        args: RelayCommand,
    },

    /// 用 USB 手柄模拟 JSM
    Fakejsm {
        #[command(flatten)]
        args: FakeJsmCommand,
    },

    /// 发送样例帧并打印摇杆转换表
    Cantest {
        #[command(flatten)]
        args: CantestCommand,
    },

    /// 无界面避障仿真
    Simulate {
        #[command(flatten)]
        args: SimulateCommand,
    },
}

/// 安装 Ctrl+C 处理器，返回运行标志
fn install_shutdown_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nReceived interrupt signal. Shutting down...");
        flag.store(false, Ordering::Release);
    })?;
    Ok(running)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Relay { args } => args.execute(install_shutdown_flag()?),
        Commands::Fakejsm { args } => args.execute(install_shutdown_flag()?),
        Commands::Cantest { args } => args.execute(),
        Commands::Simulate { args } => args.execute(install_shutdown_flag()?),
    }
}

fn main() {
    // 初始化日志
    let filter = match "pican_cli=info".parse() {
        Ok(directive) => tracing_subscriber::EnvFilter::from_default_env().add_directive(directive),
        Err(_) => tracing_subscriber::EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}
