//! # Orientus CLI
//!
//! Orientus IMU 命令行工具。
//!
//! ```bash
//! # 配置默认串口
//! orientus-cli config set --port /dev/ttyUSB0
//!
//! # 打印融合姿态（Ctrl+C 退出）
//! orientus-cli stream --fused-only
//!
//! # 健康检查
//! orientus-cli diagnostics
//!
//! # 离线解码抓包文件
//! orientus-cli decode capture.bin --format json
//! ```
//!
//! 日志级别通过 `RUST_LOG` 控制（默认 `info`）。

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{ConfigCommand, DecodeCommand, DiagnosticsCommand, StreamCommand, ZeroCommand};
use config::CliConfig;

/// Orientus CLI - IMU 命令行工具
#[derive(Parser, Debug)]
#[command(name = "orientus-cli")]
#[command(about = "Command-line interface for Orientus IMUs", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 <config_dir>/orientus/config.toml）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 持续打印输出记录
    Stream {
        #[command(flatten)]
        args: StreamCommand,
    },

    /// 打印设备健康报告
    Diagnostics {
        #[command(flatten)]
        args: DiagnosticsCommand,
    },

    /// 复位或零位对准
    Zero {
        #[command(flatten)]
        args: ZeroCommand,
    },

    /// 离线解码串口抓包文件
    Decode {
        #[command(flatten)]
        args: DecodeCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let explicit = cli.config.as_deref();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(explicit),
        Commands::Decode { args } => args.execute(),
        Commands::Stream { args } => args.execute(&CliConfig::load(explicit)?),
        Commands::Diagnostics { args } => args.execute(&CliConfig::load(explicit)?),
        Commands::Zero { args } => args.execute(&CliConfig::load(explicit)?),
    }
}
