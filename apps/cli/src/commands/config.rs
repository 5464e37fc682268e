//! 配置管理命令

use crate::config::{CliConfig, default_config_file};
use anyhow::Result;
use clap::Subcommand;
use std::path::Path;

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示当前配置
    Show,

    /// 写入带默认值的配置文件
    Init {
        /// 覆盖已存在的文件
        #[arg(short, long)]
        force: bool,
    },

    /// 设置配置项
    Set {
        /// 串口设备
        #[arg(short, long)]
        port: Option<String>,

        /// 输出记录坐标系
        #[arg(long)]
        frame_id: Option<String>,

        /// 波特率
        #[arg(short, long)]
        baud_rate: Option<u32>,
    },

    /// 打印配置文件路径
    Path,
}

impl ConfigCommand {
    /// `explicit` 为 `--config` 指定的路径
    pub fn execute(self, explicit: Option<&Path>) -> Result<()> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => default_config_file()?,
        };

        match self {
            ConfigCommand::Show => Self::show_(&path),
            ConfigCommand::Init { force } => Self::init_(&path, force),
            ConfigCommand::Set {
                port,
                frame_id,
                baud_rate,
            } => Self::set_(&path, port, frame_id, baud_rate),
            ConfigCommand::Path => {
                println!("{}", path.display());
                Ok(())
            },
        }
    }

    fn show_(path: &Path) -> Result<()> {
        let config = CliConfig::load_from(path)?;
        println!("配置文件: {}", path.display());
        println!("  串口: {}", config.port.as_deref().unwrap_or("(未设置)"));
        println!("  坐标系: {}", config.frame_id.as_deref().unwrap_or("(未设置)"));
        match config.baud_rate {
            Some(baud) => println!("  波特率: {}", baud),
            None => println!("  波特率: (未设置)"),
        }
        match config.configure_on_start {
            Some(enabled) => println!("  启动配置: {}", enabled),
            None => println!("  启动配置: (未设置)"),
        }
        Ok(())
    }

    fn init_(path: &Path, force: bool) -> Result<()> {
        anyhow::ensure!(
            force || !path.exists(),
            "配置文件已存在: {}（使用 --force 覆盖）",
            path.display()
        );
        CliConfig::with_defaults().save_to(path)?;
        println!("✅ 已写入 {}", path.display());
        Ok(())
    }

    fn set_(
        path: &Path,
        port: Option<String>,
        frame_id: Option<String>,
        baud_rate: Option<u32>,
    ) -> Result<()> {
        let mut config = CliConfig::load_from(path)?;

        if let Some(port) = port {
            println!("✅ 设置默认串口: {}", port);
            config.port = Some(port);
        }
        if let Some(frame_id) = frame_id {
            println!("✅ 设置坐标系: {}", frame_id);
            config.frame_id = Some(frame_id);
        }
        if let Some(baud) = baud_rate {
            println!("✅ 设置波特率: {}", baud);
            config.baud_rate = Some(baud);
        }

        config.save_to(path)
    }
}
