//! 置零命令
//!
//! 默认执行热启动复位；`--alignment` 以当前姿态作为安装对准零位。

use crate::config::{CliConfig, ConnectionArgs};
use anyhow::{Context, Result};
use clap::Args;
use orientus_driver::protocol::ResetKind;
use std::time::Duration;

/// 等待设备拒绝应答的时间
const ACK_WINDOW: Duration = Duration::from_millis(500);

/// 置零命令参数
#[derive(Args, Debug)]
pub struct ZeroCommand {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// 冷启动复位（默认热启动）
    #[arg(long, conflicts_with = "alignment")]
    pub cold: bool,

    /// 安装对准置零而不是复位
    #[arg(long)]
    pub alignment: bool,

    /// 对准结果写入闪存（仅与 --alignment 一起使用）
    #[arg(long, requires = "alignment")]
    pub permanent: bool,
}

impl ZeroCommand {
    pub fn execute(&self, config: &CliConfig) -> Result<()> {
        let settings = self.connection.resolve(config);

        eprintln!("🔌 连接到 {} ...", settings.port);
        let orientus = settings
            .builder()
            .configure_on_start(false)
            .build()
            .with_context(|| format!("打开串口失败: {}", settings.port))?;

        if self.alignment {
            println!("📐 发送零位对准（permanent = {}）...", self.permanent);
            orientus.zero_alignment(self.permanent)?;
        } else {
            let kind = if self.cold {
                ResetKind::ColdStart
            } else {
                ResetKind::HotStart
            };
            println!("🔄 发送复位（{:?}）...", kind);
            orientus.reset(kind)?;
        }

        std::thread::sleep(ACK_WINDOW);
        let rejection = orientus.last_rejection();
        orientus.shutdown()?;

        if let Some(rejected) = rejection {
            anyhow::bail!("设备拒绝请求: {}", rejected);
        }
        println!("✅ 完成");
        Ok(())
    }
}
