//! 诊断命令
//!
//! 等待第一份完整的诊断快照（Status + RunningTime + DeviceInformation）并打印健康报告。

use crate::config::{CliConfig, ConnectionArgs};
use anyhow::{Context, Result};
use clap::Args;
use orientus_driver::DiagnosticsReport;
use orientus_driver::protocol::{OutboundRequest, PacketId};
use std::time::Duration;

/// 诊断命令参数
#[derive(Args, Debug)]
pub struct DiagnosticsCommand {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// 等待超时（秒）
    #[arg(short, long, default_value_t = 5)]
    pub timeout: u64,

    /// 以 JSON 输出
    #[arg(long)]
    pub json: bool,
}

impl DiagnosticsCommand {
    pub fn execute(&self, config: &CliConfig) -> Result<()> {
        let settings = self.connection.resolve(config);

        eprintln!("🔌 连接到 {} ...", settings.port);
        let orientus = settings
            .builder()
            .build()
            .with_context(|| format!("打开串口失败: {}", settings.port))?;

        // 设备未配置周期输出时主动请求一次
        orientus.send_request(OutboundRequest::request(&[
            PacketId::Status,
            PacketId::RunningTime,
            PacketId::DeviceInformation,
        ]))?;

        let record = orientus
            .wait_for_diagnostics(Duration::from_secs(self.timeout))
            .context("未收到诊断数据")?;
        let report =
            DiagnosticsReport::from_record(&record, orientus.port(), orientus.frame_id());

        if self.json {
            let value = serde_json::json!({
                "overall": report.overall().to_string().trim(),
                "record": record,
                "report": report,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            println!("Overall: {}", report.overall());
            print!("{}", report);
        }

        orientus.shutdown()?;
        Ok(())
    }
}
