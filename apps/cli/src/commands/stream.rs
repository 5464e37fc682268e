//! 数据流命令
//!
//! 打开串口，持续打印同步后的输出记录，直到 Ctrl+C 或达到指定数量。

use crate::config::{CliConfig, ConnectionArgs};
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use orientus_driver::{ChannelSink, ImuOutput};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// 输出通道容量（记录数）
const OUTPUT_CAPACITY: usize = 256;

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// 每行一条 JSON 记录
    Json,
    /// 人类可读的单行摘要
    #[default]
    Text,
}

/// 数据流命令参数
#[derive(Args, Debug)]
pub struct StreamCommand {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// 输出格式
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// 收到指定数量的记录后退出
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// 只打印融合 IMU 记录
    #[arg(long)]
    pub fused_only: bool,
}

impl StreamCommand {
    pub fn execute(&self, config: &CliConfig) -> Result<()> {
        let settings = self.connection.resolve(config);

        let (sink, rx) = ChannelSink::bounded(OUTPUT_CAPACITY);
        let dropped = sink.dropped_counter();

        eprintln!("🔌 连接到 {} ...", settings.port);
        let orientus = settings
            .builder()
            .sink(sink)
            .build()
            .with_context(|| format!("打开串口失败: {}", settings.port))?;

        let running = Arc::new(AtomicBool::new(true));
        let running_handler = running.clone();
        ctrlc::set_handler(move || {
            running_handler.store(false, Ordering::SeqCst);
        })
        .context("设置 Ctrl+C 处理失败")?;

        let mut printed = 0usize;
        while running.load(Ordering::SeqCst) {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(output) => {
                    if self.fused_only && !matches!(output, ImuOutput::FusedImu(_)) {
                        continue;
                    }
                    println!("{}", render(&output, self.format)?);
                    printed += 1;
                    if self.count.is_some_and(|n| printed >= n) {
                        break;
                    }
                },
                Err(e) if e.is_timeout() => {
                    if !orientus.is_running() {
                        warn!("IO thread exited");
                        break;
                    }
                },
                Err(_) => break,
            }
        }

        let metrics = orientus.metrics();
        orientus.shutdown().context("驱动异常退出")?;

        info!(
            "{} records printed, {} frames decoded, {} packets dropped, {} records dropped by sink",
            printed,
            metrics.frames_decoded,
            metrics.packets_dropped(),
            dropped.load(Ordering::Relaxed)
        );
        Ok(())
    }
}

/// 按格式渲染单条记录
pub fn render(output: &ImuOutput, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string(output).context("序列化记录失败"),
        OutputFormat::Text => Ok(summarize(output)),
    }
}

fn summarize(output: &ImuOutput) -> String {
    let stamp = output.header().stamp.as_secs_f64();
    match output {
        ImuOutput::FusedImu(imu) => {
            let q = imu.orientation;
            let w = imu.angular_velocity;
            let a = imu.linear_acceleration;
            format!(
                "{:>12.6} imu   q=[{:+.4} {:+.4} {:+.4} {:+.4}] w=[{:+.4} {:+.4} {:+.4}] a=[{:+.3} {:+.3} {:+.3}]",
                stamp, q.w, q.x, q.y, q.z, w.x, w.y, w.z, a.x, a.y, a.z
            )
        },
        ImuOutput::EulerAttitude(euler) => {
            let rpy = euler.attitude_deg;
            format!(
                "{:>12.6} euler rpy=[{:+.2} {:+.2} {:+.2}] deg",
                stamp, rpy.x, rpy.y, rpy.z
            )
        },
        ImuOutput::RawImu(raw) => {
            let w = raw.angular_velocity;
            let a = raw.linear_acceleration;
            format!(
                "{:>12.6} raw   w=[{:+.4} {:+.4} {:+.4}] a=[{:+.3} {:+.3} {:+.3}]",
                stamp, w.x, w.y, w.z, a.x, a.y, a.z
            )
        },
        ImuOutput::MagneticField(mag) => {
            let m = mag.magnetic_field;
            format!(
                "{:>12.6} mag   m=[{:+.3e} {:+.3e} {:+.3e}] T",
                stamp, m.x, m.y, m.z
            )
        },
        ImuOutput::Temperature(t) => {
            format!("{:>12.6} temp  {:.2} °C", stamp, t.temperature)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orientus_driver::{RecordHeader, TemperatureRecord};

    fn temperature() -> ImuOutput {
        ImuOutput::Temperature(TemperatureRecord {
            header: RecordHeader {
                frame_id: "imu_link".to_string(),
                stamp: Duration::from_millis(1500),
            },
            temperature: 25.5,
            variance: 0.0,
        })
    }

    #[test]
    fn test_render_text() {
        let text = render(&temperature(), OutputFormat::Text).unwrap();
        assert!(text.contains("1.500000"));
        assert!(text.contains("25.50"));
    }

    #[test]
    fn test_render_json() {
        let json = render(&temperature(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kind"], "temperature");
        assert_eq!(value["temperature"], 25.5);
    }
}
