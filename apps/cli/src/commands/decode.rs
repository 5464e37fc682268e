//! 离线解码命令
//!
//! 把串口抓包文件当作字节流送入同一条处理管线（无 IO 线程、无设备），
//! 用于排查现场数据。

use crate::commands::stream::{OutputFormat, render};
use anyhow::{Context, Result};
use clap::Args;
use orientus_driver::{CollectingSink, DiagnosticsReport, MetricsSnapshot, Pipeline};
use std::fs;
use std::path::PathBuf;

/// 离线解码命令参数
#[derive(Args, Debug)]
pub struct DecodeCommand {
    /// 抓包文件（原始串口字节）
    pub capture: PathBuf,

    /// 输出记录坐标系
    #[arg(long, default_value = orientus_driver::DEFAULT_FRAME_ID)]
    pub frame_id: String,

    /// 每批送入的字节数（模拟串口读取粒度）
    #[arg(long, default_value_t = 1024)]
    pub chunk_size: usize,

    /// 输出格式
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// 只打印统计
    #[arg(short, long)]
    pub quiet: bool,
}

/// 解码结果
pub struct DecodeResult {
    pub sink: CollectingSink,
    pub metrics: MetricsSnapshot,
    pub report: DiagnosticsReport,
    /// 文件末尾未成帧的字节数
    pub trailing_bytes: usize,
}

impl DecodeCommand {
    pub fn execute(&self) -> Result<()> {
        let bytes = fs::read(&self.capture)
            .with_context(|| format!("读取抓包文件失败: {}", self.capture.display()))?;
        let result = self.decode(&bytes)?;

        if !self.quiet {
            for output in &result.sink.outputs {
                println!("{}", render(output, self.format)?);
            }
            for rejected in &result.sink.rejections {
                eprintln!("⚠️  {}", rejected);
            }
        }

        let m = result.metrics;
        eprintln!("📊 {} bytes, {} frames", m.bytes_received, m.frames_decoded);
        eprintln!(
            "   desyncs: {}, discarded bytes: {}, unknown: {}, malformed: {}, trailing: {}",
            m.framing_desyncs,
            m.bytes_discarded,
            m.unknown_ids,
            m.malformed_payloads,
            result.trailing_bytes
        );
        eprintln!(
            "   fused: {}, raw: {}, diagnostics refreshes: {}",
            m.fused_emitted, m.raw_emitted, m.diagnostics_refreshed
        );
        if result.report.available {
            eprint!("{}", result.report);
        }
        Ok(())
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<DecodeResult> {
        anyhow::ensure!(self.chunk_size > 0, "chunk size must be positive");

        let mut pipeline = Pipeline::offline(self.frame_id.as_str(), CollectingSink::new());
        for chunk in bytes.chunks(self.chunk_size) {
            pipeline.process_bytes(chunk);
        }
        // 文件读完后不会再有字节，卡住的伪帧头不能继续挡住后面的帧
        pipeline.finish();
        let trailing_bytes = pipeline.discard_partial();

        let ctx = pipeline.context().clone();
        let source = self.capture.display().to_string();
        let report = DiagnosticsReport::from_record(&ctx.diagnostics.load(), &source, &self.frame_id);

        Ok(DecodeResult {
            sink: pipeline.into_sink(),
            metrics: ctx.metrics.snapshot(),
            report,
            trailing_bytes,
        })
    }
}
