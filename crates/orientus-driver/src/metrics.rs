//! 驱动运行指标
//!
//! 原子计数器，由 pipeline 线程更新，任何线程都可以无锁读取快照。
//! 分帧失步、未知 ID、负载损坏都是串口链路上的正常噪声，只计数不上报错误。

use std::sync::atomic::{AtomicU64, Ordering};

/// 驱动实时指标
#[derive(Debug, Default)]
pub struct OrientusMetrics {
    /// 从串口读到的字节数
    pub bytes_received: AtomicU64,
    /// 校验通过的帧数
    pub frames_decoded: AtomicU64,
    /// 分帧失步次数（LRC / CRC 校验失败）
    pub framing_desyncs: AtomicU64,
    /// 同步前丢弃的字节数
    pub bytes_discarded: AtomicU64,
    /// 不支持的数据包 ID
    pub unknown_ids: AtomicU64,
    /// 负载长度与 ID 不符
    pub malformed_payloads: AtomicU64,
    /// 已写出的请求数
    pub commands_sent: AtomicU64,
    /// 写出失败的请求数
    pub command_send_errors: AtomicU64,
    /// 设备接受的请求数
    pub commands_acknowledged: AtomicU64,
    /// 设备拒绝的请求数
    pub commands_rejected: AtomicU64,
    /// 读超时次数（无数据时正常）
    pub read_timeouts: AtomicU64,
    /// 可恢复的传输错误次数
    pub transport_errors: AtomicU64,
    /// Group A 触发次数
    pub fused_emitted: AtomicU64,
    /// Group B 触发次数
    pub raw_emitted: AtomicU64,
    /// Group C 触发次数
    pub diagnostics_refreshed: AtomicU64,
}

impl OrientusMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        if n > 0 {
            counter.fetch_add(n, Ordering::Relaxed);
        }
    }

    pub(crate) fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            framing_desyncs: self.framing_desyncs.load(Ordering::Relaxed),
            bytes_discarded: self.bytes_discarded.load(Ordering::Relaxed),
            unknown_ids: self.unknown_ids.load(Ordering::Relaxed),
            malformed_payloads: self.malformed_payloads.load(Ordering::Relaxed),
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            command_send_errors: self.command_send_errors.load(Ordering::Relaxed),
            commands_acknowledged: self.commands_acknowledged.load(Ordering::Relaxed),
            commands_rejected: self.commands_rejected.load(Ordering::Relaxed),
            read_timeouts: self.read_timeouts.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            fused_emitted: self.fused_emitted.load(Ordering::Relaxed),
            raw_emitted: self.raw_emitted.load(Ordering::Relaxed),
            diagnostics_refreshed: self.diagnostics_refreshed.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.bytes_received.store(0, Ordering::Relaxed);
        self.frames_decoded.store(0, Ordering::Relaxed);
        self.framing_desyncs.store(0, Ordering::Relaxed);
        self.bytes_discarded.store(0, Ordering::Relaxed);
        self.unknown_ids.store(0, Ordering::Relaxed);
        self.malformed_payloads.store(0, Ordering::Relaxed);
        self.commands_sent.store(0, Ordering::Relaxed);
        self.command_send_errors.store(0, Ordering::Relaxed);
        self.commands_acknowledged.store(0, Ordering::Relaxed);
        self.commands_rejected.store(0, Ordering::Relaxed);
        self.read_timeouts.store(0, Ordering::Relaxed);
        self.transport_errors.store(0, Ordering::Relaxed);
        self.fused_emitted.store(0, Ordering::Relaxed);
        self.raw_emitted.store(0, Ordering::Relaxed);
        self.diagnostics_refreshed.store(0, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    pub bytes_received: u64,
    pub frames_decoded: u64,
    pub framing_desyncs: u64,
    pub bytes_discarded: u64,
    pub unknown_ids: u64,
    pub malformed_payloads: u64,
    pub commands_sent: u64,
    pub command_send_errors: u64,
    pub commands_acknowledged: u64,
    pub commands_rejected: u64,
    pub read_timeouts: u64,
    pub transport_errors: u64,
    pub fused_emitted: u64,
    pub raw_emitted: u64,
    pub diagnostics_refreshed: u64,
}

impl MetricsSnapshot {
    /// 丢弃的数据包总数（失步 + 未知 ID + 负载损坏）
    pub fn packets_dropped(&self) -> u64 {
        self.framing_desyncs + self.unknown_ids + self.malformed_payloads
    }

    /// 校验失败率（百分比）
    pub fn desync_rate(&self) -> f64 {
        let total = self.frames_decoded + self.framing_desyncs;
        if total == 0 {
            return 0.0;
        }
        (self.framing_desyncs as f64 / total as f64) * 100.0
    }
}
