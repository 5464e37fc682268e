//! Pipeline IO 循环模块
//!
//! 一次迭代：发送积压的请求 → 读取可用字节（带超时）→ 分帧 → 解码 → 分发 → 同步评估。
//! 只有不可恢复的串口错误会终止循环；分帧失步、未知 ID、负载损坏只计数。

use crate::dispatch::{DispatchOutcome, dispatch};
use crate::error::DriverError;
use crate::metrics::OrientusMetrics;
use crate::sink::ImuSink;
use crate::state::{OrientusContext, SensorState};
use crate::sync::{FiredGroups, Synchronizer};
use crossbeam_channel::Receiver;
use orientus_protocol::*;
use orientus_serial::{SerialAdapter, SerialError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn};

/// Pipeline 配置
///
/// # Example
///
/// ```
/// use orientus_driver::PipelineConfig;
/// use std::time::Duration;
///
/// let config = PipelineConfig {
///     read_timeout: Duration::from_millis(20),
///     ..Default::default()
/// };
/// assert_eq!(config.read_buffer_size, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// 单次读取最长阻塞时间
    pub read_timeout: Duration,
    /// 单次读取的缓冲区大小
    pub read_buffer_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(10),
            read_buffer_size: 1024,
        }
    }
}

/// 一个批次的处理结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// 校验通过的帧数
    pub frames: u64,
    /// 成功分发的数据包数
    pub packets: u64,
    /// 被丢弃的数据包数（未知 ID / 负载损坏）
    pub dropped: u64,
    /// 设备拒绝的请求数
    pub rejections: u64,
    pub fired: FiredGroups,
}

/// 同步处理核心（不含 IO）
///
/// 持有分帧器、传感器状态和同步器，`process_bytes` 对一段字节执行完整的一次批处理。
/// IO 线程与离线解码共用这一结构。
pub struct Pipeline<S: ImuSink> {
    decoder: FrameDecoder,
    state: SensorState,
    synchronizer: Synchronizer,
    sink: S,
    ctx: Arc<OrientusContext>,
}

impl<S: ImuSink> Pipeline<S> {
    pub fn new(frame_id: impl Into<String>, ctx: Arc<OrientusContext>, sink: S) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            state: SensorState::new(),
            synchronizer: Synchronizer::new(frame_id, ctx.diagnostics.clone()),
            sink,
            ctx,
        }
    }

    /// 不与任何驱动句柄共享的 pipeline（离线解码）
    pub fn offline(frame_id: impl Into<String>, sink: S) -> Self {
        Self::new(frame_id, Arc::new(OrientusContext::new()), sink)
    }

    pub fn context(&self) -> &Arc<OrientusContext> {
        &self.ctx
    }

    pub fn state(&self) -> &SensorState {
        &self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// 处理一段新读到的字节
    ///
    /// 先解出当前缓冲区中所有完整帧并依次分发，再做一次同步评估。
    pub fn process_bytes(&mut self, bytes: &[u8]) -> BatchSummary {
        self.run_batch(bytes, false)
    }

    /// 字节流结束时的最后一次批处理（离线解码）
    ///
    /// 跳过等待不到负载的伪帧头，解出其后仍完整的帧，见 [`FrameDecoder::finish`]。
    pub fn finish(&mut self) -> BatchSummary {
        self.run_batch(&[], true)
    }

    fn run_batch(&mut self, bytes: &[u8], at_eof: bool) -> BatchSummary {
        let Self {
            decoder,
            state,
            synchronizer,
            sink,
            ctx,
        } = self;
        let metrics = &ctx.metrics;
        OrientusMetrics::add(&metrics.bytes_received, bytes.len() as u64);

        let mut summary = BatchSummary::default();
        let mut frames = if at_eof {
            decoder.finish()
        } else {
            decoder.feed(bytes)
        };
        for frame in &mut frames {
            trace!("Frame id={} len={}", frame.id, frame.length());
            match decode(&frame) {
                Ok(packet) => {
                    summary.packets += 1;
                    match dispatch(packet, state) {
                        DispatchOutcome::Stored(_) | DispatchOutcome::Ignored(_) => {},
                        DispatchOutcome::Acknowledged(_) => {
                            OrientusMetrics::inc(&metrics.commands_acknowledged);
                        },
                        DispatchOutcome::Rejected(rejected) => {
                            summary.rejections += 1;
                            OrientusMetrics::inc(&metrics.commands_rejected);
                            ctx.last_rejection.store(Arc::new(Some(rejected)));
                            sink.command_rejected(rejected);
                        },
                    }
                },
                Err(DecodeError::UnknownId { id, len }) => {
                    summary.dropped += 1;
                    OrientusMetrics::inc(&metrics.unknown_ids);
                    debug!("Unknown packet id {} ({} bytes), discarded", id, len);
                },
                Err(e) => {
                    summary.dropped += 1;
                    OrientusMetrics::inc(&metrics.malformed_payloads);
                    warn!("Discarding packet: {}", e);
                },
            }
        }
        let stats = frames.stats();
        drop(frames);

        summary.frames = stats.frames;
        OrientusMetrics::add(&metrics.frames_decoded, stats.frames);
        OrientusMetrics::add(&metrics.framing_desyncs, stats.desyncs);
        OrientusMetrics::add(&metrics.bytes_discarded, stats.discarded_bytes);
        if stats.desyncs > 0 {
            debug!("{} framing desync(s) in batch", stats.desyncs);
        }

        summary.fired = synchronizer.evaluate(state, sink);
        if summary.fired.fused {
            OrientusMetrics::inc(&metrics.fused_emitted);
        }
        if summary.fired.raw {
            OrientusMetrics::inc(&metrics.raw_emitted);
        }
        if summary.fired.diagnostics {
            OrientusMetrics::inc(&metrics.diagnostics_refreshed);
        }

        summary
    }

    /// 丢弃未完成帧的残留字节，返回丢弃的字节数
    pub fn discard_partial(&mut self) -> usize {
        let pending = self.decoder.buffered_len();
        self.decoder.clear();
        pending
    }
}

/// 发送积压的请求
///
/// 返回 `Ok(true)` 表示命令通道已断开（驱动句柄已释放）。
/// 写出失败时，不可恢复的串口错误向上传播，其余错误只记录并继续下一条。
fn drain_tx_queue(
    adapter: &mut impl SerialAdapter,
    cmd_rx: &Receiver<OutboundRequest>,
    metrics: &OrientusMetrics,
) -> Result<bool, SerialError> {
    // 限制单次 drain 的请求数和时间预算，避免推迟读取
    const MAX_DRAIN_PER_CYCLE: usize = 32;
    const TIME_BUDGET: Duration = Duration::from_micros(500);

    let start = Instant::now();

    for _ in 0..MAX_DRAIN_PER_CYCLE {
        if start.elapsed() > TIME_BUDGET {
            trace!("Drain time budget exhausted, deferred {} requests", cmd_rx.len());
            break;
        }

        match cmd_rx.try_recv() {
            Ok(request) => {
                let frame = match encode(&request) {
                    Ok(frame) => frame,
                    Err(e) => {
                        OrientusMetrics::inc(&metrics.command_send_errors);
                        error!("Failed to encode {:?}: {}", request.id(), e);
                        continue;
                    },
                };
                match adapter.send_frame(&frame) {
                    Ok(()) => {
                        OrientusMetrics::inc(&metrics.commands_sent);
                        debug!("Sent {:?} (crc 0x{:04X})", request.id(), frame.crc());
                    },
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        OrientusMetrics::inc(&metrics.command_send_errors);
                        error!("Failed to send {:?}: {}", request.id(), e);
                    },
                }
            },
            Err(crossbeam_channel::TryRecvError::Empty) => break,
            Err(crossbeam_channel::TryRecvError::Disconnected) => return Ok(true),
        }
    }

    Ok(false)
}

/// IO 线程循环
///
/// # 参数
/// - `adapter`: 串口适配器（在循环中独占）
/// - `cmd_rx`: 请求通道（从驱动句柄接收待发送的请求）
/// - `pipeline`: 处理核心
/// - `config`: Pipeline 配置
/// - `is_running`: 运行标志，置为 false 后在下一次迭代开始时退出
///
/// # 返回
/// - `Ok(())`: 被要求停止，或命令通道断开
/// - `Err(DriverError::Transport)`: 串口不可恢复地失败
pub fn io_loop<A, S>(
    mut adapter: A,
    cmd_rx: Receiver<OutboundRequest>,
    mut pipeline: Pipeline<S>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
) -> Result<(), DriverError>
where
    A: SerialAdapter,
    S: ImuSink,
{
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;
        use tracing::info;

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => info!("IO thread priority set to MAX (realtime)"),
            Err(e) => warn!(
                "Failed to set IO thread priority: {:?}. \
                 On Linux this needs CAP_SYS_NICE or an rtprio limit.",
                e
            ),
        }
    }

    adapter.set_read_timeout(config.read_timeout);
    let mut buf = vec![0u8; config.read_buffer_size.max(1)];
    let metrics = pipeline.context().metrics.clone();

    let result = loop {
        if !is_running.load(Ordering::Acquire) {
            debug!("IO loop stop requested");
            break Ok(());
        }

        match drain_tx_queue(&mut adapter, &cmd_rx, &metrics) {
            Ok(false) => {},
            Ok(true) => {
                debug!("Command channel closed, IO loop exiting");
                break Ok(());
            },
            Err(e) => {
                error!("Serial write failed: {}", e);
                break Err(DriverError::Transport(e));
            },
        }

        match adapter.read(&mut buf) {
            // 超时：本次迭代结束
            Ok(0) => OrientusMetrics::inc(&metrics.read_timeouts),
            Ok(n) => {
                pipeline.process_bytes(&buf[..n]);
            },
            Err(e) if e.is_fatal() => {
                error!("Serial read failed: {}", e);
                break Err(DriverError::Transport(e));
            },
            Err(SerialError::Timeout) => OrientusMetrics::inc(&metrics.read_timeouts),
            Err(e) => {
                OrientusMetrics::inc(&metrics.transport_errors);
                warn!("Recoverable serial error: {}", e);
            },
        }
    };

    let discarded = pipeline.discard_partial();
    if discarded > 0 {
        debug!("Discarded {} buffered bytes on shutdown", discarded);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CollectingSink;
    use orientus_serial::MockSerialAdapter;

    fn frame_bytes(id: u8, payload: &[u8]) -> Vec<u8> {
        RawFrame::new(id, payload.to_vec()).unwrap().to_bytes()
    }

    fn f32s(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_process_bytes_counts() {
        let mut pipeline = Pipeline::offline("imu_link", CollectingSink::new());

        let mut stream = vec![0x00, 0x11];
        stream.extend(frame_bytes(ID_RAW_SENSORS, &[0u8; 48]));
        stream.extend(frame_bytes(99, &[1, 2, 3]));
        stream.extend(frame_bytes(ID_ACCELERATION, &[0u8; 4]));

        let summary = pipeline.process_bytes(&stream);
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.packets, 1);
        assert_eq!(summary.dropped, 2);
        assert!(summary.fired.raw);

        let m = pipeline.context().metrics.snapshot();
        assert_eq!(m.bytes_received, stream.len() as u64);
        assert_eq!(m.frames_decoded, 3);
        assert_eq!(m.bytes_discarded, 2);
        assert_eq!(m.unknown_ids, 1);
        assert_eq!(m.malformed_payloads, 1);
        assert_eq!(m.raw_emitted, 1);
        assert_eq!(pipeline.sink().raw().count(), 1);
    }

    #[test]
    fn test_group_evaluated_once_per_batch() {
        let mut pipeline = Pipeline::offline("imu_link", CollectingSink::new());

        // 同一批次两帧 RawSensors：只触发一次，使用最新值
        let mut stream = frame_bytes(ID_RAW_SENSORS, &[0u8; 48]);
        let mut payload = f32s(&[1.0, 2.0, 3.0]);
        payload.extend(vec![0u8; 36]);
        stream.extend(frame_bytes(ID_RAW_SENSORS, &payload));

        pipeline.process_bytes(&stream);
        let raw: Vec<_> = pipeline.sink().raw().collect();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].linear_acceleration.x, 1.0);
    }

    #[test]
    fn test_partial_frame_across_batches() {
        let mut pipeline = Pipeline::offline("imu_link", CollectingSink::new());
        let bytes = frame_bytes(ID_RAW_SENSORS, &[0u8; 48]);

        let first = pipeline.process_bytes(&bytes[..20]);
        assert_eq!(first.frames, 0);
        assert!(!first.fired.any());

        let second = pipeline.process_bytes(&bytes[20..]);
        assert_eq!(second.frames, 1);
        assert!(second.fired.raw);
        assert_eq!(pipeline.discard_partial(), 0);
    }

    #[test]
    fn test_finish_recovers_frame_behind_stalled_header() {
        let mut pipeline = Pipeline::offline("imu_link", CollectingSink::new());
        let [lo, hi] = 0x1234u16.to_le_bytes();
        let mut stream = vec![FRAME_SYNC, header_lrc(ID_STATUS, 200, lo, hi), ID_STATUS, 200, lo, hi];
        stream.extend(frame_bytes(ID_RAW_SENSORS, &[0u8; 48]));

        let first = pipeline.process_bytes(&stream);
        assert_eq!(first.frames, 0);

        let last = pipeline.finish();
        assert_eq!(last.frames, 1);
        assert!(last.fired.raw);
        assert_eq!(pipeline.context().metrics.snapshot().framing_desyncs, 1);
        assert_eq!(pipeline.discard_partial(), 0);
    }

    #[test]
    fn test_rejection_is_published() {
        let mut pipeline = Pipeline::offline("imu_link", CollectingSink::new());
        // packet_id=181, crc=0x1234, result=3
        let summary = pipeline.process_bytes(&frame_bytes(ID_ACKNOWLEDGE, &[181, 0x34, 0x12, 3]));

        assert_eq!(summary.rejections, 1);
        let rejected = pipeline.context().last_rejection.load_full();
        let rejected = (*rejected).unwrap();
        assert_eq!(rejected.packet_id, 181);
        assert_eq!(rejected.packet_crc, 0x1234);
        assert_eq!(rejected.result, AcknowledgeResult::RangeFailure);
        assert_eq!(pipeline.sink().rejections, vec![rejected]);
        assert!(pipeline.state().dirty_set().is_empty());
    }

    #[test]
    fn test_io_loop_stops_on_disconnect() {
        let adapter = MockSerialAdapter::from_chunks(vec![frame_bytes(ID_RAW_SENSORS, &[0u8; 48])]);
        let (_cmd_tx, cmd_rx) = crossbeam_channel::bounded(10);
        let ctx = Arc::new(OrientusContext::new());
        let pipeline = Pipeline::new("imu_link", ctx.clone(), CollectingSink::new());

        let result = io_loop(
            adapter,
            cmd_rx,
            pipeline,
            PipelineConfig::default(),
            Arc::new(AtomicBool::new(true)),
        );

        assert!(matches!(
            result,
            Err(DriverError::Transport(SerialError::Disconnected))
        ));
        assert_eq!(ctx.metrics.snapshot().raw_emitted, 1);
    }

    #[test]
    fn test_io_loop_recoverable_errors_continue() {
        let (adapter, handle) = MockSerialAdapter::new();
        handle.push_error(SerialError::Timeout);
        handle.push_error(SerialError::Io(std::io::Error::from(
            std::io::ErrorKind::Interrupted,
        )));
        handle.push_bytes(&frame_bytes(ID_RAW_SENSORS, &[0u8; 48]));
        drop(handle);

        let (_cmd_tx, cmd_rx) = crossbeam_channel::bounded(10);
        let ctx = Arc::new(OrientusContext::new());
        let pipeline = Pipeline::new("imu_link", ctx.clone(), CollectingSink::new());
        let result = io_loop(
            adapter,
            cmd_rx,
            pipeline,
            PipelineConfig::default(),
            Arc::new(AtomicBool::new(true)),
        );

        assert!(result.is_err());
        let m = ctx.metrics.snapshot();
        assert!(m.read_timeouts >= 1);
        assert_eq!(m.transport_errors, 1);
        assert_eq!(m.raw_emitted, 1);
    }

    #[test]
    fn test_io_loop_sends_queued_requests() {
        let (adapter, handle) = MockSerialAdapter::new();
        let (cmd_tx, cmd_rx) = crossbeam_channel::bounded(10);
        cmd_tx
            .send(OutboundRequest::request(&[PacketId::DeviceInformation]))
            .unwrap();
        drop(cmd_tx);

        let pipeline = Pipeline::offline("imu_link", CollectingSink::new());
        let result = io_loop(
            adapter,
            cmd_rx,
            pipeline,
            PipelineConfig::default(),
            Arc::new(AtomicBool::new(true)),
        );

        // 先发完积压的请求，再因通道断开正常退出
        assert!(result.is_ok());
        let expected = OutboundRequest::request(&[PacketId::DeviceInformation])
            .to_frame()
            .unwrap()
            .to_bytes();
        assert_eq!(handle.take_written(), vec![expected]);
    }

    #[test]
    fn test_io_loop_honours_stop_flag() {
        let (adapter, _handle) = MockSerialAdapter::new();
        let (_cmd_tx, cmd_rx) = crossbeam_channel::bounded(10);
        let pipeline = Pipeline::offline("imu_link", CollectingSink::new());

        let result = io_loop(
            adapter,
            cmd_rx,
            pipeline,
            PipelineConfig::default(),
            Arc::new(AtomicBool::new(false)),
        );
        assert!(result.is_ok());
    }
}
