//! `Orientus` 驱动句柄
//!
//! 拥有后台 IO 线程。请求通过有界通道交给 IO 线程发送，
//! 诊断与指标通过 `OrientusContext` 中的原子快照读取。

use crate::diagnostics::DiagnosticsReport;
use crate::dispatch::CommandRejected;
use crate::error::DriverError;
use crate::metrics::MetricsSnapshot;
use crate::pipeline::{Pipeline, PipelineConfig, io_loop};
use crate::records::DiagnosticsRecord;
use crate::sink::ImuSink;
use crate::state::OrientusContext;
use crossbeam_channel::{Sender, TrySendError};
use orientus_protocol::{OutboundRequest, ResetKind};
use orientus_serial::SerialAdapter;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// 命令通道容量
pub const COMMAND_CHANNEL_CAPACITY: usize = 10;

const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

type IoResult = Result<(), DriverError>;

/// 带超时的线程 join
trait JoinTimeout<T> {
    fn join_timeout(self, timeout: Duration) -> Result<T, DriverError>;
}

impl<T: Send + 'static> JoinTimeout<T> for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> Result<T, DriverError> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        // 看门狗线程负责 join；超时后它继续等待，进程退出时由 OS 回收
        spawn(move || {
            let _ = tx.send(self.join());
        });

        match rx.recv_timeout(timeout) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_panic)) => Err(DriverError::ThreadPanicked),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(DriverError::Timeout),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Err(DriverError::ThreadPanicked)
            },
        }
    }
}

/// Orientus IMU 驱动（对外 API）
pub struct Orientus {
    /// 请求发送通道
    ///
    /// 停止时必须先于 join 释放，否则 `io_loop` 收不到 `Disconnected`。
    cmd_tx: Option<Sender<OutboundRequest>>,
    /// 共享状态上下文
    ctx: Arc<OrientusContext>,
    /// IO 线程句柄
    io_thread: Option<JoinHandle<IoResult>>,
    /// 运行标志
    is_running: Arc<AtomicBool>,
    /// 设备路径（用于诊断报告）
    port: String,
    frame_id: String,
}

impl Orientus {
    /// 启动驱动
    ///
    /// `startup` 中的请求在 IO 线程第一次迭代时按顺序写出。
    ///
    /// # 错误
    /// - `DriverError::ChannelFull`: `startup` 超过命令通道容量
    pub fn new<A>(
        adapter: A,
        port: impl Into<String>,
        frame_id: impl Into<String>,
        sink: Box<dyn ImuSink>,
        config: PipelineConfig,
        startup: Vec<OutboundRequest>,
    ) -> Result<Self, DriverError>
    where
        A: SerialAdapter + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = crossbeam_channel::bounded(COMMAND_CHANNEL_CAPACITY);
        for request in startup {
            cmd_tx.try_send(request).map_err(|_| DriverError::ChannelFull)?;
        }

        let frame_id = frame_id.into();
        let ctx = Arc::new(OrientusContext::new());
        let is_running = Arc::new(AtomicBool::new(true));
        let pipeline = Pipeline::new(frame_id.clone(), ctx.clone(), sink);

        let is_running_clone = is_running.clone();
        let io_thread =
            spawn(move || io_loop(adapter, cmd_rx, pipeline, config, is_running_clone));

        let port = port.into();
        info!("Orientus driver started on {} (frame '{}')", port, frame_id);

        Ok(Self {
            cmd_tx: Some(cmd_tx),
            ctx,
            io_thread: Some(io_thread),
            is_running,
            port,
            frame_id,
        })
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    /// IO 线程是否仍在运行
    pub fn is_running(&self) -> bool {
        self.io_thread.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// 发送请求（非阻塞）
    ///
    /// # 错误
    /// - `DriverError::ChannelFull`: 命令队列已满（容量 10）
    /// - `DriverError::ChannelClosed`: IO 线程已退出
    /// - `DriverError::AlreadyStopped`: 已调用过 `stop()`
    pub fn send_request(&self, request: OutboundRequest) -> Result<(), DriverError> {
        let tx = self.cmd_tx.as_ref().ok_or(DriverError::AlreadyStopped)?;
        tx.try_send(request).map_err(|e| match e {
            TrySendError::Full(_) => DriverError::ChannelFull,
            TrySendError::Disconnected(_) => DriverError::ChannelClosed,
        })
    }

    /// 热启动复位（置零服务）
    pub fn zero(&self) -> Result<(), DriverError> {
        self.reset(ResetKind::HotStart)
    }

    pub fn reset(&self, kind: ResetKind) -> Result<(), DriverError> {
        info!("Requesting {:?} reset", kind);
        self.send_request(OutboundRequest::Reset(kind))
    }

    /// 以当前姿态作为安装对准零位
    pub fn zero_alignment(&self, permanent: bool) -> Result<(), DriverError> {
        self.send_request(OutboundRequest::ZeroAlignment { permanent })
    }

    /// 最近一次发布的诊断快照
    ///
    /// 没有新的 Group C 刷新时，重复调用返回相同的值。
    /// `is_available() == false` 表示尚未收到数据。
    pub fn query_diagnostics(&self) -> DiagnosticsRecord {
        (**self.ctx.diagnostics.load()).clone()
    }

    pub fn diagnostics_report(&self) -> DiagnosticsReport {
        DiagnosticsReport::from_record(&self.query_diagnostics(), &self.port, &self.frame_id)
    }

    /// 最近一次被设备拒绝的请求
    pub fn last_rejection(&self) -> Option<CommandRejected> {
        **self.ctx.last_rejection.load()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.ctx.metrics.reset();
    }

    /// 等待第一份诊断快照
    ///
    /// # 错误
    /// - `DriverError::Timeout`: 超时仍未收到
    /// - `DriverError::ChannelClosed`: IO 线程已退出
    pub fn wait_for_diagnostics(&self, timeout: Duration) -> Result<DiagnosticsRecord, DriverError> {
        let start = Instant::now();
        loop {
            let record = self.query_diagnostics();
            if record.is_available() {
                return Ok(record);
            }
            if !self.is_running() {
                return Err(DriverError::ChannelClosed);
            }
            if start.elapsed() >= timeout {
                return Err(DriverError::Timeout);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    /// 停止 IO 线程并返回其结束状态
    ///
    /// 串口失败导致的退出在这里以 `DriverError::Transport` 返回。
    /// 再次调用返回 `DriverError::AlreadyStopped`。
    pub fn stop(&mut self) -> Result<(), DriverError> {
        let Some(handle) = self.io_thread.take() else {
            return Err(DriverError::AlreadyStopped);
        };

        self.is_running.store(false, Ordering::Release);
        drop(self.cmd_tx.take());

        let result = handle.join_timeout(JOIN_TIMEOUT).and_then(|r| r);
        match &result {
            Ok(()) => debug!("IO thread stopped"),
            Err(e) => error!("IO thread ended with error: {}", e),
        }
        result
    }

    /// 停止并释放驱动
    pub fn shutdown(mut self) -> Result<(), DriverError> {
        self.stop()
    }
}

impl Drop for Orientus {
    fn drop(&mut self) {
        if self.io_thread.is_some()
            && let Err(e) = self.stop()
            && !e.is_transport_failure()
        {
            error!(
                "IO thread panicked or failed to shut down within {:?}",
                JOIN_TIMEOUT
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CollectingSink;
    use orientus_serial::{MockSerialAdapter, SerialError};

    fn start(adapter: MockSerialAdapter, startup: Vec<OutboundRequest>) -> Orientus {
        Orientus::new(
            adapter,
            "mock",
            "imu_link",
            Box::new(CollectingSink::new()),
            PipelineConfig::default(),
            startup,
        )
        .unwrap()
    }

    #[test]
    fn test_start_and_stop() {
        let (adapter, _handle) = MockSerialAdapter::new();
        let mut orientus = start(adapter, Vec::new());
        assert!(orientus.is_running());
        assert!(orientus.stop().is_ok());
        assert!(!orientus.is_running());
        assert!(matches!(orientus.stop(), Err(DriverError::AlreadyStopped)));
        assert!(matches!(
            orientus.zero(),
            Err(DriverError::AlreadyStopped)
        ));
    }

    #[test]
    fn test_transport_failure_surfaces_on_shutdown() {
        let (adapter, handle) = MockSerialAdapter::new();
        let orientus = start(adapter, Vec::new());
        handle.push_error(SerialError::Disconnected);

        let deadline = Instant::now() + Duration::from_secs(2);
        while orientus.is_running() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(matches!(
            orientus.send_request(OutboundRequest::Reset(ResetKind::HotStart)),
            Err(DriverError::ChannelClosed)
        ));
        assert!(matches!(
            orientus.shutdown(),
            Err(DriverError::Transport(SerialError::Disconnected))
        ));
    }

    #[test]
    fn test_query_diagnostics_before_data() {
        let (adapter, _handle) = MockSerialAdapter::new();
        let orientus = start(adapter, Vec::new());
        let record = orientus.query_diagnostics();
        assert!(!record.is_available());
        assert!(!orientus.diagnostics_report().available);
        assert!(orientus.last_rejection().is_none());
        assert!(matches!(
            orientus.wait_for_diagnostics(Duration::from_millis(20)),
            Err(DriverError::Timeout)
        ));
    }

    #[test]
    fn test_startup_overflow() {
        let (adapter, _handle) = MockSerialAdapter::new();
        let startup = vec![OutboundRequest::Reset(ResetKind::HotStart); COMMAND_CHANNEL_CAPACITY + 1];
        let result = Orientus::new(
            adapter,
            "mock",
            "imu_link",
            Box::new(CollectingSink::new()),
            PipelineConfig::default(),
            startup,
        );
        assert!(matches!(result, Err(DriverError::ChannelFull)));
    }
}
