//! Builder 模式实现
//!
//! 提供链式构造 `Orientus` 实例的便捷方式。

use crate::error::DriverError;
use crate::orientus::Orientus;
use crate::pipeline::PipelineConfig;
use crate::sink::{ImuSink, TracingSink};
use orientus_protocol::{OutboundRequest, PacketPeriodTable, default_packet_periods, startup_requests};
use orientus_serial::{DEFAULT_BAUD_RATE, SerialAdapter};
use std::time::Duration;

/// 默认串口设备
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// 默认输出坐标系
pub const DEFAULT_FRAME_ID: &str = "imu_link";

/// Orientus Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use orientus_driver::OrientusBuilder;
/// use std::time::Duration;
///
/// let orientus = OrientusBuilder::new()
///     .port("/dev/ttyUSB1")
///     .frame_id("base_imu")
///     .read_timeout(Duration::from_millis(20))
///     .build()
///     .unwrap();
///
/// let report = orientus.diagnostics_report();
/// println!("{}", report);
/// ```
pub struct OrientusBuilder {
    port: String,
    frame_id: String,
    baud_rate: u32,
    pipeline_config: PipelineConfig,
    /// 启动时是否下发数据包速率配置
    configure_on_start: bool,
    packet_periods: Option<PacketPeriodTable>,
    sink: Option<Box<dyn ImuSink>>,
}

impl OrientusBuilder {
    pub fn new() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            frame_id: DEFAULT_FRAME_ID.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            pipeline_config: PipelineConfig::default(),
            configure_on_start: true,
            packet_periods: None,
            sink: None,
        }
    }

    /// 设置串口设备路径（默认 `/dev/ttyUSB0`）
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    /// 设置输出记录的坐标系（默认 `imu_link`）
    pub fn frame_id(mut self, frame_id: impl Into<String>) -> Self {
        self.frame_id = frame_id.into();
        self
    }

    /// 设置波特率（默认 115200）
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.pipeline_config.read_timeout = timeout;
        self
    }

    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = config;
        self
    }

    /// 启动时是否发送设备信息请求与数据包速率配置（默认 true）
    ///
    /// 设为 false 时沿用设备当前（可能是永久保存的）配置。
    pub fn configure_on_start(mut self, enabled: bool) -> Self {
        self.configure_on_start = enabled;
        self
    }

    /// 替换默认的数据包周期表
    pub fn packet_periods(mut self, periods: PacketPeriodTable) -> Self {
        self.packet_periods = Some(periods);
        self
    }

    /// 设置输出 sink（默认 `TracingSink`）
    pub fn sink(mut self, sink: impl ImuSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// 打开串口并启动驱动
    ///
    /// # Errors
    /// - `DriverError::Transport`: 串口打开或配置失败
    #[cfg(all(unix, feature = "tty"))]
    pub fn build(self) -> Result<Orientus, DriverError> {
        let adapter = orientus_serial::TtyAdapter::open(&self.port, self.baud_rate)?;
        self.build_with_adapter(adapter)
    }

    /// 使用指定的适配器启动驱动（测试或自定义传输）
    pub fn build_with_adapter<A>(self, adapter: A) -> Result<Orientus, DriverError>
    where
        A: SerialAdapter + Send + 'static,
    {
        let startup = self.startup_requests();
        let sink = self.sink.unwrap_or_else(|| Box::new(TracingSink));
        Orientus::new(
            adapter,
            self.port,
            self.frame_id,
            sink,
            self.pipeline_config,
            startup,
        )
    }

    fn startup_requests(&self) -> Vec<OutboundRequest> {
        if !self.configure_on_start {
            return Vec::new();
        }
        let periods = self
            .packet_periods
            .clone()
            .unwrap_or_else(default_packet_periods);
        startup_requests(periods)
    }
}

impl Default for OrientusBuilder {
    fn default() -> Self {
        Self::new()
    }
}
