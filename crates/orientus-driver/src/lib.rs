//! # Orientus Driver
//!
//! Orientus IMU 驱动层：
//! - `dispatch`: 解码后的数据包写入 `SensorState`
//! - `sync`: 完整性分组（融合 IMU / 原始 IMU / 诊断）与输出记录构造
//! - `diagnostics`: 诊断快照到健康报告的纯投影
//! - `pipeline`: 后台 IO 循环（读取 → 分帧 → 解码 → 分发 → 同步）
//! - `Orientus` / `OrientusBuilder`: 对外句柄
//!
//! ```no_run
//! use orientus_driver::{ChannelSink, ImuOutput, OrientusBuilder};
//!
//! let (sink, rx) = ChannelSink::bounded(64);
//! let orientus = OrientusBuilder::new().port("/dev/ttyUSB0").sink(sink).build()?;
//!
//! for output in rx.iter().take(10) {
//!     if let ImuOutput::FusedImu(imu) = output {
//!         println!("{:?}", imu.orientation);
//!     }
//! }
//! orientus.shutdown()?;
//! # Ok::<(), orientus_driver::DriverError>(())
//! ```

mod builder;
pub mod diagnostics;
pub mod dispatch;
mod error;
pub mod metrics;
mod orientus;
pub mod pipeline;
pub mod records;
pub mod sink;
pub mod state;
pub mod sync;

pub use builder::{DEFAULT_FRAME_ID, DEFAULT_PORT, OrientusBuilder};
pub use diagnostics::{DiagnosticsReport, HealthLevel, SubsystemStatus};
pub use dispatch::{CommandRejected, DispatchOutcome, dispatch};
pub use error::DriverError;
pub use metrics::{MetricsSnapshot, OrientusMetrics};
pub use orientus::{COMMAND_CHANNEL_CAPACITY, Orientus};
pub use pipeline::{BatchSummary, Pipeline, PipelineConfig, io_loop};
pub use records::*;
pub use sink::{ChannelSink, CollectingSink, ImuSink, TracingSink};
pub use state::{KindSet, OrientusContext, PacketKind, SensorState, Slot};
pub use sync::{CompletenessGroup, FiredGroups, GROUPS, GroupId, Synchronizer};

// 重新导出下层 crate，调用方无需单独依赖
pub use orientus_protocol as protocol;
pub use orientus_serial as serial;
