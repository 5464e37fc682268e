//! 输出 sink
//!
//! synchronizer 在 pipeline 线程上同步调用 sink，实现必须快速返回；
//! 需要跨线程消费时使用 [`ChannelSink`]。

use crate::dispatch::CommandRejected;
use crate::records::*;
use crossbeam_channel::{Sender, TrySendError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// 记录消费者
pub trait ImuSink: Send {
    fn publish_fused_imu(&mut self, record: FusedImuRecord);

    fn publish_euler_attitude(&mut self, record: EulerAttitudeRecord);

    fn publish_raw_imu(&mut self, record: RawImuRecord);

    fn publish_magnetic_field(&mut self, record: MagneticFieldRecord);

    fn publish_temperature(&mut self, record: TemperatureRecord);

    /// 设备拒绝了一条请求
    fn command_rejected(&mut self, rejected: CommandRejected) {
        warn!("Device rejected command: {}", rejected);
    }
}

impl<S: ImuSink + ?Sized> ImuSink for Box<S> {
    fn publish_fused_imu(&mut self, record: FusedImuRecord) {
        (**self).publish_fused_imu(record)
    }

    fn publish_euler_attitude(&mut self, record: EulerAttitudeRecord) {
        (**self).publish_euler_attitude(record)
    }

    fn publish_raw_imu(&mut self, record: RawImuRecord) {
        (**self).publish_raw_imu(record)
    }

    fn publish_magnetic_field(&mut self, record: MagneticFieldRecord) {
        (**self).publish_magnetic_field(record)
    }

    fn publish_temperature(&mut self, record: TemperatureRecord) {
        (**self).publish_temperature(record)
    }

    fn command_rejected(&mut self, rejected: CommandRejected) {
        (**self).command_rejected(rejected)
    }
}

/// 只打日志的 sink（未配置 sink 时的默认值）
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ImuSink for TracingSink {
    fn publish_fused_imu(&mut self, record: FusedImuRecord) {
        debug!(
            frame_id = %record.header.frame_id,
            stamp = ?record.header.stamp,
            "imu: q=({:.4}, {:.4}, {:.4}, {:.4}) w=({:.4}, {:.4}, {:.4}) a=({:.3}, {:.3}, {:.3})",
            record.orientation.w,
            record.orientation.x,
            record.orientation.y,
            record.orientation.z,
            record.angular_velocity.x,
            record.angular_velocity.y,
            record.angular_velocity.z,
            record.linear_acceleration.x,
            record.linear_acceleration.y,
            record.linear_acceleration.z,
        );
    }

    fn publish_euler_attitude(&mut self, record: EulerAttitudeRecord) {
        debug!(
            "euler: roll={:.2} pitch={:.2} heading={:.2} deg",
            record.attitude_deg.x, record.attitude_deg.y, record.attitude_deg.z
        );
    }

    fn publish_raw_imu(&mut self, record: RawImuRecord) {
        debug!(
            "raw imu: gyro=({:.4}, {:.4}, {:.4}) accel=({:.3}, {:.3}, {:.3})",
            record.angular_velocity.x,
            record.angular_velocity.y,
            record.angular_velocity.z,
            record.linear_acceleration.x,
            record.linear_acceleration.y,
            record.linear_acceleration.z,
        );
    }

    fn publish_magnetic_field(&mut self, record: MagneticFieldRecord) {
        debug!(
            "mag: ({:.3e}, {:.3e}, {:.3e})",
            record.magnetic_field.x, record.magnetic_field.y, record.magnetic_field.z
        );
    }

    fn publish_temperature(&mut self, record: TemperatureRecord) {
        debug!("temperature: {:.2} °C", record.temperature);
    }

    fn command_rejected(&mut self, rejected: CommandRejected) {
        info!("Device rejected command: {}", rejected);
    }
}

/// 通过有界通道转发记录
///
/// 通道满时丢弃新记录并计数，不阻塞 pipeline 线程。
pub struct ChannelSink {
    tx: Sender<ImuOutput>,
    dropped: Arc<AtomicU64>,
}

impl ChannelSink {
    pub fn new(tx: Sender<ImuOutput>) -> Self {
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 创建有界通道及对应的 sink
    pub fn bounded(capacity: usize) -> (Self, crossbeam_channel::Receiver<ImuOutput>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self::new(tx), rx)
    }

    /// 丢弃计数（可在 sink 移交给驱动后继续读取）
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        self.dropped.clone()
    }

    fn forward(&mut self, output: ImuOutput) {
        match self.tx.try_send(output) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped.is_power_of_two() {
                    warn!("Output channel full, {} records dropped so far", dropped);
                }
            },
            // 消费端已退出，静默丢弃
            Err(TrySendError::Disconnected(_)) => {},
        }
    }
}

impl ImuSink for ChannelSink {
    fn publish_fused_imu(&mut self, record: FusedImuRecord) {
        self.forward(ImuOutput::FusedImu(record));
    }

    fn publish_euler_attitude(&mut self, record: EulerAttitudeRecord) {
        self.forward(ImuOutput::EulerAttitude(record));
    }

    fn publish_raw_imu(&mut self, record: RawImuRecord) {
        self.forward(ImuOutput::RawImu(record));
    }

    fn publish_magnetic_field(&mut self, record: MagneticFieldRecord) {
        self.forward(ImuOutput::MagneticField(record));
    }

    fn publish_temperature(&mut self, record: TemperatureRecord) {
        self.forward(ImuOutput::Temperature(record));
    }
}

/// 内存收集 sink（离线解码与测试）
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub outputs: Vec<ImuOutput>,
    pub rejections: Vec<CommandRejected>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fused(&self) -> impl Iterator<Item = &FusedImuRecord> {
        self.outputs.iter().filter_map(|o| match o {
            ImuOutput::FusedImu(r) => Some(r),
            _ => None,
        })
    }

    pub fn euler(&self) -> impl Iterator<Item = &EulerAttitudeRecord> {
        self.outputs.iter().filter_map(|o| match o {
            ImuOutput::EulerAttitude(r) => Some(r),
            _ => None,
        })
    }

    pub fn raw(&self) -> impl Iterator<Item = &RawImuRecord> {
        self.outputs.iter().filter_map(|o| match o {
            ImuOutput::RawImu(r) => Some(r),
            _ => None,
        })
    }

    pub fn magnetic(&self) -> impl Iterator<Item = &MagneticFieldRecord> {
        self.outputs.iter().filter_map(|o| match o {
            ImuOutput::MagneticField(r) => Some(r),
            _ => None,
        })
    }

    pub fn temperature(&self) -> impl Iterator<Item = &TemperatureRecord> {
        self.outputs.iter().filter_map(|o| match o {
            ImuOutput::Temperature(r) => Some(r),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.outputs.clear();
        self.rejections.clear();
    }
}

impl ImuSink for CollectingSink {
    fn publish_fused_imu(&mut self, record: FusedImuRecord) {
        self.outputs.push(ImuOutput::FusedImu(record));
    }

    fn publish_euler_attitude(&mut self, record: EulerAttitudeRecord) {
        self.outputs.push(ImuOutput::EulerAttitude(record));
    }

    fn publish_raw_imu(&mut self, record: RawImuRecord) {
        self.outputs.push(ImuOutput::RawImu(record));
    }

    fn publish_magnetic_field(&mut self, record: MagneticFieldRecord) {
        self.outputs.push(ImuOutput::MagneticField(record));
    }

    fn publish_temperature(&mut self, record: TemperatureRecord) {
        self.outputs.push(ImuOutput::Temperature(record));
    }

    fn command_rejected(&mut self, rejected: CommandRejected) {
        self.rejections.push(rejected);
    }
}
