//! Synchronizer：完整性分组与输出
//!
//! 设备以互不相关的速率上报各类数据包。每个 dispatch 批次结束后按固定顺序 A → B → C
//! 检查各组成员是否全部 dirty，满足则构造记录交给 sink，并清除该组的 dirty 标志。
//! 同一批次内多个组同时满足时全部触发，互不影响。

use crate::records::*;
use crate::state::{KindSet, PacketKind, SensorState};
use crate::sink::ImuSink;
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// 分组标识
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupId {
    /// Group A：融合 IMU + 欧拉角
    Fused,
    /// Group B：原始 IMU + 磁场 + 温度
    Raw,
    /// Group C：诊断快照
    Diagnostics,
}

/// 完整性分组
///
/// `members` 全部 dirty 时触发，触发后清除 `clears`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletenessGroup {
    pub id: GroupId,
    pub members: KindSet,
    pub clears: KindSet,
}

impl CompletenessGroup {
    pub fn is_complete(&self, dirty: KindSet) -> bool {
        dirty.contains_all(self.members)
    }
}

const FUSED_MEMBERS: KindSet = KindSet::of(&[
    PacketKind::EulerOrientation,
    PacketKind::QuaternionStdDev,
    PacketKind::QuaternionOrientation,
    PacketKind::Acceleration,
    PacketKind::AngularVelocity,
]);

const RAW_MEMBERS: KindSet = KindSet::of(&[PacketKind::RawSensors]);

pub const GROUP_FUSED: CompletenessGroup = CompletenessGroup {
    id: GroupId::Fused,
    members: FUSED_MEMBERS,
    clears: FUSED_MEMBERS,
};

pub const GROUP_RAW: CompletenessGroup = CompletenessGroup {
    id: GroupId::Raw,
    members: RAW_MEMBERS,
    clears: RAW_MEMBERS,
};

/// DeviceInformation 只在首次刷新时必需，之后保留其 dirty 状态，
/// 诊断快照随 Status/RunningTime 的到达而刷新。
pub const GROUP_DIAGNOSTICS: CompletenessGroup = CompletenessGroup {
    id: GroupId::Diagnostics,
    members: KindSet::of(&[
        PacketKind::Status,
        PacketKind::RunningTime,
        PacketKind::DeviceInformation,
    ]),
    clears: KindSet::of(&[PacketKind::Status, PacketKind::RunningTime]),
};

/// 评估顺序
pub const GROUPS: [CompletenessGroup; 3] = [GROUP_FUSED, GROUP_RAW, GROUP_DIAGNOSTICS];

/// 一次评估中触发的分组
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FiredGroups {
    pub fused: bool,
    pub raw: bool,
    pub diagnostics: bool,
}

impl FiredGroups {
    pub fn any(&self) -> bool {
        self.fused || self.raw || self.diagnostics
    }

    fn set(&mut self, id: GroupId) {
        match id {
            GroupId::Fused => self.fused = true,
            GroupId::Raw => self.raw = true,
            GroupId::Diagnostics => self.diagnostics = true,
        }
    }
}

/// 完整性同步器
pub struct Synchronizer {
    frame_id: String,
    epoch: Instant,
    diagnostics: Arc<ArcSwap<DiagnosticsRecord>>,
    refresh_count: u64,
}

impl Synchronizer {
    pub fn new(frame_id: impl Into<String>, diagnostics: Arc<ArcSwap<DiagnosticsRecord>>) -> Self {
        Self {
            frame_id: frame_id.into(),
            epoch: Instant::now(),
            diagnostics,
            refresh_count: 0,
        }
    }

    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    /// 诊断快照的发布位置
    pub fn diagnostics(&self) -> &Arc<ArcSwap<DiagnosticsRecord>> {
        &self.diagnostics
    }

    /// 按 A → B → C 顺序评估所有分组
    pub fn evaluate(&mut self, state: &mut SensorState, sink: &mut dyn ImuSink) -> FiredGroups {
        let mut fired = FiredGroups::default();

        for group in GROUPS {
            let dirty = state.dirty_set();
            if !group.is_complete(dirty) {
                continue;
            }

            let stamp = self.epoch.elapsed();
            let emitted = match group.id {
                GroupId::Fused => self.emit_fused(state, stamp, sink),
                GroupId::Raw => self.emit_raw(state, stamp, sink),
                GroupId::Diagnostics => self.refresh_diagnostics(state, stamp),
            };
            if emitted {
                trace!("Group {:?} fired at {:?}", group.id, stamp);
                state.clear_all(group.clears);
                fired.set(group.id);
            }
        }

        fired
    }

    fn header(&self, stamp: Duration) -> RecordHeader {
        RecordHeader {
            frame_id: self.frame_id.clone(),
            stamp,
        }
    }

    fn emit_fused(&self, state: &SensorState, stamp: Duration, sink: &mut dyn ImuSink) -> bool {
        let (Some(euler), Some(std_dev), Some(quat), Some(accel), Some(gyro)) = (
            state.euler_orientation.value(),
            state.quaternion_std_dev.value(),
            state.quaternion_orientation.value(),
            state.acceleration.value(),
            state.angular_velocity.value(),
        ) else {
            return false;
        };

        let [sx, sy, sz] = std_dev.standard_deviation.map(f64::from);
        let imu = FusedImuRecord {
            header: self.header(stamp),
            orientation: Quaternion {
                w: f64::from(quat.w()),
                x: f64::from(quat.x()),
                y: f64::from(quat.y()),
                z: f64::from(quat.z()),
            },
            orientation_covariance: diagonal_covariance([sx * sx, sy * sy, sz * sz]),
            angular_velocity: Vector3::from_f32(gyro.angular_velocity),
            angular_velocity_covariance: unknown_covariance(),
            linear_acceleration: Vector3::from_f32(accel.acceleration),
            linear_acceleration_covariance: unknown_covariance(),
        };
        let [roll, pitch, heading] = euler.orientation.map(|rad| f64::from(rad).to_degrees());
        let attitude = EulerAttitudeRecord {
            header: self.header(stamp),
            attitude_deg: Vector3::new(roll, pitch, heading),
        };

        sink.publish_fused_imu(imu);
        sink.publish_euler_attitude(attitude);
        true
    }

    fn emit_raw(&self, state: &SensorState, stamp: Duration, sink: &mut dyn ImuSink) -> bool {
        let Some(raw) = state.raw_sensors.value() else {
            return false;
        };

        let imu = RawImuRecord {
            header: self.header(stamp),
            orientation: Quaternion::IDENTITY,
            orientation_covariance: unknown_covariance(),
            angular_velocity: Vector3::from_f32(raw.gyroscopes),
            angular_velocity_covariance: unknown_covariance(),
            linear_acceleration: Vector3::from_f32(raw.accelerometers),
            linear_acceleration_covariance: unknown_covariance(),
        };
        let magnetic = MagneticFieldRecord {
            header: self.header(stamp),
            magnetic_field: Vector3::from_f32(raw.magnetometers).scaled(MAGNETIC_FIELD_SCALE),
            magnetic_field_covariance: [0.0; 9],
        };
        let temperature = TemperatureRecord {
            header: self.header(stamp),
            temperature: f64::from(raw.imu_temperature),
            variance: 0.0,
        };

        sink.publish_raw_imu(imu);
        sink.publish_magnetic_field(magnetic);
        sink.publish_temperature(temperature);
        true
    }

    fn refresh_diagnostics(&mut self, state: &SensorState, stamp: Duration) -> bool {
        let (Some(status), Some(running_time), Some(device_information)) = (
            state.status.value(),
            state.running_time.value(),
            state.device_information.value(),
        ) else {
            return false;
        };

        self.refresh_count += 1;
        let record = DiagnosticsRecord {
            stamp,
            status: *status,
            running_time: *running_time,
            device_information: *device_information,
            refresh_count: self.refresh_count,
        };
        debug!(
            "Diagnostics refreshed (#{}), system_status=0x{:04X} filter_status=0x{:04X}",
            record.refresh_count,
            status.system_status_raw(),
            status.filter_status_raw()
        );
        self.diagnostics.store(Arc::new(record));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CollectingSink;
    use orientus_protocol::*;

    fn synchronizer() -> Synchronizer {
        Synchronizer::new("imu_link", Arc::new(ArcSwap::from_pointee(DiagnosticsRecord::default())))
    }

    fn store_fused_except_gyro(state: &mut SensorState) {
        state.euler_orientation.store(EulerOrientation {
            orientation: [0.1, -0.2, 1.5],
        });
        state.quaternion_std_dev.store(QuaternionStdDev {
            standard_deviation: [0.5, 0.25, 2.0],
        });
        state.quaternion_orientation.store(QuaternionOrientation {
            orientation: [0.9, 0.1, 0.2, 0.3],
        });
        state.acceleration.store(Acceleration {
            acceleration: [0.1, 0.2, 9.8],
        });
    }

    #[test]
    fn test_group_definitions() {
        assert_eq!(GROUP_FUSED.members.len(), 5);
        assert_eq!(GROUP_FUSED.members, GROUP_FUSED.clears);
        assert_eq!(GROUP_RAW.members.len(), 1);
        assert!(GROUP_DIAGNOSTICS.members.contains_all(GROUP_DIAGNOSTICS.clears));
        assert!(!GROUP_DIAGNOSTICS.clears.contains(PacketKind::DeviceInformation));
        assert_eq!(
            GROUPS.map(|g| g.id),
            [GroupId::Fused, GroupId::Raw, GroupId::Diagnostics]
        );
    }

    #[test]
    fn test_fused_waits_for_all_members() {
        let mut sync = synchronizer();
        let mut state = SensorState::new();
        let mut sink = CollectingSink::new();

        store_fused_except_gyro(&mut state);
        let fired = sync.evaluate(&mut state, &mut sink);
        assert!(!fired.any());
        assert!(sink.outputs.is_empty());
        assert_eq!(state.dirty_set().len(), 4);

        state.angular_velocity.store(AngularVelocity {
            angular_velocity: [0.01, 0.02, 0.03],
        });
        let fired = sync.evaluate(&mut state, &mut sink);
        assert!(fired.fused);
        assert!(!fired.raw && !fired.diagnostics);
        assert_eq!(sink.fused().count(), 1);
        assert_eq!(sink.euler().count(), 1);
        assert!(state.dirty_set().is_empty());

        // 没有新数据时不会重复触发
        let fired = sync.evaluate(&mut state, &mut sink);
        assert!(!fired.any());
        assert_eq!(sink.fused().count(), 1);
    }

    #[test]
    fn test_fused_record_contents() {
        let mut sync = synchronizer();
        let mut state = SensorState::new();
        let mut sink = CollectingSink::new();

        store_fused_except_gyro(&mut state);
        state.angular_velocity.store(AngularVelocity {
            angular_velocity: [0.01, 0.02, 0.03],
        });
        sync.evaluate(&mut state, &mut sink);

        let imu = sink.fused().next().unwrap();
        assert_eq!(imu.header.frame_id, "imu_link");
        assert_eq!(imu.orientation.w, f64::from(0.9f32));
        assert_eq!(imu.orientation.z, f64::from(0.3f32));
        assert_eq!(imu.orientation_covariance[0], 0.25);
        assert_eq!(imu.orientation_covariance[4], 0.0625);
        assert_eq!(imu.orientation_covariance[8], 4.0);
        assert_eq!(imu.orientation_covariance[1], 0.0);
        assert_eq!(imu.angular_velocity.y, f64::from(0.02f32));
        assert_eq!(imu.angular_velocity_covariance[0], -1.0);
        assert_eq!(imu.linear_acceleration.z, f64::from(9.8f32));
        assert_eq!(imu.linear_acceleration_covariance[0], -1.0);

        let euler = sink.euler().next().unwrap();
        let expected = f64::from(1.5f32) * 180.0 / std::f64::consts::PI;
        assert!((euler.attitude_deg.z - expected).abs() < 1e-9);
    }

    #[test]
    fn test_raw_group_records() {
        let mut sync = synchronizer();
        let mut state = SensorState::new();
        let mut sink = CollectingSink::new();

        state.raw_sensors.store(RawSensors {
            accelerometers: [1.0, 2.0, 3.0],
            gyroscopes: [0.1, 0.2, 0.3],
            magnetometers: [100.0, -200.0, 400.0],
            imu_temperature: 36.5,
            pressure: 101_325.0,
            pressure_temperature: 30.0,
        });
        let fired = sync.evaluate(&mut state, &mut sink);
        assert!(fired.raw);

        let raw = sink.raw().next().unwrap();
        assert_eq!(raw.orientation_covariance[0], -1.0);
        assert_eq!(raw.linear_acceleration, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(raw.angular_velocity.x, f64::from(0.1f32));

        let mag = sink.magnetic().next().unwrap();
        assert_eq!(mag.magnetic_field.x, 100.0 * 1e-7);
        assert_eq!(mag.magnetic_field.y, -200.0 * 1e-7);

        let temp = sink.temperature().next().unwrap();
        assert_eq!(temp.temperature, 36.5);
        assert!(!state.raw_sensors.is_dirty());
    }

    #[test]
    fn test_diagnostics_group_keeps_device_information_dirty() {
        let mut sync = synchronizer();
        let published = sync.diagnostics().clone();
        let mut state = SensorState::new();
        let mut sink = CollectingSink::new();

        state.status.store(Status::from_raw(0x0001, 0x0001));
        state.running_time.store(RunningTime {
            seconds: 12,
            microseconds: 500_000,
        });
        // 缺 DeviceInformation，不触发
        assert!(!sync.evaluate(&mut state, &mut sink).diagnostics);
        assert!(!published.load().is_available());

        state.device_information.store(DeviceInformation {
            device_id: 7,
            ..Default::default()
        });
        assert!(sync.evaluate(&mut state, &mut sink).diagnostics);

        let record = published.load_full();
        assert_eq!(record.refresh_count, 1);
        assert_eq!(record.running_time.seconds, 12);
        assert_eq!(record.device_information.device_id, 7);
        assert!(record.status.system_status.system_failure());

        assert!(!state.status.is_dirty());
        assert!(!state.running_time.is_dirty());
        assert!(state.device_information.is_dirty());
        // 诊断组不产生 sink 输出
        assert!(sink.outputs.is_empty());
    }

    #[test]
    fn test_all_groups_fire_in_one_batch() {
        let mut sync = synchronizer();
        let mut state = SensorState::new();
        let mut sink = CollectingSink::new();

        store_fused_except_gyro(&mut state);
        state.angular_velocity.store(AngularVelocity::default());
        state.raw_sensors.store(RawSensors::default());
        state.status.store(Status::default());
        state.running_time.store(RunningTime::default());
        state.device_information.store(DeviceInformation::default());

        let fired = sync.evaluate(&mut state, &mut sink);
        assert_eq!(
            fired,
            FiredGroups {
                fused: true,
                raw: true,
                diagnostics: true
            }
        );

        assert_eq!(sink.outputs.len(), 5);
        assert!(matches!(sink.outputs[0], ImuOutput::FusedImu(_)));
        assert!(matches!(sink.outputs[1], ImuOutput::EulerAttitude(_)));
        assert!(matches!(sink.outputs[2], ImuOutput::RawImu(_)));
        assert!(matches!(sink.outputs[3], ImuOutput::MagneticField(_)));
        assert!(matches!(sink.outputs[4], ImuOutput::Temperature(_)));
        assert_eq!(
            state.dirty_set(),
            KindSet::of(&[PacketKind::DeviceInformation])
        );
    }

    #[test]
    fn test_fused_firing_leaves_other_flags() {
        let mut sync = synchronizer();
        let mut state = SensorState::new();
        let mut sink = CollectingSink::new();

        store_fused_except_gyro(&mut state);
        state.angular_velocity.store(AngularVelocity::default());
        state.status.store(Status::default());

        sync.evaluate(&mut state, &mut sink);
        assert_eq!(state.dirty_set(), KindSet::of(&[PacketKind::Status]));
    }
}
