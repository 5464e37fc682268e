//! 输出记录
//!
//! 记录是 synchronizer 在 flush 时从 `SensorState` 快照构造的纯值，交给 sink 后不再共享。
//! 协方差约定：首个对角元为 `-1.0` 表示"未知"。

use orientus_protocol::{DeviceInformation, RunningTime, Status};
use std::time::Duration;

/// 协方差"未知"标记
pub const COVARIANCE_UNKNOWN: f64 = -1.0;

/// 磁力计原始值（mG）到场强单位的比例
pub const MAGNETIC_FIELD_SCALE: f64 = 1e-7;

/// 3x3 协方差矩阵（行主序）
pub type Covariance3 = [f64; 9];

/// 首元为 -1 的协方差矩阵
pub const fn unknown_covariance() -> Covariance3 {
    let mut cov = [0.0; 9];
    cov[0] = COVARIANCE_UNKNOWN;
    cov
}

/// 对角协方差矩阵
pub fn diagonal_covariance(diag: [f64; 3]) -> Covariance3 {
    let mut cov = [0.0; 9];
    cov[0] = diag[0];
    cov[4] = diag[1];
    cov[8] = diag[2];
    cov
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_f32(v: [f32; 3]) -> Self {
        Self::new(f64::from(v[0]), f64::from(v[1]), f64::from(v[2]))
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// 记录头：坐标系 + 发布时刻
///
/// `stamp` 为相对 pipeline 启动时刻的单调时间。
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordHeader {
    pub frame_id: String,
    pub stamp: Duration,
}

/// IMU 记录（融合与原始两种输出共用一个结构）
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImuRecord {
    pub header: RecordHeader,
    pub orientation: Quaternion,
    pub orientation_covariance: Covariance3,
    /// rad/s
    pub angular_velocity: Vector3,
    pub angular_velocity_covariance: Covariance3,
    /// m/s²
    pub linear_acceleration: Vector3,
    pub linear_acceleration_covariance: Covariance3,
}

/// Group A 输出：滤波后的姿态 + 角速度 + 加速度
pub type FusedImuRecord = ImuRecord;

/// Group B 输出：未经滤波的陀螺仪与加速度计读数（无姿态）
pub type RawImuRecord = ImuRecord;

/// 欧拉角（度）
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EulerAttitudeRecord {
    pub header: RecordHeader,
    /// roll, pitch, heading
    pub attitude_deg: Vector3,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MagneticFieldRecord {
    pub header: RecordHeader,
    pub magnetic_field: Vector3,
    pub magnetic_field_covariance: Covariance3,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TemperatureRecord {
    pub header: RecordHeader,
    /// °C
    pub temperature: f64,
    pub variance: f64,
}

/// 诊断快照
///
/// 由 Group C 刷新，通过 `ArcSwap` 发布。`refresh_count == 0` 表示尚未收到过完整的
/// Status/RunningTime/DeviceInformation，此时其余字段均为默认值，不是真实读数。
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DiagnosticsRecord {
    pub stamp: Duration,
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_status"))]
    pub status: Status,
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_running_time"))]
    pub running_time: RunningTime,
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_device_information"))]
    pub device_information: DeviceInformation,
    pub refresh_count: u64,
}

impl DiagnosticsRecord {
    pub fn is_available(&self) -> bool {
        self.refresh_count > 0
    }
}

#[cfg(feature = "serde")]
fn serialize_status<S: serde::Serializer>(status: &Status, s: S) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeStruct;
    let mut st = s.serialize_struct("Status", 2)?;
    st.serialize_field("system_status", &status.system_status_raw())?;
    st.serialize_field("filter_status", &status.filter_status_raw())?;
    st.end()
}

#[cfg(feature = "serde")]
fn serialize_running_time<S: serde::Serializer>(
    time: &RunningTime,
    s: S,
) -> Result<S::Ok, S::Error> {
    s.serialize_f64(time.as_secs_f64())
}

#[cfg(feature = "serde")]
fn serialize_device_information<S: serde::Serializer>(
    info: &DeviceInformation,
    s: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeStruct;
    let mut st = s.serialize_struct("DeviceInformation", 4)?;
    st.serialize_field("device_id", &info.device_id)?;
    st.serialize_field("software_version", &info.software_version_string())?;
    st.serialize_field("hardware_revision", &info.hardware_revision_string())?;
    st.serialize_field("serial_number", &info.serial_number_hex())?;
    st.end()
}

/// 一条输出（用于通道转发和离线收集）
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum ImuOutput {
    FusedImu(FusedImuRecord),
    EulerAttitude(EulerAttitudeRecord),
    RawImu(RawImuRecord),
    MagneticField(MagneticFieldRecord),
    Temperature(TemperatureRecord),
}

impl ImuOutput {
    pub fn header(&self) -> &RecordHeader {
        match self {
            ImuOutput::FusedImu(r) | ImuOutput::RawImu(r) => &r.header,
            ImuOutput::EulerAttitude(r) => &r.header,
            ImuOutput::MagneticField(r) => &r.header,
            ImuOutput::Temperature(r) => &r.header,
        }
    }
}
