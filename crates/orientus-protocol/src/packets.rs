//! 设备上报数据包解析
//!
//! 每种数据包提供 `TryFrom<&RawFrame>`，校验 ID 与负载长度后按小端序解析。
//! [`DecodedPacket`] 汇总所有支持的数据包，[`decode`] 是统一入口。

use crate::RawFrame;
use crate::ids::*;
use bilge::prelude::*;
use bytes::Buf;
use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;

/// 期望的负载长度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLen {
    /// 固定长度
    Exact(usize),
    /// `base + stride * n`
    Stride { base: usize, stride: usize },
}

impl fmt::Display for PayloadLen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadLen::Exact(len) => write!(f, "{}", len),
            PayloadLen::Stride { base, stride } => write!(f, "{} + {}n", base, stride),
        }
    }
}

/// 数据包解码错误
///
/// 所有错误都是可恢复的：丢弃该帧，继续处理字节流。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// ID 不在支持的上报数据包目录中
    #[error("Unknown packet id {id} (length {len})")]
    UnknownId { id: u8, len: u16 },

    /// 负载长度与 ID 不符
    #[error("Malformed payload for packet {id}: expected {expected} bytes, got {actual}")]
    MalformedPayload {
        id: u8,
        expected: PayloadLen,
        actual: usize,
    },

    /// 按具体类型解析时 ID 不匹配
    #[error("Unexpected packet id: expected {expected}, got {actual}")]
    UnexpectedId { expected: u8, actual: u8 },

    /// 长度正确但字段取值非法（布尔字节不是 0/1，周期表中出现结束标记等）
    #[error("Invalid {field} value {value} in packet {id}")]
    InvalidField {
        id: u8,
        field: &'static str,
        value: u8,
    },
}

fn check_frame(frame: &RawFrame, id: u8, len: usize) -> Result<(), DecodeError> {
    if frame.id != id {
        return Err(DecodeError::UnexpectedId {
            expected: id,
            actual: frame.id,
        });
    }
    if frame.payload().len() != len {
        return Err(DecodeError::MalformedPayload {
            id,
            expected: PayloadLen::Exact(len),
            actual: frame.payload().len(),
        });
    }
    Ok(())
}

/// 布尔字节只接受 0 和 1
fn get_flag(buf: &mut &[u8], id: u8, field: &'static str) -> Result<bool, DecodeError> {
    match buf.get_u8() {
        0 => Ok(false),
        1 => Ok(true),
        value => Err(DecodeError::InvalidField { id, field, value }),
    }
}

fn get_f32x3(buf: &mut &[u8]) -> [f32; 3] {
    [buf.get_f32_le(), buf.get_f32_le(), buf.get_f32_le()]
}

// ============================================================================
// 应答包 (0)
// ============================================================================

/// 应答结果码
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::FromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum AcknowledgeResult {
    Success = 0,
    /// 请求包 CRC 错误
    CrcFailure = 1,
    /// 请求包长度错误
    LengthFailure = 2,
    /// 参数超出范围
    RangeFailure = 3,
    /// 写入 Flash 失败
    FlashFailure = 4,
    /// 设备未就绪
    NotReady = 5,
    /// 设备不认识该数据包
    UnknownPacket = 6,
    #[num_enum(catch_all)]
    Other(u8),
}

impl AcknowledgeResult {
    /// 原始结果码
    pub fn code(self) -> u8 {
        match self {
            AcknowledgeResult::Success => 0,
            AcknowledgeResult::CrcFailure => 1,
            AcknowledgeResult::LengthFailure => 2,
            AcknowledgeResult::RangeFailure => 3,
            AcknowledgeResult::FlashFailure => 4,
            AcknowledgeResult::NotReady => 5,
            AcknowledgeResult::UnknownPacket => 6,
            AcknowledgeResult::Other(code) => code,
        }
    }
}

/// 应答包
///
/// 设备对每个收到的配置/请求包回复一个应答，
/// `packet_crc` 是被应答数据包的 CRC，用于对应到具体请求。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Acknowledge {
    pub packet_id: u8,    // Byte 0
    pub packet_crc: u16,  // Byte 1-2
    pub result: AcknowledgeResult, // Byte 3
}

impl Acknowledge {
    pub const LEN: usize = 4;

    pub fn is_success(&self) -> bool {
        self.result == AcknowledgeResult::Success
    }
}

impl TryFrom<&RawFrame> for Acknowledge {
    type Error = DecodeError;

    fn try_from(frame: &RawFrame) -> Result<Self, Self::Error> {
        check_frame(frame, ID_ACKNOWLEDGE, Self::LEN)?;
        let mut buf = frame.payload();
        Ok(Self {
            packet_id: buf.get_u8(),
            packet_crc: buf.get_u16_le(),
            result: AcknowledgeResult::from(buf.get_u8()),
        })
    }
}

// ============================================================================
// 设备信息 (3)
// ============================================================================

/// 设备信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceInformation {
    /// 软件版本 ×1000
    pub software_version: u32,
    pub device_id: u32,
    /// 硬件版本 ×1000
    pub hardware_revision: u32,
    pub serial_number: [u32; 3],
}

impl DeviceInformation {
    pub const LEN: usize = 24;

    /// 软件版本，保留三位小数（如 `"5.120"`）
    pub fn software_version_string(&self) -> String {
        format!("{:.3}", self.software_version as f64 / 1000.0)
    }

    /// 硬件版本，保留三位小数
    pub fn hardware_revision_string(&self) -> String {
        format!("{:.3}", self.hardware_revision as f64 / 1000.0)
    }

    /// 序列号（十六进制）
    pub fn serial_number_hex(&self) -> String {
        let [a, b, c] = self.serial_number;
        format!("{:08x}{:08x}{:08x}", a, b, c)
    }
}

impl TryFrom<&RawFrame> for DeviceInformation {
    type Error = DecodeError;

    fn try_from(frame: &RawFrame) -> Result<Self, Self::Error> {
        check_frame(frame, ID_DEVICE_INFORMATION, Self::LEN)?;
        let mut buf = frame.payload();
        Ok(Self {
            software_version: buf.get_u32_le(),
            device_id: buf.get_u32_le(),
            hardware_revision: buf.get_u32_le(),
            serial_number: [buf.get_u32_le(), buf.get_u32_le(), buf.get_u32_le()],
        })
    }
}

// ============================================================================
// 状态包 (23)
// ============================================================================

/// 系统状态位域
#[bitsize(16)]
#[derive(FromBits, DebugBits, Clone, Copy, Default, PartialEq)]
pub struct SystemStatus {
    pub system_failure: bool,               // Bit 0
    pub accelerometer_sensor_failure: bool, // Bit 1
    pub gyroscope_sensor_failure: bool,     // Bit 2
    pub magnetometer_sensor_failure: bool,  // Bit 3
    pub pressure_sensor_failure: bool,      // Bit 4
    pub gnss_failure: bool,                 // Bit 5
    pub accelerometer_over_range: bool,     // Bit 6
    pub gyroscope_over_range: bool,         // Bit 7
    pub magnetometer_over_range: bool,      // Bit 8
    pub pressure_over_range: bool,          // Bit 9
    pub minimum_temperature_alarm: bool,    // Bit 10
    pub maximum_temperature_alarm: bool,    // Bit 11
    pub low_voltage_alarm: bool,            // Bit 12
    pub high_voltage_alarm: bool,           // Bit 13
    pub gnss_antenna_disconnected: bool,    // Bit 14
    pub serial_port_overflow_alarm: bool,   // Bit 15
}

/// 滤波器状态位域
#[bitsize(16)]
#[derive(FromBits, DebugBits, Clone, Copy, Default, PartialEq)]
pub struct FilterStatus {
    pub orientation_filter_initialised: bool, // Bit 0
    pub ins_filter_initialised: bool,         // Bit 1
    pub heading_initialised: bool,            // Bit 2
    pub utc_time_initialised: bool,           // Bit 3
    pub gnss_fix_type: u3,                    // Bit 4-6
    pub event1_flag: bool,                    // Bit 7
    pub event2_flag: bool,                    // Bit 8
    pub internal_gnss_enabled: bool,          // Bit 9
    pub magnetic_heading_enabled: bool,       // Bit 10
    pub velocity_heading_enabled: bool,       // Bit 11
    pub atmospheric_altitude_enabled: bool,   // Bit 12
    pub external_position_active: bool,       // Bit 13
    pub external_velocity_active: bool,       // Bit 14
    pub external_heading_active: bool,        // Bit 15
}

/// 状态包
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Status {
    pub system_status: SystemStatus, // Byte 0-1
    pub filter_status: FilterStatus, // Byte 2-3
}

impl Status {
    pub const LEN: usize = 4;

    /// 由原始位域值构建
    pub fn from_raw(system_status: u16, filter_status: u16) -> Self {
        Self {
            system_status: SystemStatus::from(u16::new(system_status)),
            filter_status: FilterStatus::from(u16::new(filter_status)),
        }
    }

    /// 系统状态原始值
    pub fn system_status_raw(&self) -> u16 {
        u16::from(self.system_status)
    }

    /// 滤波器状态原始值
    pub fn filter_status_raw(&self) -> u16 {
        u16::from(self.filter_status)
    }
}

impl TryFrom<&RawFrame> for Status {
    type Error = DecodeError;

    fn try_from(frame: &RawFrame) -> Result<Self, Self::Error> {
        check_frame(frame, ID_STATUS, Self::LEN)?;
        let mut buf = frame.payload();
        let system_status = buf.get_u16_le();
        let filter_status = buf.get_u16_le();
        Ok(Self::from_raw(system_status, filter_status))
    }
}

// ============================================================================
// 姿态 / 运动数据包
// ============================================================================

/// 四元数姿态标准差 (27)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuaternionStdDev {
    /// 各轴标准差（rad）
    pub standard_deviation: [f32; 3],
}

impl QuaternionStdDev {
    pub const LEN: usize = 12;
}

impl TryFrom<&RawFrame> for QuaternionStdDev {
    type Error = DecodeError;

    fn try_from(frame: &RawFrame) -> Result<Self, Self::Error> {
        check_frame(frame, ID_QUATERNION_STD_DEV, Self::LEN)?;
        let mut buf = frame.payload();
        Ok(Self {
            standard_deviation: get_f32x3(&mut buf),
        })
    }
}

/// 欧拉角姿态 (39)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EulerOrientation {
    /// roll, pitch, heading（rad）
    pub orientation: [f32; 3],
}

impl EulerOrientation {
    pub const LEN: usize = 12;
}

impl TryFrom<&RawFrame> for EulerOrientation {
    type Error = DecodeError;

    fn try_from(frame: &RawFrame) -> Result<Self, Self::Error> {
        check_frame(frame, ID_EULER_ORIENTATION, Self::LEN)?;
        let mut buf = frame.payload();
        Ok(Self {
            orientation: get_f32x3(&mut buf),
        })
    }
}

/// 四元数姿态 (40)
///
/// 线上顺序为 `w, x, y, z`。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuaternionOrientation {
    pub orientation: [f32; 4],
}

impl QuaternionOrientation {
    pub const LEN: usize = 16;

    pub fn w(&self) -> f32 {
        self.orientation[0]
    }

    pub fn x(&self) -> f32 {
        self.orientation[1]
    }

    pub fn y(&self) -> f32 {
        self.orientation[2]
    }

    pub fn z(&self) -> f32 {
        self.orientation[3]
    }
}

impl TryFrom<&RawFrame> for QuaternionOrientation {
    type Error = DecodeError;

    fn try_from(frame: &RawFrame) -> Result<Self, Self::Error> {
        check_frame(frame, ID_QUATERNION_ORIENTATION, Self::LEN)?;
        let mut buf = frame.payload();
        Ok(Self {
            orientation: [
                buf.get_f32_le(),
                buf.get_f32_le(),
                buf.get_f32_le(),
                buf.get_f32_le(),
            ],
        })
    }
}

/// 线加速度 (37)，单位 m/s²
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Acceleration {
    pub acceleration: [f32; 3],
}

impl Acceleration {
    pub const LEN: usize = 12;
}

impl TryFrom<&RawFrame> for Acceleration {
    type Error = DecodeError;

    fn try_from(frame: &RawFrame) -> Result<Self, Self::Error> {
        check_frame(frame, ID_ACCELERATION, Self::LEN)?;
        let mut buf = frame.payload();
        Ok(Self {
            acceleration: get_f32x3(&mut buf),
        })
    }
}

/// 角速度 (42)，单位 rad/s
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AngularVelocity {
    pub angular_velocity: [f32; 3],
}

impl AngularVelocity {
    pub const LEN: usize = 12;
}

impl TryFrom<&RawFrame> for AngularVelocity {
    type Error = DecodeError;

    fn try_from(frame: &RawFrame) -> Result<Self, Self::Error> {
        check_frame(frame, ID_ANGULAR_VELOCITY, Self::LEN)?;
        let mut buf = frame.payload();
        Ok(Self {
            angular_velocity: get_f32x3(&mut buf),
        })
    }
}

/// 原始传感器数据 (28)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawSensors {
    pub accelerometers: [f32; 3], // m/s²
    pub gyroscopes: [f32; 3],     // rad/s
    pub magnetometers: [f32; 3],  // mG
    pub imu_temperature: f32,     // °C
    pub pressure: f32,            // Pa
    pub pressure_temperature: f32, // °C
}

impl RawSensors {
    pub const LEN: usize = 48;
}

impl TryFrom<&RawFrame> for RawSensors {
    type Error = DecodeError;

    fn try_from(frame: &RawFrame) -> Result<Self, Self::Error> {
        check_frame(frame, ID_RAW_SENSORS, Self::LEN)?;
        let mut buf = frame.payload();
        Ok(Self {
            accelerometers: get_f32x3(&mut buf),
            gyroscopes: get_f32x3(&mut buf),
            magnetometers: get_f32x3(&mut buf),
            imu_temperature: buf.get_f32_le(),
            pressure: buf.get_f32_le(),
            pressure_temperature: buf.get_f32_le(),
        })
    }
}

/// 运行时间 (52)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunningTime {
    pub seconds: u32,
    pub microseconds: u32,
}

impl RunningTime {
    pub const LEN: usize = 8;

    /// 运行时间（秒）
    pub fn as_secs_f64(&self) -> f64 {
        self.seconds as f64 + self.microseconds as f64 * 1e-6
    }
}

impl TryFrom<&RawFrame> for RunningTime {
    type Error = DecodeError;

    fn try_from(frame: &RawFrame) -> Result<Self, Self::Error> {
        check_frame(frame, ID_RUNNING_TIME, Self::LEN)?;
        let mut buf = frame.payload();
        Ok(Self {
            seconds: buf.get_u32_le(),
            microseconds: buf.get_u32_le(),
        })
    }
}

// ============================================================================
// 配置数据包（设备对读取请求的回复，格式与下发一致）
// ============================================================================

/// 数据包定时器周期 (180)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PacketTimerPeriod {
    /// 写入 Flash（掉电保存）
    pub permanent: bool,
    /// 与 UTC 秒对齐
    pub utc_synchronisation: bool,
    /// 周期（微秒/tick）
    pub period: u16,
}

impl PacketTimerPeriod {
    pub const LEN: usize = 4;
}

impl TryFrom<&RawFrame> for PacketTimerPeriod {
    type Error = DecodeError;

    fn try_from(frame: &RawFrame) -> Result<Self, Self::Error> {
        check_frame(frame, ID_PACKET_TIMER_PERIOD, Self::LEN)?;
        let mut buf = frame.payload();
        Ok(Self {
            permanent: get_flag(&mut buf, ID_PACKET_TIMER_PERIOD, "permanent")?,
            utc_synchronisation: get_flag(&mut buf, ID_PACKET_TIMER_PERIOD, "utc_synchronisation")?,
            period: buf.get_u16_le(),
        })
    }
}

/// 数据包周期表项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PacketPeriod {
    pub packet_id: u8,
    /// 周期（tick）
    pub period: u32,
}

impl PacketPeriod {
    pub const LEN: usize = 5;

    pub fn new(packet_id: PacketId, period: u32) -> Self {
        Self {
            packet_id: packet_id.into(),
            period,
        }
    }

    /// 周期表结束标记
    pub const fn sentinel() -> Self {
        Self {
            packet_id: 0,
            period: 0,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.packet_id == 0
    }
}

/// 周期表项的内联容量（启动配置 8 项加结束标记）
pub type PacketPeriodTable = SmallVec<[PacketPeriod; 12]>;

/// 数据包周期表 (181)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PacketPeriods {
    pub permanent: bool,
    /// 清除设备上已有的周期配置
    pub clear_existing_packets: bool,
    /// 周期表，遇到 `packet_id == 0` 的表项即结束
    pub periods: PacketPeriodTable,
}

impl PacketPeriods {
    /// 固定字段长度（permanent + clear_existing_packets）
    pub const HEADER_LEN: usize = 2;

    /// 单帧最多容纳的表项数
    pub const MAX_ENTRIES: usize = (crate::MAX_PAYLOAD_LEN - Self::HEADER_LEN) / PacketPeriod::LEN;

    /// 有效表项（截止到结束标记）
    pub fn active_entries(&self) -> impl Iterator<Item = &PacketPeriod> {
        self.periods.iter().take_while(|p| !p.is_sentinel())
    }
}

impl TryFrom<&RawFrame> for PacketPeriods {
    type Error = DecodeError;

    fn try_from(frame: &RawFrame) -> Result<Self, Self::Error> {
        if frame.id != ID_PACKET_PERIODS {
            return Err(DecodeError::UnexpectedId {
                expected: ID_PACKET_PERIODS,
                actual: frame.id,
            });
        }

        let len = frame.payload().len();
        if len < Self::HEADER_LEN || (len - Self::HEADER_LEN) % PacketPeriod::LEN != 0 {
            return Err(DecodeError::MalformedPayload {
                id: ID_PACKET_PERIODS,
                expected: PayloadLen::Stride {
                    base: Self::HEADER_LEN,
                    stride: PacketPeriod::LEN,
                },
                actual: len,
            });
        }

        let mut buf = frame.payload();
        let permanent = get_flag(&mut buf, ID_PACKET_PERIODS, "permanent")?;
        let clear_existing_packets = get_flag(&mut buf, ID_PACKET_PERIODS, "clear_existing_packets")?;

        // 结束标记不上线，线上出现 id 0 的表项即视为非法
        let mut periods = PacketPeriodTable::new();
        while buf.remaining() >= PacketPeriod::LEN {
            let entry = PacketPeriod {
                packet_id: buf.get_u8(),
                period: buf.get_u32_le(),
            };
            if entry.is_sentinel() {
                return Err(DecodeError::InvalidField {
                    id: ID_PACKET_PERIODS,
                    field: "packet_id",
                    value: 0,
                });
            }
            periods.push(entry);
        }

        Ok(Self {
            permanent,
            clear_existing_packets,
            periods,
        })
    }
}

// ============================================================================
// 统一解码入口
// ============================================================================

/// 支持的上报数据包
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedPacket {
    Acknowledge(Acknowledge),
    Status(Status),
    RunningTime(RunningTime),
    DeviceInformation(DeviceInformation),
    QuaternionStdDev(QuaternionStdDev),
    EulerOrientation(EulerOrientation),
    QuaternionOrientation(QuaternionOrientation),
    Acceleration(Acceleration),
    AngularVelocity(AngularVelocity),
    RawSensors(RawSensors),
    PacketTimerPeriod(PacketTimerPeriod),
    PacketPeriods(PacketPeriods),
}

impl DecodedPacket {
    /// 数据包 ID
    pub fn id(&self) -> PacketId {
        match self {
            DecodedPacket::Acknowledge(_) => PacketId::Acknowledge,
            DecodedPacket::Status(_) => PacketId::Status,
            DecodedPacket::RunningTime(_) => PacketId::RunningTime,
            DecodedPacket::DeviceInformation(_) => PacketId::DeviceInformation,
            DecodedPacket::QuaternionStdDev(_) => PacketId::QuaternionStdDev,
            DecodedPacket::EulerOrientation(_) => PacketId::EulerOrientation,
            DecodedPacket::QuaternionOrientation(_) => PacketId::QuaternionOrientation,
            DecodedPacket::Acceleration(_) => PacketId::Acceleration,
            DecodedPacket::AngularVelocity(_) => PacketId::AngularVelocity,
            DecodedPacket::RawSensors(_) => PacketId::RawSensors,
            DecodedPacket::PacketTimerPeriod(_) => PacketId::PacketTimerPeriod,
            DecodedPacket::PacketPeriods(_) => PacketId::PacketPeriods,
        }
    }
}

impl TryFrom<&RawFrame> for DecodedPacket {
    type Error = DecodeError;

    fn try_from(frame: &RawFrame) -> Result<Self, Self::Error> {
        let unknown = || DecodeError::UnknownId {
            id: frame.id,
            len: frame.length(),
        };

        let packet = match PacketId::try_from(frame.id).map_err(|_| unknown())? {
            PacketId::Acknowledge => DecodedPacket::Acknowledge(frame.try_into()?),
            PacketId::Status => DecodedPacket::Status(frame.try_into()?),
            PacketId::RunningTime => DecodedPacket::RunningTime(frame.try_into()?),
            PacketId::DeviceInformation => DecodedPacket::DeviceInformation(frame.try_into()?),
            PacketId::QuaternionStdDev => DecodedPacket::QuaternionStdDev(frame.try_into()?),
            PacketId::EulerOrientation => DecodedPacket::EulerOrientation(frame.try_into()?),
            PacketId::QuaternionOrientation => {
                DecodedPacket::QuaternionOrientation(frame.try_into()?)
            },
            PacketId::Acceleration => DecodedPacket::Acceleration(frame.try_into()?),
            PacketId::AngularVelocity => DecodedPacket::AngularVelocity(frame.try_into()?),
            PacketId::RawSensors => DecodedPacket::RawSensors(frame.try_into()?),
            PacketId::PacketTimerPeriod => DecodedPacket::PacketTimerPeriod(frame.try_into()?),
            PacketId::PacketPeriods => DecodedPacket::PacketPeriods(frame.try_into()?),
            // 只会由主机下发，设备不会上报
            PacketId::Request | PacketId::Reset | PacketId::ZeroAlignment => {
                return Err(unknown());
            },
        };

        Ok(packet)
    }
}

/// 将一帧解码为数据包
pub fn decode(frame: &RawFrame) -> Result<DecodedPacket, DecodeError> {
    DecodedPacket::try_from(frame)
}
