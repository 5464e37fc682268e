//! 数据包 ID 常量定义和枚举
//!
//! 只收录驱动实际使用的数据包。设备还会上报很多其他 ID，
//! 这些 ID 在解码时统一归为 `DecodeError::UnknownId`。

use num_enum::{IntoPrimitive, TryFromPrimitive};

// ============================================================================
// 系统数据包
// ============================================================================

/// 应答包（设备对每条配置/请求的回复）
pub const ID_ACKNOWLEDGE: u8 = 0;

/// 请求包（请求设备立即发送若干数据包）
pub const ID_REQUEST: u8 = 1;

/// 设备信息
pub const ID_DEVICE_INFORMATION: u8 = 3;

/// 复位
pub const ID_RESET: u8 = 5;

// ============================================================================
// 状态数据包
// ============================================================================

pub const ID_STATUS: u8 = 23;
pub const ID_QUATERNION_STD_DEV: u8 = 27;
pub const ID_RAW_SENSORS: u8 = 28;
pub const ID_ACCELERATION: u8 = 37;
pub const ID_EULER_ORIENTATION: u8 = 39;
pub const ID_QUATERNION_ORIENTATION: u8 = 40;
pub const ID_ANGULAR_VELOCITY: u8 = 42;
pub const ID_RUNNING_TIME: u8 = 52;

// ============================================================================
// 配置数据包
// ============================================================================

/// 数据包定时器周期（单位：微秒/tick）
pub const ID_PACKET_TIMER_PERIOD: u8 = 180;

/// 数据包周期表（单位：tick）
pub const ID_PACKET_PERIODS: u8 = 181;

/// 零位对齐
pub const ID_ZERO_ALIGNMENT: u8 = 193;

/// 支持的数据包 ID
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, TryFromPrimitive, IntoPrimitive,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PacketId {
    Acknowledge = ID_ACKNOWLEDGE,
    Request = ID_REQUEST,
    DeviceInformation = ID_DEVICE_INFORMATION,
    Reset = ID_RESET,
    Status = ID_STATUS,
    QuaternionStdDev = ID_QUATERNION_STD_DEV,
    RawSensors = ID_RAW_SENSORS,
    Acceleration = ID_ACCELERATION,
    EulerOrientation = ID_EULER_ORIENTATION,
    QuaternionOrientation = ID_QUATERNION_ORIENTATION,
    AngularVelocity = ID_ANGULAR_VELOCITY,
    RunningTime = ID_RUNNING_TIME,
    PacketTimerPeriod = ID_PACKET_TIMER_PERIOD,
    PacketPeriods = ID_PACKET_PERIODS,
    ZeroAlignment = ID_ZERO_ALIGNMENT,
}

/// 数据包分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketClass {
    /// 系统包（0-19）
    System,
    /// 状态包（20-179）
    State,
    /// 配置包（180-255）
    Configuration,
}

impl PacketClass {
    /// 根据 ID 判断数据包分类
    pub fn from_id(id: u8) -> Self {
        match id {
            0..=19 => PacketClass::System,
            20..=179 => PacketClass::State,
            _ => PacketClass::Configuration,
        }
    }
}
