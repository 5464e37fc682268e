//! DiagnosticsView：诊断快照到健康报告的纯投影
//!
//! 每个子系统对应一个纯函数，输入只有 [`DiagnosticsRecord`]，不读写任何共享状态。

use crate::records::DiagnosticsRecord;
use std::fmt;

/// 健康等级（按严重程度递增排序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum HealthLevel {
    Ok,
    Warn,
    Error,
}

impl fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthLevel::Ok => "OK",
            HealthLevel::Warn => "WARN",
            HealthLevel::Error => "ERROR",
        };
        f.pad(s)
    }
}

/// 单个子系统的状态
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SubsystemStatus {
    pub name: &'static str,
    pub level: HealthLevel,
    pub message: &'static str,
    /// 附加键值（仅 device 和 filter 有）
    pub values: Vec<(&'static str, String)>,
}

impl SubsystemStatus {
    fn new(name: &'static str, level: HealthLevel, message: &'static str) -> Self {
        Self {
            name,
            level,
            message,
            values: Vec::new(),
        }
    }

    fn with_value(mut self, key: &'static str, value: impl ToString) -> Self {
        self.values.push((key, value.to_string()));
        self
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

/// 设备整体状态
pub fn device_status(record: &DiagnosticsRecord, port: &str, frame_id: &str) -> SubsystemStatus {
    let system = record.status.system_status;
    let info = &record.device_information;

    let (level, message) = if system.system_failure() {
        (HealthLevel::Error, "System Failure")
    } else if system.serial_port_overflow_alarm() {
        (HealthLevel::Warn, "Serial Port Overflow")
    } else {
        (HealthLevel::Ok, "IMU is OK")
    };

    SubsystemStatus::new("device", level, message)
        .with_value("Device", port)
        .with_value("TF frame", frame_id)
        .with_value(
            "Running time",
            format!("{:.6}", record.running_time.as_secs_f64()),
        )
        .with_value("Device ID", info.device_id)
        .with_value("Software Version", info.software_version_string())
        .with_value("Hardware Revision", info.hardware_revision_string())
        .with_value("Serial Number", info.serial_number_hex())
}

fn sensor_status(
    name: &'static str,
    failure: bool,
    over_range: bool,
    messages: [&'static str; 3],
) -> SubsystemStatus {
    let [failure_msg, over_range_msg, ok_msg] = messages;
    if failure {
        SubsystemStatus::new(name, HealthLevel::Error, failure_msg)
    } else if over_range {
        SubsystemStatus::new(name, HealthLevel::Warn, over_range_msg)
    } else {
        SubsystemStatus::new(name, HealthLevel::Ok, ok_msg)
    }
}

pub fn accelerometer_status(record: &DiagnosticsRecord) -> SubsystemStatus {
    let system = record.status.system_status;
    sensor_status(
        "accelerometer",
        system.accelerometer_sensor_failure(),
        system.accelerometer_over_range(),
        [
            "Accelerometer Sensor Failure",
            "Accelerometer Over Range",
            "Accelerometer OK",
        ],
    )
}

pub fn gyroscope_status(record: &DiagnosticsRecord) -> SubsystemStatus {
    let system = record.status.system_status;
    sensor_status(
        "gyroscope",
        system.gyroscope_sensor_failure(),
        system.gyroscope_over_range(),
        [
            "Gyroscope Sensor Failure",
            "Gyroscope Over Range",
            "Gyroscope OK",
        ],
    )
}

pub fn magnetometer_status(record: &DiagnosticsRecord) -> SubsystemStatus {
    let system = record.status.system_status;
    sensor_status(
        "magnetometer",
        system.magnetometer_sensor_failure(),
        system.magnetometer_over_range(),
        [
            "Magnetometer Sensor Failure",
            "Magnetometer Over Range",
            "Magnetometer OK",
        ],
    )
}

pub fn temperature_status(record: &DiagnosticsRecord) -> SubsystemStatus {
    let system = record.status.system_status;
    if system.minimum_temperature_alarm() {
        SubsystemStatus::new("temperature", HealthLevel::Warn, "Minimum Temperature Alarm")
    } else if system.maximum_temperature_alarm() {
        SubsystemStatus::new("temperature", HealthLevel::Warn, "Maximum Temperature Alarm")
    } else {
        SubsystemStatus::new("temperature", HealthLevel::Ok, "Temperature OK")
    }
}

pub fn voltage_status(record: &DiagnosticsRecord) -> SubsystemStatus {
    let system = record.status.system_status;
    if system.low_voltage_alarm() {
        SubsystemStatus::new("voltage", HealthLevel::Warn, "Low Voltage Alarm")
    } else if system.high_voltage_alarm() {
        SubsystemStatus::new("voltage", HealthLevel::Warn, "High Voltage Alarm")
    } else {
        SubsystemStatus::new("voltage", HealthLevel::Ok, "Voltage OK")
    }
}

pub fn filter_status(record: &DiagnosticsRecord) -> SubsystemStatus {
    let filter = record.status.filter_status;
    let (level, message) = if filter.orientation_filter_initialised() {
        (HealthLevel::Ok, "Filter OK")
    } else {
        (HealthLevel::Error, "Filter Not Initialised")
    };

    SubsystemStatus::new("filter", level, message)
        .with_value("Heading Initialised", yes_no(filter.heading_initialised()))
        .with_value("Magnetometers Enabled", yes_no(filter.magnetic_heading_enabled()))
        .with_value(
            "Velocity Heading Enabled",
            yes_no(filter.velocity_heading_enabled()),
        )
        .with_value(
            "External Position Active",
            yes_no(filter.external_position_active()),
        )
        .with_value(
            "External Velocity Active",
            yes_no(filter.external_velocity_active()),
        )
        .with_value(
            "External Heading Active",
            yes_no(filter.external_heading_active()),
        )
        .with_value("GNSS Fix Type", filter.gnss_fix_type().value())
}

/// 完整健康报告
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DiagnosticsReport {
    /// 是否已收到过真实数据；为 false 时各子系统状态来自默认值，不可信
    pub available: bool,
    pub subsystems: Vec<SubsystemStatus>,
}

impl DiagnosticsReport {
    pub fn from_record(record: &DiagnosticsRecord, port: &str, frame_id: &str) -> Self {
        Self {
            available: record.is_available(),
            subsystems: vec![
                device_status(record, port, frame_id),
                accelerometer_status(record),
                gyroscope_status(record),
                magnetometer_status(record),
                temperature_status(record),
                voltage_status(record),
                filter_status(record),
            ],
        }
    }

    /// 最严重的子系统等级（无数据时为 WARN）
    pub fn overall(&self) -> HealthLevel {
        if !self.available {
            return HealthLevel::Warn;
        }
        self.subsystems
            .iter()
            .map(|s| s.level)
            .max()
            .unwrap_or(HealthLevel::Ok)
    }

    pub fn subsystem(&self, name: &str) -> Option<&SubsystemStatus> {
        self.subsystems.iter().find(|s| s.name == name)
    }
}

impl fmt::Display for DiagnosticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.available {
            writeln!(f, "(no diagnostics received yet)")?;
        }
        for subsystem in &self.subsystems {
            writeln!(
                f,
                "[{:<5}] {:<13} {}",
                subsystem.level, subsystem.name, subsystem.message
            )?;
            for (key, value) in &subsystem.values {
                writeln!(f, "        {:<26} {}", key, value)?;
            }
        }
        Ok(())
    }
}
