//! PacketDispatcher：把解码后的数据包写入 `SensorState`
//!
//! 每种数据包对应一次穷举 match；新增数据包种类时编译器会提示这里缺少分支。

use crate::state::{PacketKind, SensorState};
use orientus_protocol::*;
use tracing::{debug, trace, warn};

/// 设备拒绝了一条请求（非零应答码）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommandRejected {
    /// 被拒绝的请求 ID
    pub packet_id: u8,
    /// 被拒绝请求的 CRC
    pub packet_crc: u16,
    pub result: AcknowledgeResult,
}

impl std::fmt::Display for CommandRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "packet {} (crc 0x{:04X}) rejected: {:?}",
            self.packet_id, self.packet_crc, self.result
        )
    }
}

/// 分发结果
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// 写入了对应的 slot
    Stored(PacketKind),
    /// 设备接受了一条请求
    Acknowledged(Acknowledge),
    /// 设备拒绝了一条请求，`SensorState` 未被修改
    Rejected(CommandRejected),
    /// 合法但不参与同步的数据包（配置回读）
    Ignored(PacketId),
}

/// 将一个数据包写入状态
pub fn dispatch(packet: DecodedPacket, state: &mut SensorState) -> DispatchOutcome {
    let kind = match packet {
        DecodedPacket::Acknowledge(ack) => return dispatch_acknowledge(ack),
        DecodedPacket::PacketTimerPeriod(_) | DecodedPacket::PacketPeriods(_) => {
            trace!("Ignoring configuration readback {:?}", packet.id());
            return DispatchOutcome::Ignored(packet.id());
        },
        DecodedPacket::Status(p) => {
            state.status.store(p);
            PacketKind::Status
        },
        DecodedPacket::RunningTime(p) => {
            state.running_time.store(p);
            PacketKind::RunningTime
        },
        DecodedPacket::DeviceInformation(p) => {
            state.device_information.store(p);
            PacketKind::DeviceInformation
        },
        DecodedPacket::QuaternionStdDev(p) => {
            state.quaternion_std_dev.store(p);
            PacketKind::QuaternionStdDev
        },
        DecodedPacket::EulerOrientation(p) => {
            state.euler_orientation.store(p);
            PacketKind::EulerOrientation
        },
        DecodedPacket::QuaternionOrientation(p) => {
            state.quaternion_orientation.store(p);
            PacketKind::QuaternionOrientation
        },
        DecodedPacket::Acceleration(p) => {
            state.acceleration.store(p);
            PacketKind::Acceleration
        },
        DecodedPacket::AngularVelocity(p) => {
            state.angular_velocity.store(p);
            PacketKind::AngularVelocity
        },
        DecodedPacket::RawSensors(p) => {
            state.raw_sensors.store(p);
            PacketKind::RawSensors
        },
    };
    trace!("Stored {:?}", kind);
    DispatchOutcome::Stored(kind)
}

fn dispatch_acknowledge(ack: Acknowledge) -> DispatchOutcome {
    if ack.is_success() {
        debug!("Packet {} acknowledged", ack.packet_id);
        DispatchOutcome::Acknowledged(ack)
    } else {
        let rejected = CommandRejected {
            packet_id: ack.packet_id,
            packet_crc: ack.packet_crc,
            result: ack.result,
        };
        warn!("Command rejected: {}", rejected);
        DispatchOutcome::Rejected(rejected)
    }
}
