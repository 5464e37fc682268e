//! 下发请求构建
//!
//! 所有请求都是纯函数编码，不做任何 IO。

use crate::ids::*;
use crate::packets::{PacketPeriod, PacketPeriodTable, PacketPeriods, PacketTimerPeriod};
use crate::{MAX_PAYLOAD_LEN, ProtocolError, RawFrame};
use bytes::{BufMut, BytesMut};
use smallvec::SmallVec;

/// 热启动复位校验字
pub const RESET_VERIFICATION_HOT_START: u32 = 0x2105_7A7E;

/// 冷启动复位校验字
pub const RESET_VERIFICATION_COLD_START: u32 = 0x9A5D_38B7;

/// 零位对齐校验字
pub const ZERO_ALIGNMENT_VERIFICATION: u32 = 0x9A4E_8055;

/// 启动时的数据包定时器周期（微秒/tick，即 1 kHz）
pub const STARTUP_TIMER_PERIOD_US: u16 = 1000;

/// 高速数据包周期（tick，50 Hz）
pub const FAST_PACKET_PERIOD: u32 = 20;

/// 低速数据包周期（tick，5 Hz）
pub const SLOW_PACKET_PERIOD: u32 = 200;

/// 复位类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResetKind {
    /// 热启动：重启滤波器，保留配置
    #[default]
    HotStart,
    /// 冷启动：同时清除星历等缓存
    ColdStart,
}

impl ResetKind {
    pub fn verification(self) -> u32 {
        match self {
            ResetKind::HotStart => RESET_VERIFICATION_HOT_START,
            ResetKind::ColdStart => RESET_VERIFICATION_COLD_START,
        }
    }
}

impl PacketTimerPeriod {
    /// 转换为 AN 帧
    pub fn to_frame(&self) -> RawFrame {
        let mut data = BytesMut::with_capacity(Self::LEN);
        data.put_u8(self.permanent as u8);
        data.put_u8(self.utc_synchronisation as u8);
        data.put_u16_le(self.period);

        RawFrame {
            id: ID_PACKET_TIMER_PERIOD,
            payload: data.freeze(),
        }
    }
}

impl PacketPeriods {
    /// 转换为 AN 帧
    ///
    /// 只编码结束标记之前的表项，结束标记本身不上线。
    pub fn to_frame(&self) -> Result<RawFrame, ProtocolError> {
        let count = self.active_entries().count();
        if count > Self::MAX_ENTRIES {
            return Err(ProtocolError::TooManyPeriodEntries {
                count,
                max: Self::MAX_ENTRIES,
            });
        }

        let mut data = BytesMut::with_capacity(Self::HEADER_LEN + count * PacketPeriod::LEN);
        data.put_u8(self.permanent as u8);
        data.put_u8(self.clear_existing_packets as u8);
        for entry in self.active_entries() {
            data.put_u8(entry.packet_id);
            data.put_u32_le(entry.period);
        }

        RawFrame::new(ID_PACKET_PERIODS, data.freeze())
    }
}

/// 下发请求
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutboundRequest {
    /// 请求设备立即发送指定数据包
    Request(SmallVec<[u8; 8]>),
    /// 设置数据包定时器周期
    PacketTimerPeriod(PacketTimerPeriod),
    /// 设置数据包周期表
    PacketPeriods(PacketPeriods),
    /// 复位设备
    Reset(ResetKind),
    /// 以当前姿态为零位
    ZeroAlignment { permanent: bool },
}

impl OutboundRequest {
    /// 请求若干数据包
    pub fn request(ids: &[PacketId]) -> Self {
        OutboundRequest::Request(ids.iter().map(|&id| u8::from(id)).collect())
    }

    /// 数据包 ID
    pub fn id(&self) -> PacketId {
        match self {
            OutboundRequest::Request(_) => PacketId::Request,
            OutboundRequest::PacketTimerPeriod(_) => PacketId::PacketTimerPeriod,
            OutboundRequest::PacketPeriods(_) => PacketId::PacketPeriods,
            OutboundRequest::Reset(_) => PacketId::Reset,
            OutboundRequest::ZeroAlignment { .. } => PacketId::ZeroAlignment,
        }
    }

    /// 转换为 AN 帧
    pub fn to_frame(&self) -> Result<RawFrame, ProtocolError> {
        match self {
            OutboundRequest::Request(ids) => {
                if ids.len() > MAX_PAYLOAD_LEN {
                    return Err(ProtocolError::PayloadTooLong {
                        id: ID_REQUEST,
                        len: ids.len(),
                    });
                }
                RawFrame::new(ID_REQUEST, ids.to_vec())
            },
            OutboundRequest::PacketTimerPeriod(timer) => Ok(timer.to_frame()),
            OutboundRequest::PacketPeriods(periods) => periods.to_frame(),
            OutboundRequest::Reset(kind) => {
                RawFrame::new(ID_RESET, kind.verification().to_le_bytes().to_vec())
            },
            OutboundRequest::ZeroAlignment { permanent } => {
                let mut data = BytesMut::with_capacity(5);
                data.put_u8(*permanent as u8);
                data.put_u32_le(ZERO_ALIGNMENT_VERIFICATION);
                RawFrame::new(ID_ZERO_ALIGNMENT, data.freeze())
            },
        }
    }
}

impl From<PacketTimerPeriod> for OutboundRequest {
    fn from(timer: PacketTimerPeriod) -> Self {
        OutboundRequest::PacketTimerPeriod(timer)
    }
}

impl From<PacketPeriods> for OutboundRequest {
    fn from(periods: PacketPeriods) -> Self {
        OutboundRequest::PacketPeriods(periods)
    }
}

/// 将请求编码为一帧
pub fn encode(request: &OutboundRequest) -> Result<RawFrame, ProtocolError> {
    request.to_frame()
}

/// 驱动使用的数据包周期表
///
/// 六种高速数据包 50 Hz，状态 / 运行时间 5 Hz，共 8 项，末尾为结束标记。
/// 设备信息不在表中：内容不变，由 [`startup_requests`] 的首个请求取一次即可，
/// 诊断聚合也不会清除它。
pub fn default_packet_periods() -> PacketPeriodTable {
    let fast = [
        PacketId::QuaternionStdDev,
        PacketId::QuaternionOrientation,
        PacketId::Acceleration,
        PacketId::AngularVelocity,
        PacketId::RawSensors,
        PacketId::EulerOrientation,
    ];
    let slow = [PacketId::Status, PacketId::RunningTime];

    fast.into_iter()
        .map(|id| PacketPeriod::new(id, FAST_PACKET_PERIOD))
        .chain(slow.into_iter().map(|id| PacketPeriod::new(id, SLOW_PACKET_PERIOD)))
        .chain(std::iter::once(PacketPeriod::sentinel()))
        .collect()
}

/// 启动时依次下发的配置
///
/// 1. 请求设备信息
/// 2. 定时器周期 1000 µs
/// 3. 清除原有配置并写入 `periods`（不写 Flash）
pub fn startup_requests(periods: PacketPeriodTable) -> Vec<OutboundRequest> {
    vec![
        OutboundRequest::request(&[PacketId::DeviceInformation]),
        OutboundRequest::PacketTimerPeriod(PacketTimerPeriod {
            permanent: false,
            utc_synchronisation: false,
            period: STARTUP_TIMER_PERIOD_US,
        }),
        OutboundRequest::PacketPeriods(PacketPeriods {
            permanent: false,
            clear_existing_packets: true,
            periods,
        }),
    ]
}
