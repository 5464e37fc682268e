//! 传感器状态存储
//!
//! 每种参与同步的数据包对应一个 [`Slot`]：最近一次的值 + 自上次提交以来是否更新过（dirty）。
//! `SensorState` 只属于 pipeline 线程，由 dispatcher 写入、synchronizer 读取并清除 dirty，
//! 对外只通过 `ArcSwap` 发布的快照暴露。

use crate::dispatch::CommandRejected;
use crate::metrics::OrientusMetrics;
use crate::records::DiagnosticsRecord;
use arc_swap::ArcSwap;
use orientus_protocol::*;
use std::sync::Arc;

/// 参与同步的数据包种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PacketKind {
    Status = 0,
    RunningTime = 1,
    DeviceInformation = 2,
    QuaternionStdDev = 3,
    EulerOrientation = 4,
    QuaternionOrientation = 5,
    Acceleration = 6,
    AngularVelocity = 7,
    RawSensors = 8,
}

impl PacketKind {
    pub const ALL: [PacketKind; 9] = [
        PacketKind::Status,
        PacketKind::RunningTime,
        PacketKind::DeviceInformation,
        PacketKind::QuaternionStdDev,
        PacketKind::EulerOrientation,
        PacketKind::QuaternionOrientation,
        PacketKind::Acceleration,
        PacketKind::AngularVelocity,
        PacketKind::RawSensors,
    ];

    /// 数据包种类（应答与配置回读不参与同步，返回 `None`）
    pub fn of(packet: &DecodedPacket) -> Option<Self> {
        let kind = match packet {
            DecodedPacket::Status(_) => PacketKind::Status,
            DecodedPacket::RunningTime(_) => PacketKind::RunningTime,
            DecodedPacket::DeviceInformation(_) => PacketKind::DeviceInformation,
            DecodedPacket::QuaternionStdDev(_) => PacketKind::QuaternionStdDev,
            DecodedPacket::EulerOrientation(_) => PacketKind::EulerOrientation,
            DecodedPacket::QuaternionOrientation(_) => PacketKind::QuaternionOrientation,
            DecodedPacket::Acceleration(_) => PacketKind::Acceleration,
            DecodedPacket::AngularVelocity(_) => PacketKind::AngularVelocity,
            DecodedPacket::RawSensors(_) => PacketKind::RawSensors,
            DecodedPacket::Acknowledge(_)
            | DecodedPacket::PacketTimerPeriod(_)
            | DecodedPacket::PacketPeriods(_) => return None,
        };
        Some(kind)
    }

    /// 对应的数据包 ID
    pub fn packet_id(self) -> PacketId {
        match self {
            PacketKind::Status => PacketId::Status,
            PacketKind::RunningTime => PacketId::RunningTime,
            PacketKind::DeviceInformation => PacketId::DeviceInformation,
            PacketKind::QuaternionStdDev => PacketId::QuaternionStdDev,
            PacketKind::EulerOrientation => PacketId::EulerOrientation,
            PacketKind::QuaternionOrientation => PacketId::QuaternionOrientation,
            PacketKind::Acceleration => PacketId::Acceleration,
            PacketKind::AngularVelocity => PacketId::AngularVelocity,
            PacketKind::RawSensors => PacketId::RawSensors,
        }
    }

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// 数据包种类集合（位掩码，Bit N 对应 `PacketKind as u8 == N`）
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct KindSet(u16);

impl KindSet {
    pub const EMPTY: KindSet = KindSet(0);

    pub const fn of(kinds: &[PacketKind]) -> Self {
        let mut mask = 0u16;
        let mut i = 0;
        while i < kinds.len() {
            mask |= kinds[i].bit();
            i += 1;
        }
        KindSet(mask)
    }

    pub fn insert(&mut self, kind: PacketKind) {
        self.0 |= kind.bit();
    }

    pub fn contains(self, kind: PacketKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// `other` 中的种类是否全部在本集合中
    pub fn contains_all(self, other: KindSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = PacketKind> {
        PacketKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl std::fmt::Debug for KindSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// 单个数据包的存储槽
#[derive(Debug, Clone)]
pub struct Slot<T> {
    value: Option<T>,
    dirty: bool,
}

impl<T> Slot<T> {
    /// 覆盖值并标记为 dirty
    pub fn store(&mut self, value: T) {
        self.value = Some(value);
        self.dirty = true;
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 只清除 dirty，保留值
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            value: None,
            dirty: false,
        }
    }
}

/// 传感器状态（所有 dirty 初始为 false）
#[derive(Debug, Clone, Default)]
pub struct SensorState {
    pub status: Slot<Status>,
    pub running_time: Slot<RunningTime>,
    pub device_information: Slot<DeviceInformation>,
    pub quaternion_std_dev: Slot<QuaternionStdDev>,
    pub euler_orientation: Slot<EulerOrientation>,
    pub quaternion_orientation: Slot<QuaternionOrientation>,
    pub acceleration: Slot<Acceleration>,
    pub angular_velocity: Slot<AngularVelocity>,
    pub raw_sensors: Slot<RawSensors>,
}

impl SensorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dirty(&self, kind: PacketKind) -> bool {
        match kind {
            PacketKind::Status => self.status.is_dirty(),
            PacketKind::RunningTime => self.running_time.is_dirty(),
            PacketKind::DeviceInformation => self.device_information.is_dirty(),
            PacketKind::QuaternionStdDev => self.quaternion_std_dev.is_dirty(),
            PacketKind::EulerOrientation => self.euler_orientation.is_dirty(),
            PacketKind::QuaternionOrientation => self.quaternion_orientation.is_dirty(),
            PacketKind::Acceleration => self.acceleration.is_dirty(),
            PacketKind::AngularVelocity => self.angular_velocity.is_dirty(),
            PacketKind::RawSensors => self.raw_sensors.is_dirty(),
        }
    }

    pub fn clear_dirty(&mut self, kind: PacketKind) {
        match kind {
            PacketKind::Status => self.status.clear_dirty(),
            PacketKind::RunningTime => self.running_time.clear_dirty(),
            PacketKind::DeviceInformation => self.device_information.clear_dirty(),
            PacketKind::QuaternionStdDev => self.quaternion_std_dev.clear_dirty(),
            PacketKind::EulerOrientation => self.euler_orientation.clear_dirty(),
            PacketKind::QuaternionOrientation => self.quaternion_orientation.clear_dirty(),
            PacketKind::Acceleration => self.acceleration.clear_dirty(),
            PacketKind::AngularVelocity => self.angular_velocity.clear_dirty(),
            PacketKind::RawSensors => self.raw_sensors.clear_dirty(),
        }
    }

    /// 清除一组种类的 dirty
    pub fn clear_all(&mut self, kinds: KindSet) {
        for kind in kinds.iter() {
            self.clear_dirty(kind);
        }
    }

    /// 当前所有 dirty 种类
    pub fn dirty_set(&self) -> KindSet {
        let mut set = KindSet::EMPTY;
        for kind in PacketKind::ALL {
            if self.is_dirty(kind) {
                set.insert(kind);
            }
        }
        set
    }
}

/// 驱动上下文（pipeline 线程与调用方之间共享的只读快照）
///
/// pipeline 线程写入，其他线程通过 `load()` 无锁读取；`SensorState` 本身从不共享。
pub struct OrientusContext {
    /// 最近一次 Group C 刷新的诊断快照
    pub diagnostics: Arc<ArcSwap<DiagnosticsRecord>>,
    /// 最近一次被设备拒绝的请求
    pub last_rejection: ArcSwap<Option<CommandRejected>>,
    /// 运行指标
    pub metrics: Arc<OrientusMetrics>,
}

impl OrientusContext {
    pub fn new() -> Self {
        Self {
            diagnostics: Arc::new(ArcSwap::from_pointee(DiagnosticsRecord::default())),
            last_rejection: ArcSwap::from_pointee(None),
            metrics: Arc::new(OrientusMetrics::new()),
        }
    }
}

impl Default for OrientusContext {
    fn default() -> Self {
        Self::new()
    }
}
