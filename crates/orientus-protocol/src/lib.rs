//! # Orientus Protocol
//!
//! Orientus IMU 的 AN 串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: 数据包 ID 常量定义
//! - `checksum`: 帧头 LRC 与负载 CRC16-CCITT
//! - `decoder`: 字节流 → `RawFrame` 的流式解码器
//! - `packets`: 设备上报数据包解析（`DecodedPacket`）
//! - `requests`: 下发请求构建（`OutboundRequest`）
//!
//! ## 线格式
//!
//! ```text
//! [0xAC][LRC][id: u8][len: u8][crc16: u16 LE][payload: len 字节]
//! ```
//!
//! 负载内所有多字节字段均为小端序（Little Endian），浮点数为 IEEE-754 `f32`。

pub mod checksum;
pub mod decoder;
pub mod ids;
pub mod packets;
pub mod requests;

// 重新导出常用类型
pub use checksum::*;
pub use decoder::*;
pub use ids::*;
pub use packets::*;
pub use requests::*;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// 帧起始字节
pub const FRAME_SYNC: u8 = 0xAC;

/// 帧头长度：sync + LRC + id + len + crc16
pub const HEADER_LEN: usize = 6;

/// 单帧最大负载长度（长度字段为 u8）
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

/// 单帧最大线上长度
pub const MAX_FRAME_LEN: usize = HEADER_LEN + MAX_PAYLOAD_LEN;

/// 校验通过的一帧 AN 数据
///
/// 只由 [`FrameDecoder`] 在 LRC 与 CRC 都校验通过后产出，
/// 或由 [`OutboundRequest::to_frame`] 构建后发往设备。
///
/// ```text
/// FrameDecoder ──► RawFrame ──► DecodedPacket::try_from
/// OutboundRequest::to_frame ──► RawFrame ──► to_bytes() ──► 串口
/// ```
///
/// 负载使用 `Bytes` 存储，克隆只增加引用计数。
/// 负载只能经 [`RawFrame::new`] 设置，长度字节总是由负载本身得出。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// 数据包 ID
    pub id: u8,

    /// 负载数据（不超过 255 字节）
    payload: Bytes,
}

impl RawFrame {
    /// 创建帧，负载超过 255 字节时返回错误
    pub fn new(id: u8, payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLong {
                id,
                len: payload.len(),
            });
        }

        Ok(Self { id, payload })
    }

    /// 负载长度
    pub fn length(&self) -> u16 {
        self.payload.len() as u16
    }

    /// 负载切片
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// 负载 CRC16（写入帧头的值）
    pub fn crc(&self) -> u16 {
        crc16_ccitt(&self.payload)
    }

    /// 编码为线上字节（帧头 + 负载）
    pub fn to_bytes(&self) -> Vec<u8> {
        let crc = self.crc();
        let [crc_lo, crc_hi] = crc.to_le_bytes();
        let len = self.payload.len() as u8;

        let mut out = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        out.put_u8(FRAME_SYNC);
        out.put_u8(header_lrc(self.id, len, crc_lo, crc_hi));
        out.put_u8(self.id);
        out.put_u8(len);
        out.put_u16_le(crc);
        out.put_slice(&self.payload);
        out.to_vec()
    }
}

/// 协议层错误类型
///
/// 解码失败见 [`DecodeError`]，这里只包含构建/编码阶段的错误。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Payload too long for packet {id}: {len} bytes (max 255)")]
    PayloadTooLong { id: u8, len: usize },

    #[error("Too many packet period entries: {count} (max {max})")]
    TooManyPeriodEntries { count: usize, max: usize },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: &'static str, value: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_frame_new() {
        let frame = RawFrame::new(ID_REQUEST, vec![3u8]).unwrap();
        assert_eq!(frame.id, 1);
        assert_eq!(frame.length(), 1);
        assert_eq!(frame.payload(), &[3]);
    }

    #[test]
    fn test_raw_frame_payload_too_long() {
        let result = RawFrame::new(ID_PACKET_PERIODS, vec![0u8; 256]);
        assert_eq!(
            result,
            Err(ProtocolError::PayloadTooLong { id: 181, len: 256 })
        );
    }

    #[test]
    fn test_raw_frame_max_payload() {
        let frame = RawFrame::new(ID_PACKET_PERIODS, vec![0u8; 255]).unwrap();
        assert_eq!(frame.to_bytes().len(), MAX_FRAME_LEN);
    }

    #[test]
    fn test_to_bytes_layout() {
        let frame = RawFrame::new(ID_REQUEST, vec![ID_DEVICE_INFORMATION]).unwrap();
        let bytes = frame.to_bytes();
        let crc = crc16_ccitt(&[ID_DEVICE_INFORMATION]);

        assert_eq!(bytes.len(), HEADER_LEN + 1);
        assert_eq!(bytes[0], FRAME_SYNC);
        assert_eq!(bytes[2], ID_REQUEST);
        assert_eq!(bytes[3], 1);
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), crc);
        assert_eq!(bytes[1], header_lrc(bytes[2], bytes[3], bytes[4], bytes[5]));
        assert_eq!(bytes[6], ID_DEVICE_INFORMATION);
    }

    #[test]
    fn test_length_byte_follows_payload() {
        let frame = RawFrame::new(ID_EULER_ORIENTATION, vec![0x11u8; 12]).unwrap();
        let bytes = frame.to_bytes();

        assert_eq!(frame.length(), 12);
        assert_eq!(bytes[3] as usize, frame.payload().len());
        assert_eq!(bytes.len(), HEADER_LEN + frame.payload().len());

        let mut decoder = FrameDecoder::new();
        let frames: Vec<_> = decoder.feed(&bytes).collect();
        assert_eq!(frames, vec![frame]);
    }

    #[test]
    fn test_empty_payload() {
        let frame = RawFrame::new(ID_REQUEST, Bytes::new()).unwrap();
        let bytes = frame.to_bytes();
        assert_eq!(bytes.len(), HEADER_LEN);
        // 空负载的 CRC 为初值
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), 0xFFFF);
    }
}
