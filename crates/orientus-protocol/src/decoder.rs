//! 流式帧解码器
//!
//! 串口是无边界的字节流，一帧数据可能被拆到多次读取里，
//! 也可能混入上电噪声或半帧残留。`FrameDecoder` 只保存尚未消费的字节，
//! 每次 `feed` 后返回一个惰性迭代器，逐帧产出校验通过的 [`RawFrame`]。
//!
//! # 重同步
//!
//! - 非 `0xAC` 字节：丢弃，计入 `discarded_bytes`
//! - LRC 或 CRC 校验失败：从下一个字节重新寻找帧头，计入 `desyncs`
//! - 帧不完整：保留在缓冲区，等待下一次 `feed`
//! - 流结束（`finish`）：不完整的帧头之后若还有完整的有效帧，视为伪帧头跳过
//!
//! 校验失败属于串口链路上的正常噪声，不会向上层返回错误。

use crate::{FRAME_SYNC, HEADER_LEN, MAX_FRAME_LEN, RawFrame, crc16_ccitt, header_lrc};
use bytes::{Buf, Bytes, BytesMut};
use tracing::trace;

/// 解码缓冲区初始容量（10 个最大帧）
pub const DECODER_BUFFER_CAPACITY: usize = 10 * MAX_FRAME_LEN;

/// 单次 `feed` 的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    /// 产出的帧数
    pub frames: u64,
    /// 帧头或负载校验失败次数
    pub desyncs: u64,
    /// 寻找帧头时丢弃的字节数
    pub discarded_bytes: u64,
}

/// AN 帧解码器
///
/// # Example
///
/// ```
/// use orientus_protocol::{FrameDecoder, OutboundRequest, PacketId};
///
/// let bytes = OutboundRequest::request(&[PacketId::DeviceInformation])
///     .to_frame()
///     .unwrap()
///     .to_bytes();
///
/// let mut decoder = FrameDecoder::new();
/// // 前半帧：尚不完整
/// assert_eq!(decoder.feed(&bytes[..4]).count(), 0);
/// // 后半帧：产出一帧
/// let frames: Vec<_> = decoder.feed(&bytes[4..]).collect();
/// assert_eq!(frames.len(), 1);
/// assert_eq!(decoder.buffered_len(), 0);
/// ```
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(DECODER_BUFFER_CAPACITY),
        }
    }

    /// 追加字节并返回本次可解出的帧
    ///
    /// 返回的迭代器被 drop 时，已消费的字节从缓冲区移除；
    /// 未迭代完的帧会在下一次 `feed` 时继续产出。
    pub fn feed(&mut self, bytes: &[u8]) -> Frames<'_> {
        self.buffer.extend_from_slice(bytes);
        Frames {
            buffer: &mut self.buffer,
            cursor: 0,
            stats: FeedStats::default(),
            at_eof: false,
        }
    }

    /// 字节流已结束，产出缓冲区中剩余的帧
    ///
    /// 噪声里 LRC 恰好合法的帧头会声明一个很长的负载，
    /// `feed` 会一直等它凑齐；流结束后不会再有字节到来，
    /// 此时若它后面还有完整的有效帧，就把它当作校验失败跳过。
    /// 真正被截断的尾部帧仍留在缓冲区中。
    pub fn finish(&mut self) -> Frames<'_> {
        Frames {
            buffer: &mut self.buffer,
            cursor: 0,
            stats: FeedStats::default(),
            at_eof: true,
        }
    }

    /// 缓冲区中尚未消费的字节数
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// 丢弃缓冲区中的半帧数据（关闭时调用）
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// `FrameDecoder::feed` 返回的惰性帧序列
pub struct Frames<'a> {
    buffer: &'a mut BytesMut,
    cursor: usize,
    stats: FeedStats,
    at_eof: bool,
}

/// `buf` 开头是否为一个完整且校验通过的帧
fn starts_with_frame(buf: &[u8]) -> bool {
    if buf.len() < HEADER_LEN || buf[0] != FRAME_SYNC {
        return false;
    }
    let (lrc, id, len, crc_lo, crc_hi) = (buf[1], buf[2], buf[3], buf[4], buf[5]);
    let total = HEADER_LEN + len as usize;
    header_lrc(id, len, crc_lo, crc_hi) == lrc
        && buf.len() >= total
        && crc16_ccitt(&buf[HEADER_LEN..total]) == u16::from_le_bytes([crc_lo, crc_hi])
}

impl Frames<'_> {
    /// 到目前为止的统计（迭代完再读取才是完整值）
    pub fn stats(&self) -> FeedStats {
        self.stats
    }
}

impl Iterator for Frames<'_> {
    type Item = RawFrame;

    fn next(&mut self) -> Option<RawFrame> {
        loop {
            let avail = &self.buffer[self.cursor..];
            if avail.is_empty() {
                return None;
            }

            if avail[0] != FRAME_SYNC {
                // 跳到下一个可能的帧头
                let skip = avail
                    .iter()
                    .position(|&b| b == FRAME_SYNC)
                    .unwrap_or(avail.len());
                self.cursor += skip;
                self.stats.discarded_bytes += skip as u64;
                continue;
            }

            if avail.len() < HEADER_LEN {
                return None;
            }

            let (lrc, id, len, crc_lo, crc_hi) = (avail[1], avail[2], avail[3], avail[4], avail[5]);
            if header_lrc(id, len, crc_lo, crc_hi) != lrc {
                trace!("Header LRC mismatch at offset {}, resyncing", self.cursor);
                self.stats.desyncs += 1;
                self.cursor += 1;
                continue;
            }

            let total = HEADER_LEN + len as usize;
            if avail.len() < total {
                if self.at_eof && (1..avail.len()).any(|i| starts_with_frame(&avail[i..])) {
                    trace!(
                        "Truncated header at offset {} hides a later frame, resyncing",
                        self.cursor
                    );
                    self.stats.desyncs += 1;
                    self.cursor += 1;
                    continue;
                }
                // 帧不完整，等待更多字节
                return None;
            }

            let payload = &avail[HEADER_LEN..total];
            let crc = u16::from_le_bytes([crc_lo, crc_hi]);
            if crc16_ccitt(payload) != crc {
                trace!(
                    "Payload CRC mismatch for packet {} at offset {}, resyncing",
                    id, self.cursor
                );
                self.stats.desyncs += 1;
                self.cursor += 1;
                continue;
            }

            let frame = RawFrame {
                id,
                payload: Bytes::copy_from_slice(payload),
            };
            self.cursor += total;
            self.stats.frames += 1;
            return Some(frame);
        }
    }
}

impl Drop for Frames<'_> {
    fn drop(&mut self) {
        self.buffer.advance(self.cursor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::*;

    fn encoded(id: u8, payload: &[u8]) -> Vec<u8> {
        RawFrame::new(id, payload.to_vec()).unwrap().to_bytes()
    }

    #[test]
    fn test_single_frame() {
        let bytes = encoded(ID_EULER_ORIENTATION, &[0u8; 12]);
        let mut decoder = FrameDecoder::new();
        let frames: Vec<_> = decoder.feed(&bytes).collect();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].id, ID_EULER_ORIENTATION);
        assert_eq!(frames[0].length(), 12);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_byte_by_byte() {
        let bytes = encoded(ID_RUNNING_TIME, &[1, 2, 3, 4, 5, 6, 7, 8]);
        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();

        for b in &bytes {
            frames.extend(decoder.feed(std::slice::from_ref(b)));
        }

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_leading_garbage_is_skipped() {
        let mut bytes = vec![0x00, 0x11, 0x22, 0x33];
        bytes.extend(encoded(ID_STATUS, &[0, 0, 1, 0]));

        let mut decoder = FrameDecoder::new();
        let mut frames = decoder.feed(&bytes);
        let frame = frames.next().unwrap();
        assert!(frames.next().is_none());

        assert_eq!(frame.id, ID_STATUS);
        let stats = frames.stats();
        assert_eq!(stats.discarded_bytes, 4);
        assert_eq!(stats.desyncs, 0);
        assert_eq!(stats.frames, 1);
    }

    #[test]
    fn test_bad_lrc_resyncs() {
        let mut bad = encoded(ID_ACCELERATION, &[0u8; 12]);
        bad[1] ^= 0x01;
        let good = encoded(ID_ACCELERATION, &[1u8; 12]);

        let mut bytes = bad;
        bytes.extend(&good);

        let mut decoder = FrameDecoder::new();
        let mut frames = decoder.feed(&bytes);
        let collected: Vec<_> = frames.by_ref().collect();
        let stats = frames.stats();

        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].payload(), &[1u8; 12]);
        assert!(stats.desyncs >= 1);
    }

    #[test]
    fn test_bad_crc_resyncs() {
        let mut bad = encoded(ID_ANGULAR_VELOCITY, &[7u8; 12]);
        let last = bad.len() - 1;
        bad[last] ^= 0xFF;
        let good = encoded(ID_ANGULAR_VELOCITY, &[9u8; 12]);

        let mut bytes = bad;
        bytes.extend(&good);

        let mut decoder = FrameDecoder::new();
        let mut frames = decoder.feed(&bytes);
        let collected: Vec<_> = frames.by_ref().collect();

        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].payload(), &[9u8; 12]);
        assert!(frames.stats().desyncs >= 1);
    }

    #[test]
    fn test_incomplete_frame_is_buffered() {
        let bytes = encoded(ID_RAW_SENSORS, &[0u8; 48]);
        let mut decoder = FrameDecoder::new();

        assert_eq!(decoder.feed(&bytes[..20]).count(), 0);
        assert_eq!(decoder.buffered_len(), 20);

        assert_eq!(decoder.feed(&bytes[20..]).count(), 1);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_partial_iteration_is_restartable() {
        let mut bytes = encoded(ID_EULER_ORIENTATION, &[1u8; 12]);
        bytes.extend(encoded(ID_QUATERNION_ORIENTATION, &[2u8; 16]));

        let mut decoder = FrameDecoder::new();
        {
            let mut frames = decoder.feed(&bytes);
            assert_eq!(frames.next().unwrap().id, ID_EULER_ORIENTATION);
        }

        let rest: Vec<_> = decoder.feed(&[]).collect();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, ID_QUATERNION_ORIENTATION);
    }

    #[test]
    fn test_bogus_header_inside_garbage() {
        // 伪造一个 LRC 合法但 CRC 错误的帧头，随后是真实帧
        let fake_crc: u16 = 0x1234;
        let [lo, hi] = fake_crc.to_le_bytes();
        let mut bytes = vec![FRAME_SYNC, header_lrc(ID_STATUS, 4, lo, hi), ID_STATUS, 4, lo, hi];
        bytes.extend(encoded(ID_STATUS, &[0, 0, 0, 0]));

        let mut decoder = FrameDecoder::new();
        let mut frames = decoder.feed(&bytes);
        let collected: Vec<_> = frames.by_ref().collect();

        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].id, ID_STATUS);
        assert!(frames.stats().desyncs >= 1);
    }

    #[test]
    fn test_finish_skips_stalled_header() {
        // LRC 合法的伪帧头声明 200 字节负载，后面只跟了一个真实帧
        let fake_crc: u16 = 0x1234;
        let [lo, hi] = fake_crc.to_le_bytes();
        let mut bytes = vec![FRAME_SYNC, header_lrc(ID_STATUS, 200, lo, hi), ID_STATUS, 200, lo, hi];
        let good = encoded(ID_EULER_ORIENTATION, &[3u8; 12]);
        bytes.extend(&good);

        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.feed(&bytes).count(), 0);
        assert_eq!(decoder.buffered_len(), bytes.len());

        let mut frames = decoder.finish();
        let collected: Vec<_> = frames.by_ref().collect();
        let stats = frames.stats();
        drop(frames);

        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].payload(), &[3u8; 12]);
        assert_eq!(stats.desyncs, 1);
        assert_eq!(stats.discarded_bytes, 5);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_finish_keeps_truncated_tail() {
        let mut bytes = encoded(ID_EULER_ORIENTATION, &[1u8; 12]);
        let tail = encoded(ID_RAW_SENSORS, &[0u8; 48]);
        bytes.extend(&tail[..20]);

        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.feed(&bytes).count(), 1);
        assert_eq!(decoder.finish().count(), 0);
        assert_eq!(decoder.buffered_len(), 20);
    }

    #[test]
    fn test_clear_discards_partial_frame() {
        let bytes = encoded(ID_DEVICE_INFORMATION, &[0u8; 24]);
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.feed(&bytes[..10]).count(), 0);

        decoder.clear();
        assert_eq!(decoder.buffered_len(), 0);
        assert_eq!(decoder.feed(&bytes[10..]).count(), 0);
    }
}
