//! 帧校验
//!
//! - 帧头 LRC：`((id + len + crc_lo + crc_hi) ^ 0xFF) + 1`，按 u8 回绕
//! - 负载 CRC：CRC16-CCITT（多项式 0x1021，初值 0xFFFF，无反射，无末尾异或）

const CRC16_POLY: u16 = 0x1021;
const CRC16_INIT: u16 = 0xFFFF;

/// 编译期生成的 CRC16-CCITT 查表
const CRC16_TABLE: [u16; 256] = build_crc16_table();

const fn build_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ CRC16_POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// 计算负载的 CRC16-CCITT
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    data.iter().fold(CRC16_INIT, |crc, &byte| {
        (crc << 8) ^ CRC16_TABLE[(((crc >> 8) as u8) ^ byte) as usize]
    })
}

/// 计算帧头 LRC
pub fn header_lrc(id: u8, len: u8, crc_lo: u8, crc_hi: u8) -> u8 {
    (id.wrapping_add(len).wrapping_add(crc_lo).wrapping_add(crc_hi) ^ 0xFF).wrapping_add(1)
}
