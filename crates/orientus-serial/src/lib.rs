//! # Orientus Serial Adapter Layer
//!
//! 串口硬件抽象层，提供统一的字节流读写接口。
//!
//! - `tty`: POSIX 串口（termios 原始模式 + poll 读超时），仅 unix
//! - `mock`: 基于通道的模拟串口（`mock` feature），用于无硬件测试

use std::time::Duration;
use thiserror::Error;

// 重新导出 orientus-protocol 中的 RawFrame
pub use orientus_protocol::RawFrame;

#[cfg(all(unix, feature = "tty"))]
pub mod tty;

#[cfg(all(unix, feature = "tty"))]
pub use tty::TtyAdapter;

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockSerialAdapter, MockSerialHandle};

/// 默认波特率（Orientus 出厂设置）
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// 串口适配层统一错误类型
#[derive(Error, Debug)]
pub enum SerialError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] SerialDeviceError),
    #[error("Read timeout")]
    Timeout,
    #[error("Device disconnected")]
    Disconnected,
}

impl SerialError {
    /// 是否为不可恢复错误（需要终止读取循环）
    pub fn is_fatal(&self) -> bool {
        match self {
            SerialError::Io(e) => !matches!(
                e.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            SerialError::Device(e) => e.is_fatal(),
            SerialError::Timeout => false,
            SerialError::Disconnected => true,
        }
    }
}

/// 设备错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialDeviceErrorKind {
    Unknown,
    NotFound,
    NoDevice,
    AccessDenied,
    Busy,
    UnsupportedConfig,
}

#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct SerialDeviceError {
    pub kind: SerialDeviceErrorKind,
    pub message: String,
}

impl SerialDeviceError {
    pub fn new(kind: SerialDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            SerialDeviceErrorKind::NoDevice
                | SerialDeviceErrorKind::AccessDenied
                | SerialDeviceErrorKind::NotFound
        )
    }
}

impl From<String> for SerialDeviceError {
    fn from(message: String) -> Self {
        Self::new(SerialDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for SerialDeviceError {
    fn from(message: &str) -> Self {
        Self::new(SerialDeviceErrorKind::Unknown, message)
    }
}

/// 串口适配器
///
/// 读取以字节为单位，不做任何分帧；分帧由 `FrameDecoder` 负责。
pub trait SerialAdapter {
    /// 读取可用字节，最多阻塞到读超时
    ///
    /// 超时返回 `Ok(0)`，这不是错误。
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError>;

    /// 写入全部字节
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError>;

    /// 设置读超时
    fn set_read_timeout(&mut self, _timeout: Duration) {}

    /// 编码并发送一帧
    fn send_frame(&mut self, frame: &RawFrame) -> Result<(), SerialError> {
        self.write_all(&frame.to_bytes())
    }
}

impl<T: SerialAdapter + ?Sized> SerialAdapter for Box<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        (**self).read(buf)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        (**self).write_all(bytes)
    }

    fn set_read_timeout(&mut self, timeout: Duration) {
        (**self).set_read_timeout(timeout)
    }
}
