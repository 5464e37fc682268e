//! 驱动层错误类型定义

use orientus_protocol::ProtocolError;
use orientus_serial::SerialError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口不可恢复地失败（设备拔出、IO 错误）
    #[error("Transport failure: {0}")]
    Transport(#[from] SerialError),

    /// 请求编码失败
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 命令通道已关闭（IO 线程退出）
    #[error("Command channel closed")]
    ChannelClosed,

    /// 命令通道已满（缓冲区容量 10）
    #[error("Command channel full (buffer size: 10)")]
    ChannelFull,

    /// 驱动已经停止（重复调用 `shutdown()`）
    #[error("Driver already stopped")]
    AlreadyStopped,

    /// 操作超时
    #[error("Operation timeout")]
    Timeout,

    /// IO 线程 panic 或未能在限定时间内退出
    #[error("IO thread panicked or failed to stop")]
    ThreadPanicked,
}

impl DriverError {
    /// 是否为传输层失败（pipeline 因此终止）
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, DriverError::Transport(_))
    }
}
