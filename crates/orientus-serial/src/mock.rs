//! 基于通道的模拟串口
//!
//! `MockSerialAdapter` 交给驱动的 IO 线程，测试代码通过 `MockSerialHandle`
//! 注入待读取的字节或错误，并取回驱动写出的字节。
//! 所有 handle 被 drop 且队列读空后，读取返回 `SerialError::Disconnected`。

use crate::{SerialAdapter, SerialError};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::collections::VecDeque;
use std::time::Duration;

enum MockRead {
    Bytes(Vec<u8>),
    Error(SerialError),
}

/// 模拟串口（读取端）
pub struct MockSerialAdapter {
    rx: Receiver<MockRead>,
    tx_log: Sender<Vec<u8>>,
    pending: VecDeque<u8>,
    read_timeout: Duration,
}

/// 模拟串口的测试控制端
#[derive(Clone)]
pub struct MockSerialHandle {
    tx: Sender<MockRead>,
    tx_log: Receiver<Vec<u8>>,
}

impl MockSerialAdapter {
    /// 创建模拟串口及其控制端
    pub fn new() -> (Self, MockSerialHandle) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let (log_tx, log_rx) = crossbeam_channel::unbounded();
        (
            Self {
                rx,
                tx_log: log_tx,
                pending: VecDeque::new(),
                read_timeout: Duration::from_millis(5),
            },
            MockSerialHandle { tx, tx_log: log_rx },
        )
    }

    /// 用一组预置数据块创建（控制端已 drop，读完即断开）
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        let (adapter, handle) = Self::new();
        for chunk in chunks {
            handle.push_bytes(&chunk);
        }
        adapter
    }
}

impl SerialAdapter for MockSerialAdapter {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        if self.pending.is_empty() {
            match self.rx.recv_timeout(self.read_timeout) {
                Ok(MockRead::Bytes(bytes)) => self.pending.extend(bytes),
                Ok(MockRead::Error(e)) => return Err(e),
                Err(RecvTimeoutError::Timeout) => return Ok(0),
                Err(RecvTimeoutError::Disconnected) => return Err(SerialError::Disconnected),
            }
        }

        let n = self.pending.len().min(buf.len());
        for (dst, src) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        // 控制端已 drop 时写出的数据无人关心，直接丢弃
        let _ = self.tx_log.send(bytes.to_vec());
        Ok(())
    }

    fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }
}

impl MockSerialHandle {
    /// 注入待读取字节
    pub fn push_bytes(&self, bytes: &[u8]) {
        let _ = self.tx.send(MockRead::Bytes(bytes.to_vec()));
    }

    /// 注入一次读取错误
    pub fn push_error(&self, error: SerialError) {
        let _ = self.tx.send(MockRead::Error(error));
    }

    /// 取回驱动已写出的所有数据（每次 `write_all` 一项）
    pub fn take_written(&self) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            match self.tx_log.try_recv() {
                Ok(bytes) => out.push(bytes),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }

    /// 等待下一次写出（带超时）
    pub fn wait_written(&self, timeout: Duration) -> Option<Vec<u8>> {
        self.tx_log.recv_timeout(timeout).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_in_small_buffers() {
        let (mut adapter, handle) = MockSerialAdapter::new();
        handle.push_bytes(&[1, 2, 3, 4, 5]);

        let mut buf = [0u8; 2];
        assert_eq!(adapter.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(adapter.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [3, 4]);
        assert_eq!(adapter.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 5);
    }

    #[test]
    fn test_empty_read_times_out() {
        let (mut adapter, _handle) = MockSerialAdapter::new();
        adapter.set_read_timeout(Duration::from_millis(1));
        let mut buf = [0u8; 8];
        assert_eq!(adapter.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_disconnected_after_handle_drop() {
        let mut adapter = MockSerialAdapter::from_chunks(vec![vec![9u8]]);
        let mut buf = [0u8; 8];
        assert_eq!(adapter.read(&mut buf).unwrap(), 1);
        assert!(matches!(adapter.read(&mut buf), Err(SerialError::Disconnected)));
    }

    #[test]
    fn test_injected_error() {
        let (mut adapter, handle) = MockSerialAdapter::new();
        handle.push_error(SerialError::Timeout);
        let mut buf = [0u8; 8];
        assert!(matches!(adapter.read(&mut buf), Err(SerialError::Timeout)));
    }

    #[test]
    fn test_written_bytes_are_logged() {
        let (mut adapter, handle) = MockSerialAdapter::new();
        adapter.write_all(&[0xAC, 1]).unwrap();
        adapter.write_all(&[2]).unwrap();
        assert_eq!(handle.take_written(), vec![vec![0xAC, 1], vec![2]]);
        assert!(handle.take_written().is_empty());
    }
}
