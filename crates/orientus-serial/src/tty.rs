//! POSIX 串口适配器
//!
//! 以原始模式（8N1，无流控，无回显）打开 tty 设备，
//! 读超时使用 `poll` 实现，超时返回 `Ok(0)`。

use crate::{SerialAdapter, SerialDeviceError, SerialDeviceErrorKind, SerialError};
use nix::fcntl::OFlag;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::termios::{self, BaudRate, ControlFlags, FlushArg, SetArg, SpecialCharacterIndices};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsFd;
use std::os::unix::fs::OpenOptionsExt;
use std::time::Duration;
use tracing::{debug, trace};

/// 默认读超时
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// tty 串口适配器
pub struct TtyAdapter {
    file: File,
    path: String,
    read_timeout: Duration,
}

impl TtyAdapter {
    /// 打开并配置串口
    ///
    /// # 错误
    /// - `SerialDeviceErrorKind::NotFound`: 设备不存在
    /// - `SerialDeviceErrorKind::AccessDenied`: 无权限（通常需要加入 dialout 组）
    /// - `SerialDeviceErrorKind::UnsupportedConfig`: 不支持的波特率
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, SerialError> {
        let baud = to_baud_rate(baud_rate)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(OFlag::O_NOCTTY.bits())
            .open(path)
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => SerialError::Device(SerialDeviceError::new(
                    SerialDeviceErrorKind::NotFound,
                    path,
                )),
                ErrorKind::PermissionDenied => SerialError::Device(SerialDeviceError::new(
                    SerialDeviceErrorKind::AccessDenied,
                    format!("{}: {}", path, e),
                )),
                _ => SerialError::Io(e),
            })?;

        let mut tio = termios::tcgetattr(&file).map_err(std::io::Error::from)?;
        termios::cfmakeraw(&mut tio);
        termios::cfsetspeed(&mut tio, baud).map_err(std::io::Error::from)?;
        tio.control_flags |= ControlFlags::CLOCAL | ControlFlags::CREAD;
        tio.control_flags &= !(ControlFlags::CSTOPB | ControlFlags::PARENB);
        // 非阻塞语义交给 poll，read 立即返回已有数据
        tio.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
        tio.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        termios::tcsetattr(&file, SetArg::TCSANOW, &tio).map_err(std::io::Error::from)?;
        termios::tcflush(&file, FlushArg::TCIOFLUSH).map_err(std::io::Error::from)?;

        debug!("Opened serial port {} at {} baud", path, baud_rate);

        Ok(Self {
            file,
            path: path.to_string(),
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    /// 设备路径
    pub fn path(&self) -> &str {
        &self.path
    }
}

fn to_baud_rate(rate: u32) -> Result<BaudRate, SerialError> {
    let baud = match rate {
        9_600 => BaudRate::B9600,
        19_200 => BaudRate::B19200,
        38_400 => BaudRate::B38400,
        57_600 => BaudRate::B57600,
        115_200 => BaudRate::B115200,
        230_400 => BaudRate::B230400,
        #[cfg(target_os = "linux")]
        460_800 => BaudRate::B460800,
        #[cfg(target_os = "linux")]
        921_600 => BaudRate::B921600,
        other => {
            return Err(SerialError::Device(SerialDeviceError::new(
                SerialDeviceErrorKind::UnsupportedConfig,
                format!("unsupported baud rate {}", other),
            )));
        },
    };
    Ok(baud)
}

impl SerialAdapter for TtyAdapter {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        let timeout_ms = self.read_timeout.as_millis().min(65535) as u16;
        let mut fds = [PollFd::new(self.file.as_fd(), PollFlags::POLLIN)];

        match poll(&mut fds, PollTimeout::from(timeout_ms)) {
            Ok(0) => return Ok(0),
            Ok(_) => {},
            Err(nix::errno::Errno::EINTR) => return Ok(0),
            Err(e) => return Err(SerialError::Io(std::io::Error::from(e))),
        }

        let revents = fds[0].revents().unwrap_or(PollFlags::empty());
        if revents.intersects(PollFlags::POLLHUP | PollFlags::POLLERR | PollFlags::POLLNVAL)
            && !revents.contains(PollFlags::POLLIN)
        {
            return Err(SerialError::Disconnected);
        }

        match self.file.read(buf) {
            // poll 报告可读但读到 0 字节：设备已拔出
            Ok(0) => Err(SerialError::Disconnected),
            Ok(n) => {
                trace!("Read {} bytes from {}", n, self.path);
                Ok(n)
            },
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => Ok(0),
            Err(e) => Err(SerialError::Io(e)),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        self.file.write_all(bytes)?;
        self.file.flush()?;
        Ok(())
    }

    fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }
}
