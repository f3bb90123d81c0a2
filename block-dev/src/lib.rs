//! # 块设备接口层
//!
//! 块设备以**扇区**为单位传输数据，[`BlockDevice`] 是对读写扇区的抽象，
//! 实现了此特质的类型称为**块设备驱动**。
//!
//! 所有读写都是同步阻塞的，出错时立即返回，本层不做重试。

#![no_std]

use core::any::Any;
use core::fmt::{self, Debug, Display};

/// The device-transfer unit. Every buffer handed to a driver is a multiple of this size.
pub const SECTOR_SIZE: usize = 512;

/// 块设备驱动特质
pub trait BlockDevice: Send + Sync + Any + Debug {
    /// 从`start_sector`开始读取`buf.len() / SECTOR_SIZE`个扇区
    fn read_sectors(&self, start_sector: usize, buf: &mut [u8]) -> Result<(), DeviceError>;

    /// 从`start_sector`开始写入`buf.len() / SECTOR_SIZE`个扇区
    fn write_sectors(&self, start_sector: usize, buf: &[u8]) -> Result<(), DeviceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// 扇区号超出设备容量
    OutOfRange,
    /// 缓冲区长度不是扇区大小的整数倍
    Unaligned,
    /// 实际传输的字节数少于请求
    ShortTransfer,
    /// 底层硬件或宿主文件出错
    Io,
}

impl Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            DeviceError::OutOfRange => "sector out of range",
            DeviceError::Unaligned => "buffer is not sector aligned",
            DeviceError::ShortTransfer => "short transfer",
            DeviceError::Io => "device I/O error",
        };
        f.write_str(msg)
    }
}

/// 检查缓冲区能否按整扇区传输，返回扇区数
#[inline]
pub fn sector_count(buf_len: usize) -> Result<usize, DeviceError> {
    if buf_len % SECTOR_SIZE != 0 {
        return Err(DeviceError::Unaligned);
    }
    Ok(buf_len / SECTOR_SIZE)
}
