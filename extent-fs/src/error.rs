use block_dev::DeviceError;
use derive_more::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[display(fmt = "{}", _0)]
    Device(DeviceError),
    #[display(fmt = "out of memory")]
    OutOfMemory,
    #[display(fmt = "not found")]
    NotFound,
    #[display(fmt = "is a directory")]
    IsADirectory,
    #[display(fmt = "not a directory")]
    NotADirectory,
    #[display(fmt = "invalid path")]
    InvalidPath,
    #[display(fmt = "invalid name")]
    InvalidName,
    #[display(fmt = "already exists")]
    AlreadyExists,
    /// 磁盘上的结构自相矛盾
    #[display(fmt = "corrupted filesystem")]
    Corrupted,
    #[display(fmt = "buffer too small")]
    BufferTooSmall,
    /// 计算出的数量超出字段宽度
    #[display(fmt = "layout overflow")]
    Overflow,
    #[display(fmt = "bootloader too short")]
    BootloaderTooShort,
    #[display(fmt = "bootloader too large")]
    BootloaderTooLarge,
    #[display(fmt = "bad file descriptor")]
    BadDescriptor,
    #[display(fmt = "too many open files")]
    TooManyOpenFiles,
    #[display(fmt = "read-only filesystem")]
    ReadOnly,
    /// 布局缺少根目录，或与注册的节点对不上
    #[display(fmt = "invalid layout")]
    InvalidLayout,
    /// 调用者提供的输出拒绝写入
    #[display(fmt = "output error")]
    Output,
}

pub type Result<T> = core::result::Result<T, Error>;

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Self::Device(e)
    }
}

impl From<core::fmt::Error> for Error {
    fn from(_: core::fmt::Error) -> Self {
        Self::Output
    }
}

impl From<binrw::Error> for Error {
    fn from(e: binrw::Error) -> Self {
        log::error!("codec: {e}");
        Self::Corrupted
    }
}
