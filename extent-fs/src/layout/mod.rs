//! # 磁盘数据结构层
//!
//! extent-fs 的磁盘布局：
//! 引导块 | 超级块 | 索引节点位图 | 数据块位图 | 索引节点区域 | 数据块区域
//!
//! 所有记录都按显式的小端布局编解码，字段顺序与填充都写在类型里，
//! 镜像构建器与内核读取端共用同一份定义。

/// 为定长记录生成`SIZE`、`decode`与`encode`
macro_rules! impl_record {
    ($ty:ty, $size:expr) => {
        impl $ty {
            /// 记录在磁盘上的字节数
            pub const SIZE: usize = $size;

            pub fn decode(bytes: &[u8]) -> $crate::Result<Self> {
                let bytes = bytes.get(..Self::SIZE).ok_or($crate::Error::BufferTooSmall)?;
                let record =
                    <Self as binrw::BinRead>::read(&mut binrw::io::Cursor::new(bytes))?;
                Ok(record)
            }

            pub fn encode(&self, bytes: &mut [u8]) -> $crate::Result<()> {
                let bytes = bytes
                    .get_mut(..Self::SIZE)
                    .ok_or($crate::Error::BufferTooSmall)?;
                binrw::BinWrite::write(self, &mut binrw::io::Cursor::new(bytes))?;
                Ok(())
            }
        }
    };
}

mod super_block;
pub use super_block::{Region, SuperBlock};

mod bitmap;
pub use bitmap::Bitmap;

mod inode;
pub use inode::{DateTime, DiskInode, Extent, FileType};

/// 目录项，也属于磁盘文件系统数据结构
mod dir_entry;
pub use dir_entry::DirEntry;

use crate::BLOCK_SIZE;

pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / DiskInode::SIZE;
pub const DIR_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DirEntry::SIZE;
