//! 磁盘 inode
//!
//! 每个 inode 最多记录 [`EXTENTS_PER_INODE`] 段连续的数据块，
//! 按数组顺序消费，直到累计块数覆盖`size_bytes`。
//! `single_indirect_block`只占位，遍历逻辑不使用。

use binrw::binrw;

use crate::geometry::{bytes_to_blocks, bytes_to_sectors};
use crate::EXTENTS_PER_INODE;

/// 一段连续的数据块
#[binrw]
#[brw(little)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    /// 绝对块号
    pub first_block: u32,
    /// 块数，不是字节数也不是扇区数
    pub length: u32,
}

impl_record!(Extent, 8);

impl Extent {
    #[inline]
    pub const fn new(first_block: u32, length: u32) -> Self {
        Self {
            first_block,
            length,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

#[binrw]
#[brw(little, repr = u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    #[default]
    File = 0,
    Directory = 1,
}

/// 创建时间
#[binrw]
#[brw(little)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    pub hour: u8,
    pub minute: u8,
    pub day: u8,
    pub month: u8,
    pub year: u16,
    _pad: u8,
}

impl_record!(DateTime, 7);

impl DateTime {
    #[inline]
    pub const fn new(hour: u8, minute: u8, day: u8, month: u8, year: u16) -> Self {
        Self {
            hour,
            minute,
            day,
            month,
            year,
            _pad: 0,
        }
    }
}

#[binrw]
#[brw(little)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiskInode {
    /// ID，0 表示空槽位
    pub id: u32,
    pub file_type: FileType,
    pub size_bytes: u32,
    pub size_sectors: u32,
    pub extents: [Extent; EXTENTS_PER_INODE],
    /// 保留
    pub single_indirect_block: u32,
    pub datetime: DateTime,
    /// 打开计数的提示
    pub reference_number: u16,
    _padding: [u8; 6],
}

impl_record!(DiskInode, 64);

impl DiskInode {
    /// 数据只占一段 extent 的文件
    pub fn new_file(id: u32, size_bytes: u32, extent: Extent, datetime: DateTime) -> Self {
        Self::with_extent(id, FileType::File, size_bytes, extent, datetime)
    }

    pub fn new_dir(id: u32, size_bytes: u32, extent: Extent, datetime: DateTime) -> Self {
        Self::with_extent(id, FileType::Directory, size_bytes, extent, datetime)
    }

    fn with_extent(
        id: u32,
        file_type: FileType,
        size_bytes: u32,
        extent: Extent,
        datetime: DateTime,
    ) -> Self {
        let mut extents = [Extent::default(); EXTENTS_PER_INODE];
        extents[0] = extent;

        Self {
            id,
            file_type,
            size_bytes,
            // u32 字节数换算成扇区数不会变大
            size_sectors: bytes_to_sectors(size_bytes as u64) as u32,
            extents,
            datetime,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    /// `id == 0`的 inode 从不代表有效文件
    #[inline]
    pub fn is_null(&self) -> bool {
        self.id == 0
    }

    /// 容纳`size_bytes`需要多少个数据块
    #[inline]
    pub fn data_blocks(&self) -> usize {
        bytes_to_blocks(self.size_bytes as u64) as usize
    }

    /// 按数组顺序给出真正承载数据的块段，最后一段会被裁到恰好覆盖`size_bytes`。
    ///
    /// 若 extent 总长不足，迭代会提前结束，由调用者比较累计块数。
    pub fn runs(&self) -> impl Iterator<Item = Extent> + '_ {
        let mut remaining = self.data_blocks();
        self.extents.iter().map_while(move |extent| {
            if remaining == 0 || extent.is_empty() {
                return None;
            }
            let length = (extent.length as usize).min(remaining);
            remaining -= length;
            Some(Extent::new(extent.first_block, length as u32))
        })
    }
}
