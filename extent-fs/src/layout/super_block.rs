use core::ops::Range;

use binrw::binrw;
use derive_more::Display;

use crate::{BOOT_BLOCK, EXTENTS_PER_INODE, MAGIC, SUPER_BLOCK};

/// 超级块：
/// - 提供文件系统合法性校验；
/// - 定位其它连续区域
///
/// 所有块号都是镜像内的绝对块号，第 0 块为引导块。
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperBlock {
    /// inode 数（根目录 + 其余节点），不含保留的 0 号
    pub total_inodes: u32,
    pub inode_bitmap_blocks: u32,
    pub data_bitmap_blocks: u32,
    pub first_inode_bitmap_block: u32,
    pub first_data_bitmap_block: u32,
    pub first_inode_block: u32,
    pub first_data_block: u32,
    pub inode_blocks: u32,
    pub data_blocks: u32,
    pub extents_per_inode: u32,
    /// 仅为提示，构建后不再维护
    pub first_free_inode_bit: u32,
    pub first_free_data_bit: u32,
    /// 魔数：用于校验文件系统合法性
    signature: u32,
    _reserved: [u8; 12],
}

impl_record!(SuperBlock, 64);

/// 磁盘上的区域，按布局顺序排列
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    #[display(fmt = "boot block")]
    BootBlock,
    #[display(fmt = "superblock")]
    SuperBlock,
    #[display(fmt = "inode bitmap")]
    InodeBitmap,
    #[display(fmt = "data bitmap")]
    DataBitmap,
    #[display(fmt = "inode table")]
    InodeTable,
    #[display(fmt = "data blocks")]
    DataBlocks,
}

impl SuperBlock {
    /// 由各区域块数依次累加出起始块号
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        total_inodes: u32,
        inode_bitmap_blocks: u32,
        data_bitmap_blocks: u32,
        inode_blocks: u32,
        data_blocks: u32,
        first_free_inode_bit: u32,
        first_free_data_bit: u32,
    ) -> Option<Self> {
        let first_inode_bitmap_block = SUPER_BLOCK + 1;
        let first_data_bitmap_block = first_inode_bitmap_block.checked_add(inode_bitmap_blocks)?;
        let first_inode_block = first_data_bitmap_block.checked_add(data_bitmap_blocks)?;
        let first_data_block = first_inode_block.checked_add(inode_blocks)?;
        // 整个镜像的块数也必须能用 u32 表示
        first_data_block.checked_add(data_blocks)?;

        Some(Self {
            total_inodes,
            inode_bitmap_blocks,
            data_bitmap_blocks,
            first_inode_bitmap_block,
            first_data_bitmap_block,
            first_inode_block,
            first_data_block,
            inode_blocks,
            data_blocks,
            extents_per_inode: EXTENTS_PER_INODE as u32,
            first_free_inode_bit,
            first_free_data_bit,
            signature: MAGIC,
            _reserved: [0; 12],
        })
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.signature == MAGIC
    }

    /// 镜像总块数
    #[inline]
    pub fn total_blocks(&self) -> u32 {
        self.first_data_block + self.data_blocks
    }

    /// 磁盘上保存的 inode 槽位数，含保留的 0 号
    #[inline]
    pub fn inode_slots(&self) -> u32 {
        self.total_inodes + 1
    }

    pub fn regions(&self) -> [(Region, Range<u32>); 6] {
        let span = |start: u32, len: u32| start..start.saturating_add(len);
        [
            (Region::BootBlock, span(BOOT_BLOCK, 1)),
            (Region::SuperBlock, span(SUPER_BLOCK, 1)),
            (
                Region::InodeBitmap,
                span(self.first_inode_bitmap_block, self.inode_bitmap_blocks),
            ),
            (
                Region::DataBitmap,
                span(self.first_data_bitmap_block, self.data_bitmap_blocks),
            ),
            (
                Region::InodeTable,
                span(self.first_inode_block, self.inode_blocks),
            ),
            (
                Region::DataBlocks,
                span(self.first_data_block, self.data_blocks),
            ),
        ]
    }

    /// 魔数、extent 容量与区域顺序都吻合才算合法
    pub fn validate(&self) -> bool {
        if !self.is_valid() || self.extents_per_inode != EXTENTS_PER_INODE as u32 {
            return false;
        }

        let regions = self.regions();
        let contiguous = regions
            .windows(2)
            .all(|pair| pair[0].1.end == pair[1].1.start);
        let (_, data) = &regions[5];
        let fits = self.first_data_block.checked_add(self.data_blocks) == Some(data.end);
        let inodes_fit = (self.inode_slots() as u64) * super::DiskInode::SIZE as u64
            <= self.inode_blocks as u64 * crate::BLOCK_SIZE as u64;

        contiguous && fits && inodes_fit
    }
}
