//! # 布局计算
//!
//! 只依据各节点的字节数推出超级块的全部字段与每个节点的 extent，
//! 相同的输入总得到相同的布局。
//!
//! 区域顺序固定：引导块 | 超级块 | inode 位图 | 数据位图 | inode 表 | 数据块，
//! 每个区域紧接着上一个区域结束的位置开始。

use alloc::vec::Vec;
use core::iter;

use crate::layout::{DirEntry, DiskInode, Extent, SuperBlock};
use crate::{BLOCK_BITS, BLOCK_SIZE, Error, Result, SECTOR_SIZE};

/// inode 位图固定占一块
const INODE_BITMAP_BLOCKS: u64 = 1;

/// 字节数向上取整为块数，`bytes_to_blocks(0) == 0`
#[inline]
pub fn bytes_to_blocks(bytes: u64) -> u64 {
    bytes.div_ceil(BLOCK_SIZE as u64)
}

#[inline]
pub fn bytes_to_sectors(bytes: u64) -> u64 {
    bytes.div_ceil(SECTOR_SIZE as u64)
}

/// 容纳`bits`个位需要多少块位图
#[inline]
pub fn bits_to_blocks(bits: u64) -> u64 {
    bits.div_ceil(BLOCK_BITS as u64)
}

/// 一个节点在数据区的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub id: u32,
    pub size_bytes: u32,
    pub extent: Extent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub super_block: SuperBlock,
    /// 按 inode ID 排列，第一项为根目录
    pub placements: Vec<Placement>,
}

impl Layout {
    /// 所有文件都直接挂在根目录下的镜像
    pub fn for_files(file_sizes: &[u64]) -> Result<Self> {
        let root = Self::dir_bytes(file_sizes.len());
        let node_sizes: Vec<u64> = iter::once(root)
            .chain(file_sizes.iter().copied())
            .collect();
        Self::compute(&node_sizes)
    }

    /// 含`children`个子项的目录的字节数，`.`与`..`各占一项
    #[inline]
    pub fn dir_bytes(children: usize) -> u64 {
        (children as u64 + 2) * DirEntry::SIZE as u64
    }

    /// `node_sizes[i]`为第`i + 1`号 inode 的字节数，`node_sizes[0]`即根目录
    pub fn compute(node_sizes: &[u64]) -> Result<Self> {
        if node_sizes.is_empty() {
            return Err(Error::InvalidLayout);
        }

        let total_inodes = node_sizes.len() as u64;
        let inode_slots = total_inodes + 1;
        if inode_slots > INODE_BITMAP_BLOCKS * BLOCK_BITS as u64 {
            log::error!("{inode_slots} inodes do not fit in one bitmap block");
            return Err(Error::Overflow);
        }
        let inode_blocks = bytes_to_blocks(inode_slots * DiskInode::SIZE as u64);

        let node_blocks: Vec<u64> = node_sizes.iter().map(|&size| bytes_to_blocks(size)).collect();
        let data_blocks = node_blocks
            .iter()
            .try_fold(0u64, |sum, &blocks| sum.checked_add(blocks))
            .ok_or(Error::Overflow)?;
        let data_bitmap_blocks = bits_to_blocks(data_blocks);

        let super_block = SuperBlock::new(
            narrow(total_inodes)?,
            narrow(INODE_BITMAP_BLOCKS)?,
            narrow(data_bitmap_blocks)?,
            narrow(inode_blocks)?,
            narrow(data_blocks)?,
            narrow(inode_slots)?,
            narrow(data_blocks)?,
        )
        .ok_or(Error::Overflow)?;

        let mut cursor = super_block.first_data_block;
        let mut placements = Vec::with_capacity(node_sizes.len());
        for (index, (&size_bytes, &blocks)) in node_sizes.iter().zip(&node_blocks).enumerate() {
            // 总块数已确认不溢出，单个节点的块数也就放得进 u32
            let length = blocks as u32;
            placements.push(Placement {
                id: index as u32 + 1,
                size_bytes: narrow(size_bytes)?,
                extent: Extent::new(cursor, length),
            });
            cursor += length;
        }

        log::debug!("layout: {super_block:?}");
        Ok(Self {
            super_block,
            placements,
        })
    }

    #[inline]
    pub fn root(&self) -> &Placement {
        &self.placements[0]
    }

    /// 镜像总块数
    #[inline]
    pub fn total_blocks(&self) -> u32 {
        self.super_block.total_blocks()
    }

    #[inline]
    pub fn image_bytes(&self) -> u64 {
        self.total_blocks() as u64 * BLOCK_SIZE as u64
    }
}

fn narrow(value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::Overflow)
}
