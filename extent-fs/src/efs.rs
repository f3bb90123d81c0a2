//! # 文件系统层
//!
//! 从众所周知的第 1 块装载超级块并缓存，此后只读。
//! inode 不做缓存：每次查找都重新从磁盘读取，调用者持有的是副本。

use alloc::sync::Arc;
use alloc::vec::Vec;

use block_dev::BlockDevice;

use crate::layout::{
    Bitmap, DIR_ENTRIES_PER_BLOCK, DirEntry, DiskInode, INODES_PER_BLOCK, SuperBlock,
};
use crate::{BLOCK_SIZE, DataBlock, Error, ROOT_INODE_ID, Result, SECTORS_PER_BLOCK, SUPER_BLOCK};

pub(crate) fn read_block(
    block_device: &dyn BlockDevice,
    block_id: usize,
    block: &mut DataBlock,
) -> Result<()> {
    block_device.read_sectors(block_id * SECTORS_PER_BLOCK, block)?;
    Ok(())
}

pub(crate) fn write_block(
    block_device: &dyn BlockDevice,
    block_id: usize,
    block: &DataBlock,
) -> Result<()> {
    block_device.write_sectors(block_id * SECTORS_PER_BLOCK, block)?;
    Ok(())
}

/// 按块大小分配清零的暂存缓冲区，分配失败时报错而非中止
pub(crate) fn scratch(blocks: usize) -> Result<Vec<u8>> {
    let len = blocks.checked_mul(BLOCK_SIZE).ok_or(Error::OutOfMemory)?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| {
        log::error!("failed to allocate {len} bytes of scratch space");
        Error::OutOfMemory
    })?;
    buf.resize(len, 0);
    Ok(buf)
}

#[derive(Debug)]
pub struct ExtentFileSystem {
    block_device: Arc<dyn BlockDevice>,
    super_block: SuperBlock,
}

impl ExtentFileSystem {
    /// 读取并校验超级块
    pub fn open(block_device: Arc<dyn BlockDevice>) -> Result<Self> {
        let mut block = [0; BLOCK_SIZE];
        read_block(&*block_device, SUPER_BLOCK as usize, &mut block)?;
        let super_block = SuperBlock::decode(&block)?;

        if !super_block.validate() {
            log::error!("invalid superblock: {super_block:?}");
            return Err(Error::Corrupted);
        }
        log::debug!("loaded superblock: {super_block:?}");

        Ok(Self {
            block_device,
            super_block,
        })
    }

    #[inline]
    pub fn super_block(&self) -> &SuperBlock {
        &self.super_block
    }

    #[inline]
    pub fn block_device(&self) -> &Arc<dyn BlockDevice> {
        &self.block_device
    }

    pub fn inode_bitmap(&self) -> Bitmap {
        Bitmap::new(
            self.super_block.first_inode_bitmap_block,
            self.super_block.inode_bitmap_blocks,
        )
    }

    pub fn data_bitmap(&self) -> Bitmap {
        Bitmap::new(
            self.super_block.first_data_bitmap_block,
            self.super_block.data_bitmap_blocks,
        )
    }

    /// 读取保存 0、1 号 inode 的那一块，取出根目录
    pub fn root_inode(&self) -> Result<DiskInode> {
        let mut block = [0; BLOCK_SIZE];
        read_block(
            &*self.block_device,
            self.super_block.first_inode_block as usize,
            &mut block,
        )?;

        let offset = ROOT_INODE_ID as usize * DiskInode::SIZE;
        let root = DiskInode::decode(&block[offset..])?;
        if root.id != ROOT_INODE_ID || !root.is_dir() {
            log::error!("slot 1 does not hold the root directory: {root:?}");
            return Err(Error::Corrupted);
        }
        Ok(root)
    }

    /// 逐块扫描 inode 表，线性查找`id`匹配的记录
    pub fn inode_by_id(&self, id: u32) -> Result<DiskInode> {
        let first = self.super_block.first_inode_block as usize;
        let mut block = [0; BLOCK_SIZE];
        for block_id in first..first + self.super_block.inode_blocks as usize {
            log::trace!("scan inode block {block_id} for id={id}");
            read_block(&*self.block_device, block_id, &mut block)?;

            for record in block.chunks_exact(DiskInode::SIZE).take(INODES_PER_BLOCK) {
                let inode = DiskInode::decode(record)?;
                if !inode.is_null() && inode.id == id {
                    return Ok(inode);
                }
            }
        }

        log::debug!("inode {id} not found");
        Err(Error::NotFound)
    }

    /// 把文件数据按 extent 顺序装入`dest`，每段 extent 一次扇区读取。
    ///
    /// `dest`至少要容纳`ceil(size_bytes / BLOCK_SIZE)`块；
    /// `size_bytes`之后的尾部内容无意义。返回文件字节数。
    pub fn load_file(&self, inode: &DiskInode, dest: &mut [u8]) -> Result<usize> {
        let needed = inode.data_blocks();
        if dest.len() < needed * BLOCK_SIZE {
            return Err(Error::BufferTooSmall);
        }

        let mut loaded = 0;
        for run in inode.runs() {
            let start = loaded * BLOCK_SIZE;
            let end = start + run.length as usize * BLOCK_SIZE;
            self.block_device
                .read_sectors(run.first_block as usize * SECTORS_PER_BLOCK, &mut dest[start..end])?;
            loaded += run.length as usize;
        }

        if loaded < needed {
            log::error!("inode {} covers {loaded} of {needed} blocks", inode.id);
            return Err(Error::Corrupted);
        }

        Ok(inode.size_bytes as usize)
    }

    /// 读出整个文件，长度恰为`size_bytes`
    pub fn read_file(&self, inode: &DiskInode) -> Result<Vec<u8>> {
        let mut data = scratch(inode.data_blocks())?;
        let size = self.load_file(inode, &mut data)?;
        data.truncate(size);
        Ok(data)
    }

    /// 目录项，至第一个`id == 0`为止
    pub fn read_dir(&self, dir: &DiskInode) -> Result<Vec<DirEntry>> {
        if !dir.is_dir() {
            return Err(Error::NotADirectory);
        }

        let mut data = scratch(dir.data_blocks())?;
        self.load_file(dir, &mut data)?;

        let slots = (dir.size_bytes as usize / DirEntry::SIZE)
            .min(dir.data_blocks() * DIR_ENTRIES_PER_BLOCK);
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(slots)
            .map_err(|_| Error::OutOfMemory)?;

        for record in data.chunks_exact(DirEntry::SIZE).take(slots) {
            let dirent = DirEntry::decode(record)?;
            if dirent.is_end() {
                break;
            }
            entries.push(dirent);
        }

        Ok(entries)
    }

    /// 在目录中线性查找名为`name`的项
    pub fn find_entry(&self, dir: &DiskInode, name: &str) -> Result<Option<DirEntry>> {
        Ok(self
            .read_dir(dir)?
            .into_iter()
            .find(|dirent| dirent.is_named(name)))
    }
}
