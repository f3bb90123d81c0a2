//! # 镜像构建层
//!
//! 离线运行一次，按区域顺序把整张镜像写到块设备上：
//! 引导块 | 超级块 | 位图 | inode 表 | 数据块。
//! 每个节点在注册时依次获得 ID，根目录恒为 1 号。

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use block_dev::BlockDevice;
use derive_more::Display;

use crate::efs::{scratch, write_block};
use crate::geometry::Layout;
use crate::layout::{Bitmap, DateTime, DirEntry, DiskInode, INODES_PER_BLOCK};
use crate::{
    BLOCK_SIZE, BOOT_BLOCK, DataBlock, Error, ROOT_INODE_ID, Result, SECTOR_SIZE,
    SECTORS_PER_BLOCK, SUPER_BLOCK,
};

/// 引导程序的三段扇区数：第一、二段必须完整，第三段可以不满
const STAGE_SECTORS: [usize; 3] = [1, 1, SECTORS_PER_BLOCK - 2];

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    #[display(fmt = "layout")]
    Layout,
    #[display(fmt = "boot block")]
    BootBlock,
    #[display(fmt = "superblock")]
    SuperBlock,
    #[display(fmt = "bitmap")]
    Bitmap,
    #[display(fmt = "inodes")]
    Inodes,
    #[display(fmt = "data")]
    Data,
}

/// 构建失败时指明失败的阶段
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display(fmt = "{} stage failed: {}", stage, error)]
pub struct BuildError {
    pub stage: Stage,
    pub error: Error,
}

trait StageExt<T> {
    fn stage(self, stage: Stage) -> core::result::Result<T, BuildError>;
}

impl<T> StageExt<T> for Result<T> {
    fn stage(self, stage: Stage) -> core::result::Result<T, BuildError> {
        self.map_err(|error| {
            log::error!("{stage} stage failed: {error}");
            BuildError { stage, error }
        })
    }
}

#[derive(Debug)]
enum NodeKind<'a> {
    File(&'a [u8]),
    /// 子项的 ID，按注册顺序
    Dir(Vec<u32>),
}

#[derive(Debug)]
struct Node<'a> {
    name: String,
    parent: u32,
    kind: NodeKind<'a>,
}

impl Node<'_> {
    fn size_bytes(&self) -> u64 {
        match &self.kind {
            NodeKind::File(data) => data.len() as u64,
            NodeKind::Dir(children) => Layout::dir_bytes(children.len()),
        }
    }
}

#[derive(Debug)]
pub struct ImageBuilder<'a> {
    bootloader: &'a [u8],
    /// 第`i`项为第`i + 1`号 inode
    nodes: Vec<Node<'a>>,
    datetime: DateTime,
}

impl<'a> ImageBuilder<'a> {
    pub fn new(bootloader: &'a [u8]) -> Self {
        let root = Node {
            name: "/".to_string(),
            parent: ROOT_INODE_ID,
            kind: NodeKind::Dir(Vec::new()),
        };

        Self {
            bootloader,
            nodes: alloc::vec![root],
            datetime: DateTime::default(),
        }
    }

    /// 所有 inode 的创建时间
    pub fn datetime(mut self, datetime: DateTime) -> Self {
        self.datetime = datetime;
        self
    }

    /// 以宿主路径的最后一段为名，挂到根目录下
    pub fn add_path(&mut self, path: &str, data: &'a [u8]) -> Result<u32> {
        let basename = crate::path::file_name(path).ok_or(Error::InvalidName)?;
        self.add_file(ROOT_INODE_ID, basename, data)
    }

    pub fn add_file(&mut self, parent: u32, name: &str, data: &'a [u8]) -> Result<u32> {
        self.register(parent, name, NodeKind::File(data))
    }

    pub fn mkdir(&mut self, parent: u32, name: &str) -> Result<u32> {
        self.register(parent, name, NodeKind::Dir(Vec::new()))
    }

    /// 只依据已注册节点的大小计算布局
    pub fn plan(&self) -> core::result::Result<Layout, BuildError> {
        let node_sizes: Vec<u64> = self.nodes.iter().map(Node::size_bytes).collect();
        Layout::compute(&node_sizes).stage(Stage::Layout)
    }

    pub fn build(
        &self,
        block_device: &dyn BlockDevice,
    ) -> core::result::Result<Layout, BuildError> {
        let layout = self.plan()?;
        self.write(&layout, block_device)?;
        Ok(layout)
    }

    /// 按区域顺序写出整张镜像
    pub fn write(
        &self,
        layout: &Layout,
        block_device: &dyn BlockDevice,
    ) -> core::result::Result<(), BuildError> {
        if layout.placements.len() != self.nodes.len() {
            return Err(Error::InvalidLayout).stage(Stage::Layout);
        }
        let sb = &layout.super_block;

        log::info!("writing boot block");
        boot_block(self.bootloader)
            .and_then(|block| write_block(block_device, BOOT_BLOCK as usize, &block))
            .stage(Stage::BootBlock)?;

        log::info!("writing superblock");
        let mut block = [0; BLOCK_SIZE];
        sb.encode(&mut block)
            .and_then(|()| write_block(block_device, SUPER_BLOCK as usize, &block))
            .stage(Stage::SuperBlock)?;

        log::info!("writing bitmaps");
        Bitmap::new(sb.first_inode_bitmap_block, sb.inode_bitmap_blocks)
            .write_used(block_device, sb.inode_slots() as usize)
            .and_then(|()| {
                Bitmap::new(sb.first_data_bitmap_block, sb.data_bitmap_blocks)
                    .write_used(block_device, sb.data_blocks as usize)
            })
            .stage(Stage::Bitmap)?;

        log::info!("writing {} inodes", sb.total_inodes);
        self.write_inodes(layout, block_device).stage(Stage::Inodes)?;

        log::info!("writing {} data blocks", sb.data_blocks);
        self.write_data(layout, block_device).stage(Stage::Data)?;

        Ok(())
    }
}

impl<'a> ImageBuilder<'a> {
    fn register(&mut self, parent: u32, name: &str, kind: NodeKind<'a>) -> Result<u32> {
        DirEntry::check_name(name)?;
        if name == "." || name == ".." {
            return Err(Error::InvalidName);
        }

        let id = self.nodes.len() as u32 + 1;
        let parent_index = parent.checked_sub(1).ok_or(Error::NotFound)? as usize;

        let siblings = match self.nodes.get(parent_index).map(|node| &node.kind) {
            Some(NodeKind::Dir(children)) => children,
            Some(NodeKind::File(_)) => return Err(Error::NotADirectory),
            None => return Err(Error::NotFound),
        };
        if siblings
            .iter()
            .any(|&child| self.nodes[child as usize - 1].name == name)
        {
            return Err(Error::AlreadyExists);
        }

        self.nodes.push(Node {
            name: name.to_string(),
            parent,
            kind,
        });
        if let NodeKind::Dir(children) = &mut self.nodes[parent_index].kind {
            children.push(id);
        }

        log::debug!("registered {name:?} as inode {id} under {parent}");
        Ok(id)
    }

    fn write_inodes(&self, layout: &Layout, block_device: &dyn BlockDevice) -> Result<()> {
        let sb = &layout.super_block;

        // 0 号槽位全零
        let mut table = scratch(sb.inode_blocks as usize)?;
        for (node, placement) in self.nodes.iter().zip(&layout.placements) {
            let inode = match node.kind {
                NodeKind::File(_) => DiskInode::new_file(
                    placement.id,
                    placement.size_bytes,
                    placement.extent,
                    self.datetime,
                ),
                NodeKind::Dir(_) => DiskInode::new_dir(
                    placement.id,
                    placement.size_bytes,
                    placement.extent,
                    self.datetime,
                ),
            };
            let offset = placement.id as usize * DiskInode::SIZE;
            inode.encode(&mut table[offset..])?;
        }

        debug_assert!(self.nodes.len() < sb.inode_blocks as usize * INODES_PER_BLOCK);
        write_run(block_device, sb.first_inode_block, &table)
    }

    fn write_data(&self, layout: &Layout, block_device: &dyn BlockDevice) -> Result<()> {
        for (node, placement) in self.nodes.iter().zip(&layout.placements) {
            let first_block = placement.extent.first_block;
            match &node.kind {
                NodeKind::File(data) => write_run(block_device, first_block, data)?,
                NodeKind::Dir(children) => {
                    let mut dirents = Vec::with_capacity(children.len() + 2);
                    dirents.push(DirEntry::cwd(placement.id));
                    dirents.push(DirEntry::parent(node.parent));
                    for &child in children {
                        let name = &self.nodes[child as usize - 1].name;
                        dirents.push(DirEntry::new(name, child)?);
                    }

                    let mut entries = scratch(placement.extent.length as usize)?;
                    for (slot, dirent) in entries.chunks_exact_mut(DirEntry::SIZE).zip(&dirents) {
                        dirent.encode(slot)?;
                    }
                    write_run(block_device, first_block, &entries)?;
                }
            }
        }
        Ok(())
    }
}

/// 拼出引导块：三段引导程序原样复制，其余补零
fn boot_block(bootloader: &[u8]) -> Result<DataBlock> {
    let required = (STAGE_SECTORS[0] + STAGE_SECTORS[1]) * SECTOR_SIZE;
    if bootloader.len() < required {
        log::error!(
            "bootloader has {} bytes, stages 1 and 2 need {required}",
            bootloader.len()
        );
        return Err(Error::BootloaderTooShort);
    }
    if bootloader.len() > STAGE_SECTORS.iter().sum::<usize>() * SECTOR_SIZE {
        return Err(Error::BootloaderTooLarge);
    }

    let mut block = [0; BLOCK_SIZE];
    block[..bootloader.len()].copy_from_slice(bootloader);
    log::debug!(
        "stage 3 occupies {} sectors",
        (bootloader.len() - required).div_ceil(SECTOR_SIZE)
    );
    Ok(block)
}

/// 从`first_block`开始连续写`bytes`，最后一块不足的部分补零
fn write_run(block_device: &dyn BlockDevice, first_block: u32, bytes: &[u8]) -> Result<()> {
    for (index, chunk) in bytes.chunks(BLOCK_SIZE).enumerate() {
        let mut block = [0; BLOCK_SIZE];
        block[..chunk.len()].copy_from_slice(chunk);
        write_block(block_device, first_block as usize + index, &block)?;
    }
    Ok(())
}
