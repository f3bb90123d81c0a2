#![no_std]

extern crate alloc;

/* extent-fs 的整体架构，自上而下 */

// 会话层：当前目录、路径解析、打开文件表
mod session;

// 打开文件表
mod fd;

// 文件系统层：超级块缓存、inode 查找、文件装载
mod efs;

// 镜像构建层：离线生成整张磁盘镜像
mod image;

// 布局计算：由文件大小推出超级块的全部字段
mod geometry;

// 磁盘数据结构层：表示磁盘文件系统的数据结构
pub mod layout;

mod error;
pub mod path;

pub use block_dev::{BlockDevice, DeviceError, SECTOR_SIZE};

pub use self::{
    efs::ExtentFileSystem,
    error::{Error, Result},
    fd::{OpenFile, OpenFileTable, OpenFlag},
    geometry::{Layout, Placement, bits_to_blocks, bytes_to_blocks, bytes_to_sectors},
    image::{BuildError, ImageBuilder, Stage},
    layout::{Bitmap, DateTime, DirEntry, DiskInode, Extent, FileType, Region, SuperBlock},
    session::Session,
};

pub const MAGIC: u32 = 0x4558_5446;
pub const BLOCK_SIZE: usize = 4096;
pub const BLOCK_BITS: usize = BLOCK_SIZE * 8;
pub const SECTORS_PER_BLOCK: usize = BLOCK_SIZE / SECTOR_SIZE;

/// 每个 inode 的直接 extent 数
pub const EXTENTS_PER_INODE: usize = 4;

/// 0 号 inode 保留不用
pub const RESERVED_INODE_ID: u32 = 0;
/// 根目录恒为 1 号 inode
pub const ROOT_INODE_ID: u32 = 1;

/// 引导块固定占第 0 块，超级块占第 1 块
pub const BOOT_BLOCK: u32 = 0;
pub const SUPER_BLOCK: u32 = 1;

type DataBlock = [u8; BLOCK_SIZE];
