//! # 打开文件表
//!
//! 每个会话拥有一张定长表，槽位即文件描述符。
//! 打开时文件数据被整体装入内存，此后的读取只在内存里移动偏移量。

use alloc::vec::Vec;

use enumflags2::{BitFlags, bitflags};

use crate::layout::DiskInode;
use crate::{Error, Result};

#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFlag {
    Read = 0b01,
    Write = 0b10,
}

/// 表示会话打开的文件
#[derive(Debug, Clone)]
pub struct OpenFile {
    inode: DiskInode,
    /// 装载好的文件数据，长度恰为`size_bytes`
    data: Vec<u8>,
    flags: BitFlags<OpenFlag>,
    /// **文件**内的偏移量
    offset: usize,
}

impl OpenFile {
    pub fn new(inode: DiskInode, data: Vec<u8>, flags: BitFlags<OpenFlag>) -> Self {
        Self {
            inode,
            data,
            flags,
            offset: 0,
        }
    }

    #[inline]
    pub fn inode(&self) -> &DiskInode {
        &self.inode
    }

    #[inline]
    pub fn readable(&self) -> bool {
        self.flags.contains(OpenFlag::Read)
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// 从当前偏移读出至多`buf.len()`字节
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.readable() {
            return Err(Error::BadDescriptor);
        }

        let len = buf.len().min(self.remaining());
        buf[..len].copy_from_slice(&self.data[self.offset..self.offset + len]);
        self.offset += len;
        Ok(len)
    }

    /// 移动到绝对偏移，超出文件末尾时停在末尾
    pub fn seek(&mut self, offset: usize) -> usize {
        self.offset = offset.min(self.data.len());
        self.offset
    }
}

#[derive(Debug, Default)]
pub struct OpenFileTable {
    slots: [Option<OpenFile>; OpenFileTable::CAPACITY],
}

impl OpenFileTable {
    /// 同时打开的文件数上限
    pub const CAPACITY: usize = 16;

    pub fn new() -> Self {
        Self::default()
    }

    /// 放入最小的空槽位，返回其下标
    pub fn insert(&mut self, file: OpenFile) -> Result<usize> {
        let fd = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::TooManyOpenFiles)?;
        self.slots[fd] = Some(file);
        Ok(fd)
    }

    pub fn get(&self, fd: usize) -> Result<&OpenFile> {
        self.slots
            .get(fd)
            .and_then(Option::as_ref)
            .ok_or(Error::BadDescriptor)
    }

    pub fn get_mut(&mut self, fd: usize) -> Result<&mut OpenFile> {
        self.slots
            .get_mut(fd)
            .and_then(Option::as_mut)
            .ok_or(Error::BadDescriptor)
    }

    pub fn remove(&mut self, fd: usize) -> Result<OpenFile> {
        self.slots
            .get_mut(fd)
            .and_then(Option::take)
            .ok_or(Error::BadDescriptor)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
