//! # 会话层
//!
//! 当前目录、当前路径与打开文件表都属于会话，而不是全局状态；
//! 同一个 [`ExtentFileSystem`] 可以同时服务多个会话。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt::Write;

use enumflags2::BitFlags;

use crate::efs::ExtentFileSystem;
use crate::fd::{OpenFile, OpenFileTable, OpenFlag};
use crate::layout::{DirEntry, DiskInode};
use crate::path;
use crate::{Error, ROOT_INODE_ID, Result};

/// 路径解析走到最后停在哪里
#[derive(Debug)]
enum Walk {
    File(DiskInode),
    Directory {
        current: DiskInode,
        parent: DiskInode,
    },
}

#[derive(Debug)]
pub struct Session {
    fs: Arc<ExtentFileSystem>,
    current: DiskInode,
    /// 当前目录的父目录，根目录的父目录是它自己
    parent: DiskInode,
    /// 绝对路径，非根时不以`/`结束
    path: String,
    files: OpenFileTable,
}

impl Session {
    /// 以根目录为当前目录，路径为`/`
    pub fn new(fs: Arc<ExtentFileSystem>) -> Result<Self> {
        let root = fs.root_inode()?;
        Ok(Self {
            fs,
            current: root,
            parent: root,
            path: String::from("/"),
            files: OpenFileTable::new(),
        })
    }

    #[inline]
    pub fn fs(&self) -> &Arc<ExtentFileSystem> {
        &self.fs
    }

    #[inline]
    pub fn current_path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn current_dir(&self) -> &DiskInode {
        &self.current
    }

    /// 解析到一个**文件**的 inode。
    ///
    /// 路径最终停在目录上时返回 [`Error::IsADirectory`]。
    pub fn inode_by_path(&self, path: &str) -> Result<DiskInode> {
        match self.walk(path)? {
            Walk::File(inode) => Ok(inode),
            Walk::Directory { .. } => Err(Error::IsADirectory),
        }
    }

    /// 切换当前目录，失败时状态不变
    pub fn change_dir(&mut self, path: &str) -> Result<()> {
        let Walk::Directory { current, parent } = self.walk(path)? else {
            return Err(Error::NotADirectory);
        };
        let canonical = path::canonicalize(path, &self.path).ok_or(Error::InvalidPath)?;

        log::debug!("cd {canonical} (inode {})", current.id);
        self.current = current;
        self.parent = parent;
        self.path = canonical;
        Ok(())
    }

    /// 当前目录的每一项及其 inode
    pub fn list_dir(&self) -> Result<Vec<(DirEntry, DiskInode)>> {
        self.fs
            .read_dir(&self.current)?
            .into_iter()
            .map(|dirent| Ok((dirent, self.fs.inode_by_id(dirent.id())?)))
            .collect()
    }

    /// 逐行打印当前目录：类型、创建日期、大小、名字。
    ///
    /// 引用的 inode 不存在时打印提示并结束扫描，这不算失败；
    /// `out`拒绝写入时返回 [`Error::Output`]。
    pub fn print_dir(&self, out: &mut impl Write) -> Result<()> {
        for dirent in self.fs.read_dir(&self.current)? {
            let name = dirent.name().unwrap_or("?");
            let inode = match self.fs.inode_by_id(dirent.id()) {
                Ok(inode) => inode,
                Err(Error::NotFound) => {
                    log::error!("{name}: inode {} missing", dirent.id());
                    writeln!(out, "{name}: inode {} missing", dirent.id())?;
                    break;
                }
                Err(e) => return Err(e),
            };

            let kind = if inode.is_dir() { 'd' } else { 'f' };
            let date = inode.datetime;
            writeln!(
                out,
                "{kind} {:02}/{:02}/{:04} {:>8} {name}",
                date.day, date.month, date.year, inode.size_bytes
            )?;
        }
        Ok(())
    }

    /// 打开文件并把数据装入内存，返回文件描述符
    pub fn open(&mut self, path: &str, flags: BitFlags<OpenFlag>) -> Result<usize> {
        if flags.contains(OpenFlag::Write) {
            return Err(Error::ReadOnly);
        }

        let inode = self.inode_by_path(path)?;
        let data = self.fs.read_file(&inode)?;
        self.files.insert(OpenFile::new(inode, data, flags))
    }

    pub fn read(&mut self, fd: usize, buf: &mut [u8]) -> Result<usize> {
        self.files.get_mut(fd)?.read(buf)
    }

    pub fn seek(&mut self, fd: usize, offset: usize) -> Result<usize> {
        Ok(self.files.get_mut(fd)?.seek(offset))
    }

    /// 打开时装载的 inode 副本
    pub fn stat(&self, fd: usize) -> Result<DiskInode> {
        Ok(*self.files.get(fd)?.inode())
    }

    pub fn close(&mut self, fd: usize) -> Result<()> {
        self.files.remove(fd).map(drop)
    }

    #[inline]
    pub fn files(&self) -> &OpenFileTable {
        &self.files
    }
}

impl Session {
    /// 自左向右解析路径，状态为`(剩余路径段, 当前目录, 父目录)`
    fn walk(&self, path: &str) -> Result<Walk> {
        if path.is_empty() {
            return Err(Error::InvalidPath);
        }

        let (mut current, mut parent) = if path::is_absolute(path) {
            let root = self.fs.inode_by_id(ROOT_INODE_ID)?;
            (root, root)
        } else {
            (self.current, self.parent)
        };

        let mut cmps = path::components(path).peekable();
        while let Some(cmp) = cmps.next() {
            match cmp {
                "." => (),
                ".." => {
                    current = parent;
                    parent = self.lookup(&current, "..")?;
                }
                name => {
                    let found = self.lookup(&current, name)?;
                    let is_last = cmps.peek().is_none();
                    match (found.is_dir(), is_last) {
                        (false, true) => return Ok(Walk::File(found)),
                        (false, false) => {
                            log::debug!("{name} isn't a directory in {path}");
                            return Err(Error::NotADirectory);
                        }
                        (true, _) => {
                            parent = current;
                            current = found;
                        }
                    }
                }
            }
        }

        Ok(Walk::Directory { current, parent })
    }

    /// 在`dir`中按名字找到子项并取出它的 inode
    fn lookup(&self, dir: &DiskInode, name: &str) -> Result<DiskInode> {
        let dirent = self.fs.find_entry(dir, name)?.ok_or_else(|| {
            log::debug!("{name} not found in inode {}", dir.id);
            Error::NotFound
        })?;
        self.fs.inode_by_id(dirent.id())
    }
}
