use binrw::binrw;

use crate::{Error, Result};

/// 名字缓冲区长度，最后一字节留给 \0
const NAME_CAP: usize = 60;

/// 文件系统项的元信息，目录的数据块就是它的紧密数组
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    /// 0 表示目录结束
    id: u32,
    name: [u8; NAME_CAP],
}

impl_record!(DirEntry, 64);

impl Default for DirEntry {
    fn default() -> Self {
        Self {
            id: 0,
            name: [0; NAME_CAP],
        }
    }
}

impl DirEntry {
    pub const NAME_MAX_LEN: usize = NAME_CAP - 1;

    pub fn new(name: &str, id: u32) -> Result<Self> {
        Self::check_name(name)?;

        let bytes = name.as_bytes();
        let mut buf = [0; NAME_CAP];
        buf[..bytes.len()].copy_from_slice(bytes);

        Ok(Self { id, name: buf })
    }

    /// 指向自身的`.`
    pub fn cwd(id: u32) -> Self {
        Self::relative(".", id)
    }

    /// 指向父目录的`..`，根目录的父目录是它自己
    pub fn parent(id: u32) -> Self {
        Self::relative("..", id)
    }

    /// 非空、不含`/`或`\0`，且不超过 [`Self::NAME_MAX_LEN`] 字节
    pub fn check_name(name: &str) -> Result<()> {
        if name.is_empty() || name.len() > Self::NAME_MAX_LEN {
            return Err(Error::InvalidName);
        }
        if name.bytes().any(|b| b == b'/' || b == 0) {
            return Err(Error::InvalidName);
        }
        Ok(())
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// 目录列表在第一个`id == 0`处结束
    #[inline]
    pub fn is_end(&self) -> bool {
        self.id == 0
    }

    pub fn name_bytes(&self) -> &[u8] {
        let len = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(NAME_CAP);
        &self.name[..len]
    }

    /// 名字不是合法 UTF-8 时返回`None`
    pub fn name(&self) -> Option<&str> {
        core::str::from_utf8(self.name_bytes()).ok()
    }

    #[inline]
    pub fn is_named(&self, name: &str) -> bool {
        self.name_bytes() == name.as_bytes()
    }
}

impl DirEntry {
    fn relative(name: &str, id: u32) -> Self {
        let mut buf = [0; NAME_CAP];
        buf[..name.len()].copy_from_slice(name.as_bytes());
        Self { id, name: buf }
    }
}
