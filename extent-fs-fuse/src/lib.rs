//! 宿主侧工具：以普通文件充当块设备，并把宿主文件打包成磁盘镜像。


use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use block_dev::{BlockDevice, DeviceError, SECTOR_SIZE, sector_count};
use chrono::{Datelike, Local, Timelike};
use derive_more::{Display, From};
use extent_fs::{BuildError, DateTime, ImageBuilder, Layout};

#[derive(Debug)]
pub struct BlockFile {
    file: Mutex<File>,
    /// 文件容量，不会随写入增长
    sectors: usize,
}

impl BlockFile {
    pub fn new(file: File) -> io::Result<Self> {
        let len = file.metadata()?.len() as usize;
        Ok(Self {
            file: Mutex::new(file),
            sectors: len / SECTOR_SIZE,
        })
    }

    /// 创建（或截断）镜像文件并预留`len`字节
    pub fn create(path: &Path, len: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(len)?;
        Self::new(file)
    }

    #[inline]
    pub fn sectors(&self) -> usize {
        self.sectors
    }

    /// 把写入落到宿主磁盘
    pub fn sync(&self) -> io::Result<()> {
        self.file
            .lock()
            .map_err(|_| io::Error::other("block file lock poisoned"))?
            .sync_all()
    }

    /// 检查范围并定位到`start_sector`，之后在持锁状态下传输
    fn transfer<T>(
        &self,
        start_sector: usize,
        len: usize,
        op: impl FnOnce(&mut File) -> io::Result<T>,
    ) -> Result<T, DeviceError> {
        let count = sector_count(len)?;
        let end = start_sector.checked_add(count).ok_or(DeviceError::OutOfRange)?;
        if end > self.sectors {
            return Err(DeviceError::OutOfRange);
        }

        let mut file = self.file.lock().map_err(|_| DeviceError::Io)?;
        file.seek(SeekFrom::Start((start_sector * SECTOR_SIZE) as u64))
            .map_err(io_error)?;
        op(&mut file).map_err(io_error)
    }
}

impl BlockDevice for BlockFile {
    fn read_sectors(&self, start_sector: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        self.transfer(start_sector, buf.len(), |file| file.read_exact(buf))
    }

    fn write_sectors(&self, start_sector: usize, buf: &[u8]) -> Result<(), DeviceError> {
        self.transfer(start_sector, buf.len(), |file| file.write_all(buf))
    }
}

fn io_error(e: io::Error) -> DeviceError {
    log::error!("block file: {e}");
    match e.kind() {
        ErrorKind::UnexpectedEof | ErrorKind::WriteZero => DeviceError::ShortTransfer,
        _ => DeviceError::Io,
    }
}

#[derive(Debug, Display, From)]
pub enum PackError {
    #[display(fmt = "{}: {}", _0, _1)]
    #[from(ignore)]
    Host(String, io::Error),
    #[display(fmt = "{}: {}", _0, _1)]
    #[from(ignore)]
    Register(String, extent_fs::Error),
    #[display(fmt = "{}", _0)]
    Build(BuildError),
}

/// 镜像中记录的创建时间取当前本地时间
pub fn now() -> DateTime {
    let now = Local::now();
    DateTime::new(
        now.hour() as u8,
        now.minute() as u8,
        now.day() as u8,
        now.month() as u8,
        u16::try_from(now.year()).unwrap_or_default(),
    )
}

fn read_host(path: &Path) -> Result<Vec<u8>, PackError> {
    fs::read(path).map_err(|e| PackError::Host(path.display().to_string(), e))
}

/// 把引导程序与`files`写成镜像`image`，文件都放在根目录下，以宿主文件名命名
pub fn create_disk_image(
    bootloader: &Path,
    files: &[PathBuf],
    image: &Path,
    datetime: DateTime,
) -> Result<Layout, PackError> {
    let boot = read_host(bootloader)?;
    let contents = files
        .iter()
        .map(|path| read_host(path))
        .collect::<Result<Vec<_>, _>>()?;

    let mut builder = ImageBuilder::new(&boot).datetime(datetime);
    for (path, data) in files.iter().zip(&contents) {
        let name = path.to_string_lossy();
        let id = builder
            .add_path(&name, data)
            .map_err(|e| PackError::Register(name.to_string(), e))?;
        log::info!("file {} -> inode {id} ({} bytes)", path.display(), data.len());
    }

    let layout = builder.plan()?;
    let block_file = BlockFile::create(image, layout.image_bytes())
        .map_err(|e| PackError::Host(image.display().to_string(), e))?;
    builder.write(&layout, &block_file)?;

    block_file
        .sync()
        .map_err(|e| PackError::Host(image.display().to_string(), e))?;

    Ok(layout)
}
