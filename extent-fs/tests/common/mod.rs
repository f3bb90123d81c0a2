//! Common utilities for tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use extent_fs::{
    BLOCK_SIZE, BlockDevice, DateTime, DeviceError, ExtentFileSystem, ImageBuilder, Layout,
    SECTOR_SIZE, SECTORS_PER_BLOCK, Session,
};

#[derive(Debug)]
pub struct RamDisk {
    inner: Mutex<Vec<u8>>,
    /// 置位后所有读取都失败
    broken: AtomicBool,
}

impl RamDisk {
    pub fn new(sectors: usize) -> Self {
        Self {
            inner: Mutex::new(vec![0; sectors * SECTOR_SIZE]),
            broken: AtomicBool::new(false),
        }
    }

    /// 恰好容纳`layout`的磁盘
    pub fn for_layout(layout: &Layout) -> Self {
        Self::new(layout.image_bytes() as usize / SECTOR_SIZE)
    }

    pub fn break_reads(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    /// 读出第`block_id`块，交给`f`修改后写回
    pub fn patch_block(&self, block_id: usize, f: impl FnOnce(&mut [u8])) {
        let mut block = vec![0; BLOCK_SIZE];
        self.read_sectors(block_id * SECTORS_PER_BLOCK, &mut block).unwrap();
        f(&mut block);
        self.write_sectors(block_id * SECTORS_PER_BLOCK, &block).unwrap();
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.inner.lock().unwrap().clone()
    }

    fn range(
        &self,
        start_sector: usize,
        len: usize,
    ) -> Result<std::ops::Range<usize>, DeviceError> {
        block_dev::sector_count(len)?;
        let start = start_sector * SECTOR_SIZE;
        let end = start + len;
        if end > self.inner.lock().unwrap().len() {
            return Err(DeviceError::OutOfRange);
        }
        Ok(start..end)
    }
}

impl BlockDevice for RamDisk {
    fn read_sectors(&self, start_sector: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(DeviceError::Io);
        }
        let range = self.range(start_sector, buf.len())?;
        buf.copy_from_slice(&self.inner.lock().unwrap()[range]);
        Ok(())
    }

    fn write_sectors(&self, start_sector: usize, buf: &[u8]) -> Result<(), DeviceError> {
        let range = self.range(start_sector, buf.len())?;
        self.inner.lock().unwrap()[range].copy_from_slice(buf);
        Ok(())
    }
}

pub const STAMP: DateTime = DateTime::new(9, 30, 14, 10, 2026);

pub fn bootloader() -> Vec<u8> {
    (0..1024).map(|i| (i % 251) as u8).collect()
}

/// 按确定的种子生成伪随机内容
pub fn content(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| {
            let mixed = (i as u32)
                .wrapping_mul(2_654_435_761)
                .rotate_left(seed as u32 % 32);
            mixed as u8 ^ seed
        })
        .collect()
}

/// 把 builder 写到新的内存盘上并打开一个会话
pub fn mount(builder: &ImageBuilder<'_>) -> (Arc<RamDisk>, Session) {
    let layout = builder.plan().unwrap();
    let disk = Arc::new(RamDisk::for_layout(&layout));
    builder.write(&layout, &*disk).unwrap();

    let fs = ExtentFileSystem::open(disk.clone()).unwrap();
    let session = Session::new(Arc::new(fs)).unwrap();
    (disk, session)
}
