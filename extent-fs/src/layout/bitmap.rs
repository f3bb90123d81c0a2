use block_dev::BlockDevice;

use crate::{BLOCK_BITS, BLOCK_SIZE, DataBlock, Result};

const WORD_BITS: usize = u32::BITS as usize;
const BLOCK_WORDS: usize = BLOCK_BITS / WORD_BITS;

/// 位图区域内块的结构：小端 u32 字组成的数组，
/// 第`w`个字的第`i`位指示第`w * 32 + i`个对象
#[derive(Debug, Clone)]
pub(crate) struct BitmapBlock([u32; BLOCK_WORDS]);

impl BitmapBlock {
    pub fn new() -> Self {
        Self([0; BLOCK_WORDS])
    }

    /// 将前`used`位置 1。
    ///
    /// 末尾不足一个字的部分，掩码只覆盖剩余的`left`位；
    /// `left == 0`时不写掩码。
    pub fn fill_used(&mut self, used: usize) {
        let used = used.min(BLOCK_BITS);
        let full = used / WORD_BITS;
        let left = used % WORD_BITS;

        self.0[..full].fill(u32::MAX);
        if left != 0 {
            self.0[full] = (1 << left) - 1;
        }
    }

    pub fn to_block(&self) -> DataBlock {
        let mut block = [0; BLOCK_SIZE];
        for (bytes, word) in block.chunks_exact_mut(4).zip(self.0.iter()) {
            bytes.copy_from_slice(&word.to_le_bytes());
        }
        block
    }

    #[cfg(test)]
    pub fn words(&self) -> &[u32] {
        &self.0
    }
}

/// 位图区域，记录其指示区域的分配情况
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bitmap {
    /// 位图的起始块
    start_block_id: u32,
    /// 位图占用块数
    blocks: u32,
}

impl Bitmap {
    #[inline]
    pub fn new(start_block_id: u32, blocks: u32) -> Self {
        Self {
            start_block_id,
            blocks,
        }
    }

    /// 位图所能指示的对象总数
    #[inline]
    pub fn capacity(&self) -> usize {
        self.blocks as usize * BLOCK_BITS
    }

    /// 第`index`块位图应置 1 的位数
    pub fn used_in_block(index: usize, used: usize) -> usize {
        used.saturating_sub(index * BLOCK_BITS).min(BLOCK_BITS)
    }

    /// 构建时：逐块写出前`used`位已分配的位图
    pub fn write_used(&self, block_device: &dyn BlockDevice, used: usize) -> Result<()> {
        for index in 0..self.blocks as usize {
            let mut bitmap_block = BitmapBlock::new();
            bitmap_block.fill_used(Self::used_in_block(index, used));
            let block_id = self.start_block_id as usize + index;
            crate::efs::write_block(block_device, block_id, &bitmap_block.to_block())?;
        }
        Ok(())
    }

    /// 第`bit`个对象是否已分配，越界视为未分配
    pub fn is_allocated(&self, block_device: &dyn BlockDevice, bit: usize) -> Result<bool> {
        if bit >= self.capacity() {
            return Ok(false);
        }

        let block_id = self.start_block_id as usize + bit / BLOCK_BITS;
        let mut block = [0; BLOCK_SIZE];
        crate::efs::read_block(block_device, block_id, &mut block)?;

        let bit = bit % BLOCK_BITS;
        let offset = bit / WORD_BITS * 4;
        let word = u32::from_le_bytes([
            block[offset],
            block[offset + 1],
            block[offset + 2],
            block[offset + 3],
        ]);
        Ok(word & (1 << (bit % WORD_BITS)) != 0)
    }
}
