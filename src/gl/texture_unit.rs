// RasterGL
// copyright zipxing@hotmail.com 2022~2025

//! Texture unit pool.
//!
//! One allocator lives in each `RasterContext`, so two contexts in the same
//! process never hand out units from a shared table. Uploads use the scratch
//! unit [`UPLOAD_UNIT`], which sits just past the pool.

use crate::error::{RasterError, Result};

/// number of sampler units handed out to textures
pub const TEXTURE_UNIT_COUNT: usize = 16;

/// unit used while creating or filling textures, never given to a texture
pub const UPLOAD_UNIT: u32 = TEXTURE_UNIT_COUNT as u32;

#[derive(Debug, Clone, Default)]
pub struct TextureUnitAllocator {
    slots: [bool; TEXTURE_UNIT_COUNT],
}

impl TextureUnitAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// First free slot, or `ResourceExhausted` when all are taken.
    pub fn acquire(&mut self) -> Result<u32> {
        match self.slots.iter().position(|used| !used) {
            Some(i) => {
                self.slots[i] = true;
                Ok(i as u32)
            }
            None => Err(RasterError::ResourceExhausted {
                slots: TEXTURE_UNIT_COUNT,
            }),
        }
    }

    pub fn release(&mut self, unit: u32) {
        if let Some(slot) = self.slots.get_mut(unit as usize) {
            *slot = false;
        }
    }

    pub fn is_in_use(&self, unit: u32) -> bool {
        self.slots.get(unit as usize).copied().unwrap_or(false)
    }

    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|used| **used).count()
    }

    pub fn available(&self) -> usize {
        TEXTURE_UNIT_COUNT - self.in_use()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hands_out_first_free_slot() {
        let mut units = TextureUnitAllocator::new();
        assert_eq!(units.acquire(), Ok(0));
        assert_eq!(units.acquire(), Ok(1));
        assert_eq!(units.acquire(), Ok(2));
        units.release(1);
        assert_eq!(units.acquire(), Ok(1));
        assert_eq!(units.in_use(), 3);
    }

    #[test]
    fn seventeenth_acquire_is_exhausted() {
        let mut units = TextureUnitAllocator::new();
        for i in 0..TEXTURE_UNIT_COUNT {
            assert_eq!(units.acquire(), Ok(i as u32));
        }
        assert_eq!(
            units.acquire(),
            Err(RasterError::ResourceExhausted { slots: 16 })
        );
        units.release(7);
        assert_eq!(units.acquire(), Ok(7));
    }

    #[test]
    fn release_out_of_range_is_ignored() {
        let mut units = TextureUnitAllocator::new();
        units.release(UPLOAD_UNIT);
        units.release(99);
        assert_eq!(units.available(), TEXTURE_UNIT_COUNT);
        assert!(!units.is_in_use(UPLOAD_UNIT));
    }

    #[test]
    fn pools_are_independent() {
        let mut a = TextureUnitAllocator::new();
        let mut b = TextureUnitAllocator::new();
        assert_eq!(a.acquire(), Ok(0));
        assert_eq!(b.acquire(), Ok(0));
        assert!(a.is_in_use(0) && b.is_in_use(0));
        a.release(0);
        assert!(b.is_in_use(0));
    }
}
