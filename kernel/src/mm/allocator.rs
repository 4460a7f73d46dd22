// SPDX-License-Identifier: MPL-2.0

use bitvec::{bitvec, vec::BitVec};

use crate::prelude::*;

/// The allocator that physical frames are drawn from.
///
/// Implementations must not block: frames are returned from within page-fault
/// handling (when copying on write), which may not sleep.
pub trait FrameAllocator: Send + Sync {
    /// Allocates one page-sized, page-aligned frame.
    ///
    /// Returns `None` when no frame is available.
    fn alloc(&self) -> Option<Paddr>;

    /// Returns a frame previously obtained from [`FrameAllocator::alloc`].
    fn dealloc(&self, paddr: Paddr);

    /// Returns the number of frames that can still be allocated.
    fn nr_free_frames(&self) -> usize;

    /// Returns the number of frames managed by this allocator.
    fn nr_total_frames(&self) -> usize;
}

/// A frame allocator over a fixed window of physical memory, tracked by a bitmap.
pub struct BitmapFrameAllocator {
    base: Paddr,
    bitmap: Mutex<BitVec>,
}

impl BitmapFrameAllocator {
    /// The physical address that the managed window starts at.
    pub const BASE_PADDR: Paddr = 0x10_0000;

    /// Creates an allocator that manages `nframes` frames.
    ///
    /// An allocator with zero frames fails every allocation.
    pub fn new(nframes: usize) -> Self {
        Self {
            base: Self::BASE_PADDR,
            bitmap: Mutex::new(bitvec![0; nframes]),
        }
    }

    fn index_of(&self, paddr: Paddr) -> Option<usize> {
        if paddr < self.base || (paddr - self.base) % PAGE_SIZE != 0 {
            return None;
        }
        Some((paddr - self.base) / PAGE_SIZE)
    }
}

impl FrameAllocator for BitmapFrameAllocator {
    fn alloc(&self) -> Option<Paddr> {
        let mut bitmap = self.bitmap.lock();
        let idx = bitmap.first_zero()?;
        bitmap.set(idx, true);
        Some(self.base + idx * PAGE_SIZE)
    }

    fn dealloc(&self, paddr: Paddr) {
        let mut bitmap = self.bitmap.lock();
        match self.index_of(paddr) {
            Some(idx) if idx < bitmap.len() && bitmap[idx] => bitmap.set(idx, false),
            _ => error!("deallocating an unknown frame {:#x}", paddr),
        }
    }

    fn nr_free_frames(&self) -> usize {
        self.bitmap.lock().count_zeros()
    }

    fn nr_total_frames(&self) -> usize {
        self.bitmap.lock().len()
    }
}

impl Debug for BitmapFrameAllocator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BitmapFrameAllocator")
            .field("base", &self.base)
            .field("total", &self.nr_total_frames())
            .field("free", &self.nr_free_frames())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn alloc_until_exhausted() {
        let allocator = BitmapFrameAllocator::new(2);
        let first = allocator.alloc().unwrap();
        let second = allocator.alloc().unwrap();
        assert_ne!(first, second);
        assert_eq!(first % PAGE_SIZE, 0);
        assert_eq!(allocator.alloc(), None);
        assert_eq!(allocator.nr_free_frames(), 0);

        allocator.dealloc(first);
        assert_eq!(allocator.nr_free_frames(), 1);
        assert_eq!(allocator.alloc(), Some(first));
    }

    #[test]
    fn empty_allocator_always_fails() {
        let allocator = BitmapFrameAllocator::new(0);
        assert_eq!(allocator.alloc(), None);
        assert_eq!(allocator.nr_total_frames(), 0);
    }

    #[test]
    fn unknown_frames_are_ignored() {
        let allocator = BitmapFrameAllocator::new(1);
        allocator.dealloc(0);
        allocator.dealloc(BitmapFrameAllocator::BASE_PADDR + 1);
        allocator.dealloc(BitmapFrameAllocator::BASE_PADDR);
        assert_eq!(allocator.nr_free_frames(), 1);
    }
}
