// SPDX-License-Identifier: MPL-2.0

use crate::{mm::FrameAllocator, prelude::*};

/// The page shared with every mapping of the device.
///
/// The page is zeroed at allocation and never written afterwards. Each
/// binding into an address space holds a reference to the underlying frame.
pub struct SharedPage {
    frame: Frame,
}

impl SharedPage {
    /// Allocates a zeroed page.
    pub fn alloc(allocator: &Arc<dyn FrameAllocator>) -> Result<Self> {
        let frame = Frame::alloc_zeroed(allocator)?;
        Ok(Self { frame })
    }

    /// Takes a new reference to the page for an address space to bind.
    pub fn acquire_binding(&self) -> Frame {
        self.frame.clone()
    }

    /// Returns the number of references held outside this object.
    pub fn nr_bindings(&self) -> usize {
        self.frame.reference_count() - 1
    }

    pub fn paddr(&self) -> Paddr {
        self.frame.start_paddr()
    }

    /// Gives up the reference of the driver.
    ///
    /// The frame goes back to the allocator now if there are no bindings, or
    /// when the last binding is released otherwise.
    pub fn free(self) {
        trace!("free the shared page {:#x}", self.paddr());
    }
}

impl Debug for SharedPage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedPage")
            .field("frame", &self.frame)
            .field("nr_bindings", &self.nr_bindings())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mm::BitmapFrameAllocator;

    #[test]
    fn bindings_share_one_zeroed_frame() {
        let allocator: Arc<dyn FrameAllocator> = Arc::new(BitmapFrameAllocator::new(1));
        let page = SharedPage::alloc(&allocator).unwrap();
        assert_eq!(page.nr_bindings(), 0);

        let first = page.acquire_binding();
        let second = page.acquire_binding();
        assert_eq!(page.nr_bindings(), 2);
        assert_eq!(first.start_paddr(), page.paddr());
        assert_eq!(first, second);
        assert!(first.is_zeroed());

        drop(first);
        assert_eq!(page.nr_bindings(), 1);
    }

    #[test]
    fn freed_page_outlives_its_bindings() {
        let allocator: Arc<dyn FrameAllocator> = Arc::new(BitmapFrameAllocator::new(1));
        let page = SharedPage::alloc(&allocator).unwrap();
        let binding = page.acquire_binding();

        page.free();
        assert_eq!(allocator.nr_free_frames(), 0);
        assert!(binding.is_zeroed());

        drop(binding);
        assert_eq!(allocator.nr_free_frames(), 1);
    }

    #[test]
    fn alloc_fails_without_memory() {
        let allocator: Arc<dyn FrameAllocator> = Arc::new(BitmapFrameAllocator::new(0));
        let error = SharedPage::alloc(&allocator).unwrap_err();
        assert_eq!(error.error(), Errno::ENOMEM);
    }
}
