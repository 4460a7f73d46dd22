// SPDX-License-Identifier: MPL-2.0

use super::FrameAllocator;
use crate::prelude::*;

/// A smart pointer to a physical frame.
///
/// The handle is reference-counted: cloning it atomically takes another
/// reference, and dropping the last reference returns the frame to the
/// allocator it came from. A frame bound into an address space is kept alive
/// by the handle stored in that binding.
#[derive(Clone)]
pub struct Frame {
    inner: Arc<FrameInner>,
}

struct FrameInner {
    paddr: Paddr,
    data: RwLock<Box<[u8]>>,
    allocator: Arc<dyn FrameAllocator>,
}

impl Frame {
    /// Allocates a frame whose content is all zero bytes.
    pub fn alloc_zeroed(allocator: &Arc<dyn FrameAllocator>) -> Result<Self> {
        let Some(paddr) = allocator.alloc() else {
            return_errno_with_message!(Errno::ENOMEM, "no free frames");
        };

        let mut data = Vec::new();
        if data.try_reserve_exact(PAGE_SIZE).is_err() {
            allocator.dealloc(paddr);
            return_errno_with_message!(Errno::ENOMEM, "cannot back the frame");
        }
        data.resize(PAGE_SIZE, 0u8);

        Ok(Self {
            inner: Arc::new(FrameInner {
                paddr,
                data: RwLock::new(data.into_boxed_slice()),
                allocator: allocator.clone(),
            }),
        })
    }

    /// Gets the physical address of the start of the frame.
    pub fn start_paddr(&self) -> Paddr {
        self.inner.paddr
    }

    /// Gets the size of the frame in bytes.
    pub const fn size(&self) -> usize {
        PAGE_SIZE
    }

    /// Gets the reference count of the frame.
    ///
    /// It counts every existing handle, including the ones held by the
    /// bindings in address spaces. The count can be changed by other threads
    /// at any time, so the result is only a snapshot.
    pub fn reference_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Reads bytes starting at `offset` into `buf`.
    pub fn read_bytes(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        let range = Self::checked_range(offset, buf.len())?;
        buf.copy_from_slice(&self.inner.data.read()[range]);
        Ok(())
    }

    /// Writes the bytes of `buf` starting at `offset`.
    ///
    /// Only the VM layer writes frames, after its permission checks.
    pub(crate) fn write_bytes(&self, offset: usize, buf: &[u8]) -> Result<()> {
        let range = Self::checked_range(offset, buf.len())?;
        self.inner.data.write()[range].copy_from_slice(buf);
        Ok(())
    }

    /// Returns whether every byte of the frame is zero.
    pub fn is_zeroed(&self) -> bool {
        self.inner.data.read().iter().all(|byte| *byte == 0)
    }

    fn checked_range(offset: usize, len: usize) -> Result<core::ops::Range<usize>> {
        match offset.checked_add(len) {
            Some(end) if end <= PAGE_SIZE => Ok(offset..end),
            _ => return_errno_with_message!(Errno::EFAULT, "the access exceeds the frame"),
        }
    }
}

impl Drop for FrameInner {
    fn drop(&mut self) {
        self.allocator.dealloc(self.paddr);
    }
}

impl Debug for Frame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Frame({:#x})", self.start_paddr())
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.start_paddr() == other.start_paddr()
    }
}

impl Eq for Frame {}

/// Creates a new frame from the same allocator, initialized with the contents of `src`.
pub fn duplicate_frame(src: &Frame) -> Result<Frame> {
    let new_frame = Frame::alloc_zeroed(&src.inner.allocator)?;
    let data = src.inner.data.read();
    new_frame.inner.data.write().copy_from_slice(&data);
    Ok(new_frame)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mm::BitmapFrameAllocator;

    fn allocator(nframes: usize) -> Arc<dyn FrameAllocator> {
        Arc::new(BitmapFrameAllocator::new(nframes))
    }

    #[test]
    fn frame_is_zeroed() {
        let allocator = allocator(1);
        let frame = Frame::alloc_zeroed(&allocator).unwrap();
        assert!(frame.is_zeroed());
        assert_eq!(frame.size(), PAGE_SIZE);
        assert_eq!(frame.reference_count(), 1);
    }

    #[test]
    fn reused_frame_is_zeroed_again() {
        let allocator = allocator(1);
        let frame = Frame::alloc_zeroed(&allocator).unwrap();
        let paddr = frame.start_paddr();
        frame.write_bytes(0, &[0xff; 16]).unwrap();
        drop(frame);

        let frame = Frame::alloc_zeroed(&allocator).unwrap();
        assert_eq!(frame.start_paddr(), paddr);
        assert!(frame.is_zeroed());
    }

    #[test]
    fn clone_and_drop_track_references() {
        let allocator = allocator(1);
        let frame = Frame::alloc_zeroed(&allocator).unwrap();
        let binding = frame.clone();
        assert_eq!(frame, binding);
        assert_eq!(frame.reference_count(), 2);

        drop(frame);
        assert_eq!(binding.reference_count(), 1);
        assert_eq!(allocator.nr_free_frames(), 0);

        drop(binding);
        assert_eq!(allocator.nr_free_frames(), 1);
    }

    #[test]
    fn out_of_frames() {
        let allocator = allocator(0);
        let error = Frame::alloc_zeroed(&allocator).unwrap_err();
        assert_eq!(error.error(), Errno::ENOMEM);
    }

    #[test]
    fn out_of_bounds_access() {
        let allocator = allocator(1);
        let frame = Frame::alloc_zeroed(&allocator).unwrap();
        let mut buf = [0u8; 2];
        assert!(frame.read_bytes(PAGE_SIZE - 2, &mut buf).is_ok());
        assert_eq!(
            frame.read_bytes(PAGE_SIZE - 1, &mut buf).unwrap_err().error(),
            Errno::EFAULT
        );
        assert!(frame.write_bytes(usize::MAX, &buf).is_err());
    }

    #[test]
    fn duplicate_copies_content() {
        let allocator = allocator(2);
        let frame = Frame::alloc_zeroed(&allocator).unwrap();
        frame.write_bytes(8, b"kmd").unwrap();

        let copy = duplicate_frame(&frame).unwrap();
        assert_ne!(copy, frame);
        let mut buf = [0u8; 3];
        copy.read_bytes(8, &mut buf).unwrap();
        assert_eq!(&buf, b"kmd");

        copy.write_bytes(8, b"xyz").unwrap();
        frame.read_bytes(8, &mut buf).unwrap();
        assert_eq!(&buf, b"kmd");
    }
}
