// SPDX-License-Identifier: MPL-2.0

//! Physical memory management.
//!
//! Physical memory is handed out in page-sized frames by a [`FrameAllocator`].
//! A [`Frame`] is a reference-counted handle to one such page; the page goes
//! back to its allocator once the last handle is dropped.

mod allocator;
mod frame;

pub use allocator::{BitmapFrameAllocator, FrameAllocator};
pub use frame::{Frame, duplicate_frame};

/// Physical addresses.
pub type Paddr = usize;

/// Virtual addresses.
pub type Vaddr = usize;

/// The size of a base page.
pub const PAGE_SIZE: usize = 4096;
