// SPDX-License-Identifier: MPL-2.0

use core::ops::Range;

use crate::{
    device::PageMappedDevice,
    mm::duplicate_frame,
    prelude::*,
    vm::{
        fault::{PageFaultInfo, VmFault},
        perms::VmPerms,
    },
};

/// The description of a mapping request that a device gets to inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmAreaDesc {
    /// The permissions of the mapping.
    pub perms: VmPerms,
    /// Whether writes go to the device pages instead of private copies.
    pub is_shared: bool,
    /// The device page that the first page of the mapping corresponds to.
    pub pgoff: usize,
    /// The number of pages in the mapping.
    pub nr_pages: usize,
}

/// A mapping of device pages into an address space.
///
/// Pages are bound lazily: nothing is bound until the first access to the
/// page faults. A bound page holds a reference to its frame until the
/// mapping is dropped.
///
/// A private mapping binds device pages read-only. The first write to such a
/// page replaces the binding with a private copy of the frame, so the device
/// page never sees the write.
pub struct VmMapping {
    map_to_addr: Vaddr,
    desc: VmAreaDesc,
    handler: Arc<dyn PageMappedDevice>,
    /// The bound pages, keyed by the page index inside the mapping.
    pages: Mutex<BTreeMap<usize, BoundPage>>,
}

struct BoundPage {
    frame: Frame,
    writable: bool,
}

impl VmMapping {
    pub(super) fn new(
        map_to_addr: Vaddr,
        desc: VmAreaDesc,
        handler: Arc<dyn PageMappedDevice>,
    ) -> Self {
        Self {
            map_to_addr,
            desc,
            handler,
            pages: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn map_to_addr(&self) -> Vaddr {
        self.map_to_addr
    }

    pub fn map_size(&self) -> usize {
        self.desc.nr_pages * PAGE_SIZE
    }

    pub fn range(&self) -> Range<Vaddr> {
        self.map_to_addr..self.map_to_addr + self.map_size()
    }

    pub fn perms(&self) -> VmPerms {
        self.desc.perms
    }

    pub fn is_shared(&self) -> bool {
        self.desc.is_shared
    }

    /// Returns the number of pages that are currently bound.
    pub fn nr_bound_pages(&self) -> usize {
        self.pages.lock().len()
    }

    /// Returns the frame bound at `addr`, if the binding allows `perms`.
    pub(super) fn query(&self, addr: Vaddr, perms: VmPerms) -> Option<Frame> {
        let page_idx = self.page_idx(addr);
        let pages = self.pages.lock();
        let page = pages.get(&page_idx)?;
        if perms.contains(VmPerms::WRITE) && !page.writable {
            return None;
        }
        Some(page.frame.clone())
    }

    /// Handles a page fault at an address inside the mapping.
    pub fn handle_page_fault(
        &self,
        page_fault_info: &PageFaultInfo,
    ) -> core::result::Result<(), VmFault> {
        self.check_perms(&page_fault_info.required_perms)?;

        let page_idx = self.page_idx(page_fault_info.address);
        let is_write = page_fault_info.required_perms.contains(VmPerms::WRITE);

        let mut pages = self.pages.lock();
        match pages.get(&page_idx) {
            // Skip if the page fault is already handled.
            Some(page) if !is_write || page.writable => {}
            Some(page) => {
                // Perform COW if it is a write access to a private mapping.
                debug_assert!(!self.desc.is_shared);
                let new_frame = duplicate_frame(&page.frame).map_err(|_| VmFault::Oom)?;
                pages.insert(
                    page_idx,
                    BoundPage {
                        frame: new_frame,
                        writable: true,
                    },
                );
            }
            None => {
                let (frame, is_readonly) = self.prepare_page(page_idx, is_write)?;
                let writable = self.desc.perms.contains(VmPerms::WRITE) && !is_readonly;
                pages.insert(page_idx, BoundPage { frame, writable });
            }
        }
        Ok(())
    }

    /// Asks the device for the page, and copies it for a write to a private mapping.
    ///
    /// Returns the frame to bind and whether the binding must be read-only.
    fn prepare_page(
        &self,
        page_idx: usize,
        write: bool,
    ) -> core::result::Result<(Frame, bool), VmFault> {
        let page = self.handler.fault(self.desc.pgoff + page_idx)?;

        if !self.desc.is_shared && write {
            // The reference taken by the device is dropped with `page`.
            let copy = duplicate_frame(&page).map_err(|_| VmFault::Oom)?;
            Ok((copy, false))
        } else {
            // A read of a private mapping binds the device page read-only. A
            // later write faults again and performs the COW.
            Ok((page, !self.desc.is_shared))
        }
    }

    fn check_perms(&self, required: &VmPerms) -> core::result::Result<(), VmFault> {
        if self.desc.perms.contains(*required) {
            Ok(())
        } else {
            Err(VmFault::SigSegv)
        }
    }

    fn page_idx(&self, addr: Vaddr) -> usize {
        debug_assert!(self.range().contains(&addr));
        (addr - self.map_to_addr) / PAGE_SIZE
    }
}

impl Debug for VmMapping {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VmMapping")
            .field("range", &format_args!("{:#x?}", self.range()))
            .field("desc", &self.desc)
            .finish()
    }
}
