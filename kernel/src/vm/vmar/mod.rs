// SPDX-License-Identifier: MPL-2.0

//! User address space management.

mod vm_mapping;

use core::ops::Range;

pub use vm_mapping::{VmAreaDesc, VmMapping};

use super::{
    fault::{FaultSignal, PageFaultInfo, VmFault},
    perms::VmPerms,
};
use crate::{device::PageMappedDevice, prelude::*};

pub const VMAR_LOWEST_ADDR: Vaddr = 0x001_0000; // 64 KiB is the Linux configurable default
pub const VMAR_CAP_ADDR: Vaddr = 0x8000_0000_0000;

/// Where the search for a free region starts when the caller gives no address.
const MMAP_BASE: Vaddr = 0x1000_0000;

/// Returns whether the input `vaddr` is a legal user space virtual address.
pub fn is_userspace_vaddr(vaddr: Vaddr) -> bool {
    (VMAR_LOWEST_ADDR..VMAR_CAP_ADDR).contains(&vaddr)
}

/// The virtual memory address region of a process.
///
/// It owns all the mappings of the process. Bound frames stay alive as long as
/// the mapping that binds them, so dropping a `Vmar` releases every binding.
pub struct Vmar {
    inner: RwLock<VmarInner>,
}

struct VmarInner {
    /// The mappings, keyed by their start address.
    vm_mappings: BTreeMap<Vaddr, Arc<VmMapping>>,
}

impl VmarInner {
    fn find(&self, addr: Vaddr) -> Option<&Arc<VmMapping>> {
        self.vm_mappings
            .range(..=addr)
            .next_back()
            .map(|(_, mapping)| mapping)
            .filter(|mapping| mapping.range().contains(&addr))
    }

    fn overlapping(&self, range: &Range<Vaddr>) -> Vec<Vaddr> {
        self.vm_mappings
            .range(..range.end)
            .filter(|(_, mapping)| mapping.range().end > range.start)
            .map(|(addr, _)| *addr)
            .collect()
    }

    fn alloc_free_region(&self, size: usize) -> Result<Vaddr> {
        let mut candidate = MMAP_BASE;
        for mapping in self.vm_mappings.values() {
            let range = mapping.range();
            if range.end <= candidate {
                continue;
            }
            if range.start >= candidate && range.start - candidate >= size {
                break;
            }
            candidate = range.end;
        }

        match candidate.checked_add(size) {
            Some(end) if end <= VMAR_CAP_ADDR => Ok(candidate),
            _ => return_errno_with_message!(Errno::ENOMEM, "no free region for the mapping"),
        }
    }
}

impl Vmar {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(VmarInner {
                vm_mappings: BTreeMap::new(),
            }),
        }
    }

    /// Creates a mapping into the VMAR through a set of VMAR mapping options.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let addr = vmar
    ///     .new_map(PAGE_SIZE, VmPerms::READ)?
    ///     .is_shared(true)
    ///     .handler(device, 0)
    ///     .build()?;
    /// ```
    pub fn new_map(&self, size: usize, perms: VmPerms) -> Result<VmarMapOptions<'_>> {
        if size == 0 || size % PAGE_SIZE != 0 {
            return_errno_with_message!(Errno::EINVAL, "invalid mapping size");
        }
        Ok(VmarMapOptions {
            parent: self,
            size,
            perms,
            offset: None,
            can_overwrite: false,
            is_shared: false,
            handler: None,
            handler_pgoff: 0,
        })
    }

    /// Unmaps the mappings in `[addr, addr + len)`.
    ///
    /// Only whole mappings can be removed. Unmapping a range without any
    /// mapping succeeds.
    pub fn unmap(&self, addr: Vaddr, len: usize) -> Result<()> {
        if addr % PAGE_SIZE != 0 {
            return_errno_with_message!(Errno::EINVAL, "unmap address is not page-aligned");
        }
        if len == 0 {
            return_errno_with_message!(Errno::EINVAL, "unmap len cannot be zero");
        }
        let end = len
            .checked_next_multiple_of(PAGE_SIZE)
            .and_then(|len| addr.checked_add(len))
            .ok_or(Error::with_message(Errno::EINVAL, "unmap range overflows"))?;
        let range = addr..end;

        let mut inner = self.inner.write();
        let overlapping = inner.overlapping(&range);
        for start in overlapping.iter() {
            let mapping_range = inner.vm_mappings[start].range();
            if mapping_range.start < range.start || mapping_range.end > range.end {
                return_errno_with_message!(Errno::EINVAL, "partial unmapping is not supported");
            }
        }
        for start in overlapping {
            let mapping = inner.vm_mappings.remove(&start);
            trace!("unmap {:?}", mapping);
        }
        Ok(())
    }

    /// Handles a page fault at the address given in `page_fault_info`.
    pub fn handle_page_fault(
        &self,
        page_fault_info: &PageFaultInfo,
    ) -> core::result::Result<(), VmFault> {
        let address = page_fault_info.address;
        let inner = self.inner.read();
        let Some(mapping) = inner.find(address) else {
            return Err(VmFault::SigSegv);
        };
        mapping.handle_page_fault(page_fault_info)
    }

    /// Reads bytes at `vaddr` into `buf`, faulting pages in as a load would.
    pub fn read_bytes(
        &self,
        vaddr: Vaddr,
        buf: &mut [u8],
    ) -> core::result::Result<(), FaultSignal> {
        let mut done = 0;
        while done < buf.len() {
            let addr = vaddr
                .checked_add(done)
                .ok_or(FaultSignal::new(VmFault::SigSegv, vaddr))?;
            let (frame, offset) = self.translate(addr, VmPerms::READ)?;
            let len = (PAGE_SIZE - offset).min(buf.len() - done);
            frame
                .read_bytes(offset, &mut buf[done..done + len])
                .map_err(|_| FaultSignal::new(VmFault::SigSegv, addr))?;
            done += len;
        }
        Ok(())
    }

    /// Writes the bytes of `buf` at `vaddr`, faulting pages in as a store would.
    pub fn write_bytes(&self, vaddr: Vaddr, buf: &[u8]) -> core::result::Result<(), FaultSignal> {
        let mut done = 0;
        while done < buf.len() {
            let addr = vaddr
                .checked_add(done)
                .ok_or(FaultSignal::new(VmFault::SigSegv, vaddr))?;
            let (frame, offset) = self.translate(addr, VmPerms::WRITE)?;
            let len = (PAGE_SIZE - offset).min(buf.len() - done);
            frame
                .write_bytes(offset, &buf[done..done + len])
                .map_err(|_| FaultSignal::new(VmFault::SigSegv, addr))?;
            done += len;
        }
        Ok(())
    }

    /// Returns the mapping that contains `addr`.
    pub fn find_mapping(&self, addr: Vaddr) -> Option<Arc<VmMapping>> {
        self.inner.read().find(addr).cloned()
    }

    /// Returns the number of mappings.
    pub fn nr_mappings(&self) -> usize {
        self.inner.read().vm_mappings.len()
    }

    /// Removes all mappings, releasing every bound frame.
    pub fn clear(&self) {
        self.inner.write().vm_mappings.clear();
    }

    /// Gets the frame bound at `addr` for an access requiring `perms`,
    /// resolving a page fault first if there is no suitable binding yet.
    fn translate(
        &self,
        addr: Vaddr,
        perms: VmPerms,
    ) -> core::result::Result<(Frame, usize), FaultSignal> {
        let offset = addr % PAGE_SIZE;
        let inner = self.inner.read();
        let mapping = inner
            .find(addr)
            .ok_or(FaultSignal::new(VmFault::SigSegv, addr))?;

        loop {
            if let Some(frame) = mapping.query(addr, perms) {
                return Ok((frame, offset));
            }
            let page_fault_info = PageFaultInfo {
                address: addr,
                required_perms: perms,
            };
            mapping
                .handle_page_fault(&page_fault_info)
                .map_err(|fault| FaultSignal::new(fault, addr))?;
        }
    }

    fn add_mapping(&self, options: VmarMapOptions<'_>) -> Result<Vaddr> {
        let Some(handler) = options.handler else {
            return_errno_with_message!(Errno::EINVAL, "the mapping has no page handler");
        };

        let mut inner = self.inner.write();
        let map_to_addr = match options.offset {
            Some(offset) => {
                let range = offset..offset + options.size;
                let overlapping = inner.overlapping(&range);
                if !overlapping.is_empty() {
                    if !options.can_overwrite {
                        return_errno_with_message!(Errno::EEXIST, "the range is already mapped");
                    }
                    for start in overlapping.iter() {
                        let mapping_range = inner.vm_mappings[start].range();
                        if mapping_range.start < range.start || mapping_range.end > range.end {
                            return_errno_with_message!(
                                Errno::EINVAL,
                                "partial overwriting is not supported"
                            );
                        }
                    }
                    for start in overlapping {
                        let mapping = inner.vm_mappings.remove(&start);
                        trace!("overwrite {:?}", mapping);
                    }
                }
                offset
            }
            None => inner.alloc_free_region(options.size)?,
        };

        let desc = VmAreaDesc {
            perms: options.perms,
            is_shared: options.is_shared,
            pgoff: options.handler_pgoff,
            nr_pages: options.size / PAGE_SIZE,
        };
        let mapping = VmMapping::new(map_to_addr, desc, handler);
        trace!(
            "build mapping, map_range = 0x{:x}- 0x{:x}",
            map_to_addr,
            map_to_addr + options.size
        );
        inner.vm_mappings.insert(map_to_addr, Arc::new(mapping));
        Ok(map_to_addr)
    }
}

impl Default for Vmar {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Vmar {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.inner.read();
        f.debug_list().entries(inner.vm_mappings.values()).finish()
    }
}

/// Options for creating a new mapping.
pub struct VmarMapOptions<'a> {
    parent: &'a Vmar,
    size: usize,
    perms: VmPerms,
    offset: Option<Vaddr>,
    can_overwrite: bool,
    is_shared: bool,
    handler: Option<Arc<dyn PageMappedDevice>>,
    handler_pgoff: usize,
}

impl VmarMapOptions<'_> {
    /// Sets the address of the new mapping.
    ///
    /// Without it, the VMAR picks a free region.
    pub fn offset(mut self, offset: Vaddr) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets whether the mapping can replace the mappings already in its range.
    pub fn can_overwrite(mut self, can_overwrite: bool) -> Self {
        self.can_overwrite = can_overwrite;
        self
    }

    /// Sets whether the mapping is shared with the device.
    ///
    /// Writes to a private mapping go to private copies of the pages.
    pub fn is_shared(mut self, is_shared: bool) -> Self {
        self.is_shared = is_shared;
        self
    }

    /// Sets the device that resolves page faults, and the device page that
    /// the first page of the mapping corresponds to.
    pub fn handler(mut self, handler: Arc<dyn PageMappedDevice>, pgoff: usize) -> Self {
        self.handler = Some(handler);
        self.handler_pgoff = pgoff;
        self
    }

    /// Creates the mapping and returns its start address.
    pub fn build(self) -> Result<Vaddr> {
        self.check_options()?;
        let parent = self.parent;
        parent.add_mapping(self)
    }

    fn check_options(&self) -> Result<()> {
        if let Some(offset) = self.offset {
            if offset % PAGE_SIZE != 0 {
                return_errno_with_message!(Errno::EINVAL, "invalid mapping offset");
            }
            let end = offset.checked_add(self.size).ok_or(Errno::EINVAL)?;
            if offset < VMAR_LOWEST_ADDR || end > VMAR_CAP_ADDR {
                return_errno_with_message!(Errno::EINVAL, "the mapping is out of user space");
            }
        }
        if self.handler_pgoff.checked_add(self.size / PAGE_SIZE).is_none() {
            return_errno_with_message!(Errno::EOVERFLOW, "the device offset overflows");
        }
        Ok(())
    }
}
