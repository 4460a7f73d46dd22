// SPDX-License-Identifier: MPL-2.0

use super::{
    page::SharedPage,
    policy::{decide_fault, decide_open},
};
use crate::{
    device::PageMappedDevice,
    fs::AccessMode,
    prelude::*,
    vm::{VmAreaDesc, VmFault},
};

/// The device registered with the framework.
///
/// It resolves every page fault on its mappings by binding the shared page,
/// as long as the driver still holds the page. Once the page is taken away at
/// shutdown, all faults are bus errors, while bindings made before keep
/// working.
pub struct SharedPageDevice {
    page: RwLock<Option<SharedPage>>,
}

impl SharedPageDevice {
    pub fn new(page: SharedPage) -> Self {
        Self {
            page: RwLock::new(Some(page)),
        }
    }

    /// Takes the shared page away from the device.
    pub(super) fn take_page(&self) -> Option<SharedPage> {
        self.page.write().take()
    }

    /// Returns the number of live bindings of the shared page.
    pub fn nr_bindings(&self) -> usize {
        self.page
            .read()
            .as_ref()
            .map_or(0, |page| page.nr_bindings())
    }

    /// Returns the physical address of the shared page.
    pub fn page_paddr(&self) -> Option<Paddr> {
        self.page.read().as_ref().map(|page| page.paddr())
    }
}

impl PageMappedDevice for SharedPageDevice {
    fn open(&self, access_mode: AccessMode) -> Result<()> {
        decide_open(access_mode)
    }

    fn mmap(&self, desc: &VmAreaDesc) -> Result<()> {
        // Admission happens page by page at fault time.
        trace!("kmd: mmap {:?}", desc);
        Ok(())
    }

    fn fault(&self, page_idx: usize) -> core::result::Result<Frame, VmFault> {
        decide_fault(page_idx)?;

        let page = self.page.read();
        let Some(page) = page.as_ref() else {
            debug!("kmd: fault after the page is freed");
            return Err(VmFault::SigBus);
        };
        Ok(page.acquire_binding())
    }
}

impl Debug for SharedPageDevice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedPageDevice")
            .field("page", &*self.page.read())
            .finish()
    }
}
