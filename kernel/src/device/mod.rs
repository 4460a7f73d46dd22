// SPDX-License-Identifier: MPL-2.0

//! Page-mapped character devices and the framework that makes them visible.

mod registry;

pub use registry::{
    CharDevHandle, ClassHandle, DevRegistry, DeviceNodeHandle, RegistrationFramework,
};

use crate::{
    fs::AccessMode,
    prelude::*,
    vm::{VmAreaDesc, VmFault},
};

/// A character device whose content is reached through `mmap`.
///
/// The registration framework keeps the device as the target of the `open`
/// entry point of its device numbers. A mapping of an open file keeps it as
/// the handler of its page faults.
pub trait PageMappedDevice: Send + Sync {
    /// Decides whether the device can be opened with `access_mode`.
    fn open(&self, access_mode: AccessMode) -> Result<()>;

    /// Inspects a new mapping of the device before it is created.
    ///
    /// Returning an error refuses the mapping.
    fn mmap(&self, desc: &VmAreaDesc) -> Result<()>;

    /// Resolves a page fault on the device page `page_idx`.
    ///
    /// On success, the returned frame is a new reference that the faulting
    /// address space binds and releases when the binding goes away.
    fn fault(&self, page_idx: usize) -> core::result::Result<Frame, VmFault>;
}
