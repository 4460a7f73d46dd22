// SPDX-License-Identifier: MPL-2.0

//! The access rules of the device.
//!
//! Both checks are pure: they look at nothing but their argument.

use crate::{fs::AccessMode, prelude::*, vm::VmFault};

/// Decides whether the device can be opened with `access_mode`.
///
/// Only read-only opens are granted.
pub fn decide_open(access_mode: AccessMode) -> Result<()> {
    if access_mode.is_writable() {
        return_errno_with_message!(Errno::EACCES, "the device cannot be opened for writing");
    }
    Ok(())
}

/// Decides whether a fault on the device page `page_idx` can be resolved.
///
/// Only the first page is backed; every other page is a bus error.
pub fn decide_fault(page_idx: usize) -> core::result::Result<(), VmFault> {
    if page_idx != 0 {
        return Err(VmFault::SigBus);
    }
    Ok(())
}
