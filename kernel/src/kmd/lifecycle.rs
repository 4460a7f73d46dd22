// SPDX-License-Identifier: MPL-2.0

//! Guards of the resources acquired at start-up.
//!
//! Each guard releases its resource when dropped.

use super::fault::SharedPageDevice;
use crate::{
    device::{CharDevHandle, ClassHandle, DeviceNodeHandle, RegistrationFramework},
    prelude::*,
};

/// Owns the shared page on behalf of the driver.
pub(super) struct PageGuard(pub(super) Arc<SharedPageDevice>);

impl Drop for PageGuard {
    fn drop(&mut self) {
        let nr_bindings = self.0.nr_bindings();
        if nr_bindings > 0 {
            warn!(
                "kmd: free the page with {} bindings still live",
                nr_bindings
            );
        }
        if let Some(page) = self.0.take_page() {
            page.free();
        }
    }
}

pub(super) struct DeviceNumbersGuard {
    pub(super) framework: Arc<dyn RegistrationFramework>,
    pub(super) range: DeviceIdRange,
}

impl Drop for DeviceNumbersGuard {
    fn drop(&mut self) {
        self.framework.release_device_numbers(self.range);
    }
}

pub(super) struct CharDevGuard {
    pub(super) framework: Arc<dyn RegistrationFramework>,
    pub(super) handle: Option<CharDevHandle>,
}

impl Drop for CharDevGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.framework.unregister_char_device(handle);
        }
    }
}

pub(super) struct ClassGuard {
    pub(super) framework: Arc<dyn RegistrationFramework>,
    pub(super) handle: Option<ClassHandle>,
}

impl Drop for ClassGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.framework.destroy_class(handle);
        }
    }
}

pub(super) struct DeviceNodeGuard {
    pub(super) framework: Arc<dyn RegistrationFramework>,
    pub(super) handle: Option<DeviceNodeHandle>,
}

impl Drop for DeviceNodeGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.framework.destroy_device_node(handle);
        }
    }
}
