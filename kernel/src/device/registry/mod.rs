// SPDX-License-Identifier: MPL-2.0

//! The framework that numbers character devices and publishes them as
//! device nodes.

mod char;

pub use char::DevRegistry;

use super::PageMappedDevice;
use crate::prelude::*;

/// The services a driver needs to make a character device usable.
///
/// Each acquiring method returns the resource it created, and each releasing
/// method consumes it. Releasing never fails.
pub trait RegistrationFramework: Send + Sync {
    /// Allocates `count` device numbers under a free major number.
    fn alloc_device_numbers(
        &self,
        base_minor: MinorId,
        count: u32,
        name: &str,
    ) -> Result<DeviceIdRange>;

    /// Returns device numbers obtained from [`Self::alloc_device_numbers`].
    fn release_device_numbers(&self, range: DeviceIdRange);

    /// Routes opens of the device numbers in `range` to `device`.
    fn register_char_device(
        &self,
        range: DeviceIdRange,
        device: Arc<dyn PageMappedDevice>,
    ) -> Result<CharDevHandle>;

    fn unregister_char_device(&self, handle: CharDevHandle);

    /// Creates a device class, which makes its devices discoverable.
    fn create_class(&self, name: &str) -> Result<ClassHandle>;

    fn destroy_class(&self, handle: ClassHandle);

    /// Creates the device node `/dev/<name>` for the device number `id`.
    fn create_device_node(
        &self,
        class: &ClassHandle,
        id: DeviceId,
        name: &str,
    ) -> Result<DeviceNodeHandle>;

    fn destroy_device_node(&self, handle: DeviceNodeHandle);
}

/// A registered character device.
#[derive(Debug, PartialEq, Eq)]
pub struct CharDevHandle {
    range: DeviceIdRange,
}

impl CharDevHandle {
    pub fn new(range: DeviceIdRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> DeviceIdRange {
        self.range
    }
}

/// A created device class.
#[derive(Debug, PartialEq, Eq)]
pub struct ClassHandle {
    id: u64,
    name: String,
}

impl ClassHandle {
    pub fn new(id: u64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A created device node.
#[derive(Debug, PartialEq, Eq)]
pub struct DeviceNodeHandle {
    class_id: u64,
    device_id: DeviceId,
    name: String,
}

impl DeviceNodeHandle {
    pub fn new(class: &ClassHandle, device_id: DeviceId, name: &str) -> Self {
        Self {
            class_id: class.id(),
            device_id,
            name: name.to_string(),
        }
    }

    pub fn class_id(&self) -> u64 {
        self.class_id
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
