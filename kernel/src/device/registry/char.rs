// SPDX-License-Identifier: MPL-2.0

//! An in-memory registration framework for character devices.

use core::ops::Range;

use super::{CharDevHandle, ClassHandle, DeviceNodeHandle, RegistrationFramework};
use crate::{device::PageMappedDevice, prelude::*};

/// The ranges of free char majors.
///
/// Reference: <https://elixir.bootlin.com/linux/v6.13/source/include/linux/fs.h#L2840>.
const DYNAMIC_MAJOR_ID_RANGES: [Range<u16>; 2] = [234..255, 384..512];

/// The directory where device nodes live.
const DEV_DIR: &str = "/dev/";

/// The registry of device numbers, character devices, classes and device
/// nodes.
///
/// Opening a device goes through [`DevRegistry::lookup`], which resolves a
/// device node to the character device registered for its device number.
pub struct DevRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    /// The allocated majors and the name of their owners.
    majors: BTreeMap<u16, String>,
    /// The registered character devices, keyed by the raw base of their range.
    cdevs: BTreeMap<u32, (DeviceIdRange, Arc<dyn PageMappedDevice>)>,
    classes: BTreeMap<u64, String>,
    next_class_id: u64,
    /// The device nodes, keyed by their name under `/dev`.
    nodes: BTreeMap<String, (u64, DeviceId)>,
}

impl DevRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// Resolves a device node path to its device number and character device.
    pub fn lookup(&self, path: &str) -> Option<(DeviceId, Arc<dyn PageMappedDevice>)> {
        let name = path.strip_prefix(DEV_DIR)?;
        let inner = self.inner.lock();
        let (_, device_id) = inner.nodes.get(name)?;
        inner
            .cdevs
            .values()
            .find(|(range, _)| range.contains(*device_id))
            .map(|(_, device)| (*device_id, device.clone()))
    }

    /// Returns the name that allocated `major`.
    pub fn major_owner(&self, major: MajorId) -> Option<String> {
        self.inner.lock().majors.get(&major.get()).cloned()
    }

    pub fn nr_majors(&self) -> usize {
        self.inner.lock().majors.len()
    }

    pub fn nr_cdevs(&self) -> usize {
        self.inner.lock().cdevs.len()
    }

    pub fn nr_classes(&self) -> usize {
        self.inner.lock().classes.len()
    }

    pub fn nr_nodes(&self) -> usize {
        self.inner.lock().nodes.len()
    }

    /// Returns whether nothing is registered at all.
    pub fn is_empty(&self) -> bool {
        let inner = self.inner.lock();
        inner.majors.is_empty()
            && inner.cdevs.is_empty()
            && inner.classes.is_empty()
            && inner.nodes.is_empty()
    }
}

impl Default for DevRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationFramework for DevRegistry {
    fn alloc_device_numbers(
        &self,
        base_minor: MinorId,
        count: u32,
        name: &str,
    ) -> Result<DeviceIdRange> {
        let mut inner = self.inner.lock();

        let Some(major) = DYNAMIC_MAJOR_ID_RANGES
            .iter()
            .flat_map(|range| range.clone().rev())
            .find(|id| !inner.majors.contains_key(id))
        else {
            return_errno_with_message!(Errno::ENOSPC, "no more major IDs are available");
        };

        let base = DeviceId::new(MajorId::new(major), base_minor);
        let Some(range) = DeviceIdRange::new(base, count) else {
            return_errno_with_message!(Errno::EINVAL, "the minor range is invalid");
        };

        inner.majors.insert(major, name.to_string());
        debug!("allocate device numbers {}+{} for {}", base, count, name);
        Ok(range)
    }

    fn release_device_numbers(&self, range: DeviceIdRange) {
        if self
            .inner
            .lock()
            .majors
            .remove(&range.major().get())
            .is_none()
        {
            warn!("release device numbers {} that are not allocated", range.base());
        }
    }

    fn register_char_device(
        &self,
        range: DeviceIdRange,
        device: Arc<dyn PageMappedDevice>,
    ) -> Result<CharDevHandle> {
        let mut inner = self.inner.lock();

        let overlaps = inner.cdevs.values().any(|(registered, _)| {
            registered.contains(range.base()) || range.contains(registered.base())
        });
        if overlaps {
            return_errno_with_message!(Errno::EEXIST, "the char device already exists");
        }

        inner.cdevs.insert(range.base().to_raw(), (range, device));
        Ok(CharDevHandle::new(range))
    }

    fn unregister_char_device(&self, handle: CharDevHandle) {
        let base = handle.range().base();
        if self.inner.lock().cdevs.remove(&base.to_raw()).is_none() {
            warn!("unregister char device {} that is not registered", base);
        }
    }

    fn create_class(&self, name: &str) -> Result<ClassHandle> {
        let mut inner = self.inner.lock();
        if name.is_empty() {
            return_errno_with_message!(Errno::EINVAL, "the class name is empty");
        }
        if inner.classes.values().any(|class| class == name) {
            return_errno_with_message!(Errno::EEXIST, "the class already exists");
        }

        let id = inner.next_class_id;
        inner.next_class_id += 1;
        inner.classes.insert(id, name.to_string());
        Ok(ClassHandle::new(id, name))
    }

    fn destroy_class(&self, handle: ClassHandle) {
        let mut inner = self.inner.lock();
        if inner.classes.remove(&handle.id()).is_none() {
            warn!("destroy class {} that does not exist", handle.name());
            return;
        }
        if inner
            .nodes
            .values()
            .any(|(class_id, _)| *class_id == handle.id())
        {
            warn!("class {} is destroyed with device nodes left", handle.name());
        }
    }

    fn create_device_node(
        &self,
        class: &ClassHandle,
        id: DeviceId,
        name: &str,
    ) -> Result<DeviceNodeHandle> {
        if name.is_empty() || name.contains('/') {
            return_errno_with_message!(Errno::EINVAL, "the device node name is invalid");
        }

        let mut inner = self.inner.lock();
        if !inner.classes.contains_key(&class.id()) {
            return_errno_with_message!(Errno::ENOENT, "the class does not exist");
        }
        if inner.nodes.contains_key(name) {
            return_errno_with_message!(Errno::EEXIST, "the device node already exists");
        }

        inner.nodes.insert(name.to_string(), (class.id(), id));
        debug!("create device node {}{} ({})", DEV_DIR, name, id);
        Ok(DeviceNodeHandle::new(class, id, name))
    }

    fn destroy_device_node(&self, handle: DeviceNodeHandle) {
        if self.inner.lock().nodes.remove(handle.name()).is_none() {
            warn!("destroy device node {} that does not exist", handle.name());
        }
    }
}
