// SPDX-License-Identifier: MPL-2.0

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use device_id::{DeviceId, DeviceIdRange, MinorId};
use kernel_mmap_device::{
    Errno, Error, KernelMmapDevice, KmdConfig, Result,
    device::{
        CharDevHandle, ClassHandle, DevRegistry, DeviceNodeHandle, PageMappedDevice,
        RegistrationFramework,
    },
    mm::{BitmapFrameAllocator, FrameAllocator},
};

pub const O_RDONLY: u32 = 0;
pub const O_WRONLY: u32 = 1;
pub const O_RDWR: u32 = 2;

pub const PROT_READ: u32 = 1;
pub const PROT_WRITE: u32 = 2;

pub const MAP_SHARED: u32 = 1;
pub const MAP_PRIVATE: u32 = 2;

pub const NODE_PATH: &str = "/dev/kernel-mmap-device";

/// A host with a device registry and a few free frames.
pub struct Host {
    pub registry: Arc<DevRegistry>,
    pub allocator: Arc<dyn FrameAllocator>,
}

impl Host {
    pub fn new(nframes: usize) -> Self {
        Self {
            registry: Arc::new(DevRegistry::new()),
            allocator: Arc::new(BitmapFrameAllocator::new(nframes)),
        }
    }

    pub fn start(&self) -> KernelMmapDevice {
        KernelMmapDevice::start(self.registry.clone(), &self.allocator, KmdConfig::default())
            .unwrap()
    }

    /// Returns whether the host is back to the state before any start-up.
    pub fn is_pristine(&self) -> bool {
        self.registry.is_empty()
            && self.allocator.nr_free_frames() == self.allocator.nr_total_frames()
    }
}

/// A framework step that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    AllocDeviceNumbers,
    RegisterCharDevice,
    CreateClass,
    CreateDeviceNode,
}

impl Step {
    pub const ALL: [Step; 4] = [
        Step::AllocDeviceNumbers,
        Step::RegisterCharDevice,
        Step::CreateClass,
        Step::CreateDeviceNode,
    ];
}

/// A framework that records every call and fails on request.
pub struct RecordingFramework {
    inner: Arc<DevRegistry>,
    fail_at: Option<Step>,
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingFramework {
    pub fn new(inner: Arc<DevRegistry>, fail_at: Option<Step>) -> Self {
        Self {
            inner,
            fail_at,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn enter(&self, call: &'static str, step: Step) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail_at == Some(step) {
            return Err(Error::with_message(Errno::EIO, "injected failure"));
        }
        Ok(())
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RegistrationFramework for RecordingFramework {
    fn alloc_device_numbers(
        &self,
        base_minor: MinorId,
        count: u32,
        name: &str,
    ) -> Result<DeviceIdRange> {
        self.enter("alloc_device_numbers", Step::AllocDeviceNumbers)?;
        self.inner.alloc_device_numbers(base_minor, count, name)
    }

    fn release_device_numbers(&self, range: DeviceIdRange) {
        self.record("release_device_numbers");
        self.inner.release_device_numbers(range)
    }

    fn register_char_device(
        &self,
        range: DeviceIdRange,
        device: Arc<dyn PageMappedDevice>,
    ) -> Result<CharDevHandle> {
        self.enter("register_char_device", Step::RegisterCharDevice)?;
        self.inner.register_char_device(range, device)
    }

    fn unregister_char_device(&self, handle: CharDevHandle) {
        self.record("unregister_char_device");
        self.inner.unregister_char_device(handle)
    }

    fn create_class(&self, name: &str) -> Result<ClassHandle> {
        self.enter("create_class", Step::CreateClass)?;
        self.inner.create_class(name)
    }

    fn destroy_class(&self, handle: ClassHandle) {
        self.record("destroy_class");
        self.inner.destroy_class(handle)
    }

    fn create_device_node(
        &self,
        class: &ClassHandle,
        id: DeviceId,
        name: &str,
    ) -> Result<DeviceNodeHandle> {
        self.enter("create_device_node", Step::CreateDeviceNode)?;
        self.inner.create_device_node(class, id, name)
    }

    fn destroy_device_node(&self, handle: DeviceNodeHandle) {
        self.record("destroy_device_node");
        self.inner.destroy_device_node(handle)
    }
}
