// SPDX-License-Identifier: MPL-2.0

//! The kernel mmap device driver.
//!
//! The driver shares one zeroed page, read-only, with every process that
//! maps its device node. Start-up acquires, in order:
//!  1. the shared page;
//!  2. a device number;
//!  3. the character device registration;
//!  4. the device class;
//!  5. the device node.
//!
//! A failing step releases the steps before it in reverse order. Shutdown
//! releases all of them in reverse order.

mod fault;
mod lifecycle;
mod page;
mod policy;

pub use fault::SharedPageDevice;
use lifecycle::{CharDevGuard, ClassGuard, DeviceNodeGuard, DeviceNumbersGuard, PageGuard};
pub use page::SharedPage;
pub use policy::{decide_fault, decide_open};

use crate::{config::KmdConfig, device::RegistrationFramework, mm::FrameAllocator, prelude::*};

/// A started kernel mmap device.
///
/// Dropping it shuts the device down like [`KernelMmapDevice::stop`] does,
/// only without the log records.
pub struct KernelMmapDevice {
    // Fields are dropped in declaration order, the reverse of acquisition.
    node: DeviceNodeGuard,
    class: ClassGuard,
    cdev: CharDevGuard,
    numbers: DeviceNumbersGuard,
    page: PageGuard,
    config: KmdConfig,
}

impl KernelMmapDevice {
    /// Starts the device.
    ///
    /// On failure, nothing acquired so far is left behind.
    pub fn start(
        framework: Arc<dyn RegistrationFramework>,
        allocator: &Arc<dyn FrameAllocator>,
        config: KmdConfig,
    ) -> Result<Self> {
        let page = SharedPage::alloc(allocator)
            .inspect_err(|_| warn!("kmd: can't allocate page"))?;
        let device = Arc::new(SharedPageDevice::new(page));
        let page = PageGuard(device.clone());

        let range = framework
            .alloc_device_numbers(config.base_minor, 1, &config.device_name)
            .inspect_err(|_| warn!("kmd: can't allocate chrdev region"))?;
        let numbers = DeviceNumbersGuard {
            framework: framework.clone(),
            range,
        };

        let handle = framework
            .register_char_device(range, device)
            .inspect_err(|_| warn!("kmd: can't add character device"))?;
        let cdev = CharDevGuard {
            framework: framework.clone(),
            handle: Some(handle),
        };

        let class_handle = framework
            .create_class(&config.class_name)
            .inspect_err(|_| warn!("kmd: can't create class"))?;
        let node_handle =
            framework.create_device_node(&class_handle, range.base(), &config.device_name);
        let class = ClassGuard {
            framework: framework.clone(),
            handle: Some(class_handle),
        };

        let handle = node_handle.inspect_err(|_| warn!("kmd: can't create device"))?;
        let node = DeviceNodeGuard {
            framework,
            handle: Some(handle),
        };

        info!(
            "kmd: {} is ready with device number {}",
            config.node_path(),
            range.base()
        );

        Ok(Self {
            node,
            class,
            cdev,
            numbers,
            page,
            config,
        })
    }

    /// Shuts the device down.
    ///
    /// The device node, the class, the character device, the device number
    /// and the page are released in this order. Mappings that are still live
    /// keep their bindings of the page, which goes back to the allocator
    /// once they are all gone.
    pub fn stop(self) {
        let Self {
            node,
            class,
            cdev,
            numbers,
            page,
            config,
        } = self;
        info!("kmd: stop {}", config.node_path());

        drop(node);
        drop(class);
        drop(cdev);
        drop(numbers);
        drop(page);
    }

    /// Returns the device number of the device.
    pub fn device_id(&self) -> DeviceId {
        self.numbers.range.base()
    }

    pub fn config(&self) -> &KmdConfig {
        &self.config
    }

    /// Returns the number of live bindings of the shared page.
    pub fn nr_bindings(&self) -> usize {
        self.page.0.nr_bindings()
    }

    /// Returns the device registered with the framework.
    pub fn device(&self) -> &Arc<SharedPageDevice> {
        &self.page.0
    }
}

impl Debug for KernelMmapDevice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KernelMmapDevice")
            .field("device_id", &self.device_id())
            .field("config", &self.config)
            .field("device", &self.page.0)
            .finish()
    }
}

/// Loads the driver.
///
/// The configuration is read from the kernel command line `cmdline`.
pub fn module_init(
    framework: Arc<dyn RegistrationFramework>,
    allocator: &Arc<dyn FrameAllocator>,
    cmdline: &str,
) -> Result<KernelMmapDevice> {
    let config = KmdConfig::from_cmdline(cmdline)?;
    if let Err(err) = kmd_logger::init(config.log_level) {
        warn!("kmd: {}, keep the installed logger", err);
    }
    debug!("kmd: {:?}", config);

    KernelMmapDevice::start(framework, allocator, config)
}

/// Unloads the driver.
pub fn module_exit(device: KernelMmapDevice) {
    device.stop();
}
