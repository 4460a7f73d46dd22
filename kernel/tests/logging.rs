// SPDX-License-Identifier: MPL-2.0

//! Log records of the device, captured from a console.

mod common;

use std::sync::{Arc, Mutex};

use common::*;
use kernel_mmap_device::{KernelMmapDevice, KmdConfig, device::PageMappedDevice};
use kmd_logger::Console;
use log::LevelFilter;

#[derive(Default)]
struct CaptureConsole(Mutex<Vec<u8>>);

impl CaptureConsole {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Console for CaptureConsole {
    fn send(&self, buf: &[u8]) {
        self.0.lock().unwrap().extend_from_slice(buf);
    }
}

#[test]
fn start_up_and_shutdown_records() {
    let console = Arc::new(CaptureConsole::default());
    kmd_logger::register_console("capture", console.clone());
    kmd_logger::init(LevelFilter::Info).unwrap();

    for (step, message) in [
        (Step::AllocDeviceNumbers, "kmd: can't allocate chrdev region"),
        (Step::RegisterCharDevice, "kmd: can't add character device"),
        (Step::CreateClass, "kmd: can't create class"),
        (Step::CreateDeviceNode, "kmd: can't create device"),
    ] {
        let host = Host::new(1);
        let framework = Arc::new(RecordingFramework::new(host.registry.clone(), Some(step)));
        KernelMmapDevice::start(framework, &host.allocator, KmdConfig::default()).unwrap_err();
        assert!(console.text().contains(message), "{step:?}");
    }

    let host = Host::new(0);
    KernelMmapDevice::start(host.registry.clone(), &host.allocator, KmdConfig::default())
        .unwrap_err();
    assert!(console.text().contains("WARN  kernel_mmap_device::kmd: kmd: can't allocate page"));

    let host = Host::new(1);
    let kmd = host.start();
    assert!(console.text().contains("kmd: /dev/kernel-mmap-device is ready"));
    kmd.stop();
    assert!(console.text().contains("kmd: stop /dev/kernel-mmap-device"));
    assert!(!console.text().contains("bindings still live"));

    let kmd = host.start();
    let binding = kmd.device().fault(0).unwrap();
    kmd.stop();
    assert!(console.text().contains("kmd: free the page with 1 bindings still live"));
    drop(binding);
    assert!(host.is_pristine());

    kmd_logger::unregister_console("capture");
}
