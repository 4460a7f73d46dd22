// SPDX-License-Identifier: MPL-2.0

//! Start-up and shutdown of the device.

mod common;

use std::sync::Arc;

use common::*;
use device_id::MinorId;
use kernel_mmap_device::{
    Errno, KernelMmapDevice, KmdConfig, device::RegistrationFramework, mm::PAGE_SIZE,
    module_exit, module_init, process::Process, vm::SigNum,
};

const ACQUIRE_CALLS: [&str; 4] = [
    "alloc_device_numbers",
    "register_char_device",
    "create_class",
    "create_device_node",
];

const RELEASE_CALLS: [&str; 4] = [
    "destroy_device_node",
    "destroy_class",
    "unregister_char_device",
    "release_device_numbers",
];

#[test]
fn teardown_reverses_start_up() {
    let host = Host::new(1);
    let framework = Arc::new(RecordingFramework::new(host.registry.clone(), None));
    let kmd = KernelMmapDevice::start(framework.clone(), &host.allocator, KmdConfig::default())
        .unwrap();
    assert_eq!(framework.calls(), ACQUIRE_CALLS);
    assert!(host.registry.lookup(NODE_PATH).is_some());

    kmd.stop();
    let calls = framework.calls();
    assert_eq!(calls[..4], ACQUIRE_CALLS);
    assert_eq!(calls[4..], RELEASE_CALLS);
    assert!(host.is_pristine());
}

#[test]
fn failure_at_any_step_releases_everything() {
    for (nth, step) in Step::ALL.into_iter().enumerate() {
        let host = Host::new(1);
        let framework = Arc::new(RecordingFramework::new(host.registry.clone(), Some(step)));
        let error =
            KernelMmapDevice::start(framework.clone(), &host.allocator, KmdConfig::default())
                .unwrap_err();
        assert_eq!(error.error(), Errno::EIO, "{step:?}");

        // The acquired prefix is released in reverse, and nothing else.
        let calls = framework.calls();
        assert_eq!(calls[..=nth], ACQUIRE_CALLS[..=nth], "{step:?}");
        assert_eq!(calls[nth + 1..], RELEASE_CALLS[4 - nth..], "{step:?}");

        assert!(host.is_pristine(), "{step:?}");
        assert!(host.registry.lookup(NODE_PATH).is_none(), "{step:?}");
    }
}

#[test]
fn failure_to_allocate_the_page() {
    let host = Host::new(0);
    let framework = Arc::new(RecordingFramework::new(host.registry.clone(), None));
    let error = KernelMmapDevice::start(framework.clone(), &host.allocator, KmdConfig::default())
        .unwrap_err();
    assert_eq!(error.error(), Errno::ENOMEM);
    assert!(framework.calls().is_empty());
    assert!(host.is_pristine());
}

#[test]
fn exhausted_device_numbers() {
    let host = Host::new(1);
    let mut taken = Vec::new();
    while let Ok(range) = host
        .registry
        .alloc_device_numbers(MinorId::new(0), 1, "hog")
    {
        taken.push(range);
    }

    let error =
        KernelMmapDevice::start(host.registry.clone(), &host.allocator, KmdConfig::default())
            .unwrap_err();
    assert_eq!(error.error(), Errno::ENOSPC);
    assert_eq!(host.allocator.nr_free_frames(), 1);
    assert_eq!(host.registry.nr_cdevs(), 0);
    assert_eq!(host.registry.nr_majors(), taken.len());
}

#[test]
fn restart_after_stop() {
    let host = Host::new(1);
    for _ in 0..3 {
        let kmd = host.start();
        let process = Process::new(1, host.registry.clone());
        let fd = process.open(NODE_PATH, O_RDONLY).unwrap();
        let addr = process
            .mmap(0, PAGE_SIZE, PROT_READ, MAP_SHARED, fd, 0)
            .unwrap();
        let mut buf = [0xffu8; 8];
        process.read_bytes(addr, &mut buf).unwrap();
        assert_eq!(buf, [0; 8]);

        drop(process);
        kmd.stop();
        assert!(host.is_pristine());
    }
}

#[test]
fn live_mapping_across_stop() {
    let host = Host::new(1);
    let kmd = host.start();
    let process = Process::new(1, host.registry.clone());
    let fd = process.open(NODE_PATH, O_RDONLY).unwrap();
    let touched = process
        .mmap(0, PAGE_SIZE, PROT_READ, MAP_SHARED, fd, 0)
        .unwrap();
    let untouched = process
        .mmap(0, PAGE_SIZE, PROT_READ, MAP_SHARED, fd, 0)
        .unwrap();
    let mut buf = [0xffu8; 1];
    process.read_bytes(touched, &mut buf).unwrap();
    assert_eq!(kmd.nr_bindings(), 1);

    kmd.stop();
    assert!(host.registry.is_empty());
    assert_eq!(
        process.open(NODE_PATH, O_RDONLY).unwrap_err().error(),
        Errno::ENOENT
    );

    // The bound page stays readable and keeps its frame.
    process.read_bytes(touched, &mut buf).unwrap();
    assert_eq!(buf, [0]);
    assert_eq!(host.allocator.nr_free_frames(), 0);

    // The page cannot be bound anymore.
    let signal = process.read_bytes(untouched, &mut buf).unwrap_err();
    assert_eq!(signal.signum, SigNum::SIGBUS);

    process.munmap(touched, PAGE_SIZE).unwrap();
    assert!(host.is_pristine());
}

#[test]
fn module_entry_points() {
    let host = Host::new(1);
    let kmd = module_init(
        host.registry.clone(),
        &host.allocator,
        "root=/dev/vda kmd.name=kmd kmd.class=mmap kmd.log_level=warn -- init",
    )
    .unwrap();
    assert_eq!(kmd.config().device_name, "kmd");
    assert!(host.registry.lookup("/dev/kmd").is_some());
    assert!(host.registry.lookup(NODE_PATH).is_none());

    module_exit(kmd);
    assert!(host.is_pristine());
}
