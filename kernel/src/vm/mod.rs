// SPDX-License-Identifier: MPL-2.0

//! Virtual memory (VM).
//!
//! A process address space is a [`Vmar`] holding [`VmMapping`]s. Each mapping
//! is backed by a page-mapped device that resolves its page faults, one page
//! at a time, on first access.

pub mod fault;
pub mod mmap;
pub mod perms;
pub mod vmar;

pub use fault::{FaultSignal, PageFaultInfo, SigNum, VmFault};
pub use mmap::{MMapFlags, MMapOptions, MMapType, do_mmap};
pub use perms::VmPerms;
pub use vmar::{VmAreaDesc, VmMapping, Vmar, VmarMapOptions};
