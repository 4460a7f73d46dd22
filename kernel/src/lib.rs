// SPDX-License-Identifier: MPL-2.0

//! The kernel mmap device.
//!
//! The driver exposes exactly one kernel page through the `mmap` interface of
//! a character device. Every process that maps the device observes the same
//! physical page, and only read access is ever granted: opening the device for
//! writing is refused, and only page offset zero of a mapping is backed.
//!
//! The crate is organized like a small kernel:
//!  * [`mm`] provides physical frames and the frame allocator;
//!  * [`device`] defines the page-mapped device capability and the
//!    registration framework the driver plugs into;
//!  * [`kmd`] is the driver itself (access policy, shared page, fault
//!    resolution and the start-up/shutdown lifecycle);
//!  * [`vm`] and [`process`] model user address spaces, which is how the
//!    driver is exercised end to end.

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

pub mod config;
pub mod device;
pub mod error;
pub mod fs;
pub mod kmd;
pub mod mm;
mod prelude;
pub mod process;
pub mod vm;

pub use config::KmdConfig;
pub use error::{Errno, Error};
pub use kmd::{KernelMmapDevice, module_exit, module_init};
pub use prelude::Result;
