// SPDX-License-Identifier: MPL-2.0

//! The logging backend.
//!
//! Log records produced through the [`log`] facade are formatted by
//! [`KmdLogger`](kmd_logger) and fanned out to every registered [`Console`].
//! Nothing is printed until at least one console has been registered.

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

mod console;
mod kmd_logger;

pub use console::{_print, all_console_names, register_console, unregister_console, Console};
pub use kmd_logger::init;
