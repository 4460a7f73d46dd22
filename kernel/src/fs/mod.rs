// SPDX-License-Identifier: MPL-2.0

//! Files opened on device nodes.

mod access_mode;
mod file;
mod file_table;

pub use access_mode::{AccessMode, O_ACCMODE};
pub use file::OpenFile;
pub use file_table::{FileDesc, FileTable};
