// SPDX-License-Identifier: MPL-2.0

use crate::prelude::*;

/// The mask of the access mode bits in the open flags.
pub const O_ACCMODE: u32 = 0o3;

#[expect(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AccessMode {
    /// read only
    O_RDONLY = 0,
    /// write only
    O_WRONLY = 1,
    /// read write
    O_RDWR = 2,
}

impl AccessMode {
    /// Extracts the access mode from the flags passed to `open`.
    ///
    /// Bits outside of [`O_ACCMODE`] are ignored.
    pub fn from_open_flags(flags: u32) -> Result<Self> {
        Self::try_from((flags & O_ACCMODE) as u8)
    }

    pub fn is_readable(&self) -> bool {
        matches!(*self, AccessMode::O_RDONLY | AccessMode::O_RDWR)
    }

    pub fn is_writable(&self) -> bool {
        matches!(*self, AccessMode::O_WRONLY | AccessMode::O_RDWR)
    }
}

impl TryFrom<u8> for AccessMode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(AccessMode::O_RDONLY),
            1 => Ok(AccessMode::O_WRONLY),
            2 => Ok(AccessMode::O_RDWR),
            _ => return_errno_with_message!(Errno::EINVAL, "invalid access mode"),
        }
    }
}
