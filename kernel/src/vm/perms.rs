// SPDX-License-Identifier: MPL-2.0

use bitflags::bitflags;

bitflags! {
    /// The memory access permissions of memory mappings.
    ///
    /// The bits are the same as the `PROT_*` bits of `mmap`.
    pub struct VmPerms: u32 {
        /// Readable.
        const READ    = 1 << 0;
        /// Writable.
        const WRITE   = 1 << 1;
        /// Executable.
        const EXEC   = 1 << 2;
    }
}

impl VmPerms {
    /// Converts the `prot` argument of `mmap`, dropping unknown bits.
    pub fn from_prot(prot: u32) -> Self {
        let perms = Self::from_bits_truncate(prot);
        // On x86, `PROT_WRITE` implies `PROT_READ`.
        // <https://man7.org/linux/man-pages/man2/mmap.2.html>
        if perms.contains(VmPerms::WRITE) {
            perms | VmPerms::READ
        } else {
            perms
        }
    }
}
