// SPDX-License-Identifier: MPL-2.0

//! The `mmap` flags and the checks that turn an `mmap` request on an open
//! device file into a mapping of the address space.

use super::{
    perms::VmPerms,
    vmar::{VmAreaDesc, Vmar, is_userspace_vaddr},
};
use crate::{fs::OpenFile, prelude::*};

/// Maps `len` bytes of `file` starting at `offset` into `vmar`.
///
/// The address-space and access checks happen here, before the device sees
/// the request. The device may still refuse the mapping from its own `mmap`
/// hook, in which case nothing is mapped.
pub fn do_mmap(
    vmar: &Vmar,
    addr: Vaddr,
    len: usize,
    vm_perms: VmPerms,
    mut option: MMapOptions,
    file: &Arc<OpenFile>,
    offset: usize,
) -> Result<Vaddr> {
    debug!(
        "addr = 0x{:x}, len = 0x{:x}, perms = {:?}, option = {:?}, file = {:?}, offset = 0x{:x}",
        addr, len, vm_perms, option, file, offset
    );

    let noreplace = option.flags.contains(MMapFlags::MAP_FIXED_NOREPLACE);
    if noreplace {
        option.flags.insert(MMapFlags::MAP_FIXED);
    }

    check_option(addr, len, &option)?;

    if len == 0 {
        return_errno_with_message!(Errno::EINVAL, "mmap len cannot be zero");
    }
    if len > isize::MAX as usize {
        return_errno_with_message!(Errno::ENOMEM, "mmap len too large");
    }

    let len = len
        .checked_next_multiple_of(PAGE_SIZE)
        .ok_or(Error::with_message(Errno::ENOMEM, "mmap len too large"))?;

    if offset % PAGE_SIZE != 0 {
        return_errno_with_message!(Errno::EINVAL, "mmap only support page-aligned offset");
    }
    offset.checked_add(len).ok_or(Error::with_message(
        Errno::EOVERFLOW,
        "integer overflow when (offset + len)",
    ))?;

    if option.flags.contains(MMapFlags::MAP_ANONYMOUS) {
        return_errno_with_message!(Errno::EINVAL, "anonymous mappings are not supported");
    }

    let access_mode = file.access_mode();
    if vm_perms.contains(VmPerms::READ) && !access_mode.is_readable() {
        return_errno!(Errno::EACCES);
    }
    let is_shared = option.typ() != MMapType::Private;
    // Refused here as Linux does, rather than at the first write fault.
    if is_shared && vm_perms.contains(VmPerms::WRITE) && !access_mode.is_writable() {
        return_errno_with_message!(
            Errno::EACCES,
            "shared writable mapping of a file not opened for writing"
        );
    }

    let desc = VmAreaDesc {
        perms: vm_perms,
        is_shared,
        pgoff: offset / PAGE_SIZE,
        nr_pages: len / PAGE_SIZE,
    };
    file.device().mmap(&desc)?;

    let mut options = vmar
        .new_map(len, vm_perms)?
        .is_shared(is_shared)
        .handler(file.device().clone(), desc.pgoff);
    if option.flags.contains(MMapFlags::MAP_FIXED) {
        options = options.offset(addr).can_overwrite(!noreplace);
    } else if option.flags.contains(MMapFlags::MAP_32BIT) {
        warn!("MAP_32BIT is not supported");
    }

    options.build()
}

fn check_option(addr: Vaddr, size: usize, option: &MMapOptions) -> Result<()> {
    if option.typ() == MMapType::File {
        return_errno_with_message!(Errno::EINVAL, "Invalid mmap type");
    }

    if option.flags().contains(MMapFlags::MAP_FIXED) {
        let map_end = addr.checked_add(size).ok_or(Errno::EINVAL)?;
        if addr % PAGE_SIZE != 0
            || size == 0
            || !(is_userspace_vaddr(addr) && is_userspace_vaddr(map_end - 1))
        {
            return_errno_with_message!(Errno::EINVAL, "Invalid mmap fixed addr");
        }
    }

    Ok(())
}

// Definition of MMap flags, conforming to the linux mmap interface:
// https://man7.org/linux/man-pages/man2/mmap.2.html
//
// The first 4 bits of the flag value represents the type of memory map,
// while other bits are used as memory map flags.

// The map type mask
const MAP_TYPE: u32 = 0xf;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum MMapType {
    File = 0x0, // Invalid
    Shared = 0x1,
    Private = 0x2,
    SharedValidate = 0x3,
}

impl TryFrom<u8> for MMapType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x0 => Ok(MMapType::File),
            0x1 => Ok(MMapType::Shared),
            0x2 => Ok(MMapType::Private),
            0x3 => Ok(MMapType::SharedValidate),
            _ => Err(Error::with_message(Errno::EINVAL, "unknown mmap type")),
        }
    }
}

bitflags! {
    pub struct MMapFlags : u32 {
        const MAP_FIXED           = 0x10;
        const MAP_ANONYMOUS       = 0x20;
        const MAP_32BIT           = 0x40;
        const MAP_NORESERVE       = 0x4000;
        const MAP_POPULATE        = 0x8000;
        const MAP_NONBLOCK        = 0x10000;
        const MAP_FIXED_NOREPLACE = 0x100000;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MMapOptions {
    typ: MMapType,
    flags: MMapFlags,
}

impl TryFrom<u32> for MMapOptions {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        let typ_raw = (value & MAP_TYPE) as u8;
        let typ = MMapType::try_from(typ_raw)?;

        let flags_raw = value & !MAP_TYPE;
        let Some(flags) = MMapFlags::from_bits(flags_raw) else {
            return Err(Error::with_message(Errno::EINVAL, "unknown mmap flags"));
        };
        Ok(MMapOptions { typ, flags })
    }
}

impl MMapOptions {
    pub fn typ(&self) -> MMapType {
        self.typ
    }

    pub fn flags(&self) -> MMapFlags {
        self.flags
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn options_from_raw_flags() {
        let option = MMapOptions::try_from(0x1).unwrap();
        assert_eq!(option.typ(), MMapType::Shared);
        assert!(option.flags().is_empty());

        let option = MMapOptions::try_from(0x2 | 0x10).unwrap();
        assert_eq!(option.typ(), MMapType::Private);
        assert!(option.flags().contains(MMapFlags::MAP_FIXED));

        let err = MMapOptions::try_from(0x7).unwrap_err();
        assert_eq!(err.error(), Errno::EINVAL);

        let err = MMapOptions::try_from(0x1 | 0x8000_0000).unwrap_err();
        assert_eq!(err.error(), Errno::EINVAL);
    }
}
