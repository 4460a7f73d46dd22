// SPDX-License-Identifier: MPL-2.0

//! User processes.
//!
//! A process opens device nodes, maps them, and touches the mappings. This is
//! the user-space side of a device, seen from the kernel.

use crate::{
    device::DevRegistry,
    fs::{FileDesc, FileTable, OpenFile},
    prelude::*,
    vm::{FaultSignal, MMapOptions, VmPerms, Vmar, do_mmap},
};

pub type Pid = u32;

/// A process with its open files and its address space.
///
/// Exiting the process, which is dropping it, closes all files and unmaps
/// all mappings.
pub struct Process {
    pid: Pid,
    devices: Arc<DevRegistry>,
    file_table: Mutex<FileTable>,
    root_vmar: Vmar,
}

impl Process {
    pub fn new(pid: Pid, devices: Arc<DevRegistry>) -> Self {
        Self {
            pid,
            devices,
            file_table: Mutex::new(FileTable::new()),
            root_vmar: Vmar::new(),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn root_vmar(&self) -> &Vmar {
        &self.root_vmar
    }

    /// Opens the device node at `path` with the `open` flags `flags`.
    pub fn open(&self, path: &str, flags: u32) -> Result<FileDesc> {
        debug!("[pid {}] open {}, flags = {:#o}", self.pid, path, flags);
        let Some((device_id, device)) = self.devices.lookup(path) else {
            return_errno_with_message!(Errno::ENOENT, "the device node does not exist");
        };
        let file = OpenFile::open(path, device_id, device, flags)?;
        self.file_table.lock().insert(file)
    }

    pub fn close(&self, fd: FileDesc) -> Result<()> {
        debug!("[pid {}] close {}", self.pid, fd);
        self.file_table
            .lock()
            .close_file(fd)
            .map(|_| ())
            .ok_or(Error::with_message(Errno::EBADF, "the fd does not exist"))
    }

    /// Maps `len` bytes of the file `fd` from `offset`.
    ///
    /// `prot` and `flags` are the `PROT_*` and `MAP_*` bits of `mmap`.
    pub fn mmap(
        &self,
        addr: Vaddr,
        len: usize,
        prot: u32,
        flags: u32,
        fd: FileDesc,
        offset: usize,
    ) -> Result<Vaddr> {
        let perms = VmPerms::from_prot(prot);
        let option = MMapOptions::try_from(flags)?;
        let file = self.file_table.lock().get_file(fd)?.clone();
        do_mmap(&self.root_vmar, addr, len, perms, option, &file, offset)
    }

    pub fn munmap(&self, addr: Vaddr, len: usize) -> Result<()> {
        debug!("[pid {}] munmap {:#x}, len = {:#x}", self.pid, addr, len);
        self.root_vmar.unmap(addr, len)
    }

    /// Loads bytes from the address space.
    ///
    /// A failed access raises a fatal signal in this process.
    pub fn read_bytes(
        &self,
        addr: Vaddr,
        buf: &mut [u8],
    ) -> core::result::Result<(), FaultSignal> {
        self.root_vmar
            .read_bytes(addr, buf)
            .inspect_err(|signal| debug!("[pid {}] {:?}", self.pid, signal))
    }

    /// Stores bytes into the address space.
    ///
    /// A failed access raises a fatal signal in this process.
    pub fn write_bytes(
        &self,
        addr: Vaddr,
        buf: &[u8],
    ) -> core::result::Result<(), FaultSignal> {
        self.root_vmar
            .write_bytes(addr, buf)
            .inspect_err(|signal| debug!("[pid {}] {:?}", self.pid, signal))
    }

    /// Returns the number of open files.
    pub fn nr_open_files(&self) -> usize {
        self.file_table.lock().len()
    }
}

impl Debug for Process {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("nr_open_files", &self.nr_open_files())
            .field("root_vmar", &self.root_vmar)
            .finish()
    }
}
