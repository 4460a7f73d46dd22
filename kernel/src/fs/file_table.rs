// SPDX-License-Identifier: MPL-2.0

use super::OpenFile;
use crate::prelude::*;

pub type FileDesc = i32;

/// The table of files opened by a process.
pub struct FileTable {
    table: BTreeMap<FileDesc, Arc<OpenFile>>,
}

impl FileTable {
    /// The maximum number of open files of a process.
    pub const MAX_FILES: usize = 1024;

    pub const fn new() -> Self {
        Self {
            table: BTreeMap::new(),
        }
    }

    /// Inserts a file at the lowest free descriptor.
    pub fn insert(&mut self, file: Arc<OpenFile>) -> Result<FileDesc> {
        if self.table.len() >= Self::MAX_FILES {
            return_errno_with_message!(Errno::EMFILE, "too many open files");
        }

        let mut fd: FileDesc = 0;
        for used in self.table.keys() {
            if *used != fd {
                break;
            }
            fd += 1;
        }
        self.table.insert(fd, file);
        Ok(fd)
    }

    pub fn get_file(&self, fd: FileDesc) -> Result<&Arc<OpenFile>> {
        self.table
            .get(&fd)
            .ok_or_else(|| Error::with_message(Errno::EBADF, "the fd does not exist"))
    }

    pub fn close_file(&mut self, fd: FileDesc) -> Option<Arc<OpenFile>> {
        self.table.remove(&fd)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        device::PageMappedDevice,
        fs::AccessMode,
        vm::{VmAreaDesc, VmFault},
    };

    struct AnyMode;

    impl PageMappedDevice for AnyMode {
        fn open(&self, _access_mode: AccessMode) -> Result<()> {
            Ok(())
        }

        fn mmap(&self, _desc: &VmAreaDesc) -> Result<()> {
            Ok(())
        }

        fn fault(&self, _page_idx: usize) -> core::result::Result<Frame, VmFault> {
            Err(VmFault::SigBus)
        }
    }

    fn file() -> Arc<OpenFile> {
        let id = DeviceId::new(MajorId::new(254), MinorId::new(0));
        OpenFile::open("/dev/any", id, Arc::new(AnyMode), 0).unwrap()
    }

    #[test]
    fn lowest_free_fd_is_reused() {
        let mut table = FileTable::new();
        assert_eq!(table.insert(file()).unwrap(), 0);
        assert_eq!(table.insert(file()).unwrap(), 1);
        assert_eq!(table.insert(file()).unwrap(), 2);

        assert!(table.close_file(1).is_some());
        assert_eq!(table.insert(file()).unwrap(), 1);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn bad_fd() {
        let mut table = FileTable::new();
        assert_eq!(table.get_file(0).unwrap_err().error(), Errno::EBADF);
        assert!(table.close_file(0).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn table_is_full() {
        let mut table = FileTable::new();
        let file = file();
        for _ in 0..FileTable::MAX_FILES {
            table.insert(file.clone()).unwrap();
        }
        assert_eq!(table.insert(file).unwrap_err().error(), Errno::EMFILE);
    }
}
