// SPDX-License-Identifier: MPL-2.0

use super::AccessMode;
use crate::{device::PageMappedDevice, prelude::*};

/// A file opened on a device node.
///
/// The file only remembers the access mode granted at open time. It holds the
/// device so that `mmap` can wire new mappings to it.
pub struct OpenFile {
    path: String,
    device_id: DeviceId,
    device: Arc<dyn PageMappedDevice>,
    access_mode: AccessMode,
}

impl OpenFile {
    /// Opens the device with the given open flags.
    ///
    /// The device decides whether the requested access mode is granted.
    pub fn open(
        path: &str,
        device_id: DeviceId,
        device: Arc<dyn PageMappedDevice>,
        flags: u32,
    ) -> Result<Arc<Self>> {
        let access_mode = AccessMode::from_open_flags(flags)?;
        device.open(access_mode)?;

        Ok(Arc::new(Self {
            path: path.to_string(),
            device_id,
            device,
            access_mode,
        }))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn device(&self) -> &Arc<dyn PageMappedDevice> {
        &self.device
    }

    pub fn access_mode(&self) -> AccessMode {
        self.access_mode
    }
}

impl Debug for OpenFile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OpenFile")
            .field("path", &self.path)
            .field("device_id", &self.device_id)
            .field("access_mode", &self.access_mode)
            .finish()
    }
}
