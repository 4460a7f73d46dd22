// SPDX-License-Identifier: MPL-2.0

//! Linux kernel device numbers.
//!
//! In Linux, each device is identified by a **major** number and a **minor** number.
//! The major number selects the driver, while the minor number selects one of the
//! instances that the driver manages. Drivers ask for a contiguous range of minor
//! numbers under a single major number, which is represented by [`DeviceIdRange`].
//!
//! For more information about device number allocation in Linux, see:
//! <https://www.kernel.org/doc/Documentation/admin-guide/devices.txt>

#![no_std]
#![deny(unsafe_code)]

use core::fmt;

/// The number of bits used by the minor number in the kernel-internal `dev_t`.
///
/// Reference: <https://elixir.bootlin.com/linux/v6.13/source/include/linux/kdev_t.h#L7>.
pub const MINOR_BITS: u32 = 20;

const MINOR_MASK: u32 = (1 << MINOR_BITS) - 1;

/// A major device number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MajorId(u16);

impl MajorId {
    /// The largest major number that fits into a kernel-internal `dev_t`.
    pub const MAX: u16 = (1 << (32 - MINOR_BITS)) - 1;

    /// Creates a major number.
    ///
    /// # Panics
    ///
    /// Panics if `major` is larger than [`MajorId::MAX`].
    pub const fn new(major: u16) -> Self {
        assert!(major <= Self::MAX);
        Self(major)
    }

    /// Creates a major number, returning `None` if it is out of range.
    pub const fn try_new(major: u16) -> Option<Self> {
        if major <= Self::MAX {
            Some(Self(major))
        } else {
            None
        }
    }

    /// Returns the raw value.
    pub const fn get(&self) -> u16 {
        self.0
    }
}

/// A minor device number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MinorId(u32);

impl MinorId {
    /// The largest minor number that fits into a kernel-internal `dev_t`.
    pub const MAX: u32 = MINOR_MASK;

    /// Creates a minor number.
    ///
    /// # Panics
    ///
    /// Panics if `minor` is larger than [`MinorId::MAX`].
    pub const fn new(minor: u32) -> Self {
        assert!(minor <= Self::MAX);
        Self(minor)
    }

    /// Creates a minor number, returning `None` if it is out of range.
    pub const fn try_new(minor: u32) -> Option<Self> {
        if minor <= Self::MAX {
            Some(Self(minor))
        } else {
            None
        }
    }

    /// Returns the raw value.
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// A device ID, containing a major device number and a minor device number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId {
    major: MajorId,
    minor: MinorId,
}

impl DeviceId {
    /// Creates a device ID from the major device number and the minor device number.
    pub const fn new(major: MajorId, minor: MinorId) -> Self {
        Self { major, minor }
    }

    /// Returns the major device number.
    pub const fn major(&self) -> MajorId {
        self.major
    }

    /// Returns the minor device number.
    pub const fn minor(&self) -> MinorId {
        self.minor
    }

    /// Encodes the device ID as a kernel-internal `dev_t` (`MKDEV`).
    pub const fn to_raw(&self) -> u32 {
        ((self.major.get() as u32) << MINOR_BITS) | self.minor.get()
    }

    /// Decodes a kernel-internal `dev_t` (`MAJOR` and `MINOR`).
    pub const fn from_raw(raw: u32) -> Self {
        Self {
            major: MajorId((raw >> MINOR_BITS) as u16),
            minor: MinorId(raw & MINOR_MASK),
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major.get(), self.minor.get())
    }
}

/// A contiguous range of device numbers sharing one major number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceIdRange {
    base: DeviceId,
    count: u32,
}

impl DeviceIdRange {
    /// Creates a range of `count` device numbers starting at `base`.
    ///
    /// Returns `None` if the range is empty or runs past [`MinorId::MAX`].
    pub const fn new(base: DeviceId, count: u32) -> Option<Self> {
        if count == 0 {
            return None;
        }
        match base.minor.get().checked_add(count - 1) {
            Some(last) if last <= MinorId::MAX => Some(Self { base, count }),
            _ => None,
        }
    }

    /// Returns the first device number of the range.
    pub const fn base(&self) -> DeviceId {
        self.base
    }

    /// Returns the number of device numbers in the range.
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Returns the major number shared by the range.
    pub const fn major(&self) -> MajorId {
        self.base.major
    }

    /// Returns whether `id` falls into the range.
    pub fn contains(&self, id: DeviceId) -> bool {
        id.major == self.base.major
            && id.minor.get() >= self.base.minor.get()
            && id.minor.get() - self.base.minor.get() < self.count
    }

    /// Returns the `nth` device number of the range.
    pub fn nth(&self, nth: u32) -> Option<DeviceId> {
        if nth >= self.count {
            return None;
        }
        Some(DeviceId::new(
            self.base.major,
            MinorId(self.base.minor.get() + nth),
        ))
    }
}
