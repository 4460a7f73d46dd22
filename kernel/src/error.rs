// SPDX-License-Identifier: MPL-2.0

/// Error number.
///
/// Only the error numbers that the device and its host framework can report
/// are listed. The values follow Linux.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Errno {
    EPERM = 1,   /* Operation not permitted */
    ENOENT = 2,  /* No such file or directory */
    EIO = 5,     /* I/O error */
    ENXIO = 6,   /* No such device or address */
    EBADF = 9,   /* Bad file number */
    EAGAIN = 11, /* Try again */
    ENOMEM = 12, /* Out of memory */
    EACCES = 13, /* Permission denied */
    EFAULT = 14, /* Bad address */
    EBUSY = 16,  /* Device or resource busy */
    EEXIST = 17, /* File exists */
    ENODEV = 19, /* No such device */
    EINVAL = 22, /* Invalid argument */
    EMFILE = 24, /* Too many open files */
    ENOSPC = 28, /* No space left on device */

    ENAMETOOLONG = 36, /* File name too long */
    EOVERFLOW = 75,    /* Value too large for defined data type */
}

/// error used in this crate
#[derive(Debug, Clone, Copy)]
pub struct Error {
    errno: Errno,
    msg: Option<&'static str>,
}

impl Error {
    pub const fn new(errno: Errno) -> Self {
        Error { errno, msg: None }
    }

    pub const fn with_message(errno: Errno, msg: &'static str) -> Self {
        Error {
            errno,
            msg: Some(msg),
        }
    }

    pub const fn error(&self) -> Errno {
        self.errno
    }

    pub const fn message(&self) -> Option<&'static str> {
        self.msg
    }
}

impl PartialEq for Error {
    /// Two errors are equal if they carry the same error number.
    fn eq(&self, other: &Self) -> bool {
        self.errno == other.errno
    }
}

impl Eq for Error {}

impl From<Errno> for Error {
    fn from(errno: Errno) -> Self {
        Error::new(errno)
    }
}

impl AsRef<Error> for Error {
    fn as_ref(&self) -> &Error {
        self
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.msg {
            Some(msg) => write!(f, "{:?}: {}", self.errno, msg),
            None => write!(f, "{:?}", self.errno),
        }
    }
}

impl core::error::Error for Error {}

impl From<core::num::ParseIntError> for Error {
    fn from(_: core::num::ParseIntError) -> Self {
        Error::with_message(Errno::EINVAL, "invalid integer")
    }
}

impl From<log::ParseLevelError> for Error {
    fn from(_: log::ParseLevelError) -> Self {
        Error::with_message(Errno::EINVAL, "invalid log level")
    }
}

#[macro_export]
macro_rules! return_errno {
    ($errno: expr) => {
        return Err($crate::error::Error::new($errno))
    };
}

#[macro_export]
macro_rules! return_errno_with_message {
    ($errno: expr, $message: expr) => {
        return Err($crate::error::Error::with_message($errno, $message))
    };
}
