// SPDX-License-Identifier: MPL-2.0

use super::perms::VmPerms;
use crate::prelude::*;

/// Page fault information.
#[derive(Debug, Clone, Copy)]
pub struct PageFaultInfo {
    /// The virtual address where a page fault occurred.
    pub address: Vaddr,

    /// The [`VmPerms`] required by the memory operation that causes page fault.
    /// For example, a "store" operation may require `VmPerms::WRITE`.
    pub required_perms: VmPerms,
}

/// The reason that a page fault cannot be resolved.
///
/// These correspond to the `VM_FAULT_*` error codes of Linux.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmFault {
    /// The faulting offset has no valid backing.
    SigBus,
    /// The access is not allowed by the mapping, or hits no mapping at all.
    SigSegv,
    /// No memory is left to resolve the fault.
    Oom,
}

impl VmFault {
    /// Returns the signal delivered to the faulting process.
    pub fn signal(&self) -> SigNum {
        match self {
            VmFault::SigBus => SigNum::SIGBUS,
            VmFault::SigSegv => SigNum::SIGSEGV,
            VmFault::Oom => SigNum::SIGKILL,
        }
    }
}

/// Signal numbers that a memory access can raise.
#[expect(clippy::upper_case_acronyms)]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigNum {
    SIGBUS = 7,
    SIGKILL = 9,
    SIGSEGV = 11,
}

/// A fatal memory-access signal raised by a failed page fault.
///
/// The signal terminates the faulting process only; the device and other
/// processes are not affected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultSignal {
    pub signum: SigNum,
    pub addr: Vaddr,
}

impl FaultSignal {
    pub fn new(fault: VmFault, addr: Vaddr) -> Self {
        Self {
            signum: fault.signal(),
            addr,
        }
    }
}
