//! Per-thread context visible to the switch path.
//!
//! The thread manager owns thread lifetimes; this module only defines the
//! slice of a thread the context-switch core reads and writes.

use kernel_addr::{AddressRange, VirtualAddress};

use crate::fpu::{FpuContextBox, FpuFlags};

/// A thread's kernel stack: base and size, immutable after creation.
///
/// Bounds both the privileged stack pointer computed at switch time and
/// the frame-pointer walk in the unwinder.
#[derive(Copy, Clone, Debug)]
pub struct KernelStack {
    base: VirtualAddress,
    size: usize,
}

impl KernelStack {
    #[must_use]
    pub const fn new(base: VirtualAddress, size: usize) -> Self {
        Self { base, size }
    }

    #[inline]
    #[must_use]
    pub const fn base(&self) -> VirtualAddress {
        self.base
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// One past the highest usable address; stacks grow downward.
    #[inline]
    #[must_use]
    pub const fn top(&self) -> VirtualAddress {
        self.base.add(self.size)
    }

    /// The stack as an address range for bounds checks.
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> AddressRange {
        AddressRange::from_base_and_size(self.base, self.size)
    }
}

/// A thread pointer held as two independently written 32-bit halves.
///
/// On the 32-bit ARM variant no general-purpose register holds the full
/// 64-bit thread-pointer value atomically, so it is kept as two hardware
/// registers: a user-writable half and a privileged-readable/writable
/// half. The stored copy mirrors that split.
///
/// Invariant: after a context switch the *stored* `user_half` is
/// authoritative (the hardware value was persisted into it by the switch
/// preparer); while the thread runs, the *hardware* user half is
/// authoritative and the stored copy may be stale.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SplitThreadPointer {
    /// Half only privileged code reads or writes.
    pub kernel_half: u32,
    /// Half user code may rewrite while running; captured at switch-out.
    pub user_half: u32,
}

impl SplitThreadPointer {
    /// Captures the hardware-resident user half at switch-out, making
    /// the stored copy authoritative again.
    #[inline]
    pub const fn persist_user_half(&mut self, hardware_value: u32) {
        self.user_half = hardware_value;
    }

    /// The combined logical 64-bit value.
    #[inline]
    #[must_use]
    pub fn combined(&self) -> u64 {
        (u64::from(self.kernel_half) << 32) | u64::from(self.user_half)
    }
}

/// The thread pointer representation for this target.
///
/// Full-width architectures store the value whole; the 32-bit ARM
/// variant uses the split form.
#[cfg(not(target_arch = "arm"))]
pub type ThreadPointer = VirtualAddress;

#[cfg(target_arch = "arm")]
pub type ThreadPointer = SplitThreadPointer;

/// The slice of thread state the context-switch core operates on.
///
/// Created at thread creation, destroyed at thread termination, owned by
/// the external thread manager. Only the processor currently running the
/// thread touches these fields.
pub struct ThreadContext {
    /// Kernel stack bounds; immutable after creation.
    pub kernel_stack: KernelStack,

    /// FPU ownership flags; see [`crate::fpu`].
    pub fpu_flags: FpuFlags,

    /// Extended register file snapshot. Absent only during teardown or
    /// after a mid-system-call abandonment.
    pub fpu_context: Option<FpuContextBox>,

    /// While set, the thread's FPU state is excluded from save: state is
    /// not guaranteed preserved across privileged re-entrant calls.
    pub in_system_call: bool,

    /// User-mode thread-local storage pointer.
    pub thread_pointer: ThreadPointer,
}

impl ThreadContext {
    /// A fresh thread that has never used the FPU.
    #[must_use]
    pub fn new(kernel_stack: KernelStack) -> Self {
        Self {
            kernel_stack,
            fpu_flags: FpuFlags::new(),
            fpu_context: None,
            in_system_call: false,
            thread_pointer: ThreadPointer::default(),
        }
    }
}
