//! Floating-point/vector state ownership and the lazy save protocol.
//!
//! ## Ownership flags
//!
//! Two bits describe a thread's relationship to the FPU:
//!
//! * `in_use` — the thread has ever touched floating-point state; it has
//!   (or had) state worth preserving.
//! * `owner` — the floating-point *hardware* currently holds this
//!   thread's live state, as opposed to a stale in-memory copy.
//!
//! `owner` implies `in_use`. At most one thread per processor can be the
//! owner, and only the processor running a thread ever touches its flags
//! or context buffer.
//!
//! ## The protocol
//!
//! On every context switch, [`flush_fpu_state`] runs against the thread
//! being switched *out*:
//!
//! 1. `in_use` clear — nothing to do.
//! 2. Context buffer absent — the thread is terminating or its state was
//!    already abandoned; clear the flags and return. Not an error.
//! 3. `in_system_call` set — the state is not trustworthy across the
//!    privileged call boundary; abandon it without saving.
//! 4. `owner` set — save the hardware state into the context buffer.
//! 5. After any save or abandonment, clear `owner` and disable the
//!    hardware unit, so the next floating-point instruction in the new
//!    thread faults and can be lazily re-enabled on demand.
//!
//! Steps 1–3 are pure-software fast paths; hardware is touched only when
//! a thread has provably live, trustworthy state to preserve.

use alloc::alloc::{alloc_zeroed, dealloc};
use bitfield_struct::bitfield;
use core::alloc::Layout;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;
use log::trace;

use crate::thread::ThreadContext;

/// Size in bytes of the architecture's extended register file snapshot.
#[cfg(any(target_arch = "x86_64", not(any(target_arch = "x86", target_arch = "arm", target_arch = "aarch64"))))]
pub const FPU_CONTEXT_SIZE: usize = 512;
/// Alignment required by the architecture's save instruction.
#[cfg(any(target_arch = "x86_64", not(any(target_arch = "x86", target_arch = "arm", target_arch = "aarch64"))))]
pub const FPU_CONTEXT_ALIGN: usize = 64;

#[cfg(target_arch = "x86")]
pub const FPU_CONTEXT_SIZE: usize = 512;
#[cfg(target_arch = "x86")]
pub const FPU_CONTEXT_ALIGN: usize = 16;

#[cfg(target_arch = "aarch64")]
pub const FPU_CONTEXT_SIZE: usize = 528;
#[cfg(target_arch = "aarch64")]
pub const FPU_CONTEXT_ALIGN: usize = 16;

#[cfg(target_arch = "arm")]
pub const FPU_CONTEXT_SIZE: usize = 264;
#[cfg(target_arch = "arm")]
pub const FPU_CONTEXT_ALIGN: usize = 16;

/// Thread FPU ownership flags.
///
/// Kept as a bitfield because the flags live next to other thread state
/// words and are read on every switch.
#[bitfield(u32)]
pub struct FpuFlags {
    /// The thread has ever used floating-point state.
    pub in_use: bool,
    /// The hardware currently holds this thread's live state.
    pub owner: bool,
    #[bits(30)]
    _reserved: u32,
}

/// The architecture-defined extended register file snapshot.
///
/// An opaque, alignment-annotated blob. The layout is defined by the
/// save instruction, not by this kernel, so no field-level access exists
/// — only allocate, save-into, restore-from, and destroy.
#[repr(C, align(64))]
pub struct FpuContext {
    bytes: [u8; FPU_CONTEXT_SIZE],
}

// The repr alignment is fixed at the strictest any architecture's save
// instruction demands; the per-architecture requirement may only be looser.
const _: () = assert!(core::mem::align_of::<FpuContext>() >= FPU_CONTEXT_ALIGN);

impl FpuContext {
    /// Raw pointer for the architecture's save/restore instruction.
    #[inline]
    #[must_use]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.bytes.as_mut_ptr()
    }

    /// Raw pointer for the architecture's restore instruction.
    #[inline]
    #[must_use]
    pub const fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    /// Byte-copies another context's snapshot into this one.
    ///
    /// Used on the thread-clone path when the source thread's state is
    /// already stale in memory (it is not the hardware owner).
    pub fn copy_from(&mut self, other: &Self) {
        self.bytes.copy_from_slice(&other.bytes);
    }
}

/// FPU context allocation failed.
#[derive(Debug, thiserror::Error)]
#[error("non-paged pool exhausted allocating an FPU context")]
pub struct FpuAllocError;

/// An exclusively-owned, heap-allocated [`FpuContext`].
///
/// Freshly allocated contexts are zeroed; handing a new thread the
/// previous owner's register contents would leak data between processes.
/// Allocation exhaustion is the only error this module surfaces, and it
/// is returned, never propagated as a panic.
pub struct FpuContextBox {
    ptr: NonNull<FpuContext>,
}

// Owned exclusively by one thread; the buffer itself is plain bytes.
unsafe impl Send for FpuContextBox {}

impl FpuContextBox {
    /// Allocates a zeroed, properly aligned context buffer.
    ///
    /// # Errors
    /// [`FpuAllocError`] when the allocator is exhausted. The caller (the
    /// thread-creation path) decides whether that fails thread creation.
    pub fn allocate() -> Result<Self, FpuAllocError> {
        let layout = Self::layout();
        // SAFETY: the layout has non-zero size and valid alignment.
        let raw = unsafe { alloc_zeroed(layout) };
        NonNull::new(raw.cast::<FpuContext>())
            .map(|ptr| Self { ptr })
            .ok_or(FpuAllocError)
    }

    const fn layout() -> Layout {
        // The repr alignment of FpuContext is the strictest any
        // architecture needs; FPU_CONTEXT_ALIGN can only be looser.
        Layout::new::<FpuContext>()
    }
}

impl Deref for FpuContextBox {
    type Target = FpuContext;

    fn deref(&self) -> &FpuContext {
        // SAFETY: the pointer is valid and exclusively owned for the
        // lifetime of the box.
        unsafe { self.ptr.as_ref() }
    }
}

impl DerefMut for FpuContextBox {
    fn deref_mut(&mut self) -> &mut FpuContext {
        // SAFETY: as above, and &mut self guarantees uniqueness.
        unsafe { self.ptr.as_mut() }
    }
}

impl Drop for FpuContextBox {
    fn drop(&mut self) {
        // SAFETY: allocated by `allocate` with the same layout.
        unsafe { dealloc(self.ptr.as_ptr().cast::<u8>(), Self::layout()) }
    }
}

/// Architecture primitives for the floating-point unit.
///
/// Injected into the switch path so the protocol is testable on a host;
/// real implementations live in the per-architecture switch modules
/// behind the `asm` feature.
pub trait FpuHardware {
    /// Saves the live extended register file into `context`.
    ///
    /// Only ever invoked for a thread with both `in_use` and `owner` set
    /// and a present context buffer.
    fn save(&mut self, context: &mut FpuContext);

    /// Restores the extended register file from `context`.
    fn restore(&mut self, context: &FpuContext);

    /// Disables the unit so the next floating-point instruction faults,
    /// entering the lazy re-enable path.
    fn disable(&mut self);
}

/// Runs the lazy save/abandon protocol against the outgoing thread.
///
/// See the module documentation for the decision ladder. Reads or writes
/// hardware only on the save path and the post-save/abandon disable.
pub fn flush_fpu_state(thread: &mut ThreadContext, hw: &mut impl FpuHardware) {
    if !thread.fpu_flags.in_use() {
        return;
    }

    let Some(context) = thread.fpu_context.as_mut() else {
        // Terminating, or already abandoned mid-system-call. The buffer
        // is gone; just drop the claim. Not an error.
        trace!("fpu: context already abandoned, clearing ownership");
        thread.fpu_flags.set_in_use(false);
        thread.fpu_flags.set_owner(false);
        return;
    };

    if thread.in_system_call {
        // State is transiently undefined across the privileged call
        // boundary; abandoning is cheaper and equally correct.
        trace!("fpu: abandoning state across system call boundary");
        thread.fpu_flags.set_in_use(false);
    } else if thread.fpu_flags.owner() {
        hw.save(context);
    }

    thread.fpu_flags.set_owner(false);
    hw.disable();
}

/// Clones a thread's FPU state for a newly created thread.
///
/// Some extended registers are non-volatile across function calls, so a
/// clone must carry them over. If the old thread is the hardware owner
/// its live state is saved directly into the new buffer; otherwise the
/// stale in-memory copy is duplicated. Returns `None` when the old
/// thread never used the FPU.
///
/// Must run on the processor currently running `old` (when `old` is the
/// owner) at dispatch level, so the state cannot be flushed out from
/// underneath the save.
///
/// # Errors
/// [`FpuAllocError`] when the context allocation fails.
pub fn clone_fpu_context(
    old: &ThreadContext,
    hw: &mut impl FpuHardware,
) -> Result<Option<FpuContextBox>, FpuAllocError> {
    if !old.fpu_flags.in_use() {
        return Ok(None);
    }

    let mut new_context = FpuContextBox::allocate()?;
    if old.fpu_flags.owner() {
        hw.save(&mut new_context);
    } else {
        match old.fpu_context.as_ref() {
            Some(old_context) => new_context.copy_from(old_context),
            None => debug_assert!(false, "in-use thread cloned with no FPU context"),
        }
    }

    Ok(Some(new_context))
}

/// Drops a thread's FPU claim when its user context is reset in place.
///
/// The thread restarts with pristine floating-point state; whatever the
/// hardware holds for it is discarded, not saved.
pub fn reset_fpu_ownership(thread: &mut ThreadContext, hw: &mut impl FpuHardware) {
    if thread.fpu_flags.in_use() {
        thread.fpu_flags.set_in_use(false);
        thread.fpu_flags.set_owner(false);
        hw.disable();
    }
}
