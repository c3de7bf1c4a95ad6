//! 32-bit ARM switch details.
//!
//! Two things are specific to this variant: the exception stack pointer
//! only needs 8-byte alignment, and the thread pointer is split across
//! two coprocessor registers, one of which user code can rewrite at any
//! time. The user-writable half is therefore read back from hardware and
//! persisted into the outgoing thread during switch preparation; see
//! [`crate::thread::SplitThreadPointer`].

use kernel_addr::VirtualAddress;

use crate::thread::KernelStack;

const STACK_ALIGN: usize = 8;

/// Stack-top value installed as the exception stack pointer.
#[inline]
#[must_use]
pub fn privileged_stack_top(stack: &KernelStack) -> VirtualAddress {
    stack.top().align_down(STACK_ALIGN)
}
