//! AArch64 switch details.
//!
//! `SP_EL1` must be 16-byte aligned whenever it is used as a base
//! register, so the privileged stack top is rounded down to that
//! boundary regardless of how the stack allocation ended.

use kernel_addr::VirtualAddress;

use crate::thread::KernelStack;

const STACK_ALIGN: usize = 16;

/// Stack-top value installed as the exception stack pointer.
#[inline]
#[must_use]
pub fn privileged_stack_top(stack: &KernelStack) -> VirtualAddress {
    stack.top().align_down(STACK_ALIGN)
}
