//! 32-bit x86 switch details.
//!
//! The hardware task segment stores the stack top verbatim; the trap
//! entry path needs no reserved slot because the frame layout already
//! accounts for the extra segment words.

use kernel_addr::VirtualAddress;

use crate::thread::KernelStack;

/// Stack-top value written into the privileged stack slot (TSS `esp0`).
#[inline]
#[must_use]
pub fn privileged_stack_top(stack: &KernelStack) -> VirtualAddress {
    stack.top()
}
