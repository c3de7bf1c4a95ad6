//! x86-64 switch details.
//!
//! The privileged stack top leaves one pointer-sized slot free below the
//! true top; the trap entry path stashes a scratch pointer there before
//! the full frame is built.

use kernel_addr::VirtualAddress;

use crate::thread::KernelStack;

/// Stack-top value written into the privileged stack slot (TSS `rsp0`).
#[inline]
#[must_use]
pub fn privileged_stack_top(stack: &KernelStack) -> VirtualAddress {
    stack.top().sub(core::mem::size_of::<u64>())
}

#[cfg(all(feature = "asm", target_arch = "x86_64"))]
mod hw {
    use crate::fpu::{FpuContext, FpuHardware};
    use crate::switch::SwitchHardware;

    /// The real floating-point unit, driven through `fxsave64`/`fxrstor64`
    /// and the `CR0.TS` lazy-fault bit.
    pub struct X86_64Fpu;

    impl FpuHardware for X86_64Fpu {
        fn save(&mut self, context: &mut FpuContext) {
            // SAFETY: the buffer is 512 bytes and 64-byte aligned, which
            // exceeds the 16-byte alignment fxsave64 requires. TS must be
            // clear here; the caller only saves for the hardware owner.
            unsafe {
                core::arch::asm!(
                    "fxsave64 [{ctx}]",
                    ctx = in(reg) context.as_mut_ptr(),
                    options(nostack, preserves_flags),
                );
            }
        }

        fn restore(&mut self, context: &FpuContext) {
            // SAFETY: the buffer was produced by fxsave64 (or zeroed at
            // allocation, which is a valid initial image).
            unsafe {
                core::arch::asm!(
                    "clts",
                    "fxrstor64 [{ctx}]",
                    ctx = in(reg) context.as_ptr(),
                    options(nostack, preserves_flags),
                );
            }
        }

        fn disable(&mut self) {
            // Set CR0.TS so the next FPU instruction raises #NM and the
            // lazy-restore fault handler runs.
            unsafe {
                core::arch::asm!(
                    "mov {tmp}, cr0",
                    "or {tmp}, 8",
                    "mov cr0, {tmp}",
                    tmp = out(reg) _,
                    options(nostack, preserves_flags),
                );
            }
        }
    }

    impl SwitchHardware for X86_64Fpu {
        fn user_thread_pointer(&self) -> u32 {
            // The thread pointer lives whole in FS/GS base here; no split
            // half exists to read.
            0
        }
    }
}

#[cfg(all(feature = "asm", target_arch = "x86_64"))]
pub use hw::X86_64Fpu;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_top_reserves_one_slot() {
        let stack = KernelStack::new(VirtualAddress::new(0x8000), 0x4000);
        assert_eq!(privileged_stack_top(&stack), VirtualAddress::new(0xbff8));
    }
}
