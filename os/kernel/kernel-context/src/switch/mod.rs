//! Context-switch preparation and its per-architecture stack math.
//!
//! The steps are identical everywhere; only the privileged stack-top
//! computation differs per architecture, plus the thread-pointer persist
//! step on 32-bit ARM. The per-architecture math lives in plain
//! functions so it stays testable regardless of the build target.

pub mod aarch64;
pub mod arm;
pub mod x86;
pub mod x86_64;

use kernel_runlevel::RunLevel;

use crate::fpu::{FpuHardware, flush_fpu_state};
use crate::processor::ProcessorState;
use crate::thread::ThreadContext;

/// Privileged per-architecture primitives used during switch preparation.
///
/// Extends the FPU primitives with the thread-pointer register read that
/// the 32-bit ARM variant needs. Real implementations are built behind
/// the `asm` feature; tests inject recording mocks.
pub trait SwitchHardware: FpuHardware {
    /// Reads the hardware register holding the user-writable half of the
    /// split thread pointer. Only consulted on 32-bit ARM; other
    /// architectures never call it.
    fn user_thread_pointer(&self) -> u32;
}

/// Prepares the processor for switching from `old` to `new`.
///
/// 1. Retargets the processor's privileged stack-top slot at the top of
///    `new`'s kernel stack (with the architecture's adjustment).
/// 2. Runs the lazy FPU save/abandon protocol against `old`.
/// 3. On 32-bit ARM, persists the hardware-resident user half of `old`'s
///    thread pointer into its stored value.
///
/// Infallible. Must run at dispatch run level or above (or with
/// interrupts hardware-disabled); the caller still holds `old` on the
/// current stack, so the switch itself happens after this returns.
pub fn prepare_context_switch(
    processor: &mut ProcessorState,
    old: &mut ThreadContext,
    new: &ThreadContext,
    hw: &mut impl SwitchHardware,
) {
    debug_assert!(
        processor.run_level.current() >= RunLevel::Dispatch,
        "context switch prepared below dispatch level"
    );

    #[cfg(target_arch = "x86")]
    {
        processor.privileged_stack_top = x86::privileged_stack_top(&new.kernel_stack);
    }
    #[cfg(target_arch = "aarch64")]
    {
        processor.privileged_stack_top = aarch64::privileged_stack_top(&new.kernel_stack);
    }
    #[cfg(target_arch = "arm")]
    {
        processor.privileged_stack_top = arm::privileged_stack_top(&new.kernel_stack);
    }
    #[cfg(not(any(target_arch = "x86", target_arch = "aarch64", target_arch = "arm")))]
    {
        processor.privileged_stack_top = x86_64::privileged_stack_top(&new.kernel_stack);
    }

    flush_fpu_state(old, hw);

    #[cfg(target_arch = "arm")]
    old.thread_pointer.persist_user_half(hw.user_thread_pointer());
}
