//! Hardware interrupt-flag control.
//!
//! Run levels are software bookkeeping; the actual masking at and above
//! device level is the processor's interrupt flag. These helpers wrap
//! `cli`/`sti` and the `RFLAGS.IF` query.
//!
//! # Platform
//!
//! Uses `cli`/`sti` and `pushfq`/`pop`, so x86/x86_64 only, and only in a
//! context where those instructions are legal (kernel mode).

/// Disables hardware interrupts (`cli`) and reports whether they were
/// enabled beforehand.
///
/// # Safety
/// Must only be called where `cli` is permitted. Leaving interrupts
/// disabled indefinitely hangs the machine.
#[inline]
pub unsafe fn disable_interrupts() -> bool {
    let enabled = interrupts_enabled();
    unsafe { core::arch::asm!("cli", options(nomem, nostack, preserves_flags)) }
    enabled
}

/// Enables hardware interrupts (`sti`).
///
/// # Safety
/// Must only be called where `sti` is permitted, and only when the caller
/// knows pending-interrupt delivery is safe at the current run level.
#[inline]
pub unsafe fn enable_interrupts() {
    unsafe { core::arch::asm!("sti", options(nomem, nostack, preserves_flags)) }
}

/// Whether interrupts are currently enabled (`RFLAGS.IF`, bit 9).
#[inline]
#[must_use]
pub fn interrupts_enabled() -> bool {
    let rflags: usize;
    unsafe {
        #[cfg(target_arch = "x86_64")]
        core::arch::asm!("pushfq; pop {}", out(reg) rflags, options(nostack, preserves_flags));
        #[cfg(target_arch = "x86")]
        core::arch::asm!("pushfd; pop {}", out(reg) rflags, options(nostack, preserves_flags));
    }
    (rflags & (1 << 9)) != 0
}

/// RAII guard that disables interrupts on creation and restores the prior
/// state on drop.
///
/// On drop, `sti` executes only if interrupts were enabled when the guard
/// was created, preserving the original state across nesting.
pub struct IrqGuard {
    were_enabled: bool,
}

impl IrqGuard {
    /// Snapshots `IF` and disables interrupts.
    ///
    /// # Safety
    /// Same requirements as [`disable_interrupts`].
    #[inline]
    #[must_use]
    pub unsafe fn new() -> Self {
        Self {
            were_enabled: unsafe { disable_interrupts() },
        }
    }

    /// Whether interrupts were enabled when this guard was created.
    #[inline]
    #[must_use]
    pub const fn were_enabled(&self) -> bool {
        self.were_enabled
    }
}

impl Drop for IrqGuard {
    fn drop(&mut self) {
        if self.were_enabled {
            unsafe { enable_interrupts() }
        }
    }
}
