//! # Cycle Accounting Ledger
//!
//! Attributes elapsed processor cycles to an account — kernel execution,
//! user execution, or an invalid/transitional period — one running period
//! per processor.
//!
//! ## Overview
//!
//! The ledger does not keep a stack of accounting periods. Instead,
//! [`CycleLedger::begin`] closes the running period, charges its cycle
//! delta to the account it was opened under, opens a new period, and
//! returns the *previous* account. Every trap or interrupt handler
//! brackets its body with a `begin(Kernel)` on entry and a
//! `begin(previous)` on exit; the returned value held in the caller's
//! frame forms an implicit LIFO of accounting periods matching the trap
//! nesting exactly.
//!
//! [`CycleScope`] packages that pairing as a guard object: it captures the
//! previous account when constructed and restores it when dropped, so a
//! bracket cannot be left open on any exit path.
//!
//! ## The invalid account
//!
//! [`CycleAccount::Invalid`] marks transitional periods (processor
//! bring-up, mid-switch windows). Closing an invalid period charges
//! nobody. The NMI exit path historically restores the previous account
//! *only* when it is not invalid; [`CycleLedger::restore_unless_invalid`]
//! preserves that exact behavior (see the dispatcher).
//!
//! ## Cycle source
//!
//! The counter itself is hardware. [`CycleSource`] abstracts it so the
//! ledger stays host-testable; the real implementation reads the TSC
//! behind the `asm` feature.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

/// The account a period of processor cycles is charged to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum CycleAccount {
    /// Transitional; cycles in this period are charged to nobody.
    Invalid = 0,
    /// Unprivileged (user-mode) execution.
    User = 1,
    /// Privileged (kernel-mode) execution.
    Kernel = 2,
}

/// A monotonic per-processor cycle counter.
pub trait CycleSource {
    /// The current counter value. Deltas between reads on the same
    /// processor are meaningful; absolute values are not.
    fn now(&self) -> u64;
}

/// Reads the processor timestamp counter.
#[cfg(all(feature = "asm", any(target_arch = "x86", target_arch = "x86_64")))]
pub struct TscSource;

#[cfg(all(feature = "asm", any(target_arch = "x86", target_arch = "x86_64")))]
impl CycleSource for TscSource {
    #[inline]
    fn now(&self) -> u64 {
        let lo: u32;
        let hi: u32;
        unsafe {
            core::arch::asm!("rdtsc", out("eax") lo, out("edx") hi, options(nomem, nostack, preserves_flags));
        }
        (u64::from(hi) << 32) | u64::from(lo)
    }
}

/// Per-processor cycle accounting state.
///
/// Lives inside the processor block and is only touched by code running
/// on that processor.
#[derive(Debug)]
pub struct CycleLedger {
    period_account: CycleAccount,
    period_start: u64,
    user_cycles: u64,
    kernel_cycles: u64,
}

impl CycleLedger {
    /// A fresh ledger; the initial period is invalid, so cycles elapsed
    /// before the first real `begin` are charged to nobody.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            period_account: CycleAccount::Invalid,
            period_start: 0,
            user_cycles: 0,
            kernel_cycles: 0,
        }
    }

    /// Begins a new accounting period and returns the previous account.
    ///
    /// Closes the running period: its cycle delta is added to the total
    /// of the account it was opened under (nothing for
    /// [`CycleAccount::Invalid`]). The caller must hold the returned
    /// value and pass it to the matching exit-side `begin` — or use
    /// [`CycleScope`], which does so automatically.
    pub fn begin(&mut self, account: CycleAccount, source: &impl CycleSource) -> CycleAccount {
        let now = source.now();
        let previous = self.period_account;
        let delta = now.wrapping_sub(self.period_start);
        match previous {
            CycleAccount::User => self.user_cycles += delta,
            CycleAccount::Kernel => self.kernel_cycles += delta,
            CycleAccount::Invalid => {}
        }
        self.period_account = account;
        self.period_start = now;
        previous
    }

    /// Restores a previously captured account, skipping the restore when
    /// that account is [`CycleAccount::Invalid`].
    ///
    /// This is the NMI exit-path behavior carried over from the original
    /// design: whether skipping on an invalid previous period is policy
    /// or an edge-case gap is unresolved, so it is preserved as-is rather
    /// than folded into [`begin`](Self::begin).
    pub fn restore_unless_invalid(
        &mut self,
        previous: CycleAccount,
        source: &impl CycleSource,
    ) {
        if previous != CycleAccount::Invalid {
            let _ = self.begin(previous, source);
        }
    }

    /// The account the running period is charged to.
    #[inline]
    #[must_use]
    pub const fn current_account(&self) -> CycleAccount {
        self.period_account
    }

    /// Total cycles charged to user execution so far.
    #[inline]
    #[must_use]
    pub const fn user_cycles(&self) -> u64 {
        self.user_cycles
    }

    /// Total cycles charged to kernel execution so far.
    #[inline]
    #[must_use]
    pub const fn kernel_cycles(&self) -> u64 {
        self.kernel_cycles
    }
}

impl Default for CycleLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped accounting bracket.
///
/// Construction begins a period under `account` and captures the previous
/// account; drop begins a period under the captured account. This gives
/// the same LIFO discipline as the manual pairing without relying on the
/// caller to keep the halves matched.
pub struct CycleScope<'a, S: CycleSource> {
    ledger: &'a mut CycleLedger,
    source: &'a S,
    previous: CycleAccount,
}

impl<'a, S: CycleSource> CycleScope<'a, S> {
    /// Opens the bracket.
    pub fn enter(ledger: &'a mut CycleLedger, source: &'a S, account: CycleAccount) -> Self {
        let previous = ledger.begin(account, source);
        Self {
            ledger,
            source,
            previous,
        }
    }

    /// The account that will be restored when the scope closes.
    #[inline]
    #[must_use]
    pub const fn previous(&self) -> CycleAccount {
        self.previous
    }
}

impl<S: CycleSource> Drop for CycleScope<'_, S> {
    fn drop(&mut self) {
        let _ = self.ledger.begin(self.previous, self.source);
    }
}
