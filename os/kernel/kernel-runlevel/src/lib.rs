//! # Run-Level Gate
//!
//! Tracks and enforces the per-processor run level: how much interrupt
//! activity is currently masked, and therefore which kernel operations are
//! legal right now.
//!
//! ## Overview
//!
//! Every processor is always at exactly one [`RunLevel`]. Ordinary thread
//! execution happens at [`RunLevel::Low`]; scheduling and context-switch
//! preparation require [`RunLevel::Dispatch`]; device interrupt handlers
//! run at device levels and above. Raising the level masks a class of
//! interrupts, lowering unmasks it.
//!
//! Raise and lower must be strictly paired: a lower restores exactly the
//! level the matching raise returned. There is no recovery path for a
//! mismatched pair — it is a programming-contract violation and panics
//! immediately if detected.
//!
//! ## Components
//!
//! * [`RunLevel`] — the totally ordered level values.
//! * [`RunLevelState`] — the per-processor current-level cell with
//!   `raise`/`lower`/`current`.
//! * [`RunLevelGuard`] — RAII raise-on-create, lower-on-drop wrapper for
//!   scoped critical sections.
//! * [`irq`] — hardware interrupt-flag control (`asm` feature,
//!   x86/x86_64): disable/enable, the `IF`-bit query, and an RAII
//!   save/disable/restore guard.
//!
//! The state machine itself is pure software and fully host-testable; only
//! the [`irq`] module touches hardware.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(all(feature = "asm", any(target_arch = "x86", target_arch = "x86_64")))]
pub mod irq;

use core::cell::Cell;
use core::fmt;

/// A processor run level.
///
/// Levels are totally ordered; a higher level masks everything a lower
/// level masks plus more. The numeric gaps leave room for device levels
/// assigned at interrupt-controller initialization.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[repr(u8)]
pub enum RunLevel {
    /// Ordinary thread execution; nothing masked.
    Low = 0,
    /// Scheduling operations are safe; the dispatch software interrupt is
    /// masked, so the scheduler cannot re-enter itself.
    Dispatch = 2,
    /// Highest device hardware interrupt level.
    Device = 11,
    /// Clock tick interrupt level.
    Clock = 13,
    /// Inter-processor interrupt level.
    Ipi = 14,
    /// Everything maskable is masked.
    High = 15,
}

/// Per-processor current run level.
///
/// Lives inside the processor block; it is only ever touched by code
/// running on that processor, so a plain [`Cell`] suffices — exclusivity
/// is structural, not lock-based.
pub struct RunLevelState {
    current: Cell<RunLevel>,
}

impl RunLevelState {
    /// A fresh processor starts at [`RunLevel::Low`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: Cell::new(RunLevel::Low),
        }
    }

    /// Starts at an explicit level (processor bring-up runs at `High`).
    #[must_use]
    pub const fn starting_at(level: RunLevel) -> Self {
        Self {
            current: Cell::new(level),
        }
    }

    /// The level this processor is currently at.
    #[inline]
    #[must_use]
    pub fn current(&self) -> RunLevel {
        self.current.get()
    }

    /// Raises the run level to `target` and returns the previous level.
    ///
    /// The returned level must be handed back to the matching
    /// [`lower`](Self::lower) call.
    ///
    /// # Panics
    /// Panics if `target` is below the current level. Raising downward is
    /// a contract violation with no recovery path.
    #[inline]
    pub fn raise(&self, target: RunLevel) -> RunLevel {
        let previous = self.current.get();
        assert!(
            target >= previous,
            "run level raise to {target:?} from higher level {previous:?}"
        );
        self.current.set(target);
        previous
    }

    /// Lowers the run level back to `target`.
    ///
    /// `target` must be the value returned by the matching
    /// [`raise`](Self::raise).
    ///
    /// # Panics
    /// Panics if `target` is above the current level.
    #[inline]
    pub fn lower(&self, target: RunLevel) {
        let previous = self.current.get();
        assert!(
            target <= previous,
            "run level lower to {target:?} from lower level {previous:?}"
        );
        self.current.set(target);
    }

    /// Scoped raise; the guard lowers back to the previous level on drop.
    #[inline]
    pub fn raise_scoped(&self, target: RunLevel) -> RunLevelGuard<'_> {
        let previous = self.raise(target);
        RunLevelGuard {
            state: self,
            previous,
        }
    }
}

impl Default for RunLevelState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RunLevelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RunLevelState").field(&self.current()).finish()
    }
}

/// RAII pair for [`RunLevelState::raise`]/[`RunLevelState::lower`].
///
/// Guarantees the lower happens with exactly the level the raise
/// returned, removing the manual pairing discipline.
pub struct RunLevelGuard<'a> {
    state: &'a RunLevelState,
    previous: RunLevel,
}

impl RunLevelGuard<'_> {
    /// The level that will be restored on drop.
    #[inline]
    #[must_use]
    pub const fn previous(&self) -> RunLevel {
        self.previous
    }
}

impl Drop for RunLevelGuard<'_> {
    fn drop(&mut self) {
        self.state.lower(self.previous);
    }
}
