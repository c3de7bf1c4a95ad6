//! # Thread Context and Context-Switch Preparation
//!
//! The state that travels with a thread across processors, the state that
//! stays pinned to a processor, and the per-architecture routine that runs
//! immediately before the running thread changes.
//!
//! ## Overview
//!
//! Whenever the scheduler decides to switch threads on a processor, it
//! calls [`prepare_context_switch`] with the processor block, the outgoing
//! thread, and the incoming thread. The routine:
//!
//! 1. points the processor's privileged-mode stack pointer slot (the TSS
//!    `rsp0` equivalent) at the top of the incoming thread's kernel stack,
//! 2. runs the lazy floating-point save/abandon protocol against the
//!    outgoing thread ([`fpu::flush_fpu_state`]), and
//! 3. on the 32-bit ARM variant, persists the hardware-resident
//!    user-writable thread-pointer half into the outgoing thread's stored
//!    value.
//!
//! There is no failure mode: every step is an unconditional memory or
//! register write guarded by the invariants below.
//!
//! ## The lazy FPU protocol
//!
//! Saving the extended register file is the expensive operation, so it is
//! deferred until the owning processor actually switches away from the
//! thread that last used it. The [`fpu`] module holds the protocol and the
//! ownership flags; see its documentation for the exact decision ladder.
//!
//! ## Invariants
//!
//! * At most one processor owns a thread's live FPU hardware state at any
//!   instant; `owner` implies `in_use`.
//! * A null FPU context buffer means "already abandoned", never an error.
//! * Context-switch preparation runs at dispatch run level or with
//!   interrupts hardware-disabled — asserted, not returned.
//! * [`ProcessorState`] is processor-private and passed `&mut`; exclusivity
//!   is structural, no locks exist in this crate.
//!
//! ## Hardware injection
//!
//! The privileged instructions (extended-state save/restore, unit disable,
//! thread-pointer register reads) sit behind the [`switch::SwitchHardware`]
//! trait. Real implementations are per-architecture and gated behind the
//! `asm` feature; tests inject recording mocks and run on the host.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

pub mod fpu;
pub mod processor;
pub mod switch;
pub mod thread;

pub use fpu::{FpuContext, FpuContextBox, FpuFlags, FpuHardware};
pub use processor::ProcessorState;
pub use switch::{SwitchHardware, prepare_context_switch};
pub use thread::{KernelStack, SplitThreadPointer, ThreadContext};
