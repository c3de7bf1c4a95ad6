//! # Trap and Interrupt Dispatch
//!
//! Routes single-step traps, debug-service traps, and non-maskable
//! interrupts to the correct handler, coordinating cycle accounting,
//! interrupt masking, and signal delivery along the way.
//!
//! ## Overview
//!
//! Hardware trap entry stubs build a [`TrapFrame`] and call one of the
//! three dispatch routines:
//!
//! * [`dispatch_single_step`] — hardware single-step exceptions.
//! * [`dispatch_debug_service`] — the software trap privileged code uses
//!   to deliberately break into the debugger, and the generic
//!   signal-delivery path when user code raises it.
//! * [`dispatch_nmi`] — non-maskable interrupts, guarded against
//!   re-entering themselves.
//!
//! Every routine keys its behavior on the trap's origin: privileged
//! traps go to the debugger, unprivileged traps go through the signal
//! machinery under a kernel cycle-accounting bracket with interrupts
//! deliberately re-enabled for the duration.
//!
//! There is no failure return. Every path either returns to the
//! interrupted context or diverts into the debugger, which is terminal
//! for that execution attempt.
//!
//! ## Collaborator injection
//!
//! Signal delivery, the kernel debugger, and the interrupt-enable
//! hardware sit behind the [`SignalSink`], [`Debugger`], and
//! [`InterruptControl`] traits, so the state machine runs under host
//! tests with recording mocks.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod dispatch;
pub mod frame;

pub use dispatch::{
    BreakReason, Debugger, InterruptControl, SignalSink, dispatch_debug_service, dispatch_nmi,
    dispatch_single_step,
};
pub use frame::TrapFrame;
