//! # Hardware Register Access
//!
//! Uncached, volatile-semantics access to memory-mapped and legacy
//! port-mapped device registers.
//!
//! ## Overview
//!
//! Every hardware register the core touches goes through this crate, never
//! through a raw pointer dereference at the call site. Two register spaces
//! exist:
//!
//! * **Memory-mapped I/O** ([`mmio`]): device registers that live at
//!   virtual addresses. Accesses compile to single volatile loads/stores
//!   that the compiler may not elide, merge, or reorder against each other.
//! * **Port-mapped I/O** ([`port`]): the legacy 16-bit x86 port space,
//!   reached only via `in`/`out` instructions.
//!
//! ## Access Widths
//!
//! Registers are accessed at their architectural width — 8, 16, or 32 bits.
//! Reading a 32-bit register with two 16-bit accesses is not equivalent on
//! real devices (reads can have side effects, such as clearing an interrupt
//! status), so no width-splitting helpers exist.
//!
//! ## Feature Gating
//!
//! Port I/O requires inline assembly and is compiled only with the `asm`
//! feature on `x86`/`x86_64`. MMIO accessors are plain volatile operations
//! and are available on every target, which keeps them usable from host
//! tests against buffer-backed fake registers.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod mmio;

#[cfg(all(feature = "asm", any(target_arch = "x86", target_arch = "x86_64")))]
pub mod port;
