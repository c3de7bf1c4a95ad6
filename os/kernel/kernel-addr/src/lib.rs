//! # Typed Kernel Addresses
//!
//! Strongly typed wrappers for the raw addresses that flow through the
//! context-switch and trap-dispatch core.
//!
//! ## Overview
//!
//! The core passes stack tops, instruction pointers, and frame pointers
//! between components that must never confuse one for another, or for a
//! plain integer. [`VirtualAddress`] is a zero-cost `usize` wrapper that
//! carries the *kind* of value at the type level; [`AddressRange`] is a
//! half-open `[start, end)` region used for bounds checks (kernel text
//! range, kernel stack bounds).
//!
//! Pointer width follows the target: 32-bit on the 32-bit architectures,
//! 64-bit on the 64-bit ones. No canonicality validation happens at
//! runtime; these types only prevent accidental mixing.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

use core::fmt;

/// A virtual memory address.
///
/// Thin wrapper around `usize`. Alignment and validity are the caller's
/// concern; the type only communicates intent.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(usize);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: usize) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr.addr())
    }

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn as_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    #[inline]
    #[must_use]
    pub const fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }

    /// Offsets the address downward, saturating at zero.
    #[inline]
    #[must_use]
    pub const fn sub(self, offset: usize) -> Self {
        Self(self.0.saturating_sub(offset))
    }

    /// Offsets the address upward, wrapping on overflow.
    #[inline]
    #[must_use]
    pub const fn add(self, offset: usize) -> Self {
        Self(self.0.wrapping_add(offset))
    }

    /// Rounds the address down to the given power-of-two alignment.
    #[inline]
    #[must_use]
    pub const fn align_down(self, align: usize) -> Self {
        debug_assert!(align.is_power_of_two());
        Self(self.0 & !(align - 1))
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtualAddress({:#x})", self.0)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<usize> for VirtualAddress {
    fn from(v: usize) -> Self {
        Self(v)
    }
}

/// A half-open virtual address range `[start, end)`.
///
/// Used for the kernel text range and for kernel stack bounds. An empty
/// range (`start >= end`) contains nothing.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AddressRange {
    start: VirtualAddress,
    end: VirtualAddress,
}

impl AddressRange {
    #[inline]
    #[must_use]
    pub const fn new(start: VirtualAddress, end: VirtualAddress) -> Self {
        Self { start, end }
    }

    /// Builds the range covering `size` bytes upward from `base`.
    #[inline]
    #[must_use]
    pub const fn from_base_and_size(base: VirtualAddress, size: usize) -> Self {
        Self {
            start: base,
            end: VirtualAddress::new(base.as_usize().wrapping_add(size)),
        }
    }

    #[inline]
    #[must_use]
    pub const fn start(self) -> VirtualAddress {
        self.start
    }

    #[inline]
    #[must_use]
    pub const fn end(self) -> VirtualAddress {
        self.end
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, addr: VirtualAddress) -> bool {
        addr.as_usize() >= self.start.as_usize() && addr.as_usize() < self.end.as_usize()
    }
}
