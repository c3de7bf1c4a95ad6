//! Memory-mapped register accessors.
//!
//! Each accessor is a single volatile load or store at the given address.
//! Volatile semantics guarantee the access happens exactly once, at its
//! program-order position relative to other volatile accesses. They do
//! *not* imply a CPU memory fence; insert one explicitly when ordering
//! against normal memory is required.

use kernel_addr::VirtualAddress;

/// Reads an 8-bit device register.
///
/// # Safety
/// - `addr` must be the virtual address of a readable device register,
///   mapped uncached (or with semantics the device tolerates).
/// - The read must be legal in the device's current state; device reads
///   can have side effects.
#[inline]
#[must_use]
pub unsafe fn read_u8(addr: VirtualAddress) -> u8 {
    unsafe { core::ptr::read_volatile(addr.as_ptr::<u8>()) }
}

/// Reads a 16-bit device register.
///
/// # Safety
/// Same obligations as [`read_u8`]; `addr` must additionally be 2-byte
/// aligned.
#[inline]
#[must_use]
pub unsafe fn read_u16(addr: VirtualAddress) -> u16 {
    unsafe { core::ptr::read_volatile(addr.as_ptr::<u16>()) }
}

/// Reads a 32-bit device register.
///
/// # Safety
/// Same obligations as [`read_u8`]; `addr` must additionally be 4-byte
/// aligned.
#[inline]
#[must_use]
pub unsafe fn read_u32(addr: VirtualAddress) -> u32 {
    unsafe { core::ptr::read_volatile(addr.as_ptr::<u32>()) }
}

/// Writes an 8-bit device register.
///
/// # Safety
/// - `addr` must be the virtual address of a writable device register,
///   mapped uncached.
/// - The written value must be valid for the register in the device's
///   current state; a wrong value can wedge the device.
#[inline]
pub unsafe fn write_u8(addr: VirtualAddress, value: u8) {
    unsafe { core::ptr::write_volatile(addr.as_mut_ptr::<u8>(), value) }
}

/// Writes a 16-bit device register.
///
/// # Safety
/// Same obligations as [`write_u8`]; `addr` must additionally be 2-byte
/// aligned.
#[inline]
pub unsafe fn write_u16(addr: VirtualAddress, value: u16) {
    unsafe { core::ptr::write_volatile(addr.as_mut_ptr::<u16>(), value) }
}

/// Writes a 32-bit device register.
///
/// # Safety
/// Same obligations as [`write_u8`]; `addr` must additionally be 4-byte
/// aligned.
#[inline]
pub unsafe fn write_u32(addr: VirtualAddress, value: u32) {
    unsafe { core::ptr::write_volatile(addr.as_mut_ptr::<u32>(), value) }
}
