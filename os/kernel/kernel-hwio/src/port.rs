//! Legacy x86 I/O port accessors.
//!
//! The port space is a separate 16-bit address space (0x0000–0xFFFF)
//! reached only through `in`/`out` instructions. It hosts the legacy
//! platform devices: PICs, the PIT, the keyboard controller, CMOS/RTC,
//! serial ports, and emulator debug consoles.
//!
//! `in`/`out` are ordered with respect to each other but are **not** a
//! general memory fence.

/// Writes one byte to an I/O port.
///
/// # Safety
/// - Requires CPL0 or I/O permission (IOPL / I/O bitmap) for `port`;
///   otherwise the CPU raises `#GP`.
/// - `port` must belong to the intended device and accept this value in
///   its current protocol state.
/// - Multi-step device handshakes must be serialized against interrupt
///   handlers and other processors.
#[inline]
pub unsafe fn outb(port: u16, value: u8) {
    unsafe {
        core::arch::asm!("out dx, al", in("dx") port, in("al") value, options(nomem, nostack, preserves_flags));
    }
}

/// Writes one 16-bit word to an I/O port.
///
/// # Safety
/// Same obligations as [`outb`].
#[inline]
pub unsafe fn outw(port: u16, value: u16) {
    unsafe {
        core::arch::asm!("out dx, ax", in("dx") port, in("ax") value, options(nomem, nostack, preserves_flags));
    }
}

/// Writes one 32-bit doubleword to an I/O port.
///
/// # Safety
/// Same obligations as [`outb`].
#[inline]
pub unsafe fn outl(port: u16, value: u32) {
    unsafe {
        core::arch::asm!("out dx, eax", in("dx") port, in("eax") value, options(nomem, nostack, preserves_flags));
    }
}

/// Reads one byte from an I/O port.
///
/// # Safety
/// - Requires CPL0 or I/O permission for `port`; otherwise `#GP`.
/// - `port` must be a readable register of the intended device; reads can
///   advance device protocol state.
#[inline]
#[must_use]
pub unsafe fn inb(port: u16) -> u8 {
    let value: u8;
    unsafe {
        core::arch::asm!("in al, dx", in("dx") port, out("al") value, options(nomem, nostack, preserves_flags));
    }
    value
}

/// Reads one 16-bit word from an I/O port.
///
/// # Safety
/// Same obligations as [`inb`].
#[inline]
#[must_use]
pub unsafe fn inw(port: u16) -> u16 {
    let value: u16;
    unsafe {
        core::arch::asm!("in ax, dx", in("dx") port, out("ax") value, options(nomem, nostack, preserves_flags));
    }
    value
}

/// Reads one 32-bit doubleword from an I/O port.
///
/// # Safety
/// Same obligations as [`inb`].
#[inline]
#[must_use]
pub unsafe fn inl(port: u16) -> u32 {
    let value: u32;
    unsafe {
        core::arch::asm!("in eax, dx", in("dx") port, out("eax") value, options(nomem, nostack, preserves_flags));
    }
    value
}
