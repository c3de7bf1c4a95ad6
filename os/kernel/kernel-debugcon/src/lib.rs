//! # Debug Console Output
//!
//! Byte-at-a-time diagnostic output over the emulator debug console
//! port, with a [`log`] backend on top.
//!
//! The debug console (port `0x402`, captured by `-debugcon` on the
//! emulator side) needs no initialization, no buffering, and works from
//! the earliest trap path onward, which makes it the right sink for the
//! dispatch core's tracing. Writes go through the port primitives in
//! [`kernel_hwio`] and are therefore compiled out entirely unless the
//! `asm` feature is active on an x86 target; formatting itself is also
//! removed when the `enabled` feature is off, so release builds carry
//! zero overhead.
//!
//! Two surfaces:
//!
//! * [`debug_trace!`] — direct, allocation-free formatted output,
//!   usable before the logging framework exists.
//! * [`DebugConLogger`] — a `log::Log` implementation routing the
//!   standard logging macros to the same port.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod logger;

pub use logger::DebugConLogger;

#[cfg(feature = "enabled")]
#[doc(hidden)]
pub mod console_fmt {
    use core::fmt::{self, Write};

    /// Port the emulator's debug console listens on.
    const DEBUG_PORT: u16 = 0x402;

    #[inline]
    fn putc(byte: u8) {
        #[cfg(all(feature = "asm", any(target_arch = "x86", target_arch = "x86_64")))]
        // SAFETY: the debug console port carries no device state; writing
        // a byte has no effect beyond emitting it to the host.
        unsafe {
            kernel_hwio::port::outb(DEBUG_PORT, byte);
        }
        #[cfg(not(all(feature = "asm", any(target_arch = "x86", target_arch = "x86_64"))))]
        let _ = byte;
    }

    /// Unbuffered writer over the debug console port.
    pub struct ConsoleSink;

    impl Write for ConsoleSink {
        #[inline]
        fn write_str(&mut self, s: &str) -> fmt::Result {
            for byte in s.bytes() {
                putc(byte);
            }
            Ok(())
        }
    }

    #[doc(hidden)]
    #[inline]
    pub fn console_write(args: fmt::Arguments) {
        // Best-effort output; the sink cannot fail anyway.
        let _ = fmt::write(&mut ConsoleSink, args);
    }
}

#[cfg(not(feature = "enabled"))]
#[doc(hidden)]
pub mod console_fmt {
    use core::fmt;

    #[doc(hidden)]
    #[inline]
    pub fn console_write(_args: fmt::Arguments) {}
}

/// Formatted output straight to the debug console, bypassing the
/// logging framework. Compiles to nothing without the `enabled` feature.
#[macro_export]
macro_rules! debug_trace {
    ($($arg:tt)*) => {{
        $crate::console_fmt::console_write(core::format_args!($($arg)*));
    }};
}
