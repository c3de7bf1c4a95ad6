//! The register snapshot pushed on trap entry.

use bitfield_struct::bitfield;
use kernel_addr::VirtualAddress;

/// An x86 segment selector, decoded for its privilege bits.
#[bitfield(u16)]
struct SegmentSelector {
    /// Requested privilege level; 0 is kernel, 3 is user.
    #[bits(2)]
    rpl: u8,
    /// Table indicator (GDT/LDT).
    table_indicator: bool,
    /// Descriptor table index.
    #[bits(13)]
    index: u16,
}

/// The x86-64 trap frame.
///
/// Built by the trap entry stubs: general-purpose registers pushed by
/// software, then the error code (zero where the hardware pushes none),
/// then the five words the processor pushes itself. Layout is fixed by
/// those stubs, so this struct is `repr(C)` and field order matters.
#[repr(C)]
#[derive(Clone, Debug, Default)]
pub struct TrapFrame {
    pub rax: u64,
    pub rbx: u64,
    pub rcx: u64,
    pub rdx: u64,
    pub rsi: u64,
    pub rdi: u64,
    pub rbp: u64,
    pub r8: u64,
    pub r9: u64,
    pub r10: u64,
    pub r11: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    pub error_code: u64,
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

impl TrapFrame {
    /// Whether the trap interrupted privileged (ring 0) execution.
    ///
    /// Decided from the saved code-segment selector's requested
    /// privilege level, not stored as a separate field.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // selectors are architecturally 16 bits
    pub const fn from_privileged_mode(&self) -> bool {
        SegmentSelector::from_bits(self.cs as u16).rpl() == 0
    }

    /// Where the interrupted code was executing.
    #[inline]
    #[must_use]
    pub const fn instruction_pointer(&self) -> VirtualAddress {
        VirtualAddress::new(self.rip as usize)
    }

    /// The interrupted code's frame pointer, root of the stack walk.
    #[inline]
    #[must_use]
    pub const fn frame_pointer(&self) -> VirtualAddress {
        VirtualAddress::new(self.rbp as usize)
    }

    /// The interrupted code's stack pointer.
    #[inline]
    #[must_use]
    pub const fn stack_pointer(&self) -> VirtualAddress {
        VirtualAddress::new(self.rsp as usize)
    }

    /// Reason code for a privileged debug-service trap, passed in the
    /// first argument register.
    #[inline]
    #[must_use]
    pub const fn debug_service_reason(&self) -> u64 {
        self.rdi
    }

    /// Data pointer for a privileged debug-service trap, passed in the
    /// second argument register.
    #[inline]
    #[must_use]
    pub const fn debug_service_data(&self) -> u64 {
        self.rsi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privilege_is_read_from_the_selector_rpl() {
        let mut frame = TrapFrame {
            cs: 0x08,
            ..TrapFrame::default()
        };
        assert!(frame.from_privileged_mode());

        frame.cs = 0x2b;
        assert!(!frame.from_privileged_mode());
    }

    #[test]
    fn debug_service_arguments_use_the_sysv_argument_registers() {
        let frame = TrapFrame {
            rdi: 0x11,
            rsi: 0xfee0_0000,
            ..TrapFrame::default()
        };
        assert_eq!(frame.debug_service_reason(), 0x11);
        assert_eq!(frame.debug_service_data(), 0xfee0_0000);
    }
}
