//! # Frame-Pointer Stack Walking
//!
//! Best-effort reconstruction of a bounded sequence of return addresses
//! from a trap frame, innermost first, for profiling and diagnostics.
//!
//! The walk follows the frame-pointer chain embedded in the stack: each
//! frame stores the previous frame pointer immediately followed by its
//! return address. The walk is read-only, never allocates, and stops at
//! the first sign the chain has left the thread's kernel stack. It is
//! not re-entrant-safe with respect to the stack it walks; callers pass
//! a quiesced thread's frame or their own.
//!
//! A starting instruction pointer outside the kernel text range is the
//! only hard failure: the top frame itself is untrusted, so the walk
//! refuses to start. Everything after frame 0 degrades gracefully to a
//! shorter walk.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

use kernel_addr::{AddressRange, VirtualAddress};
use kernel_trap::TrapFrame;

const WORD: usize = core::mem::size_of::<usize>();

/// Stack walking failed before the first frame.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum WalkError {
    /// The trap frame's instruction pointer is outside the kernel text
    /// range; the stack it points at is untrusted.
    #[error("instruction pointer {0} is outside the kernel text range")]
    OutOfBounds(VirtualAddress),
}

/// Walks the frame-pointer chain rooted at a trap frame.
///
/// Writes return addresses into `out`, innermost first, with the trap's
/// own instruction pointer as frame 0, and returns how many were
/// written. The walk ends early, without error, when the chain reaches
/// a zero frame pointer, leaves `stack`, loses pointer alignment, or
/// yields a zero return address; zero is the legitimate
/// "no further frames" sentinel, not corruption.
///
/// # Errors
/// [`WalkError::OutOfBounds`] when the instruction pointer is outside
/// `kernel_text`; no frames are written.
pub fn walk(
    frame: &TrapFrame,
    kernel_text: AddressRange,
    stack: AddressRange,
    out: &mut [VirtualAddress],
) -> Result<usize, WalkError> {
    let ip = frame.instruction_pointer();
    if !kernel_text.contains(ip) {
        return Err(WalkError::OutOfBounds(ip));
    }
    if out.is_empty() {
        return Ok(0);
    }

    out[0] = ip;
    let mut count = 1;
    let mut fp = frame.frame_pointer();

    while count < out.len() {
        if fp.is_zero() || fp.as_usize() % WORD != 0 {
            break;
        }
        // Both words of the [previous-fp, return-address] pair must lie
        // inside the stack before they are dereferenced.
        if !stack.contains(fp) || !stack.contains(fp.add(2 * WORD - 1)) {
            break;
        }

        // SAFETY: both reads were bounds-checked against the caller's
        // stack range and are word-aligned.
        let previous_fp = unsafe { fp.as_ptr::<usize>().read() };
        let return_address = unsafe { fp.add(WORD).as_ptr::<usize>().read() };

        if return_address == 0 {
            break;
        }

        out[count] = VirtualAddress::new(return_address);
        count += 1;
        fp = VirtualAddress::new(previous_fp);
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: AddressRange =
        AddressRange::new(VirtualAddress::new(0xffff_8000_0000), VirtualAddress::new(0xffff_9000_0000));

    /// A synthetic stack: `frames` are (previous-fp-index, return-address)
    /// pairs laid out as real frame records, with `usize::MAX` meaning a
    /// zero previous-fp link.
    struct FakeStack {
        words: Vec<usize>,
    }

    impl FakeStack {
        fn new(frames: &[(usize, usize)]) -> Self {
            let mut stack = Self {
                words: vec![0; frames.len() * 2],
            };
            for (i, &(prev, ret)) in frames.iter().enumerate() {
                stack.words[2 * i] = if prev == usize::MAX {
                    0
                } else {
                    stack.frame_addr(prev).as_usize()
                };
                stack.words[2 * i + 1] = ret;
            }
            stack
        }

        fn frame_addr(&self, index: usize) -> VirtualAddress {
            VirtualAddress::from_ptr(self.words.as_ptr()).add(2 * index * WORD)
        }

        fn bounds(&self) -> AddressRange {
            AddressRange::from_base_and_size(
                VirtualAddress::from_ptr(self.words.as_ptr()),
                self.words.len() * WORD,
            )
        }
    }

    fn frame_at(ip: usize, fp: VirtualAddress) -> TrapFrame {
        TrapFrame {
            rip: ip as u64,
            rbp: fp.as_usize() as u64,
            cs: 0x08,
            ..TrapFrame::default()
        }
    }

    #[test]
    fn walk_follows_the_chain_innermost_first() {
        let stack = FakeStack::new(&[(1, 0xffff_8000_1111), (2, 0xffff_8000_2222), (usize::MAX, 0xffff_8000_3333)]);
        let frame = frame_at(0xffff_8000_0042, stack.frame_addr(0));
        let mut out = [VirtualAddress::zero(); 8];

        let count = walk(&frame, TEXT, stack.bounds(), &mut out).expect("in-bounds walk");

        assert_eq!(count, 4);
        assert_eq!(out[0], VirtualAddress::new(0xffff_8000_0042));
        assert_eq!(out[1], VirtualAddress::new(0xffff_8000_1111));
        assert_eq!(out[2], VirtualAddress::new(0xffff_8000_2222));
        assert_eq!(out[3], VirtualAddress::new(0xffff_8000_3333));
    }

    #[test]
    fn user_mode_instruction_pointer_refuses_to_walk() {
        let stack = FakeStack::new(&[(usize::MAX, 0xffff_8000_1111)]);
        let frame = frame_at(0x0040_1000, stack.frame_addr(0));
        let mut out = [VirtualAddress::zero(); 8];

        let result = walk(&frame, TEXT, stack.bounds(), &mut out);

        assert_eq!(result, Err(WalkError::OutOfBounds(VirtualAddress::new(0x0040_1000))));
        assert!(out.iter().all(|address| address.is_zero()));
    }

    #[test]
    fn walk_is_bounded_by_the_output_capacity() {
        let stack = FakeStack::new(&[(1, 0xffff_8000_1111), (2, 0xffff_8000_2222), (usize::MAX, 0xffff_8000_3333)]);
        let frame = frame_at(0xffff_8000_0042, stack.frame_addr(0));
        let mut out = [VirtualAddress::zero(); 2];

        let count = walk(&frame, TEXT, stack.bounds(), &mut out).expect("in-bounds walk");
        assert_eq!(count, 2);
    }

    #[test]
    fn zero_frame_pointer_ends_the_walk_cleanly() {
        let stack = FakeStack::new(&[(usize::MAX, 0xffff_8000_1111)]);
        let frame = frame_at(0xffff_8000_0042, stack.frame_addr(0));
        let mut out = [VirtualAddress::zero(); 8];

        let count = walk(&frame, TEXT, stack.bounds(), &mut out).expect("in-bounds walk");
        assert_eq!(count, 2);
    }

    #[test]
    fn zero_return_address_ends_the_walk_cleanly() {
        let stack = FakeStack::new(&[(1, 0xffff_8000_1111), (usize::MAX, 0)]);
        let frame = frame_at(0xffff_8000_0042, stack.frame_addr(0));
        let mut out = [VirtualAddress::zero(); 8];

        let count = walk(&frame, TEXT, stack.bounds(), &mut out).expect("in-bounds walk");
        assert_eq!(count, 2);
    }

    #[test]
    fn frame_pointer_leaving_the_stack_ends_the_walk() {
        let stack = FakeStack::new(&[(usize::MAX, 0xffff_8000_1111)]);
        let mut frame = frame_at(0xffff_8000_0042, stack.frame_addr(0));
        frame.rbp = 0x1000;
        let mut out = [VirtualAddress::zero(); 8];

        let count = walk(&frame, TEXT, stack.bounds(), &mut out).expect("in-bounds walk");
        assert_eq!(count, 1);
    }

    #[test]
    fn zero_frame_pointer_in_the_trap_frame_yields_only_frame_zero() {
        let stack = FakeStack::new(&[(usize::MAX, 0xffff_8000_1111)]);
        let frame = frame_at(0xffff_8000_0042, VirtualAddress::zero());
        let mut out = [VirtualAddress::zero(); 8];

        let count = walk(&frame, TEXT, stack.bounds(), &mut out).expect("in-bounds walk");
        assert_eq!(count, 1);
    }
}
